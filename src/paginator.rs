use crate::Error;
use futures::future::BoxFuture;
use futures::stream::{self, Stream};

/// Default page size for paginators built by the client.
pub const DEFAULT_INCREMENT: u32 = 50;

/// Default upper bound on the offset for paginators built by the client.
pub const DEFAULT_MAX: u32 = 200;

/// Largest page size the Web API accepts on list endpoints.
pub const MAX_INCREMENT: u32 = 100;

/// Future returned by a page fetch callback.
pub type PageFuture<'a, T> = BoxFuture<'a, Result<Vec<T>, Error>>;

type FetchPage<'a, T> = Box<dyn FnMut(u32, u32) -> PageFuture<'a, T> + Send + 'a>;

/// Lifecycle of a [`Paginator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    /// Another page may be requested.
    Ready,
    /// A page request is in flight.
    Fetching,
    /// The last request returned no items.
    ExhaustedEmpty,
    /// The offset reached the configured maximum.
    ExhaustedMax,
}

impl PaginatorState {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::ExhaustedEmpty | Self::ExhaustedMax)
    }
}

/// Drives an offset/limit list endpoint one page at a time.
///
/// The fetch callback receives `(offset, limit)` and returns the items of
/// that page. Paging stops when a page comes back empty or once the offset
/// reaches `max`, whichever happens first. A paginator only moves forward
/// and is finished once exhausted.
///
/// # Example
///
/// ```
/// use spotifyrs::Paginator;
///
/// # async fn example() -> Result<(), spotifyrs::Error> {
/// let mut paginator = Paginator::new(
///     |offset, limit| {
///         Box::pin(async move { Ok::<_, spotifyrs::Error>((offset..(offset + limit).min(7)).collect::<Vec<u32>>()) })
///     },
///     5,
///     100,
/// )?;
///
/// let all = paginator.all().await?;
/// assert_eq!(all.len(), 7);
/// # Ok(())
/// # }
/// ```
pub struct Paginator<'a, T> {
    fetch: FetchPage<'a, T>,
    increment: u32,
    max: u32,
    offset: u32,
    state: PaginatorState,
    items: Vec<T>,
}

impl<'a, T: Clone> Paginator<'a, T> {
    /// Create a paginator around `fetch`.
    ///
    /// Fails with [`Error::InvalidArgument`] unless `increment` is between 1
    /// and 100.
    pub fn new<F>(fetch: F, increment: u32, max: u32) -> Result<Self, Error>
    where
        F: FnMut(u32, u32) -> PageFuture<'a, T> + Send + 'a,
    {
        if !(1..=MAX_INCREMENT).contains(&increment) {
            return Err(Error::InvalidArgument(format!(
                "increment must be between 1 and {MAX_INCREMENT}, got {increment}"
            )));
        }

        Ok(Self {
            fetch: Box::new(fetch),
            increment,
            max,
            offset: 0,
            state: PaginatorState::Ready,
            items: Vec::new(),
        })
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the paginator is exhausted. A failed fetch
    /// leaves the offset untouched and returns the error as is.
    pub async fn next(&mut self) -> Result<Option<Vec<T>>, Error> {
        if self.state.is_exhausted() {
            return Ok(None);
        }

        if self.offset >= self.max {
            self.state = PaginatorState::ExhaustedMax;
            return Ok(None);
        }

        self.state = PaginatorState::Fetching;

        let page = match (self.fetch)(self.offset, self.increment).await {
            Ok(page) => page,
            Err(e) => {
                self.state = PaginatorState::Ready;
                return Err(e);
            }
        };

        if page.is_empty() {
            self.state = PaginatorState::ExhaustedEmpty;
            return Ok(None);
        }

        log::trace!(
            "Fetched page of {} items at offset {}",
            page.len(),
            self.offset
        );

        self.offset = self.offset.saturating_add(self.increment);
        self.items.extend(page.iter().cloned());
        self.state = PaginatorState::Ready;

        Ok(Some(page))
    }

    /// Fetch every remaining page and return all items collected so far.
    ///
    /// Calling this again after exhaustion returns the same items without
    /// fetching anything.
    pub async fn all(&mut self) -> Result<Vec<T>, Error> {
        while self.next().await?.is_some() {}
        Ok(self.items.clone())
    }

    /// Items collected so far, in fetch order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn state(&self) -> PaginatorState {
        self.state
    }

    /// Offset of the next page to fetch.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Turn the paginator into a stream of pages.
    ///
    /// The stream ends after exhaustion or after yielding the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>, Error>> + Send + 'a
    where
        T: Send + 'a,
    {
        stream::unfold((self, false), |(mut paginator, failed)| async move {
            if failed {
                return None;
            }

            match paginator.next().await {
                Ok(Some(page)) => Some((Ok(page), (paginator, false))),
                Ok(None) => None,
                Err(e) => Some((Err(e), (paginator, true))),
            }
        })
    }
}

impl<T> std::fmt::Debug for Paginator<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("offset", &self.offset)
            .field("increment", &self.increment)
            .field("max", &self.max)
            .field("state", &self.state)
            .field("items", &self.items.len())
            .finish()
    }
}
