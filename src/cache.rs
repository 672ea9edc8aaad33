//! Identity map for catalog entities.
//!
//! Every entity decoded by the client passes through an [`EntityCache`], so a
//! track reached directly and the same track reached through a playlist or an
//! album converge on one shared `Arc`. The cache has no eviction: it grows
//! with the number of distinct resources a client touches.

use crate::id::{EntityKind, HasUri};
use crate::{Album, Artist, Episode, Playlist, Show, Track, User};
use std::sync::{Arc, PoisonError};

mod sealed {
    use super::EntityCache;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// Storage for a single entity kind.
    pub struct Slot<T>(pub(super) RwLock<HashMap<String, Arc<T>>>);

    impl<T> Default for Slot<T> {
        fn default() -> Self {
            Self(RwLock::new(HashMap::new()))
        }
    }

    pub trait Stored: Sized {
        fn slot(cache: &EntityCache) -> &Slot<Self>;
    }
}

use sealed::Slot;

/// A catalog resource with a stable id, unique within its [`EntityKind`].
pub trait Entity: sealed::Stored + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Replace embedded related entities with their cached instances.
    ///
    /// Called once before the entity itself is stored.
    fn link(self, _cache: &EntityCache) -> Self {
        self
    }
}

/// Process wide store of decoded entities, one map per kind.
///
/// Reads and writes take a short synchronous lock and never await, so the
/// cache can be shared freely between tasks.
#[derive(Default)]
pub struct EntityCache {
    tracks: Slot<Track>,
    albums: Slot<Album>,
    artists: Slot<Artist>,
    playlists: Slot<Playlist>,
    users: Slot<User>,
    shows: Slot<Show>,
    episodes: Slot<Episode>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entity by id.
    pub fn get<T: Entity>(&self, id: &str) -> Option<Arc<T>> {
        T::slot(self)
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Look up an entity by bare id, URI or web URL.
    ///
    /// Fails if the argument names a different kind than `T`.
    pub fn lookup<T: Entity>(&self, argument: &str) -> Result<Option<Arc<T>>, crate::Error> {
        let id = crate::parse_argument(argument, T::KIND)?;
        Ok(self.get(&id))
    }

    /// Store `entity`, replacing any earlier entry with the same id, and
    /// return the stored instance.
    ///
    /// Embedded related entities are linked first. Entities without an id
    /// (local files inside playlists) are returned without being stored.
    pub fn insert<T: Entity>(&self, entity: T) -> Arc<T> {
        let entity = Arc::new(entity.link(self));

        if entity.id().is_empty() {
            return entity;
        }

        T::slot(self)
            .0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.id().to_string(), entity.clone());

        entity
    }

    /// Return the cached instance for `entity`'s id, storing `entity` if the
    /// id has not been seen yet.
    pub fn intern<T: Entity>(&self, entity: Arc<T>) -> Arc<T> {
        if entity.id().is_empty() {
            return entity;
        }

        if let Some(existing) = self.get::<T>(entity.id()) {
            return existing;
        }

        let linked = Arc::new(Arc::unwrap_or_clone(entity).link(self));

        T::slot(self)
            .0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(linked.id().to_string())
            .or_insert(linked)
            .clone()
    }

    /// Intern every entity in `entities`.
    pub(crate) fn intern_all<T: Entity>(&self, entities: Vec<Arc<T>>) -> Vec<Arc<T>> {
        entities
            .into_iter()
            .map(|entity| self.intern(entity))
            .collect()
    }

    /// Insert every entity in `entities`, preserving order.
    pub(crate) fn insert_all<T: Entity>(&self, entities: Vec<Arc<T>>) -> Vec<Arc<T>> {
        entities
            .into_iter()
            .map(|entity| self.insert(Arc::unwrap_or_clone(entity)))
            .collect()
    }

    /// Whether an entity of `kind` with `id` is cached.
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        match kind {
            EntityKind::Track => self.get::<Track>(id).is_some(),
            EntityKind::Album => self.get::<Album>(id).is_some(),
            EntityKind::Artist => self.get::<Artist>(id).is_some(),
            EntityKind::Playlist => self.get::<Playlist>(id).is_some(),
            EntityKind::User => self.get::<User>(id).is_some(),
            EntityKind::Show => self.get::<Show>(id).is_some(),
            EntityKind::Episode => self.get::<Episode>(id).is_some(),
        }
    }

    /// Number of cached entities of `kind`.
    pub fn len(&self, kind: EntityKind) -> usize {
        fn count<T>(slot: &Slot<T>) -> usize {
            slot.0.read().unwrap_or_else(PoisonError::into_inner).len()
        }

        match kind {
            EntityKind::Track => count(&self.tracks),
            EntityKind::Album => count(&self.albums),
            EntityKind::Artist => count(&self.artists),
            EntityKind::Playlist => count(&self.playlists),
            EntityKind::User => count(&self.users),
            EntityKind::Show => count(&self.shows),
            EntityKind::Episode => count(&self.episodes),
        }
    }

    /// Whether nothing of `kind` is cached.
    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }
}

macro_rules! stored_entity {
    ($entity:ty, $field:ident) => {
        impl sealed::Stored for $entity {
            fn slot(cache: &EntityCache) -> &Slot<Self> {
                &cache.$field
            }
        }

        impl HasUri for $entity {
            fn uri(&self) -> String {
                format!(
                    "{}:{}:{}",
                    crate::id::SPOTIFY_URI_SCHEME,
                    <$entity as Entity>::KIND,
                    self.id
                )
            }
        }
    };
}

stored_entity!(Track, tracks);
stored_entity!(Album, albums);
stored_entity!(Artist, artists);
stored_entity!(Playlist, playlists);
stored_entity!(User, users);
stored_entity!(Show, shows);
stored_entity!(Episode, episodes);
