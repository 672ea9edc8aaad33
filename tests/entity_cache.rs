use serde_json::json;
use spotifyrs::{Album, Artist, EntityCache, EntityKind, Error, HasUri, Playlist, Track};
use std::sync::Arc;

fn artist(id: &str, name: &str) -> Artist {
    serde_json::from_value(json!({ "id": id, "name": name })).unwrap()
}

fn track(id: &str, name: &str, album_id: &str) -> Track {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "duration_ms": 200000,
        "artists": [{ "id": "artist1", "name": "Simplified Artist" }],
        "album": {
            "id": album_id,
            "name": "Simplified Album",
            "artists": [{ "id": "artist1", "name": "Simplified Artist" }]
        }
    }))
    .unwrap()
}

#[test]
fn test_insert_then_get_returns_same_instance() {
    let cache = EntityCache::new();

    let stored = cache.insert(artist("a1", "Daft Punk"));
    let fetched = cache.get::<Artist>("a1").unwrap();

    assert!(Arc::ptr_eq(&stored, &fetched));
    assert_eq!(fetched.name, "Daft Punk");
}

#[test]
fn test_insert_is_last_write_wins() {
    let cache = EntityCache::new();

    let first = cache.insert(artist("a1", "Old Name"));
    let second = cache.insert(artist("a1", "New Name"));

    assert!(!Arc::ptr_eq(&first, &second));
    let fetched = cache.get::<Artist>("a1").unwrap();
    assert!(Arc::ptr_eq(&fetched, &second));
    assert_eq!(fetched.name, "New Name");
    assert_eq!(cache.len(EntityKind::Artist), 1);
}

#[test]
fn test_get_missing_returns_none() {
    let cache = EntityCache::new();

    assert!(cache.get::<Track>("missing").is_none());
    assert!(cache.is_empty(EntityKind::Track));
}

#[test]
fn test_kinds_are_separate() {
    let cache = EntityCache::new();

    cache.insert(artist("shared", "An Artist"));

    assert!(cache.contains(EntityKind::Artist, "shared"));
    assert!(!cache.contains(EntityKind::Album, "shared"));
    assert!(cache.get::<Album>("shared").is_none());
}

#[test]
fn test_insert_links_embedded_entities() {
    let cache = EntityCache::new();

    let full_artist = cache.insert(artist("artist1", "Full Artist"));
    let track = cache.insert(track("t1", "Song", "album1"));

    // The embedded artist is replaced by the cached full artist
    assert!(Arc::ptr_eq(&track.artists[0], &full_artist));
    assert_eq!(track.artists[0].name, "Full Artist");

    // The embedded album was unknown, so it is now cached
    let album = cache.get::<Album>("album1").unwrap();
    assert!(Arc::ptr_eq(track.album.as_ref().unwrap(), &album));

    // And the album's own artist was linked too
    assert!(Arc::ptr_eq(&album.artists[0], &full_artist));
}

#[test]
fn test_embedded_entities_converge_across_tracks() {
    let cache = EntityCache::new();

    let first = cache.insert(track("t1", "First", "album1"));
    let second = cache.insert(track("t2", "Second", "album1"));

    assert!(Arc::ptr_eq(
        first.album.as_ref().unwrap(),
        second.album.as_ref().unwrap()
    ));
    assert!(Arc::ptr_eq(&first.artists[0], &second.artists[0]));
    assert_eq!(cache.len(EntityKind::Album), 1);
    assert_eq!(cache.len(EntityKind::Artist), 1);
}

#[test]
fn test_intern_keeps_existing_instance() {
    let cache = EntityCache::new();

    let full = cache.insert(artist("a1", "Full"));
    let interned = cache.intern(Arc::new(artist("a1", "Partial")));

    assert!(Arc::ptr_eq(&full, &interned));
    assert_eq!(cache.get::<Artist>("a1").unwrap().name, "Full");
}

#[test]
fn test_intern_stores_unknown_entity() {
    let cache = EntityCache::new();

    let interned = cache.intern(Arc::new(artist("a2", "Newcomer")));
    let fetched = cache.get::<Artist>("a2").unwrap();

    assert!(Arc::ptr_eq(&interned, &fetched));
}

#[test]
fn test_entities_without_id_are_not_cached() {
    let cache = EntityCache::new();

    let local: Track = serde_json::from_value(json!({
        "id": null,
        "name": "Local File",
        "duration_ms": 1000,
        "is_local": true
    }))
    .unwrap();

    let stored = cache.insert(local);
    assert_eq!(stored.name, "Local File");
    assert!(cache.is_empty(EntityKind::Track));
}

#[test]
fn test_lookup_accepts_uri_and_rejects_other_kind() {
    let cache = EntityCache::new();
    cache.insert(artist("0OdUWJ0sBjDrqHygGUXeCF", "Band of Horses"));

    let found = cache
        .lookup::<Artist>("spotify:artist:0OdUWJ0sBjDrqHygGUXeCF")
        .unwrap();
    assert!(found.is_some());

    let mismatch = cache.lookup::<Artist>("spotify:track:0OdUWJ0sBjDrqHygGUXeCF");
    assert!(matches!(mismatch, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_entity_uri() {
    let playlist: Playlist = serde_json::from_value(json!({
        "id": "37i9dQZF1DXcBWIGoYBM5M",
        "name": "Today's Top Hits"
    }))
    .unwrap();

    assert_eq!(playlist.uri(), "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M");
    assert_eq!(artist("abc", "x").uri(), "spotify:artist:abc");
}

#[test]
fn test_concurrent_inserts_converge() {
    let cache = Arc::new(EntityCache::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = cache.clone();
            std::thread::spawn(move || cache.intern(Arc::new(artist("same", &format!("copy {i}")))))
        })
        .collect();

    let results: Vec<Arc<Artist>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let cached = cache.get::<Artist>("same").unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(result, &cached));
    }
}
