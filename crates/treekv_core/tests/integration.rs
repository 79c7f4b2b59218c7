//! End-to-end tests for the store over the in-memory engine.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use treekv_core::{Config, CoreError, Store};
use treekv_engine::{Connection, MemoryConnection};

/// Replay window short enough to keep tests fast, long enough to absorb
/// the replay burst reliably.
const REPLAY: Duration = Duration::from_millis(100);

fn open_store() -> (Arc<MemoryConnection>, Store) {
    open_store_with(Config::default().replay_window(REPLAY))
}

fn open_store_with(config: Config) -> (Arc<MemoryConnection>, Store) {
    let conn = Arc::new(MemoryConnection::new());
    let store = Store::open(Arc::clone(&conn) as Arc<dyn Connection>, config).unwrap();
    (conn, store)
}

/// Sleeps past the replay window so subsequent writes count as live.
fn settle() {
    thread::sleep(REPLAY + Duration::from_millis(200));
}

#[test]
fn crud_and_listing_over_a_hierarchy() {
    let (_conn, store) = open_store();

    store.put("services/web/host", b"web-1").unwrap();
    store.put("services/web/port", b"8080").unwrap();
    store.put("services/db/host", b"db-1").unwrap();
    store.put("jobs/nightly", b"0 3 * * *").unwrap();

    let entry = store.get("services/web/host").unwrap();
    assert_eq!(entry.key, "services/web/host");
    assert_eq!(entry.value, b"web-1");

    let mut keys: Vec<String> = store
        .list("services")
        .unwrap()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "services/db/host".to_string(),
            "services/web/host".to_string(),
            "services/web/port".to_string(),
        ]
    );

    let web = store.list("services/web").unwrap();
    assert_eq!(web.len(), 2);

    store.delete_tree("services").unwrap();
    assert!(matches!(
        store.list("services"),
        Err(CoreError::KeyNotFound)
    ));
    // Unrelated trees are untouched.
    assert!(store.exists("jobs/nightly").unwrap());
}

#[test]
fn optimistic_concurrency_round() {
    let (_conn, store) = open_store();

    // Two writers create-race; one wins.
    let first = store.atomic_put("leader", b"node-a", None).unwrap();
    assert!(matches!(
        store.atomic_put("leader", b"node-b", None),
        Err(CoreError::KeyExists)
    ));

    // The winner advances its entry; a stale holder loses the swap.
    let second = store.atomic_put("leader", b"node-a2", Some(&first)).unwrap();
    assert!(matches!(
        store.atomic_put("leader", b"node-b", Some(&first)),
        Err(CoreError::KeyModified { .. })
    ));
    assert_eq!(store.get("leader").unwrap().value, b"node-a2");

    // Conditional delete follows the same rules.
    assert!(matches!(
        store.atomic_delete("leader", Some(&first)),
        Err(CoreError::KeyModified { .. })
    ));
    store.atomic_delete("leader", Some(&second)).unwrap();
    assert!(matches!(store.get("leader"), Err(CoreError::KeyNotFound)));
}

#[test]
fn watch_sees_only_live_updates_for_its_key() {
    let (_conn, store) = open_store();
    store.put("config/flag", b"old").unwrap();

    let watch = store.watch("config/flag").unwrap();
    settle();

    store.put("config/flag", b"new").unwrap();
    store.put("config/other", b"noise").unwrap();

    let update = watch.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(update.key, "config/flag");
    assert_eq!(update.value, b"new");
    // The pre-subscription value was suppressed and the other key never
    // matched the subject.
    assert!(watch.try_recv().is_none());
}

#[test]
fn watch_wildcard_covers_immediate_children() {
    let (_conn, store) = open_store();
    let watch = store.watch("config/*").unwrap();
    settle();

    store.put("config/a", b"1").unwrap();
    store.put("config/a/nested", b"2").unwrap();
    store.put("other/b", b"3").unwrap();

    let update = watch.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(update.key, "config/a");
    assert!(watch.try_recv().is_none());
}

#[test]
fn watch_tree_delivers_single_element_batches() {
    let (_conn, store) = open_store();
    let watch = store.watch_tree("config").unwrap();
    settle();

    store.put("config/a", b"1").unwrap();
    store.put("config/b", b"2").unwrap();

    let batches: Vec<_> = watch.iter().take(2).collect();
    assert!(batches.iter().all(|batch| batch.len() == 1));
    assert_eq!(batches[0][0].key, "config/a");
    assert_eq!(batches[1][0].key, "config/b");
}

#[test]
fn watch_delivers_delete_notifications() {
    let (_conn, store) = open_store();
    store.put("config/flag", b"v").unwrap();

    let watch = store.watch("config/flag").unwrap();
    settle();

    store.delete("config/flag").unwrap();
    let update = watch.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(update.key, "config/flag");
    assert!(update.value.is_empty());
}

#[test]
fn cancelled_watch_releases_its_subscription() {
    let (conn, store) = open_store();
    let watch = store.watch("config/flag").unwrap();
    settle();

    watch.cancel();
    assert!(watch.recv_timeout(Duration::from_secs(1)).is_none());

    // The engine prunes the watcher on the next delivery attempt.
    store.put("config/flag", b"v").unwrap();
    thread::sleep(Duration::from_millis(200));
    store.put("config/flag", b"v2").unwrap();
    let bucket = conn.bucket("kvstore").unwrap();
    assert_eq!(bucket.watcher_count(), 0);
}

#[test]
fn encoded_store_handles_hostile_segments() {
    let (_conn, store) =
        open_store_with(Config::default().encode_keys(true).replay_window(REPLAY));

    store.put("hosts/10.0.0.1/role", b"gateway").unwrap();
    let entry = store.get("hosts/10.0.0.1/role").unwrap();
    assert_eq!(entry.key, "hosts/10.0.0.1/role");

    let entries = store.list("hosts/10.0.0.1").unwrap();
    assert_eq!(entries.len(), 1);

    let watch = store.watch("hosts/10.0.0.1/*").unwrap();
    settle();
    store.put("hosts/10.0.0.1/port", b"443").unwrap();
    let update = watch.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(update.key, "hosts/10.0.0.1/port");
}

#[test]
fn close_ends_active_watches() {
    let (_conn, store) = open_store();
    let watch = store.watch("config/flag").unwrap();
    settle();

    store.close().unwrap();
    assert!(watch.recv_timeout(Duration::from_secs(2)).is_none());
    assert!(matches!(
        store.get("config/flag"),
        Err(CoreError::StoreClosed)
    ));
}
