//! Behaviour every `VersionStore` adapter must share, run against each one.

use crate::{SetOptions, StoreError, VersionStore};

fn values(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn check_all(store: &dyn VersionStore) {
    set_then_get_current(store);
    latest_grows_by_one_per_write(store);
    keep_current_retains_pointer(store);
    get_many_returns_write_order(store);
    unknown_path_is_not_found(store);
    empty_version_semantics(store);
    first_write_keep_current(store);
}

fn set_then_get_current(store: &dyn VersionStore) {
    let meta = store.set("/c/one", "v1", SetOptions::default()).unwrap();
    assert_eq!(meta.path, "/c/one");
    assert_eq!(meta.latest_version, 1);
    assert_eq!(meta.current_version, 1);
    assert_eq!(store.get_current("/c/one").unwrap(), "v1");
    assert_eq!(store.get("/c/one", 1).unwrap(), "v1");
}

fn latest_grows_by_one_per_write(store: &dyn VersionStore) {
    let m1 = store
        .set_many("/c/grow", &values(&["a", "b", "c"]), SetOptions::default())
        .unwrap();
    let m2 = store.set("/c/grow", "d", SetOptions::default()).unwrap();
    let m3 = store
        .set_many("/c/grow", &[], SetOptions::default())
        .unwrap();
    assert_eq!(m1.latest_version, 1);
    assert_eq!(m2.latest_version, 2);
    assert_eq!(m3.latest_version, 3);
    assert_eq!(m3.created_at, m1.created_at);
    assert!(m3.updated_at >= m1.updated_at);
}

fn keep_current_retains_pointer(store: &dyn VersionStore) {
    store.set("/c/keep", "first", SetOptions::default()).unwrap();
    let meta = store
        .set("/c/keep", "second", SetOptions::keep_current())
        .unwrap();
    assert_eq!(meta.latest_version, 2);
    assert_eq!(meta.current_version, 1);
    assert_eq!(store.get_current("/c/keep").unwrap(), "first");
    assert_eq!(store.get("/c/keep", 2).unwrap(), "second");

    let meta = store.set("/c/keep", "third", SetOptions::default()).unwrap();
    assert_eq!(meta.current_version, meta.latest_version);
    assert_eq!(store.metadata("/c/keep").unwrap(), meta);
}

fn get_many_returns_write_order(store: &dyn VersionStore) {
    store
        .set_many("/c/many", &values(&["z", "a", "m"]), SetOptions::default())
        .unwrap();
    store
        .set_many("/c/many", &values(&["x"]), SetOptions::keep_current())
        .unwrap();
    assert_eq!(store.get_many("/c/many", 1).unwrap(), values(&["z", "a", "m"]));
    assert_eq!(store.get_many("/c/many", 2).unwrap(), values(&["x"]));
    assert_eq!(store.get_many_current("/c/many").unwrap(), values(&["z", "a", "m"]));
    assert_eq!(store.get_current("/c/many").unwrap(), "z");
}

fn unknown_path_is_not_found(store: &dyn VersionStore) {
    assert!(store.get_current("/c/missing").unwrap_err().is_not_found());
    assert!(store.get("/c/missing", 1).unwrap_err().is_not_found());
    assert!(store.get_many_current("/c/missing").unwrap_err().is_not_found());
    assert!(store.get_many("/c/missing", 1).unwrap_err().is_not_found());
    assert!(store.metadata("/c/missing").unwrap_err().is_not_found());
}

fn empty_version_semantics(store: &dyn VersionStore) {
    store.set_many("/c/empty", &[], SetOptions::default()).unwrap();
    assert_eq!(store.get_many_current("/c/empty").unwrap(), Vec::<String>::new());
    assert!(store.get_current("/c/empty").unwrap_err().is_not_found());
    // Never-written version of a known path.
    assert_eq!(store.get_many("/c/empty", 42).unwrap(), Vec::<String>::new());
    assert!(matches!(
        store.get("/c/empty", 42),
        Err(StoreError::NotFound { .. })
    ));
}

fn first_write_keep_current(store: &dyn VersionStore) {
    let meta = store
        .set("/c/staged", "pending", SetOptions::keep_current())
        .unwrap();
    assert_eq!(meta.latest_version, 1);
    assert_eq!(meta.current_version, 0);
    assert!(store.get_current("/c/staged").unwrap_err().is_not_found());
    assert!(store.get_many_current("/c/staged").unwrap().is_empty());
    assert_eq!(store.get("/c/staged", 1).unwrap(), "pending");
}

/// Many threads writing one path must produce versions 1..=N with no lost
/// update, while a second path is written alongside.
pub(crate) fn check_concurrent_writers(store: &dyn VersionStore) {
    const THREADS: usize = 8;
    const WRITES: usize = 10;

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            scope.spawn(move || {
                for w in 0..WRITES {
                    let value = format!("{t}-{w}");
                    store
                        .set_many("/race", &[value.clone(), value], SetOptions::default())
                        .unwrap();
                    store.set(&format!("/other/{t}"), "x", SetOptions::default()).unwrap();
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..THREADS * WRITES {
                if let Ok(values) = store.get_many_current("/race") {
                    // Version 0 is empty; any later visible version carries its full value set.
                    assert!(values.is_empty() || values.len() == 2, "torn read: {values:?}");
                }
            }
        });
    });

    let total = (THREADS * WRITES) as u64;
    let meta = store.metadata("/race").unwrap();
    assert_eq!(meta.latest_version, total);
    assert_eq!(meta.current_version, total);

    let mut seen = std::collections::HashSet::new();
    for version in 1..=total {
        let values = store.get_many("/race", version).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], values[1]);
        assert!(seen.insert(values[0].clone()), "duplicate write {}", values[0]);
    }
    for t in 0..THREADS {
        let meta = store.metadata(&format!("/other/{t}")).unwrap();
        assert_eq!(meta.latest_version, WRITES as u64);
    }
}

/// A path whose first write is in flight is either unknown or fully
/// committed; never metadata at version 0 or a version without its values.
pub(crate) fn check_first_write_visibility(store: &dyn VersionStore) {
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PATHS: usize = 300;
    let next = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..PATHS {
                next.store(i, Ordering::Release);
                store
                    .set_many(&format!("/fresh/{i}"), &values(&["a", "b"]), SetOptions::default())
                    .unwrap();
            }
            next.store(PATHS, Ordering::Release);
        });
        scope.spawn(|| {
            loop {
                let i = next.load(Ordering::Acquire);
                if i >= PATHS {
                    break;
                }
                let path = format!("/fresh/{i}");
                match store.metadata(&path) {
                    Ok(meta) => {
                        assert_eq!(meta.latest_version, 1, "uncommitted metadata for {path}");
                        assert_eq!(meta.current_version, 1);
                    }
                    Err(err) => assert!(err.is_not_found(), "unexpected error: {err}"),
                }
                match store.get_many_current(&path) {
                    Ok(found) => assert_eq!(found, values(&["a", "b"])),
                    Err(err) => assert!(err.is_not_found(), "unexpected error: {err}"),
                }
            }
        });
    });

    for i in 0..PATHS {
        let meta = store.metadata(&format!("/fresh/{i}")).unwrap();
        assert_eq!(meta.latest_version, 1);
    }
}
