use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use mtutils::cache::Cache;

use crate::util::init_tracing;

const TTL: Duration = Duration::from_millis(100);

#[test]
fn test_set_get() {
    let cache = Cache::new(Duration::from_secs(60));
    assert!(cache.is_empty());

    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("a", 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&"a"), Some(3));
    assert_eq!(cache.get(&"b"), Some(2));
    assert_eq!(cache.get(&"c"), None);
}

#[test]
fn test_expiry() {
    init_tracing();
    let cache = Cache::new(TTL);

    cache.set(1, "one");
    assert_eq!(cache.get(&1), Some("one"));

    thread::sleep(TTL * 4);

    assert_eq!(cache.get(&1), None);
    assert!(cache.is_empty());
}

#[test]
fn test_activity_postpones_expiry() {
    let cache = Cache::new(TTL);
    cache.set(1, 1);

    for _ in 0..6 {
        thread::sleep(TTL / 3);
        assert_eq!(cache.get(&1), Some(1));
    }

    thread::sleep(TTL * 4);
    assert_eq!(cache.get(&1), None);
}

#[test]
fn test_eviction_callback() {
    let evicted = Arc::new(Mutex::new(Vec::new()));

    let cache = {
        let evicted = Arc::clone(&evicted);
        Cache::with_eviction(TTL, move |key: &u64, value: String| {
            evicted.lock().unwrap().push((*key, value));
        })
    };

    cache.set(1, "one".to_string());
    cache.set(2, "two".to_string());

    thread::sleep(TTL * 4);

    let mut evicted = evicted.lock().unwrap().clone();
    evicted.sort();

    assert_eq!(
        evicted,
        vec![(1, "one".to_string()), (2, "two".to_string())]
    );
    assert!(cache.is_empty());
}

#[test]
fn test_remove_skips_callback() {
    let evicted = Arc::new(Mutex::new(0));

    let cache = {
        let evicted = Arc::clone(&evicted);
        Cache::with_eviction(TTL, move |_: &u64, _: u64| *evicted.lock().unwrap() += 1)
    };

    cache.set(1, 10);
    assert_eq!(cache.remove(&1), Some(10));
    assert_eq!(cache.remove(&1), None);

    // a new entry under the same key gets a fresh expiry
    cache.set(1, 11);

    thread::sleep(TTL * 4);

    assert_eq!(*evicted.lock().unwrap(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_many_keys_expire() {
    init_tracing();
    let evicted = Arc::new(Mutex::new(0));

    let cache = {
        let evicted = Arc::clone(&evicted);
        Cache::with_eviction(TTL, move |_: &u64, _: u64| *evicted.lock().unwrap() += 1)
    };

    for key in 0..5_000 {
        cache.set(key, key);
    }
    assert_eq!(cache.len(), 5_000);

    // keep half of them alive for a while
    for _ in 0..3 {
        thread::sleep(TTL / 2);
        for key in (0..5_000).step_by(2) {
            assert_eq!(cache.get(&key), Some(key));
        }
    }

    thread::sleep(TTL * 5);

    assert!(cache.is_empty());
    assert_eq!(*evicted.lock().unwrap(), 5_000);
}

#[test]
fn test_panicking_callback_keeps_sweeping() {
    let cache = Cache::with_eviction(TTL, |key: &u64, _: u64| {
        if *key == 0 {
            panic!("eviction failed");
        }
    });

    cache.set(0, 0);
    thread::sleep(TTL * 3);
    assert!(cache.is_empty());

    cache.set(1, 1);
    thread::sleep(TTL * 3);
    assert!(cache.is_empty());
}
