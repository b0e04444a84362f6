//! Integration tests for the shared result caches.

mod common;

use std::sync::Arc;
use std::thread;

use common::Harness;
use quay_render::{Redirect, Render, ResultCache};
use quay_test::SarBuilder;

#[test]
fn test_cached_acquire_returns_the_same_instance() {
    let cache: ResultCache<Render> = ResultCache::new();

    let first = cache.acquire("home", None, true).unwrap();
    let second = cache.acquire("home", None, true).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.template, "home");

    let a = cache.acquire("home", None, false).unwrap();
    let b = cache.acquire("home", None, false).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &first));
}

#[test]
fn test_candidate_overwrites_cached_entry() {
    let cache: ResultCache<Render> = ResultCache::new();
    let original = cache.acquire("home", None, true).unwrap();

    let candidate = Render::new("home").with_attribute("banner", "sale");
    let replaced = cache.acquire("home", Some(candidate), true).unwrap();
    assert!(!Arc::ptr_eq(&original, &replaced));

    let seen = cache.acquire("home", None, true).unwrap();
    assert!(Arc::ptr_eq(&seen, &replaced));
    assert_eq!(seen.attributes["banner"], "sale");
}

#[test]
fn test_concurrent_writers_leave_one_visible_value() {
    let cache: Arc<ResultCache<Redirect>> = Arc::new(ResultCache::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let candidate = Redirect::new(format!("/page/{i}"));
                cache.acquire("next", Some(candidate), true).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 1);
    let winner = cache.acquire("next", None, true).unwrap();
    let again = cache.acquire("next", None, true).unwrap();
    assert!(Arc::ptr_eq(&winner, &again));
    assert!(winner.url.starts_with("/page/"));
}

#[test]
fn test_redeploy_clears_host_caches() {
    let harness = Harness::new();
    harness.deploy(&SarBuilder::new("shop").file("public/a.txt", "a"));

    let caches = Arc::clone(harness.host.caches());
    let before = caches.renders.acquire("home", None, true).unwrap();
    caches.redirects.acquire("/cart", None, true).unwrap();
    assert_eq!(caches.len(), 2);

    harness.deploy(&SarBuilder::new("shop").file("public/b.txt", "b"));
    assert!(caches.is_empty());

    let after = caches.renders.acquire("home", None, true).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
}
