//! Concurrent Access Tests
//!
//! One DAO shared by many threads:
//! - Concurrent misses on the same predicate prepare exactly one statement
//! - Hits do not prepare
//! - Independent inserts all land

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use columndao::schema::Entity;

use common::store;

const THREADS: usize = 8;

// =============================================================================
// Predicate Statement Cache
// =============================================================================

/// Threads racing on a cold predicate share one prepared handle.
#[test]
fn test_concurrent_misses_prepare_once() {
    let s = store();
    let driver = Arc::clone(&s.driver);
    let users = Arc::new(s.users);
    let prepares = driver.prepare_count();
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let users = Arc::clone(&users);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                users.resolve_predicate(&["handle", "name"]).unwrap().handle
            })
        })
        .collect();

    let handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(handles.iter().all(|h| *h == handles[0]));
    assert_eq!(driver.prepare_count(), prepares + 1);

    let metrics = users.metrics().snapshot();
    assert_eq!(metrics.dynamic_cache_misses, 1);
    assert_eq!(metrics.dynamic_cache_hits, (THREADS - 1) as u64);
}

/// Field order in the predicate does not create a second statement.
#[test]
fn test_field_order_does_not_split_cache() {
    let s = store();
    let a = s.users.resolve_predicate(&["name", "email"]).unwrap();
    let b = s.users.resolve_predicate(&["email", "name"]).unwrap();
    assert_eq!(a.handle, b.handle);
    assert_eq!(a.params, vec!["email", "name"]);
}

// =============================================================================
// Mutations
// =============================================================================

/// Distinct inserts from many threads all persist.
#[test]
fn test_concurrent_inserts_with_distinct_values() {
    let s = store();
    let driver = Arc::clone(&s.driver);
    let users = Arc::new(s.users);

    let workers: Vec<_> = (0..THREADS)
        .map(|n| {
            let users = Arc::clone(&users);
            thread::spawn(move || {
                users
                    .insert(Entity::new().with("email", format!("user{}@example.com", n)))
                    .unwrap()
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(driver.row_count("users"), THREADS);
    assert_eq!(users.find(0, None).unwrap().entities.len(), THREADS);
}
