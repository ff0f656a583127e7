// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registry tests under concurrent callers.

use std::sync::Arc;
use std::thread;

use flowbind_runtime::{Activity, Registries, Registry};
use serde_json::json;

#[test]
fn test_register_then_duplicate_keeps_first() {
    let registry = Registry::new("process");
    let h1 = Activity::new("p1", |_| Ok(json!(1))).handler;
    let h2 = Activity::new("p1", |_| Ok(json!(2))).handler;

    assert!(registry.register("p1", Arc::clone(&h1)));
    assert!(!registry.register("p1", h2));

    let found = registry.lookup("p1").unwrap();
    assert!(Arc::ptr_eq(&found, &h1));
    assert_eq!(found(json!(null)).unwrap(), json!(1));
}

#[test]
fn test_concurrent_registration_has_one_winner() {
    let registry = Arc::new(Registry::new("activity"));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.register("shared", i))
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(registry.size(), 1);
    assert!(registry.lookup("shared").is_some());
}

#[test]
fn test_distinct_names_register_concurrently() {
    let registry = Arc::new(Registry::new("activity"));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..50 {
                    assert!(registry.register(format!("a-{}-{}", t, i), i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.size(), 400);
    assert_eq!(registry.lookup("a-3-7"), Some(7));
}

#[test]
fn test_reregister_after_unregister() {
    let registry = Registry::new("process");
    assert!(registry.register("p", "first"));
    assert!(registry.unregister("p"));
    assert!(registry.register("p", "second"));
    assert_eq!(registry.lookup("p"), Some("second"));
}

#[test]
fn test_registries_are_independent() {
    let registries = Registries::new();
    registries
        .activities
        .register("shared", Activity::new("shared", |v| Ok(v)).handler);

    assert!(registries.activities.contains("shared"));
    assert!(!registries.processes.contains("shared"));
    assert!(!registries.events.contains("shared"));
}
