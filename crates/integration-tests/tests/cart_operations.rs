//! Integration tests for cart operations and the store lifecycle.
//!
//! These run against in-memory storage; persistence behavior is covered in
//! `cart_persistence.rs`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashSet;
use std::sync::Arc;

use gomarket_cart::{CartConfig, CartError, CartStore, MemoryStore};
use gomarket_core::{CartItem, CartStatus};
use gomarket_integration_tests::{new_item, ready_store};
use rust_decimal::Decimal;

fn quantities(items: &[CartItem]) -> Vec<(String, u32)> {
    items
        .iter()
        .map(|item| (item.id.to_string(), item.quantity.get()))
        .collect()
}

fn q(id: &str, quantity: u32) -> (String, u32) {
    (id.to_string(), quantity)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_add_to_empty_cart() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();

    store.add_to_cart(new_item("p1", "10")).unwrap();

    let products = store.products().unwrap();
    assert_eq!(quantities(&products), vec![q("p1", 1)]);
    assert_eq!(products[0].title, "Product p1");
    assert_eq!(products[0].image_url, "http://img.example/p1.png");
    assert_eq!(products[0].price.amount(), Decimal::new(10, 0));
}

#[tokio::test]
async fn test_increment_existing() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    store.add_to_cart(new_item("p1", "10")).unwrap();

    store.increment("p1").unwrap();

    assert_eq!(quantities(&store.products().unwrap()), vec![q("p1", 2)]);
}

#[tokio::test]
async fn test_decrement_last_unit_removes_line() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    store.add_to_cart(new_item("p1", "10")).unwrap();

    store.decrement("p1").unwrap();

    assert!(store.products().unwrap().is_empty());
}

#[tokio::test]
async fn test_decrement_keeps_line_above_zero() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    store.add_to_cart(new_item("p1", "10")).unwrap();
    store.increment("p1").unwrap();

    store.decrement("p1").unwrap();

    assert_eq!(quantities(&store.products().unwrap()), vec![q("p1", 1)]);
}

#[tokio::test]
async fn test_unknown_id_leaves_cart_unchanged() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    store.add_to_cart(new_item("p1", "10")).unwrap();
    let before = store.products().unwrap();

    store.increment("nonexistent").unwrap();
    store.decrement("nonexistent").unwrap();

    assert_eq!(store.products().unwrap(), before);
}

#[tokio::test]
async fn test_operations_without_initialize_are_configuration_errors() {
    let store = CartStore::new(Arc::new(MemoryStore::new()), CartConfig::default()).unwrap();

    let err = store.add_to_cart(new_item("p1", "10")).unwrap_err();
    assert!(matches!(err, CartError::Configuration(_)));
    assert!(err.to_string().contains("outside provider scope"));

    assert!(matches!(store.increment("p1"), Err(CartError::Configuration(_))));
    assert!(matches!(store.decrement("p1"), Err(CartError::Configuration(_))));
    assert!(matches!(store.products(), Err(CartError::Configuration(_))));
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_add_existing_is_increment() {
    let via_add = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    let via_increment = ready_store(Arc::new(MemoryStore::new())).await.unwrap();

    for store in [&via_add, &via_increment] {
        store.add_to_cart(new_item("p1", "10")).unwrap();
        store.add_to_cart(new_item("p2", "3.5")).unwrap();
    }
    via_add.add_to_cart(new_item("p1", "10")).unwrap();
    via_increment.increment("p1").unwrap();

    assert_eq!(via_add.products().unwrap(), via_increment.products().unwrap());
}

/// Small deterministic generator so operation sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound
    }
}

#[tokio::test]
async fn test_invariants_hold_for_random_operation_sequences() {
    const IDS: [&str; 4] = ["p1", "p2", "p3", "p4"];

    for seed in 0..50 {
        let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
        let mut rng = Lcg(seed);
        // Model: (id, quantity) in insertion order.
        let mut model: Vec<(String, u32)> = Vec::new();

        for _ in 0..60 {
            let id = IDS[usize::try_from(rng.next(4)).unwrap()];
            match rng.next(3) {
                0 => {
                    store.add_to_cart(new_item(id, "1")).unwrap();
                    match model.iter_mut().find(|(m, _)| m == id) {
                        Some((_, quantity)) => *quantity += 1,
                        None => model.push(q(id, 1)),
                    }
                }
                1 => {
                    store.increment(id).unwrap();
                    if let Some((_, quantity)) = model.iter_mut().find(|(m, _)| m == id) {
                        *quantity += 1;
                    }
                }
                _ => {
                    store.decrement(id).unwrap();
                    if let Some(pos) = model.iter().position(|(m, _)| m == id) {
                        model[pos].1 -= 1;
                        if model[pos].1 == 0 {
                            model.remove(pos);
                        }
                    }
                }
            }

            let products = store.products().unwrap();
            let ids: HashSet<_> = products.iter().map(|item| &item.id).collect();
            assert_eq!(ids.len(), products.len(), "duplicate id (seed {seed})");
            assert!(products.iter().all(|item| item.quantity.get() >= 1));
            assert_eq!(quantities(&products), model, "diverged from model (seed {seed})");
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_status_transitions() {
    let store = CartStore::new(Arc::new(MemoryStore::new()), CartConfig::default()).unwrap();
    assert_eq!(store.status(), CartStatus::Loading);

    store.initialize().await.unwrap();
    assert_eq!(store.status(), CartStatus::Ready);

    store.close().await;
    assert_eq!(store.status(), CartStatus::Closed);
    assert!(matches!(
        store.add_to_cart(new_item("p1", "10")),
        Err(CartError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_clones_share_one_cart() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    let other = store.clone();

    other.add_to_cart(new_item("p1", "10")).unwrap();
    assert_eq!(quantities(&store.products().unwrap()), vec![q("p1", 1)]);

    store.close().await;
    assert_eq!(other.status(), CartStatus::Closed);
}

#[tokio::test]
async fn test_subscriber_notified_on_hydration() {
    let storage = Arc::new(MemoryStore::with_entry(
        "cart:products",
        r#"[{"id":"p1","title":"T","image_url":"u","price":10,"quantity":3}]"#,
    ));
    let store = CartStore::new(storage, CartConfig::default()).unwrap();

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    store.subscribe(move |items| {
        seen_clone.lock().unwrap().push(quantities(items));
    });

    store.initialize().await.unwrap();
    store.decrement("p1").unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec![q("p1", 3)], vec![q("p1", 2)]]
    );
}

#[tokio::test]
async fn test_summary_tracks_cart() {
    let store = ready_store(Arc::new(MemoryStore::new())).await.unwrap();
    store.add_to_cart(new_item("p1", "29.9")).unwrap();
    store.add_to_cart(new_item("p1", "29.9")).unwrap();
    store.add_to_cart(new_item("p2", "5")).unwrap();

    let summary = store.summary().unwrap();
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.line_count, 2);
    assert_eq!(summary.formatted_subtotal(), "64.80");
}
