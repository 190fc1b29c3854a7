//! The cart store.
//!
//! A [`CartStore`] holds the cart lines in memory, notifies subscribers after
//! every change, and mirrors the lines to a [`KeyValueStore`] under one key.
//!
//! # Lifecycle
//!
//! ```text
//! CartStore::new  ->  Loading
//! initialize()    ->  Ready      (persisted lines loaded, if any)
//! close()         ->  Closed     (pending writes drained)
//! ```
//!
//! Cart operations are accepted only while `Ready`. Anything else fails with
//! [`CartError::Configuration`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gomarket_cart::{CartConfig, CartStore, MemoryStore};
//! use gomarket_core::{NewCartItem, ProductId};
//!
//! # async fn demo() -> gomarket_cart::Result<()> {
//! let store = CartStore::new(Arc::new(MemoryStore::new()), CartConfig::default())?;
//! store.initialize().await?;
//!
//! let id = ProductId::parse("p1").expect("valid id");
//! let price = "29.90".parse().expect("valid price");
//! store.add_to_cart(NewCartItem::new(id, "Shirt", "http://img/shirt.png", price))?;
//! store.increment("p1")?;
//!
//! assert_eq!(store.products()?[0].quantity.get(), 2);
//! store.close().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use gomarket_core::{CartItem, CartStatus, CartSummary, NewCartItem};
use tracing::{debug, error, info, instrument, warn};

use crate::config::CartConfig;
use crate::error::{CartError, Result, StorageError};
use crate::persist::{PersistHandle, PersistenceStats};
use crate::storage::{FileStore, KeyValueStore};

/// Callback invoked with the full list of cart lines after each change.
pub type Subscriber = Arc<dyn Fn(&[CartItem]) + Send + Sync>;

/// Identifies a subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct CartState {
    status: CartStatus,
    items: Vec<CartItem>,
}

struct CartStoreInner<S> {
    storage: Arc<S>,
    config: CartConfig,
    state: RwLock<CartState>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    writer: PersistHandle,
}

/// Shared, persisted shopping cart.
///
/// Cheaply cloneable; every clone refers to the same cart. Mutations apply to
/// memory and notify subscribers synchronously, then queue the new snapshot
/// for the background writer. Mutations are meant to come from one UI thread;
/// from several threads they are still applied and persisted in lock order,
/// but subscriber callbacks may interleave.
///
/// Call [`close`](Self::close) before shutting down. Dropping the last handle
/// leaves the writer to finish on its own, and any snapshot still queued when
/// the runtime stops is lost; `close` is the only way to be sure every queued
/// write has reached storage.
pub struct CartStore<S: KeyValueStore> {
    inner: Arc<CartStoreInner<S>>,
}

impl<S: KeyValueStore> Clone for CartStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore> CartStore<S> {
    /// Create a store in the `Loading` status.
    ///
    /// Spawns the persistence writer, so this must be called from within a
    /// tokio runtime. Call [`initialize`](Self::initialize) before using the
    /// cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] if the storage key is empty or no
    /// tokio runtime is running.
    pub fn new(storage: Arc<S>, config: CartConfig) -> Result<Self> {
        if config.storage_key.trim().is_empty() {
            return Err(CartError::Configuration(
                "storage key must not be empty".to_string(),
            ));
        }

        let writer = PersistHandle::spawn(Arc::clone(&storage), config.storage_key.clone())?;

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                storage,
                config,
                state: RwLock::new(CartState {
                    status: CartStatus::Loading,
                    items: Vec::new(),
                }),
                subscribers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                writer,
            }),
        })
    }

    /// Load the persisted cart and start accepting operations.
    ///
    /// Absent data leaves the cart empty. Data that is not text, fails to
    /// parse, or holds duplicate product ids is discarded with a warning and
    /// the cart starts empty. Nothing is written back.
    ///
    /// # Errors
    ///
    /// - [`CartError::Storage`] if the read fails for any reason other than
    ///   [`StorageError::Corrupt`]; the store stays `Loading`
    ///   and initialization can be retried.
    /// - [`CartError::Configuration`] if the store is already initialized or
    ///   has been closed.
    #[instrument(skip(self), fields(key = %self.inner.config.storage_key))]
    pub async fn initialize(&self) -> Result<()> {
        self.ensure_loading()?;

        let items = match self.inner.storage.get(&self.inner.config.storage_key).await {
            Ok(raw) => raw.as_deref().map(decode_items).unwrap_or_default(),
            Err(StorageError::Corrupt(reason)) => {
                warn!(%reason, "Discarding unreadable persisted cart");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = {
            let mut state = self.write_state();
            // Another initialize, or close, may have finished while we were reading.
            Self::check_loading(state.status)?;
            state.items = items;
            state.status = CartStatus::Ready;
            state.items.clone()
        };

        info!(lines = snapshot.len(), "Cart hydrated");
        self.publish(&snapshot);
        Ok(())
    }

    /// Current lifecycle status. Never fails.
    #[must_use]
    pub fn status(&self) -> CartStatus {
        self.read_state().status
    }

    /// The configuration this store was created with.
    #[must_use]
    pub fn config(&self) -> &CartConfig {
        &self.inner.config
    }

    /// The storage backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<S> {
        &self.inner.storage
    }

    /// Snapshot of the current cart lines, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub fn products(&self) -> Result<Vec<CartItem>> {
        self.read(|items| items.to_vec())
    }

    /// Run `f` against the current cart lines without cloning them.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&[CartItem]) -> R,
    {
        let state = self.read_state();
        Self::check_ready(state.status)?;
        Ok(f(&state.items))
    }

    /// Item count and subtotal of the current cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub fn summary(&self) -> Result<CartSummary> {
        self.read(CartSummary::from_items)
    }

    /// Add one unit of a product.
    ///
    /// If the product is already in the cart its quantity goes up by one,
    /// exactly like [`increment`](Self::increment); otherwise it is appended
    /// with a quantity of one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub fn add_to_cart(&self, item: NewCartItem) -> Result<()> {
        debug!(product_id = %item.id, "Adding to cart");
        self.mutate(|items| add_item(items, item))
    }

    /// Raise the quantity of the line for `id` by one.
    ///
    /// Unknown ids leave the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub fn increment(&self, id: &str) -> Result<()> {
        self.mutate(|items| increment_item(items, id))
    }

    /// Lower the quantity of the line for `id` by one, removing the line when
    /// it reaches zero.
    ///
    /// Unknown ids leave the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub fn decrement(&self, id: &str) -> Result<()> {
        self.mutate(|items| decrement_item(items, id))
    }

    /// Register a callback invoked with the cart lines after hydration and
    /// after every change.
    ///
    /// Allowed in any status, so a UI can subscribe before the cart loads.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[CartItem]) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Wait until every change made so far has been written to storage.
    ///
    /// Write failures do not fail the flush; see
    /// [`persistence_stats`](Self::persistence_stats).
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] unless the store is `Ready`.
    pub async fn flush(&self) -> Result<()> {
        Self::check_ready(self.status())?;
        self.inner.writer.flush().await
    }

    /// Shut the store down.
    ///
    /// Moves to `Closed`, drops all subscribers, and waits for queued writes
    /// to reach storage. Later cart operations fail with
    /// [`CartError::Configuration`]. Calling `close` again is a no-op.
    #[instrument(skip(self), fields(key = %self.inner.config.storage_key))]
    pub async fn close(&self) {
        {
            let mut state = self.write_state();
            if state.status == CartStatus::Closed {
                return;
            }
            state.status = CartStatus::Closed;
        }

        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.writer.shutdown().await;
        info!("Cart store closed");
    }

    /// Persistence counters since the store was created.
    #[must_use]
    pub fn persistence_stats(&self) -> PersistenceStats {
        self.inner.writer.stats()
    }

    /// Apply `op` to the cart; if it changed anything, publish and persist
    /// the resulting lines.
    fn mutate<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<CartItem>) -> bool,
    {
        let snapshot = {
            let mut state = self.write_state();
            Self::check_ready(state.status)?;

            if !op(&mut state.items) {
                return Ok(());
            }

            // Enqueue under the lock so storage sees snapshots in mutation order.
            self.persist(&state.items);
            state.items.clone()
        };

        self.publish(&snapshot);
        Ok(())
    }

    fn persist(&self, items: &[CartItem]) {
        let payload = match serde_json::to_string(items) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize cart");
                return;
            }
        };

        if let Err(e) = self.inner.writer.enqueue(payload) {
            warn!(error = %e, "Cart change not persisted");
        }
    }

    fn publish(&self, items: &[CartItem]) {
        // Clone the list so callbacks may subscribe or unsubscribe.
        let subscribers: Vec<Subscriber> = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for subscriber in subscribers {
            subscriber(items);
        }
    }

    fn ensure_loading(&self) -> Result<()> {
        Self::check_loading(self.status())
    }

    fn check_loading(status: CartStatus) -> Result<()> {
        match status {
            CartStatus::Loading => Ok(()),
            CartStatus::Ready => Err(CartError::Configuration(
                "cart store is already initialized".to_string(),
            )),
            CartStatus::Closed => Err(CartError::outside_scope(status)),
        }
    }

    fn check_ready(status: CartStatus) -> Result<()> {
        if status.is_ready() {
            Ok(())
        } else {
            Err(CartError::outside_scope(status))
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CartState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CartState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl CartStore<FileStore> {
    /// Create a store backed by files in `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Configuration`] if `storage_dir` is unset, plus
    /// everything [`CartStore::new`] can return.
    pub fn file_backed(config: CartConfig) -> Result<Self> {
        let dir = config.storage_dir.clone().ok_or_else(|| {
            CartError::Configuration("CART_STORAGE_DIR is required for file storage".to_string())
        })?;
        Self::new(Arc::new(FileStore::new(dir)), config)
    }
}

// =============================================================================
// List Operations
// =============================================================================

/// Parse persisted cart lines, discarding anything that breaks the cart's
/// invariants.
fn decode_items(raw: &str) -> Vec<CartItem> {
    let items: Vec<CartItem> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "Discarding malformed persisted cart");
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(items.len());
    if let Some(dup) = items.iter().find(|item| !seen.insert(&item.id)) {
        warn!(product_id = %dup.id, "Discarding persisted cart with duplicate product id");
        return Vec::new();
    }

    items
}

fn add_item(items: &mut Vec<CartItem>, new: NewCartItem) -> bool {
    if let Some(existing) = items.iter_mut().find(|item| item.id == new.id) {
        let before = existing.quantity;
        existing.quantity = existing.quantity.saturating_add(1);
        existing.quantity != before
    } else {
        items.push(new.into_cart_item());
        true
    }
}

fn increment_item(items: &mut [CartItem], id: &str) -> bool {
    let Some(item) = items.iter_mut().find(|item| item.id == id) else {
        return false;
    };
    let before = item.quantity;
    item.quantity = item.quantity.saturating_add(1);
    item.quantity != before
}

fn decrement_item(items: &mut Vec<CartItem>, id: &str) -> bool {
    let Some(item) = items.iter_mut().find(|item| item.id == id) else {
        return false;
    };

    match NonZeroU32::new(item.quantity.get() - 1) {
        Some(quantity) => item.quantity = quantity,
        None => items.retain(|item| item.id != id),
    }
    true
}
