use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard, RwLockWriteGuard};
use log::debug;
use crate::error::Result;
use crate::models::{CategoryFilter, PriceUpdate, SortConfig, Token};
use super::{StoreAction, StoreChange, StoreChangeKind, StoreSnapshot, TokenStore};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Cloneable handle to a [`TokenStore`] shared between the presentation layer and
/// the feed task.
///
/// Every mutation goes through the single write lock, and its change notification
/// is published while that lock is still held, so subscribers observe changes in
/// revision order.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    inner: Arc<RwLock<TokenStore>>,
    changes: broadcast::Sender<StoreChange>,
}

impl StoreHandle {
    pub fn new(store: TokenStore) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(store)),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub async fn dispatch(&self, action: StoreAction) -> Result<()> {
        let mut store = self.inner.write().await;
        if let Some(change) = store.dispatch(action)? {
            self.notify(change);
        }
        Ok(())
    }

    pub async fn load_tokens(&self, tokens: Vec<Token>) {
        self.mutate(|store| {
            store.load_tokens(tokens);
            Some(StoreChangeKind::Loaded {
                count: store.registry().len(),
            })
        })
        .await;
    }

    pub async fn set_category(&self, category: CategoryFilter) {
        self.mutate(|store| {
            store.set_category(category);
            Some(StoreChangeKind::CategoryChanged { category })
        })
        .await;
    }

    pub async fn set_sort_config(&self, sort: SortConfig) {
        self.mutate(|store| {
            store.set_sort_config(sort);
            Some(StoreChangeKind::SortChanged { sort })
        })
        .await;
    }

    pub async fn add_token(&self, token: Token) -> Result<()> {
        self.dispatch(StoreAction::AddToken(token)).await
    }

    /// Returns `false` when no token had that id.
    pub async fn remove_token(&self, id: &str) -> bool {
        self.mutate(|store| {
            store.remove_token(id).then(|| StoreChangeKind::TokenRemoved { id: id.to_string() })
        })
        .await
    }

    /// Returns `false` when the update was discarded for an unknown token.
    pub async fn apply_price_update(&self, update: PriceUpdate) -> bool {
        self.mutate(|store| {
            store.apply_price_update(&update).then(|| StoreChangeKind::PricesUpdated {
                ids: vec![update.token_id.clone()],
            })
        })
        .await
    }

    /// Applies a whole batch under one lock so no configuration change can land
    /// between its events. Returns how many events found their token.
    pub async fn apply_price_batch(&self, updates: &[PriceUpdate]) -> usize {
        let mut store = self.inner.write().await;
        self.apply_batch_locked(&mut store, updates)
    }

    pub(crate) fn apply_batch_locked(
        &self,
        store: &mut TokenStore,
        updates: &[PriceUpdate],
    ) -> usize {
        let ids = store.apply_price_batch(updates);
        let applied = ids.len();
        if applied > 0 {
            let change = store.record(StoreChangeKind::PricesUpdated { ids });
            self.notify(change);
        }
        applied
    }

    pub async fn set_loading(&self, is_loading: bool) {
        self.mutate(|store| {
            store.set_loading(is_loading);
            Some(StoreChangeKind::StatusChanged)
        })
        .await;
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.mutate(|store| {
            store.set_error(error);
            Some(StoreChangeKind::StatusChanged)
        })
        .await;
    }

    pub async fn tokens(&self) -> Vec<Token> {
        self.read().await.registry().to_vec()
    }

    pub async fn view(&self) -> Vec<Token> {
        self.read().await.view().to_vec()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.read().await.snapshot()
    }

    /// Raw read guard. Never hold it across `PriceFeedSimulator::stop`, which
    /// joins a feed task that may be waiting for the write lock.
    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, TokenStore> {
        self.inner.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, TokenStore> {
        self.inner.write().await
    }

    /// Runs an infallible mutation under the write lock and publishes the change
    /// it reports. Returns `false` for a no-op.
    async fn mutate<F>(&self, mutator: F) -> bool
    where
        F: FnOnce(&mut TokenStore) -> Option<StoreChangeKind>,
    {
        let mut store = self.inner.write().await;
        match mutator(&mut *store) {
            Some(kind) => {
                let change = store.record(kind);
                self.notify(change);
                true
            }
            None => false,
        }
    }

    fn notify(&self, change: StoreChange) {
        debug!("Store revision {}: {:?}", change.revision, change.kind);
        // no subscribers is fine
        let _ = self.changes.send(change);
    }
}
