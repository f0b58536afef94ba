use serde::{Deserialize, Serialize};
use log::{debug, info};
use crate::error::Result;
use crate::metrics;
use crate::models::{CategoryFilter, PriceUpdate, SortConfig, Token};
use crate::projector::project;
use crate::registry::TokenRegistry;

mod handle;
pub use handle::StoreHandle;

/// Every mutation the store accepts. Serialized as `{"type": ..., "payload": ...}`;
/// unknown kinds are rejected when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StoreAction {
    LoadTokens(Vec<Token>),
    SetCategory(CategoryFilter),
    SetSortConfig(SortConfig),
    AddToken(Token),
    RemoveToken(String),
    ApplyPriceUpdate(PriceUpdate),
    SetLoading(bool),
    SetError(Option<String>),
}

impl StoreAction {
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreChangeKind {
    Loaded { count: usize },
    CategoryChanged { category: CategoryFilter },
    SortChanged { sort: SortConfig },
    TokenAdded { id: String },
    TokenRemoved { id: String },
    PricesUpdated { ids: Vec<String> },
    StatusChanged,
}

/// Notification emitted after each effective mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreChange {
    pub revision: u64,
    #[serde(flatten)]
    pub kind: StoreChangeKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub revision: u64,
    pub tokens: Vec<Token>,
    pub view: Vec<Token>,
    pub selected_category: CategoryFilter,
    pub sort_config: SortConfig,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Owns the registry and its projected view and is their only mutator.
///
/// The view is recomputed from the registry on load, category and sort changes.
/// Price ticks patch view entries in place and never move them; the view is only
/// re-sorted on an explicit change, trading sort freshness for stable rows.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    registry: TokenRegistry,
    view: Vec<Token>,
    category: CategoryFilter,
    sort: SortConfig,
    is_loading: bool,
    error: Option<String>,
    revision: u64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(category: CategoryFilter, sort: SortConfig) -> Self {
        Self {
            category,
            sort,
            ..Self::default()
        }
    }

    pub fn load_tokens(&mut self, tokens: Vec<Token>) {
        self.registry.replace_all(tokens);
        self.error = None;
        self.recompute();
        info!(
            "Loaded {} tokens ({} in {} view)",
            self.registry.len(),
            self.view.len(),
            self.category
        );
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
        self.recompute();
        info!("Category set to {} ({} tokens)", category, self.view.len());
    }

    pub fn set_sort_config(&mut self, sort: SortConfig) {
        self.sort = sort;
        self.recompute();
        match sort.field {
            Some(field) => info!("Sorting by {} {:?}", field, sort.direction),
            None => info!("Sorting disabled"),
        }
    }

    /// Applies one tick. Returns `false` when the token is gone, which is an
    /// expected race with removal rather than an error.
    pub fn apply_price_update(&mut self, update: &PriceUpdate) -> bool {
        let token = match self.registry.update(&update.token_id, |t| t.apply_price_update(update)) {
            Ok(token) => token.clone(),
            Err(_) => {
                debug!("Discarding price update for unknown token {}", update.token_id);
                metrics::PRICE_UPDATES_DISCARDED.inc();
                return false;
            }
        };
        if let Some(position) = self.view_position(&token.id) {
            self.view[position] = token;
        }
        metrics::PRICE_UPDATES_APPLIED.inc();
        true
    }

    /// Applies a whole tick in emission order; returns the ids that were applied.
    pub fn apply_price_batch(&mut self, updates: &[PriceUpdate]) -> Vec<String> {
        updates
            .iter()
            .filter(|update| self.apply_price_update(update))
            .map(|update| update.token_id.clone())
            .collect()
    }

    /// Appends to the registry, and to the end of the view when the category matches.
    pub fn add_token(&mut self, token: Token) -> Result<()> {
        let id = token.id.clone();
        self.registry.add(token)?;
        if let Some(added) = self.registry.get(&id) {
            if self.category.matches(added) {
                self.view.push(added.clone());
            }
        }
        self.update_gauges();
        debug!("Added token {}", id);
        Ok(())
    }

    pub fn remove_token(&mut self, id: &str) -> bool {
        let removed = self.registry.remove(id).is_some();
        let before = self.view.len();
        self.view.retain(|token| token.id != id);
        self.update_gauges();
        removed || self.view.len() != before
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Runs one action and reports what changed, or `None` if it was a no-op.
    pub fn dispatch(&mut self, action: StoreAction) -> Result<Option<StoreChange>> {
        let kind = match action {
            StoreAction::LoadTokens(tokens) => {
                self.load_tokens(tokens);
                StoreChangeKind::Loaded { count: self.registry.len() }
            }
            StoreAction::SetCategory(category) => {
                self.set_category(category);
                StoreChangeKind::CategoryChanged { category }
            }
            StoreAction::SetSortConfig(sort) => {
                self.set_sort_config(sort);
                StoreChangeKind::SortChanged { sort }
            }
            StoreAction::AddToken(token) => {
                let id = token.id.clone();
                self.add_token(token)?;
                StoreChangeKind::TokenAdded { id }
            }
            StoreAction::RemoveToken(id) => {
                if !self.remove_token(&id) {
                    return Ok(None);
                }
                StoreChangeKind::TokenRemoved { id }
            }
            StoreAction::ApplyPriceUpdate(update) => {
                if !self.apply_price_update(&update) {
                    return Ok(None);
                }
                StoreChangeKind::PricesUpdated { ids: vec![update.token_id] }
            }
            StoreAction::SetLoading(is_loading) => {
                self.set_loading(is_loading);
                StoreChangeKind::StatusChanged
            }
            StoreAction::SetError(error) => {
                self.set_error(error);
                StoreChangeKind::StatusChanged
            }
        };
        Ok(Some(self.record(kind)))
    }

    pub(crate) fn record(&mut self, kind: StoreChangeKind) -> StoreChange {
        self.revision += 1;
        StoreChange {
            revision: self.revision,
            kind,
        }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn view(&self) -> &[Token] {
        &self.view
    }

    pub fn view_position(&self, id: &str) -> Option<usize> {
        self.view.iter().position(|token| token.id == id)
    }

    pub fn category(&self) -> CategoryFilter {
        self.category
    }

    pub fn sort_config(&self) -> SortConfig {
        self.sort
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision,
            tokens: self.registry.to_vec(),
            view: self.view.clone(),
            selected_category: self.category,
            sort_config: self.sort,
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }

    fn recompute(&mut self) {
        self.view = project(&self.registry, self.category, &self.sort);
        self.update_gauges();
    }

    fn update_gauges(&self) {
        metrics::REGISTRY_TOKENS.set(self.registry.len() as f64);
        metrics::VIEW_TOKENS.set(self.view.len() as f64);
    }
}
