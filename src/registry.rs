use std::collections::HashMap;
use log::debug;
use crate::error::{Error, Result};
use crate::models::Token;

/// Canonical set of known tokens, keyed by id.
///
/// Entries are kept in arrival order so an unsorted projection is stable, but callers
/// must not rely on that order for presentation.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    index: HashMap<String, usize>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps the whole contents in one step. Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, tokens: Vec<Token>) {
        let mut next = TokenRegistry::new();
        for token in tokens {
            if let Err(e) = next.add(token) {
                debug!("Skipping token during bulk load: {}", e);
            }
        }
        *self = next;
    }

    pub fn get(&self, id: &str) -> Option<&Token> {
        self.index.get(id).map(|&i| &self.tokens[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn add(&mut self, mut token: Token) -> Result<()> {
        if self.index.contains_key(&token.id) {
            return Err(Error::DuplicateId(token.id));
        }
        token.normalize();
        self.index.insert(token.id.clone(), self.tokens.len());
        self.tokens.push(token);
        Ok(())
    }

    /// Removes a token, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Token> {
        let position = self.index.remove(id)?;
        let removed = self.tokens.remove(position);
        for token in &self.tokens[position..] {
            if let Some(slot) = self.index.get_mut(&token.id) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Mutates a token in place. Identity fields (`id`, `category`, `created_at`)
    /// are restored after the mutator runs, and the model invariants re-applied.
    pub fn update<F>(&mut self, id: &str, mutator: F) -> Result<&Token>
    where
        F: FnOnce(&mut Token),
    {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let token = &mut self.tokens[position];
        let (original_id, category, created_at) =
            (token.id.clone(), token.category, token.created_at);

        mutator(token);

        token.id = original_id;
        token.category = category;
        token.created_at = created_at;
        token.normalize();
        Ok(&*token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn to_vec(&self) -> Vec<Token> {
        self.tokens.clone()
    }
}
