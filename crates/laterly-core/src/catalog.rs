//! Item sources.
//!
//! The recommendation pipeline only ever reads items. Whatever owns them
//! (a database, a sync service, a JSON export) exposes them through
//! [`ItemSource`].

use std::fs;
use std::path::Path;

use crate::error::{Result, ValidationError};
use crate::item::Item;

pub trait ItemSource {
    fn all_items(&self) -> Vec<Item>;
    fn get_item(&self, id: &str) -> Option<Item>;
}

/// In-memory item list, typically loaded from a JSON export.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
}

impl ItemCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Load a JSON array of items. Entries that do not decode as an item
    /// are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let raw: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        let total = raw.len();

        let items: Vec<Item> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value::<Item>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(index = idx, error = %e, "skipping undecodable item");
                    None
                }
            })
            .collect();

        tracing::debug!(path = %path.display(), count = items.len(), total, "item catalog loaded");
        Ok(Self { items })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Like [`ItemSource::get_item`], but a missing id is an error.
    pub fn require(&self, id: &str) -> Result<Item, ValidationError> {
        self.get_item(id)
            .ok_or_else(|| ValidationError::ItemNotFound(id.to_string()))
    }
}

impl ItemSource for ItemCatalog {
    fn all_items(&self) -> Vec<Item> {
        self.items.clone()
    }

    fn get_item(&self, id: &str) -> Option<Item> {
        self.items.iter().find(|i| i.id == id).cloned()
    }
}
