//! Multi-path discovery merge
//!
//! The same document can be reached through more than one index (the
//! document listing and a container's views). [`DiscoveryMap`] keeps one entry
//! per id for the space being archived.

use std::collections::HashMap;

/// Items discovered through several paths, deduplicated by id
///
/// A later discovery of the same id replaces the stored item but keeps the
/// position of the first discovery.
#[derive(Debug)]
pub struct DiscoveryMap<T> {
    order: Vec<String>,
    items: HashMap<String, T>,
}

impl<T> Default for DiscoveryMap<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }
}

impl<T> DiscoveryMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `item` under `id`; returns true when the id was new
    pub fn insert(&mut self, id: impl Into<String>, item: T) -> bool {
        let id = id.into();
        if self.items.insert(id.clone(), item).is_some() {
            tracing::trace!("Replacing earlier discovery of {}", id);
            false
        } else {
            self.order.push(id);
            true
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes every item, returned in first-discovery order
    pub fn drain(&mut self) -> Vec<T> {
        let order = std::mem::take(&mut self.order);
        let mut items = std::mem::take(&mut self.items);
        order.into_iter().filter_map(|id| items.remove(&id)).collect()
    }
}
