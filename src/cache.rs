//! Selection cache: the set of items awaiting the next job.
//!
//! Populated incrementally by the caller, read once per job start via
//! [`ItemCache::snapshot`], and never mutated by the job itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable, path-like identifier for a taggable item.
///
/// The core never owns the item it names; equality and hashing are by
/// identifier string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemRef(String);

impl ItemRef {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display name: the last `/`- or `.`-delimited segment of the
    /// identifier (e.g. `SM_Rock` for `/Game/Props/SM_Rock.SM_Rock`).
    pub fn name(&self) -> &str {
        self.0.rsplit(['/', '.']).next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemRef {
    fn from(identifier: &str) -> Self {
        Self::new(identifier)
    }
}

/// Insertion-ordered set of items, deduplicated by identifier.
#[derive(Debug, Default)]
pub struct ItemCache {
    ordered: Vec<ItemRef>,
    seen: HashSet<ItemRef>,
}

impl ItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.seen.clear();
    }

    /// Adds one item; a duplicate identifier is silently collapsed.
    pub fn add(&mut self, item: ItemRef) {
        if self.seen.insert(item.clone()) {
            self.ordered.push(item);
        }
    }

    pub fn add_many(&mut self, items: impl IntoIterator<Item = ItemRef>) {
        for item in items {
            self.add(item);
        }
    }

    /// Current membership in insertion order.
    pub fn snapshot(&self) -> Vec<ItemRef> {
        self.ordered.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_by_identifier() {
        let mut cache = ItemCache::new();
        cache.add(ItemRef::new("/Game/A"));
        cache.add(ItemRef::new("/Game/B"));
        cache.add(ItemRef::new("/Game/A"));
        cache.add_many([
            ItemRef::new("/Game/B"),
            ItemRef::new("/Game/C"),
            ItemRef::new("/Game/A"),
        ]);

        let snapshot = cache.snapshot();
        assert_eq!(
            snapshot,
            vec![
                ItemRef::new("/Game/A"),
                ItemRef::new("/Game/B"),
                ItemRef::new("/Game/C"),
            ]
        );
    }

    #[test]
    fn clear_allows_reinsertion() {
        let mut cache = ItemCache::new();
        cache.add(ItemRef::new("/Game/A"));
        cache.clear();
        assert!(cache.is_empty());

        cache.add(ItemRef::new("/Game/A"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn name_is_last_segment() {
        assert_eq!(ItemRef::new("/Game/Props/SM_Rock.SM_Rock").name(), "SM_Rock");
        assert_eq!(ItemRef::new("flat-identifier").name(), "flat-identifier");
    }
}
