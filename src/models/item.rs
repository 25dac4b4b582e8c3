//! Tracked items and fetched records.

use serde::{Deserialize, Serialize};

/// An item on the watch-list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedItem {
    /// Workshop item id (digits only)
    pub id: String,

    /// URL the operator configured for this item
    pub source_url: String,

    /// Category the item was listed under
    pub category: String,
}

impl TrackedItem {
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            category: category.into(),
        }
    }
}

/// A record produced by one fetch of one item.
///
/// Never persisted directly; the change detector decides whether it
/// becomes an [`Observation`](super::Observation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    pub id: String,
    pub title: String,
    /// Unix seconds
    pub updated_at: i64,
    pub source_url: String,
}

impl FetchedRecord {
    /// Title shown when the source did not provide one.
    pub fn fallback_title(id: &str) -> String {
        format!("Mod {id}")
    }
}
