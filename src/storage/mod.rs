//! Persistent state for the monitor.
//!
//! ## Directory Structure
//!
//! ```text
//! {data_dir}/
//! ├── mod_data.json         # Observation store, keyed by item id
//! └── webhook_data.json     # Which webhook already got the test message
//! ```

pub mod local;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Observation;

// Re-export for convenience
pub use local::LocalStorage;

/// Last confirmed observation per item id.
///
/// Serializes as a plain JSON object `{ "<id>": {lastUpdate, title, category} }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationStore {
    entries: BTreeMap<String, Observation>,
}

impl ObservationStore {
    pub fn get(&self, id: &str) -> Option<&Observation> {
        self.entries.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, observation: Observation) {
        self.entries.insert(id.into(), observation);
    }

    pub fn remove(&mut self, id: &str) -> Option<Observation> {
        self.entries.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Observation)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_serializes_as_plain_object() {
        let mut store = ObservationStore::default();
        store.insert(
            "42",
            Observation {
                last_update: 500,
                title: "Foo".to_string(),
                category: "A".to_string(),
            },
        );

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["42"]["lastUpdate"], 500);
        assert_eq!(json["42"]["title"], "Foo");
    }

    #[test]
    fn test_store_reads_mod_data_format() {
        let store: ObservationStore = serde_json::from_str(
            r#"{
                "123": {"lastUpdate": 1700000000, "title": "A", "category": "Essential Mods"},
                "456": {"lastUpdate": 1600000000, "title": "B", "category": "Graphics Mods"}
            }"#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("456").unwrap().last_update, 1_600_000_000);
    }
}
