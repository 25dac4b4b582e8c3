// src/services/watchlist.rs

//! The set of tracked items, grouped by category.

use std::collections::BTreeMap;

use crate::models::{Observation, TrackedItem};
use crate::storage::ObservationStore;
use crate::utils::extract_item_id;

/// Category name to ordered list of tracked items.
///
/// Categories iterate in name order, items in insertion order, so a poll
/// cycle always visits items in the same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    categories: BTreeMap<String, Vec<TrackedItem>>,
}

/// One item in a [`WatchList::list`] listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    pub item: TrackedItem,
    /// `None` when the item has never been checked
    pub observation: Option<Observation>,
}

impl WatchList {
    /// Build from configured URLs. URLs without an `id=<digits>` parameter
    /// are skipped with a warning.
    pub fn from_config(mod_categories: &BTreeMap<String, Vec<String>>) -> Self {
        let mut categories = BTreeMap::new();

        for (category, urls) in mod_categories {
            let mut items: Vec<TrackedItem> = Vec::with_capacity(urls.len());
            for url in urls {
                let Some(id) = extract_item_id(url) else {
                    log::warn!("Invalid Steam Workshop URL in {category}: {url}");
                    continue;
                };
                if items.iter().any(|item| item.id == id) {
                    log::warn!("Duplicate item {id} in {category}, ignoring {url}");
                    continue;
                }
                items.push(TrackedItem::new(id, url.as_str(), category.as_str()));
            }
            categories.insert(category.clone(), items);
        }

        let list = Self { categories };
        log::info!(
            "Parsed mod categories: {}",
            list.categories
                .iter()
                .map(|(name, items)| format!("{name}: {} mods", items.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        list
    }

    /// Add `url` to `category`, creating the category if needed.
    ///
    /// Returns `false` for a malformed URL or an id already in the category.
    pub fn add_item(&mut self, category: &str, url: &str) -> bool {
        let Some(id) = extract_item_id(url) else {
            log::error!("Invalid Steam Workshop URL: {url}");
            return false;
        };

        let items = self.categories.entry(category.to_string()).or_default();
        if items.iter().any(|item| item.id == id) {
            log::info!("Mod {id} already exists in category {category}");
            return false;
        }

        items.push(TrackedItem::new(id.as_str(), url, category));
        log::info!("Added mod {id} to category {category}");
        true
    }

    /// Remove `url` from `category` and purge its observation.
    ///
    /// Returns `false` when the URL is malformed or the category or item is unknown.
    pub fn remove_item(&mut self, category: &str, url: &str, store: &mut ObservationStore) -> bool {
        let Some(id) = extract_item_id(url) else {
            return false;
        };
        let Some(items) = self.categories.get_mut(category) else {
            return false;
        };
        let Some(index) = items.iter().position(|item| item.id == id) else {
            return false;
        };

        items.remove(index);
        store.remove(&id);
        log::info!("Removed mod {id} from category {category}");
        true
    }

    /// Items per category annotated with their last observation.
    pub fn list(&self, store: &ObservationStore) -> Vec<(String, Vec<ListedItem>)> {
        self.categories
            .iter()
            .map(|(category, items)| {
                let listed = items
                    .iter()
                    .map(|item| ListedItem {
                        item: item.clone(),
                        observation: store.get(&item.id).cloned(),
                    })
                    .collect();
                (category.clone(), listed)
            })
            .collect()
    }

    /// All tracked items in poll order.
    pub fn items(&self) -> impl Iterator<Item = &TrackedItem> {
        self.categories.values().flatten()
    }

    pub fn item_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Configured URLs per category, for writing back to the config file.
    pub fn to_config(&self) -> BTreeMap<String, Vec<String>> {
        self.categories
            .iter()
            .map(|(category, items)| {
                let urls = items.iter().map(|item| item.source_url.clone()).collect();
                (category.clone(), urls)
            })
            .collect()
    }
}
