//! Service layer for the monitor.
//!
//! This module contains the collaborators a poll cycle talks to:
//! - Item lookup (`WorkshopSource`, behind the `ItemSource` trait)
//! - Changelog scraping helpers (`changelog`)
//! - Webhook delivery (`Notifier`)
//! - The tracked item list (`WatchList`)

pub mod changelog;
pub mod embed;
pub mod notifier;
pub mod source;
pub mod watchlist;

pub use notifier::{HttpTransport, Notifier, RetryOn, RetryPolicy, WebhookTransport};
pub use source::{FetchStrategy, ItemSource, WorkshopSource};
pub use watchlist::{ListedItem, WatchList};
