// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains the data structures shared across the application,
//! organized by their primary purpose.

mod config;
mod item;
mod observation;

// Re-export all public types
pub use config::{Config, HttpConfig, PLACEHOLDER_API_KEY, PLACEHOLDER_WEBHOOK_URL};
pub use item::{FetchedRecord, TrackedItem};
pub use observation::{Observation, WebhookMarker};
