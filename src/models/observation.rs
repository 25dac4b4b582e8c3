//! Persisted state: observations and the webhook marker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FetchedRecord;

/// Last confirmed state of one item, keyed by item id in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Unix seconds of the most recent confirmed update
    pub last_update: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub category: String,
}

impl Observation {
    /// Build an observation from a fetched record and the owning category.
    pub fn from_record(record: &FetchedRecord, category: &str) -> Self {
        Self {
            last_update: record.updated_at,
            title: record.title.clone(),
            category: category.to_string(),
        }
    }

    /// Last update as a UTC datetime, if representable.
    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_update, 0)
    }
}

/// Remembers which webhook last received the connectivity test.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMarker {
    #[serde(default)]
    pub last_webhook: Option<String>,

    #[serde(default)]
    pub last_test_sent: Option<DateTime<Utc>>,
}

impl WebhookMarker {
    /// Whether `webhook_url` differs from the one already tested.
    pub fn is_new_webhook(&self, webhook_url: &str) -> bool {
        self.last_webhook.as_deref() != Some(webhook_url)
    }

    /// Record that the test message was sent to `webhook_url` at `at`.
    pub fn mark_tested(&mut self, webhook_url: &str, at: DateTime<Utc>) {
        self.last_webhook = Some(webhook_url.to_string());
        self.last_test_sent = Some(at);
    }
}
