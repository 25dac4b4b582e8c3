//! One-time connectivity test per webhook.
//!
//! Independent of first-run detection: the observation store can be wiped
//! while the webhook marker survives, and the other way round.

use chrono::Utc;

use crate::services::embed::WebhookPayload;
use crate::services::{Notifier, WatchList};
use crate::storage::LocalStorage;

/// Send the test message if `webhook_url` has not received one yet.
///
/// Returns whether a test was attempted. The marker is updated even if the
/// delivery failed, so a broken webhook is not retried on every start.
pub async fn ensure_connectivity_test(
    storage: &LocalStorage,
    notifier: &Notifier,
    webhook_url: &str,
    watchlist: &WatchList,
    interval_minutes: f64,
) -> bool {
    let mut marker = storage.load_webhook_marker().await;
    if !marker.is_new_webhook(webhook_url) {
        return false;
    }

    log::info!("New webhook detected, sending test message...");
    let now = Utc::now();
    let payload = WebhookPayload::connectivity_test(
        watchlist.item_count(),
        watchlist.category_count(),
        interval_minutes,
        now,
    );
    match notifier.deliver(&payload).await {
        Ok(()) => log::info!("Test message sent successfully"),
        Err(e) => log::error!("Failed to send test message: {}", e),
    }

    marker.mark_tested(webhook_url, now);
    if let Err(e) = storage.save_webhook_marker(&marker).await {
        log::error!("Failed to save webhook data: {}", e);
    }
    true
}
