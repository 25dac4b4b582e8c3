//! Change detection for fetched records.
//!
//! Update timestamps from the source jitter by a few minutes between polls,
//! so a change only counts once it moves more than
//! [`JITTER_TOLERANCE_SECS`] away from the last confirmed value:
//!
//! ```text
//!   delta = fetched.updated_at - observation.last_update
//!
//!   no observation        -> Baseline   (record, never notify)
//!   delta >  tolerance    -> Updated    (notify, record)
//!   |delta| <= tolerance  -> Unchanged
//!   delta < -tolerance    -> Regressed  (warn, keep old record)
//! ```

use chrono::DateTime;

use crate::models::{FetchedRecord, Observation, TrackedItem};
use crate::storage::ObservationStore;

/// Dead-band for both directions, in seconds.
pub const JITTER_TOLERANCE_SECS: i64 = 300;

/// What a fetched record means for its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First sighting; the record becomes the baseline.
    Baseline,
    /// Confirmed update.
    Updated { previous: i64, delta: i64 },
    /// Within the jitter band.
    Unchanged { delta: i64 },
    /// Moved backwards past the jitter band; ignored.
    Regressed { previous: i64, delta: i64 },
}

impl Verdict {
    /// Whether this verdict should produce a notification.
    pub fn should_notify(&self) -> bool {
        matches!(self, Verdict::Updated { .. })
    }

    /// Whether the store must take the fetched record.
    pub fn should_record(&self) -> bool {
        matches!(self, Verdict::Baseline | Verdict::Updated { .. })
    }
}

/// Classifies fetched records against stored observations.
#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    tolerance_secs: i64,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            tolerance_secs: JITTER_TOLERANCE_SECS,
        }
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what `fetched_updated_at` means given the previous observation.
    pub fn classify(&self, previous: Option<&Observation>, fetched_updated_at: i64) -> Verdict {
        let Some(previous) = previous else {
            return Verdict::Baseline;
        };

        let delta = fetched_updated_at.saturating_sub(previous.last_update);
        if delta > self.tolerance_secs {
            Verdict::Updated {
                previous: previous.last_update,
                delta,
            }
        } else if delta < -self.tolerance_secs {
            Verdict::Regressed {
                previous: previous.last_update,
                delta,
            }
        } else {
            Verdict::Unchanged { delta }
        }
    }

    /// Classify `record` against the store entry for `item`, logging the outcome.
    pub fn inspect(
        &self,
        store: &ObservationStore,
        item: &TrackedItem,
        record: &FetchedRecord,
    ) -> Verdict {
        let verdict = self.classify(store.get(&item.id), record.updated_at);

        match verdict {
            Verdict::Baseline => log::info!(
                "Recording baseline for mod {} ({}): {}",
                item.id,
                record.title,
                format_timestamp(record.updated_at)
            ),
            Verdict::Updated { previous, delta } => {
                log::info!("REAL UPDATE DETECTED for mod {} ({})", item.id, record.title);
                log::info!("  Previous: {}", format_timestamp(previous));
                log::info!("  Current:  {}", format_timestamp(record.updated_at));
                log::info!("  Time difference: {} minutes", delta / 60);
            }
            Verdict::Unchanged { delta } => {
                log::debug!("Mod {} unchanged (delta {}s)", item.id, delta)
            }
            Verdict::Regressed { delta, .. } => log::warn!(
                "Mod {} timestamp went backwards by {} minutes; keeping the newer record",
                item.id,
                delta.abs() / 60
            ),
        }

        verdict
    }

    /// Write the fetched record into the store when `verdict` calls for it.
    pub fn commit(
        &self,
        store: &mut ObservationStore,
        item: &TrackedItem,
        record: &FetchedRecord,
        verdict: Verdict,
    ) {
        if verdict.should_record() {
            store.insert(item.id.as_str(), Observation::from_record(record, &item.category));
        }
    }
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}
