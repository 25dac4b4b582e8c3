// src/pipeline/poll.rs

//! Poll cycles and the periodic loop driving them.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::models::TrackedItem;
use crate::pipeline::detect::{ChangeDetector, Verdict};
use crate::services::{ItemSource, Notifier, WatchList};
use crate::storage::{LocalStorage, ObservationStore};

/// Counters for one pass over the watch-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// The store was empty when the cycle started
    pub first_run: bool,
    pub checked: usize,
    pub baselined: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub regressed: usize,
    pub errors: usize,
}

/// How a cycle is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Baselines were recorded (including every first run)
    Baseline,
    /// At least one confirmed update
    Updates,
    /// Nothing new
    Quiet,
}

impl CycleSummary {
    pub fn kind(&self) -> CycleKind {
        if self.first_run || self.baselined > 0 {
            CycleKind::Baseline
        } else if self.updated > 0 {
            CycleKind::Updates
        } else {
            CycleKind::Quiet
        }
    }

    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Baseline => self.baselined += 1,
            Verdict::Updated { .. } => self.updated += 1,
            Verdict::Unchanged { .. } => self.unchanged += 1,
            Verdict::Regressed { .. } => self.regressed += 1,
        }
    }

    /// Write the end-of-cycle report to the log.
    pub fn log(&self) {
        log::info!("=== Check Summary ===");
        log::info!("Mods checked: {}", self.checked);
        if self.errors > 0 {
            log::info!("Errors: {}", self.errors);
        }

        if self.kind() == CycleKind::Baseline {
            log::info!(
                "Recorded baseline data for {} mods (no notifications sent)",
                self.baselined
            );
        }
        if self.updated > 0 {
            log::info!("Actual updates found: {} (notifications sent)", self.updated);
        } else if self.kind() == CycleKind::Quiet {
            log::info!("No mod updates found");
        }
        log::info!("=====================");
    }
}

/// Everything a poll cycle reads and writes.
pub struct Monitor {
    pub watchlist: WatchList,
    pub store: ObservationStore,
    source: Box<dyn ItemSource>,
    notifier: Notifier,
    storage: LocalStorage,
    detector: ChangeDetector,
}

impl Monitor {
    pub fn new(
        watchlist: WatchList,
        store: ObservationStore,
        source: Box<dyn ItemSource>,
        notifier: Notifier,
        storage: LocalStorage,
    ) -> Self {
        Self {
            watchlist,
            store,
            source,
            notifier,
            storage,
            detector: ChangeDetector::new(),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Check every tracked item once, then persist the store.
    ///
    /// A failing item is counted and skipped; it never aborts the cycle.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        log::info!("Checking for mod updates...");
        let mut summary = CycleSummary {
            first_run: self.store.is_empty(),
            ..CycleSummary::default()
        };

        let items: Vec<TrackedItem> = self.watchlist.items().cloned().collect();
        for item in &items {
            summary.checked += 1;
            match self.check_item(item).await {
                Some(verdict) => summary.record(verdict),
                None => summary.errors += 1,
            }
        }

        summary.log();
        self.persist().await;
        summary
    }

    async fn check_item(&mut self, item: &TrackedItem) -> Option<Verdict> {
        let record = match self.source.fetch(&item.id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                log::error!("Mod {} in {} not found", item.id, item.category);
                return None;
            }
            Err(e) => {
                log::error!("Error checking mod {} in {}: {}", item.id, item.category, e);
                return None;
            }
        };

        let verdict = self.detector.inspect(&self.store, item, &record);
        if verdict.should_notify() {
            self.notifier.notify(&record, &item.category).await;
        }
        self.detector.commit(&mut self.store, item, &record, verdict);
        Some(verdict)
    }

    /// Save the store; failures are logged and the in-memory state kept.
    pub async fn persist(&self) {
        if let Err(e) = self.storage.save_observations(&self.store).await {
            log::error!("Failed to save data: {}", e);
        }
    }
}

/// Install the Ctrl-C handler right away.
///
/// The returned future resolves once the interrupt arrives. If the handler
/// cannot be installed the error is logged and the future never resolves.
pub fn shutdown_signal() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                log::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });
    async move {
        let _ = rx.await;
    }
}

/// Run a cycle now, then every `interval`, until `shutdown` resolves.
///
/// Cycles run inside this one task, so they never overlap; ticks missed
/// while a cycle is still running are skipped. Shutdown is checked between
/// cycles, so an interrupt during a cycle waits for it to finish. The store
/// is persisted before returning. Returns the number of cycles run.
pub async fn run_monitor(
    monitor: &mut Monitor,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                log::info!("Shutting down gracefully...");
                monitor.persist().await;
                break;
            }
            _ = ticker.tick() => {
                monitor.run_cycle().await;
                cycles += 1;
            }
        }
    }
    cycles
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{AppError, Result};
    use crate::models::FetchedRecord;
    use crate::services::ItemSource;

    /// Serves preset timestamps per id; unknown ids fail.
    #[derive(Clone, Default)]
    pub struct FakeSource {
        timestamps: Arc<Mutex<HashMap<String, i64>>>,
        delay: Duration,
        fetches: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl FakeSource {
        /// Every fetch sleeps for `delay` first.
        pub fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        pub fn set(&self, id: &str, updated_at: i64) {
            self.timestamps.lock().unwrap().insert(id.to_string(), updated_at);
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        /// Highest number of fetches seen running at once.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ItemSource for FakeSource {
        async fn fetch(&self, id: &str) -> Result<Option<FetchedRecord>> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let updated_at = self.timestamps.lock().unwrap().get(id).copied();
            match updated_at {
                Some(updated_at) => Ok(Some(FetchedRecord {
                    id: id.to_string(),
                    title: format!("Title {id}"),
                    updated_at,
                    source_url: format!("https://example.com/?id={id}"),
                })),
                None if id == "404" => Ok(None),
                None => Err(AppError::fetch(id, "connection refused")),
            }
        }
    }
}
