//! Pipeline entry points for the monitor.
//!
//! - `detect`: decide whether a fetched record is a real update
//! - `poll`: run cycles over the watch-list, once or on an interval
//! - `handshake`: one-time connectivity test for a new webhook

pub mod detect;
pub mod handshake;
pub mod poll;

pub use detect::{ChangeDetector, JITTER_TOLERANCE_SECS, Verdict};
pub use handshake::ensure_connectivity_test;
pub use poll::{CycleKind, CycleSummary, Monitor, run_monitor, shutdown_signal};
