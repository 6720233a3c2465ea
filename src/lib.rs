//! herald - Multi-account auto-publishing engine
//!
//! A quota-aware scheduling system that generates and publishes posts for a
//! fleet of accounts: cron- or slot-triggered batches, randomized pacing
//! between accounts, resource rotation without early repeats, and an
//! append-only run history that doubles as the daily quota ledger.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`scheduler`] - Cron/slot batch scheduling and one-shot planning
//! - [`runner`] - The per-account publish pipeline with run locking
//! - [`generator`] - Content generation against a completion endpoint
//! - [`poster`] - Login and submission against the publishing service
//! - [`resources`] - Per-account image pools and rotation
//! - [`models`] - Core data structures and types
//! - [`storage`] - Flat-file persistence (accounts, history, run flag)
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use herald::config::Config;
//! use herald::storage::{HistoryStore, QuotaLedger};
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let history = Arc::new(HistoryStore::new(config.storage.history_path())?);
//!     let ledger = QuotaLedger::new(Arc::clone(&history));
//!     // wire the runner and scheduler on top
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod poster;
pub mod resources;
pub mod runner;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::generator::{ContentGenerator, HttpGenerator};
    pub use crate::models::{Account, GeneratedPost, HistoryRecord, RecordStatus, RunKind};
    pub use crate::poster::{HttpPoster, Poster};
    pub use crate::runner::AccountRunner;
    pub use crate::scheduler::{RandomPlanner, RecurringScheduler, SchedulerFacade};
    pub use crate::storage::{AccountStore, HistoryStore, QuotaLedger, RunFlagStore};
}

// Direct re-exports for convenience
pub use models::{Account, HistoryRecord, RecordStatus, RunKind};
