//! Publishing schedule orchestration
//!
//! This module provides the scheduling layer that decides *when* accounts
//! publish; the per-account pipeline in [`crate::runner`] decides *how*.
//!
//! # Overview
//!
//! Two scheduling styles share one timer substrate. The recurring scheduler
//! fires on a cron descriptor (or per-account daily slots) and walks active
//! accounts sequentially with randomized gaps, so a batch never bursts.
//! The random planner draws one-shot send times inside an operator-given
//! window for ad-hoc notification posts.
//!
//! Operator intent survives restarts: `start` persists a run flag and
//! `restore` re-arms from it, while process shutdown leaves the flag alone.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RecurringScheduler                   │
//! │  ┌───────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │ CronSpec  │──▶│ TimerHandle  │──▶│  batch runner  │  │
//! │  │ DailyTime │   │ (tokio task) │   │ (spawned task) │  │
//! │  └───────────┘   └──────────────┘   └───────┬────────┘  │
//! │        ▲                                     │           │
//! │  ┌─────┴──────┐                    account 1 │ jitter    │
//! │  │ RunFlag    │                    account 2 │ 2..5 min  │
//! │  │ (persisted)│                    account 3 ▼           │
//! │  └────────────┘                  ┌──────────────────┐    │
//! └──────────────────────────────────│  AccountRunner   │────┘
//!                                    └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cron`] - Descriptor parsing and next-fire expansion
//! - [`timer`] - Tokio-based one-shot and repeating timers
//! - [`recurring`] - Cron/daily-slot batch scheduling with quota checks
//! - [`planner`] - Randomized one-shot send planning
//! - [`facade`] - Aggregate status snapshots for the CLI
//! - [`error`] - Scheduling error types
//!
//! # Quick Start
//!
//! ## Recurring batches
//!
//! ```ignore
//! use herald::scheduler::RecurringScheduler;
//!
//! let scheduler = Arc::new(RecurringScheduler::new(
//!     config.scheduler.clone(),
//!     runner,
//!     accounts,
//!     ledger,
//!     run_flag,
//! ));
//!
//! scheduler.start()?;
//! assert!(matches!(scheduler.state(), SchedulerState::Armed));
//!
//! // later, on SIGINT: timers stop, in-flight batches drain,
//! // the persisted flag keeps saying "running"
//! scheduler.shutdown().await;
//! ```
//!
//! ## Planned one-shot sends
//!
//! ```ignore
//! use herald::scheduler::RandomPlanner;
//!
//! let planner = RandomPlanner::new(runner, accounts);
//! let plan = planner.plan_and_arm(&account_ids, window_start, window_end)?;
//! for send in &plan {
//!     println!("{} fires at {}", send.account_id, send.fire_at);
//! }
//! ```
//!
//! # Timing Settings
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `cron` | `0 0 9 * * *` | Shared batch descriptor (seconds granularity) |
//! | `use_daily_slots` | false | Arm one timer per account `daily_slot` instead |
//! | `delay_min_minutes` | 2 | Minimum gap between accounts in a batch |
//! | `delay_max_minutes` | 5 | Maximum gap between accounts in a batch |

pub mod cron;
pub mod error;
pub mod facade;
pub mod planner;
pub mod recurring;
pub mod timer;

// Re-export main types
pub use cron::{CronSpec, DailyTime};
pub use error::{SchedulerError, SchedulerResult};
pub use facade::{SchedulerFacade, StatusReport};
pub use planner::{PlannedSend, RandomPlanner};
pub use recurring::{BatchEntry, BatchReport, RecurringScheduler, SchedulerState};
pub use timer::TimerHandle;
