//! Aggregate scheduler status
//!
//! Read-only view over the persisted run flag, the in-memory run-state
//! table, and the schedule descriptor. Usable both in-process next to a
//! live scheduler and standalone from the CLI, where only the persisted
//! flag and the descriptor are available.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::cron::CronSpec;
use super::recurring::{RecurringScheduler, SchedulerState};
use crate::runner::{AccountRunState, RunStateTable};
use crate::storage::RunFlagStore;

/// Point-in-time snapshot of the whole engine
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Persisted operator intent, true between start and stop
    pub running: bool,
    /// In-process lifecycle state; `stopped` when inspected from outside
    pub state: SchedulerState,
    pub accounts: BTreeMap<String, AccountRunState>,
    pub next_runs: Vec<NaiveDateTime>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let intent = if self.running { "running" } else { "stopped" };
        writeln!(f, "Scheduler: {intent} ({})", self.state)?;

        if self.accounts.is_empty() {
            writeln!(f, "Accounts: no runs tracked this session")?;
        } else {
            writeln!(f, "Accounts:")?;
            for (id, state) in &self.accounts {
                let activity = if state.running { "running" } else { "idle" };
                write!(f, "  {id:<20} {activity:<8}")?;
                match (&state.last_run_at, &state.last_result) {
                    (Some(at), Some(result)) => {
                        write!(
                            f,
                            " last run {} {}",
                            at.format("%Y-%m-%d %H:%M:%S UTC"),
                            result.status
                        )?;
                        if let Some(message) = &result.message {
                            write!(f, " ({message})")?;
                        }
                    }
                    _ => write!(f, " no runs yet")?,
                }
                writeln!(f)?;
            }
        }

        if self.next_runs.is_empty() {
            writeln!(f, "Next fires: none")?;
        } else {
            writeln!(f, "Next fires:")?;
            for at in &self.next_runs {
                writeln!(f, "  {at}")?;
            }
        }
        Ok(())
    }
}

/// Builds status snapshots from whatever engine pieces are on hand
pub struct SchedulerFacade {
    run_flag: Arc<RunFlagStore>,
    state_table: Arc<RunStateTable>,
    cron: String,
    scheduler: Option<Arc<RecurringScheduler>>,
}

impl SchedulerFacade {
    pub fn new(
        run_flag: Arc<RunFlagStore>,
        state_table: Arc<RunStateTable>,
        cron: impl Into<String>,
    ) -> Self {
        Self {
            run_flag,
            state_table,
            cron: cron.into(),
            scheduler: None,
        }
    }

    /// Attach a live scheduler so the report carries its lifecycle state
    pub fn with_scheduler(mut self, scheduler: Arc<RecurringScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Snapshot the engine, expanding up to `next_n` upcoming fire times.
    ///
    /// Descriptor shapes the expander does not support (lists, names) yield
    /// an empty `next_runs` rather than an error; status must always render.
    pub fn status(&self, next_n: usize) -> StatusReport {
        let state = self
            .scheduler
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(SchedulerState::Stopped);

        let next_runs = CronSpec::parse(&self.cron)
            .map(|spec| spec.upcoming(next_n, Local::now().naive_local()))
            .unwrap_or_default();

        StatusReport {
            running: self.run_flag.get(),
            state,
            accounts: self.state_table.snapshot().into_iter().collect(),
            next_runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordStatus, RunSummary};
    use tempfile::TempDir;

    fn facade_with_cron(cron: &str) -> (TempDir, SchedulerFacade) {
        let dir = TempDir::new().unwrap();
        let run_flag = Arc::new(RunFlagStore::new(dir.path().join("run_flag.json")));
        let facade = SchedulerFacade::new(run_flag, Arc::new(RunStateTable::new()), cron);
        (dir, facade)
    }

    #[test]
    fn test_next_runs_expand_supported_descriptor() {
        let (_dir, facade) = facade_with_cron("0 0 9 * * *");
        let report = facade.status(3);

        assert_eq!(report.next_runs.len(), 3);
        assert!(report.next_runs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unsupported_descriptor_degrades_to_empty() {
        // Lists are not expandable; status still renders
        let (_dir, facade) = facade_with_cron("0 0 9,18 * * *");
        let report = facade.status(5);

        assert!(report.next_runs.is_empty());
        assert!(report.to_string().contains("Next fires: none"));
    }

    #[test]
    fn test_running_reflects_persisted_flag() {
        let dir = TempDir::new().unwrap();
        let run_flag = Arc::new(RunFlagStore::new(dir.path().join("run_flag.json")));
        run_flag.set(true).unwrap();

        let facade = SchedulerFacade::new(
            Arc::clone(&run_flag),
            Arc::new(RunStateTable::new()),
            "0 0 9 * * *",
        );
        assert!(facade.status(1).running);

        run_flag.set(false).unwrap();
        assert!(!facade.status(1).running);
    }

    #[test]
    fn test_display_includes_account_lines() {
        let dir = TempDir::new().unwrap();
        let run_flag = Arc::new(RunFlagStore::new(dir.path().join("run_flag.json")));
        let table = Arc::new(RunStateTable::new());
        {
            let guard = table.try_begin("alpha").unwrap();
            guard.complete(RunSummary::ok(RecordStatus::Success));
        }

        let facade = SchedulerFacade::new(run_flag, table, "0 0 9 * * *");
        let rendered = facade.status(1).to_string();

        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("idle"));
        assert!(rendered.contains("success"));
    }
}
