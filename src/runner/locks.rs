//! Per-account run-state table
//!
//! At most one runner may work on a given account at any instant. The table
//! holds the `running` flag plus the last outcome for status reporting, and
//! hands out RAII guards so the flag clears on every exit path.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::RunSummary;

/// Ephemeral per-account execution state
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountRunState {
    pub running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_result: Option<RunSummary>,
}

/// Lock table keyed by account id
#[derive(Default)]
pub struct RunStateTable {
    states: Mutex<HashMap<String, AccountRunState>>,
}

impl RunStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the account for a run.
    ///
    /// Returns `None` when another run already holds it. The returned guard
    /// clears the flag on drop, so a panicking or erroring run never wedges
    /// the account.
    pub fn try_begin(&self, account_id: &str) -> Option<RunGuard<'_>> {
        let mut states = self.states.lock();
        let state = states.entry(account_id.to_string()).or_default();
        if state.running {
            return None;
        }
        state.running = true;

        Some(RunGuard {
            table: self,
            account_id: account_id.to_string(),
        })
    }

    /// Whether a run currently holds the account
    pub fn is_running(&self, account_id: &str) -> bool {
        self.states
            .lock()
            .get(account_id)
            .map(|state| state.running)
            .unwrap_or(false)
    }

    /// Copy of the whole table for status reporting
    pub fn snapshot(&self) -> HashMap<String, AccountRunState> {
        self.states.lock().clone()
    }
}

/// Exclusive claim on one account, released on drop
pub struct RunGuard<'a> {
    table: &'a RunStateTable,
    account_id: String,
}

impl RunGuard<'_> {
    /// Stamp the finished run's outcome into the table
    pub fn complete(&self, summary: RunSummary) {
        let mut states = self.table.states.lock();
        if let Some(state) = states.get_mut(&self.account_id) {
            state.last_run_at = Some(Utc::now());
            state.last_result = Some(summary);
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut states = self.table.states.lock();
        if let Some(state) = states.get_mut(&self.account_id) {
            state.running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;

    #[test]
    fn test_second_claim_is_refused() {
        let table = RunStateTable::new();

        let guard = table.try_begin("a1").expect("first claim succeeds");
        assert!(table.try_begin("a1").is_none());
        assert!(table.is_running("a1"));

        drop(guard);
        assert!(!table.is_running("a1"));
        assert!(table.try_begin("a1").is_some());
    }

    #[test]
    fn test_accounts_lock_independently() {
        let table = RunStateTable::new();

        let _a = table.try_begin("a1").unwrap();
        assert!(table.try_begin("a2").is_some());
    }

    #[test]
    fn test_complete_stamps_outcome() {
        let table = RunStateTable::new();

        {
            let guard = table.try_begin("a1").unwrap();
            guard.complete(RunSummary::ok(RecordStatus::Success));
        }

        let snapshot = table.snapshot();
        let state = snapshot.get("a1").expect("state recorded");
        assert!(!state.running);
        assert!(state.last_run_at.is_some());
        assert_eq!(
            state.last_result.as_ref().map(|r| r.status),
            Some(RecordStatus::Success)
        );
    }

    #[test]
    fn test_guard_releases_even_after_failure_summary() {
        let table = RunStateTable::new();

        {
            let guard = table.try_begin("a1").unwrap();
            guard.complete(RunSummary::failed("boom"));
        }

        assert!(!table.is_running("a1"));
        let snapshot = table.snapshot();
        let result = snapshot["a1"].last_result.as_ref().unwrap();
        assert_eq!(result.status, RecordStatus::Failed);
        assert_eq!(result.message.as_deref(), Some("boom"));
    }
}
