//! Daily quota accounting
//!
//! The ledger keeps no counters of its own. It is a pure view over the
//! append-only history, so it can never drift from reality: a crash between
//! "publish succeeded" and "counter bumped" is impossible because there is
//! no counter. Only normal publishes count; notification sends and failed or
//! test-skipped runs never consume quota.

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;

use super::history::{HistoryFilter, HistoryStore};
use crate::models::{Account, RecordStatus, RunKind};

/// Derived per-day publish counts over the history store
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    history: Arc<HistoryStore>,
}

impl QuotaLedger {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self { history }
    }

    /// Successful normal publishes recorded for today's calendar date
    pub fn successful_runs_today(&self, account_id: &str) -> Result<usize> {
        self.history.count(
            &HistoryFilter::new()
                .for_account(account_id)
                .on_date(Local::now().date_naive())
                .of_kind(RunKind::Publish)
                .with_status(RecordStatus::Success),
        )
    }

    /// Whether the account may still publish today
    pub fn has_quota(&self, account: &Account) -> Result<bool> {
        let used = self.successful_runs_today(&account.id)?;
        Ok(used < account.posts_per_day as usize)
    }

    /// Publishes the account may still make today
    pub fn remaining_today(&self, account: &Account) -> Result<u32> {
        let used = self.successful_runs_today(&account.id)? as u32;
        Ok(account.posts_per_day.saturating_sub(used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, ContentMeta, GeneratedPost, HistoryRecord, PostChannel,
        PostVisibility, ResolvedOptions};
    use tempfile::TempDir;

    fn meta() -> ContentMeta {
        let post = GeneratedPost::from_parts("t".into(), "b".into());
        ContentMeta::new(
            &post,
            "x.jpg",
            ResolvedOptions {
                channel: PostChannel::Feed,
                visibility: PostVisibility::Public,
            },
        )
    }

    fn ledger_in(dir: &TempDir) -> (QuotaLedger, Arc<HistoryStore>) {
        let store = Arc::new(HistoryStore::new(dir.path().join("history.jsonl")).unwrap());
        (QuotaLedger::new(store.clone()), store)
    }

    #[test]
    fn test_counts_only_successful_publishes() {
        let dir = TempDir::new().unwrap();
        let (ledger, store) = ledger_in(&dir);
        let account = Account::new("a1", "Alpha");

        store
            .append(&HistoryRecord::success(&account, RunKind::Publish, meta()))
            .unwrap();
        store
            .append(&HistoryRecord::failure(&account, RunKind::Publish, "boom"))
            .unwrap();
        store
            .append(&HistoryRecord::success(&account, RunKind::Notification, meta()))
            .unwrap();
        store
            .append(&HistoryRecord::test_skipped(&account, RunKind::Publish, meta()))
            .unwrap();

        assert_eq!(ledger.successful_runs_today("a1").unwrap(), 1);
    }

    #[test]
    fn test_yesterdays_records_do_not_count() {
        let dir = TempDir::new().unwrap();
        let (ledger, store) = ledger_in(&dir);
        let account = Account::new("a1", "Alpha");

        let mut old = HistoryRecord::success(&account, RunKind::Publish, meta());
        old.date = old.date.pred_opt().unwrap();
        store.append(&old).unwrap();

        assert_eq!(ledger.successful_runs_today("a1").unwrap(), 0);
        assert!(ledger.has_quota(&account).unwrap());
    }

    #[test]
    fn test_quota_boundary() {
        let dir = TempDir::new().unwrap();
        let (ledger, store) = ledger_in(&dir);
        let mut account = Account::new("a1", "Alpha");
        account.posts_per_day = 2;

        assert_eq!(ledger.remaining_today(&account).unwrap(), 2);
        store
            .append(&HistoryRecord::success(&account, RunKind::Publish, meta()))
            .unwrap();
        assert!(ledger.has_quota(&account).unwrap());
        store
            .append(&HistoryRecord::success(&account, RunKind::Publish, meta()))
            .unwrap();
        assert!(!ledger.has_quota(&account).unwrap());
        assert_eq!(ledger.remaining_today(&account).unwrap(), 0);
    }
}
