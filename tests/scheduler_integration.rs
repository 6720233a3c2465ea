//! Integration tests for the recurring scheduler
//!
//! These tests verify the complete workflow of:
//! - Start/stop/restore against the persisted run flag
//! - Quota-aware batch execution in account order
//! - Failure isolation inside a batch
//! - Daily-slot arming

mod common;

use std::sync::Arc;

use common::{engine, engine_with, one_account_json, StubGenerator, StubPoster, TestEngine};
use herald::config::SchedulerConfig;
use herald::models::{
    Account, ContentMeta, GeneratedPost, HistoryRecord, PostChannel, PostVisibility, RecordStatus,
    ResolvedOptions, RunKind,
};
use herald::scheduler::{RecurringScheduler, SchedulerState};
use herald::storage::QuotaLedger;

fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        cron: String::from("0 0 9 * * *"),
        use_daily_slots: false,
        // No pacing gaps in tests; batches finish immediately
        delay_min_minutes: 0,
        delay_max_minutes: 0,
    }
}

fn scheduler_over(engine: &TestEngine, config: SchedulerConfig) -> RecurringScheduler {
    RecurringScheduler::new(
        config,
        Arc::clone(&engine.runner),
        Arc::clone(&engine.accounts),
        QuotaLedger::new(Arc::clone(&engine.history)),
        Arc::clone(&engine.run_flag),
    )
}

fn content_meta(resource: &str) -> ContentMeta {
    let post = GeneratedPost::from_parts("seeded".into(), "seeded body".into());
    ContentMeta::new(
        &post,
        resource,
        ResolvedOptions {
            channel: PostChannel::Feed,
            visibility: PostVisibility::Public,
        },
    )
}

fn seed_success(engine: &TestEngine, account: &Account, kind: RunKind) {
    let record = HistoryRecord::success(account, kind, content_meta("seed.jpg"));
    engine.history.append(&record).unwrap();
}

// ============================================================================
// Lifecycle and Persisted Intent
// ============================================================================

#[tokio::test]
async fn test_start_persists_flag_and_stop_clears_it() {
    let engine = engine(&one_account_json("a1", 1));
    engine.seed_images("a1", &["x.jpg"]);
    let scheduler = scheduler_over(&engine, test_config());

    scheduler.start().unwrap();
    assert!(scheduler.is_armed());
    assert!(engine.run_flag.get());

    scheduler.stop().unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(!engine.run_flag.get());
}

#[tokio::test]
async fn test_resume_round_trip() {
    let engine = engine(&one_account_json("a1", 1));
    engine.seed_images("a1", &["x.jpg"]);
    engine.run_flag.set(true).unwrap();

    // A fresh scheduler instance picks up the persisted intent
    let scheduler = scheduler_over(&engine, test_config());
    let resumed = scheduler.restore().unwrap();

    assert!(resumed);
    assert!(scheduler.is_armed());

    // Process shutdown leaves the flag alone for the next start
    scheduler.shutdown().await;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(engine.run_flag.get());
}

#[tokio::test]
async fn test_restore_with_unset_flag_stays_stopped() {
    let engine = engine(&one_account_json("a1", 1));
    let scheduler = scheduler_over(&engine, test_config());

    let resumed = scheduler.restore().unwrap();

    assert!(!resumed);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_invalid_cron_fails_start_without_setting_flag() {
    let engine = engine(&one_account_json("a1", 1));
    let scheduler = scheduler_over(
        &engine,
        SchedulerConfig {
            cron: String::from("bogus"),
            ..test_config()
        },
    );

    assert!(scheduler.start().is_err());
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(!engine.run_flag.get());
}

// ============================================================================
// Quota-Aware Batches
// ============================================================================

#[tokio::test]
async fn test_batch_skips_account_at_quota() {
    let engine = engine(&one_account_json("a1", 1));
    engine.seed_images("a1", &["x.jpg"]);
    let account = engine.accounts.get("a1").unwrap().unwrap();
    seed_success(&engine, &account, RunKind::Publish);

    let scheduler = scheduler_over(&engine, test_config());
    let report = scheduler.run_batch_now().await;

    // At quota: excluded entirely, no new record of any status
    assert!(report.entries.is_empty());
    assert_eq!(engine.history.recent(10).unwrap().len(), 1);
    assert_eq!(engine.generator_calls(), 0);
}

#[tokio::test]
async fn test_notification_sends_do_not_consume_quota() {
    let engine = engine(&one_account_json("a1", 1));
    engine.seed_images("a1", &["x.jpg"]);
    let account = engine.accounts.get("a1").unwrap().unwrap();
    seed_success(&engine, &account, RunKind::Notification);

    let scheduler = scheduler_over(&engine, test_config());
    let report = scheduler.run_batch_now().await;

    assert_eq!(report.entries.len(), 1);
    assert!(report.entries[0].outcome.is_ok());
}

#[tokio::test]
async fn test_failed_runs_do_not_consume_quota() {
    let engine = engine(&one_account_json("a1", 1));
    engine.seed_images("a1", &["x.jpg"]);
    let account = engine.accounts.get("a1").unwrap().unwrap();
    engine
        .history
        .append(&HistoryRecord::failure(
            &account,
            RunKind::Publish,
            "earlier attempt broke",
        ))
        .unwrap();

    let scheduler = scheduler_over(&engine, test_config());
    let report = scheduler.run_batch_now().await;

    assert_eq!(report.entries.len(), 1);
    assert!(report.entries[0].outcome.is_ok());
}

#[tokio::test]
async fn test_quota_invariant_across_batches() {
    let engine = engine(&one_account_json("a1", 1));
    engine.seed_images("a1", &["x.jpg", "y.jpg"]);

    let scheduler = scheduler_over(&engine, test_config());
    let ledger = QuotaLedger::new(Arc::clone(&engine.history));

    let first = scheduler.run_batch_now().await;
    assert_eq!(first.succeeded(), 1);
    assert_eq!(ledger.successful_runs_today("a1").unwrap(), 1);

    // Second batch the same day must not push past posts_per_day
    let second = scheduler.run_batch_now().await;
    assert!(second.entries.is_empty());
    assert_eq!(ledger.successful_runs_today("a1").unwrap(), 1);
}

// ============================================================================
// Batch Ordering and Isolation
// ============================================================================

#[tokio::test]
async fn test_batch_runs_accounts_in_file_order() {
    let accounts = r#"[
        {"id": "c1", "name": "Charlie", "posts_per_day": 3},
        {"id": "a1", "name": "Alpha", "posts_per_day": 3},
        {"id": "b1", "name": "Beta", "posts_per_day": 3}
    ]"#;
    let engine = engine(accounts);
    for id in ["c1", "a1", "b1"] {
        engine.seed_images(id, &["x.jpg"]);
    }

    let scheduler = scheduler_over(&engine, test_config());
    let report = scheduler.run_batch_now().await;

    let order: Vec<&str> = report
        .entries
        .iter()
        .map(|e| e.account_id.as_str())
        .collect();
    assert_eq!(order, vec!["c1", "a1", "b1"]);
}

#[tokio::test]
async fn test_batch_continues_past_failing_account() {
    let accounts = r#"[
        {"id": "bad", "name": "Bad", "posts_per_day": 3},
        {"id": "good", "name": "Good", "posts_per_day": 3}
    ]"#;
    let engine = engine_with(
        accounts,
        StubGenerator::failing_for(&["bad"]),
        StubPoster::new(),
        true,
    );
    engine.seed_images("bad", &["x.jpg"]);
    engine.seed_images("good", &["x.jpg"]);

    let scheduler = scheduler_over(&engine, test_config());
    let report = scheduler.run_batch_now().await;

    assert_eq!(report.entries.len(), 2);
    assert!(report.entries[0].outcome.is_err());
    assert!(report.entries[1].outcome.is_ok());
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    // The failure is captured in history, not just the report
    let failed = engine.history.recent(10).unwrap();
    assert!(failed
        .iter()
        .any(|r| r.account_id == "bad" && r.status == RecordStatus::Failed));
}

#[tokio::test]
async fn test_inactive_accounts_never_run() {
    let accounts = r#"[
        {"id": "on", "name": "On", "posts_per_day": 3},
        {"id": "off", "name": "Off", "posts_per_day": 3, "active": false}
    ]"#;
    let engine = engine(accounts);
    engine.seed_images("on", &["x.jpg"]);
    engine.seed_images("off", &["x.jpg"]);

    let scheduler = scheduler_over(&engine, test_config());
    let report = scheduler.run_batch_now().await;

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].account_id, "on");
}

// ============================================================================
// Daily Slots
// ============================================================================

#[tokio::test]
async fn test_daily_slot_mode_arms_slotted_accounts() {
    let accounts = r#"[
        {"id": "slotted", "name": "Slotted", "daily_slot": "09:30"},
        {"id": "slotless", "name": "Slotless"}
    ]"#;
    let engine = engine(accounts);
    let scheduler = scheduler_over(
        &engine,
        SchedulerConfig {
            use_daily_slots: true,
            ..test_config()
        },
    );

    // Slotless accounts are skipped with a warning, not an error
    scheduler.start().unwrap();
    assert!(scheduler.is_armed());
    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_malformed_daily_slot_fails_start() {
    let accounts = r#"[{"id": "a1", "name": "Alpha", "daily_slot": "25:77"}]"#;
    let engine = engine(accounts);
    let scheduler = scheduler_over(
        &engine,
        SchedulerConfig {
            use_daily_slots: true,
            ..test_config()
        },
    );

    assert!(scheduler.start().is_err());
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(!engine.run_flag.get());
}
