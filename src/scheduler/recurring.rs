//! Recurring batch scheduling
//!
//! The recurring scheduler owns the repeating timers that drive automated
//! publishing. Two arming modes:
//! - shared mode: one cron timer fires the whole batch, which walks eligible
//!   accounts sequentially with a random pause between them
//! - daily-slot mode: one timer per account, firing at its own "HH:MM"
//!
//! Operator intent (started or stopped) is persisted through `RunFlagStore`
//! so a process restart can resume the schedule; see `restore`.

use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::cron::{CronSpec, DailyTime};
use super::error::{SchedulerError, SchedulerResult};
use super::timer::{self, TimerHandle};
use crate::config::SchedulerConfig;
use crate::models::RunKind;
use crate::runner::{AccountRunner, RunError, RunOutcome};
use crate::storage::{AccountStore, QuotaLedger, RunFlagStore};

/// Lifecycle of the recurring scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Starting,
    Armed,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Armed => "armed",
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one account within a batch
#[derive(Debug)]
pub struct BatchEntry {
    pub account_id: String,
    pub outcome: Result<RunOutcome, RunError>,
}

/// Ordered per-account outcomes of one batch firing.
///
/// Accounts skipped for quota are not listed; they produced no run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    fn log(&self) {
        info!(
            total = self.entries.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            "Batch finished"
        );
    }
}

/// Everything one firing needs, cheap to clone into timer callbacks
#[derive(Clone)]
struct BatchContext {
    runner: Arc<AccountRunner>,
    accounts: Arc<AccountStore>,
    ledger: QuotaLedger,
    delay_min_minutes: u64,
    delay_max_minutes: u64,
}

/// Cron- or slot-driven batch publisher with persisted start/stop intent
pub struct RecurringScheduler {
    config: SchedulerConfig,
    runner: Arc<AccountRunner>,
    accounts: Arc<AccountStore>,
    ledger: QuotaLedger,
    run_flag: Arc<RunFlagStore>,
    state: Mutex<SchedulerState>,
    timers: Mutex<Vec<TimerHandle>>,
    batches: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RecurringScheduler {
    pub fn new(
        config: SchedulerConfig,
        runner: Arc<AccountRunner>,
        accounts: Arc<AccountStore>,
        ledger: QuotaLedger,
        run_flag: Arc<RunFlagStore>,
    ) -> Self {
        Self {
            config,
            runner,
            accounts,
            ledger,
            run_flag,
            state: Mutex::new(SchedulerState::Stopped),
            timers: Mutex::new(Vec::new()),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn is_armed(&self) -> bool {
        self.state() == SchedulerState::Armed
    }

    /// Arm the schedule and persist run-flag = true.
    ///
    /// A malformed cron descriptor or daily slot fails loudly here; nothing
    /// is armed and the flag stays untouched. Calling an already started
    /// scheduler is a no-op.
    pub fn start(&self) -> SchedulerResult<()> {
        {
            let mut state = self.state.lock();
            if *state != SchedulerState::Stopped {
                debug!(state = %state, "Scheduler already started");
                return Ok(());
            }
            *state = SchedulerState::Starting;
        }

        match self.arm() {
            Ok(armed) => {
                *self.state.lock() = SchedulerState::Armed;
                self.run_flag.set(true).map_err(|e| {
                    SchedulerError::persist_failed("run flag write", e.to_string())
                })?;
                info!(
                    timers = armed,
                    daily_slots = self.config.use_daily_slots,
                    cron = %self.config.cron,
                    "Scheduler started"
                );
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = SchedulerState::Stopped;
                Err(e)
            }
        }
    }

    /// Cancel future firings and persist run-flag = false.
    ///
    /// An in-flight batch is never interrupted; only upcoming fires go away.
    pub fn stop(&self) -> SchedulerResult<()> {
        let cancelled = {
            let mut timers = self.timers.lock();
            for handle in timers.iter() {
                debug!(timer = handle.label(), "Cancelling timer");
                handle.cancel();
            }
            timers.drain(..).count()
        };
        *self.state.lock() = SchedulerState::Stopped;

        self.run_flag
            .set(false)
            .map_err(|e| SchedulerError::persist_failed("run flag write", e.to_string()))?;
        info!(cancelled, "Scheduler stopped");
        Ok(())
    }

    /// Rearm if the persisted flag says the scheduler should be active.
    ///
    /// This is the only place state crosses a restart boundary. Returns
    /// whether the schedule was resumed.
    pub fn restore(&self) -> SchedulerResult<bool> {
        if !self.run_flag.get() {
            debug!("Run flag unset, staying stopped");
            return Ok(false);
        }
        info!("Persisted run flag set, resuming schedule");
        self.start()?;
        Ok(true)
    }

    /// Cancel timers and wait for in-flight batches, leaving the run flag
    /// untouched so a supervisor restart resumes operator intent.
    pub async fn shutdown(&self) {
        let timers: Vec<TimerHandle> = self.timers.lock().drain(..).collect();
        for timer in &timers {
            timer.cancel();
        }

        let batches: Vec<JoinHandle<()>> = self.batches.lock().drain(..).collect();
        let in_flight = batches.iter().filter(|b| !b.is_finished()).count();
        if in_flight > 0 {
            info!(in_flight, "Waiting for in-flight batches to finish");
        }
        for result in futures::future::join_all(batches).await {
            if let Err(e) = result {
                warn!(error = %e, "Batch task ended abnormally");
            }
        }

        *self.state.lock() = SchedulerState::Stopped;
        debug!("Scheduler shut down, run flag untouched");
    }

    /// Run one whole batch inline, outside any timer
    pub async fn run_batch_now(&self) -> BatchReport {
        run_batch(self.batch_context()).await
    }

    fn arm(&self) -> SchedulerResult<usize> {
        let accounts = self
            .accounts
            .active()
            .map_err(|e| SchedulerError::config_missing("accounts file", format!("{e:#}")))?;
        if accounts.is_empty() {
            warn!("No active accounts configured, schedule will idle");
        }

        let mut handles = Vec::new();
        if self.config.use_daily_slots {
            for account in &accounts {
                let Some(raw_slot) = account.daily_slot.as_deref() else {
                    warn!(account_id = %account.id, "Account has no daily slot, not arming");
                    continue;
                };
                let slot = DailyTime::parse(raw_slot)?;
                handles.push(self.arm_account_slot(&account.id, slot));
            }
        } else {
            let spec = CronSpec::parse(&self.config.cron)?;
            handles.push(self.arm_batch_cron(spec));
        }

        let count = handles.len();
        self.timers.lock().extend(handles);
        Ok(count)
    }

    fn arm_batch_cron(&self, spec: CronSpec) -> TimerHandle {
        let ctx = self.batch_context();
        let batches = Arc::clone(&self.batches);

        // The callback only spawns and registers the batch, so the timer
        // task is free to time the next fire while the batch runs.
        timer::arm_cron("recurring-batch", spec, move || {
            let ctx = ctx.clone();
            let batches = Arc::clone(&batches);
            async move {
                let task = tokio::spawn(async move {
                    run_batch(ctx).await.log();
                });
                let mut running = batches.lock();
                running.retain(|b| !b.is_finished());
                running.push(task);
            }
        })
    }

    fn arm_account_slot(&self, account_id: &str, slot: DailyTime) -> TimerHandle {
        let ctx = self.batch_context();
        let batches = Arc::clone(&self.batches);
        let id = account_id.to_string();

        timer::arm_daily(format!("daily-{id}"), slot, move || {
            let ctx = ctx.clone();
            let id = id.clone();
            let batches = Arc::clone(&batches);
            async move {
                let task = tokio::spawn(run_slot(ctx, id));
                let mut running = batches.lock();
                running.retain(|b| !b.is_finished());
                running.push(task);
            }
        })
    }

    fn batch_context(&self) -> BatchContext {
        BatchContext {
            runner: Arc::clone(&self.runner),
            accounts: Arc::clone(&self.accounts),
            ledger: self.ledger.clone(),
            delay_min_minutes: self.config.delay_min_minutes,
            delay_max_minutes: self.config.delay_max_minutes,
        }
    }
}

/// Walk eligible accounts in file order, one at a time, pausing a random
/// delay between runs. One account's failure never halts the batch.
async fn run_batch(ctx: BatchContext) -> BatchReport {
    let accounts = match ctx.accounts.active() {
        Ok(accounts) => accounts,
        Err(e) => {
            error!(error = %e, "Could not read accounts, batch aborted");
            return BatchReport::default();
        }
    };
    if accounts.is_empty() {
        info!("No active accounts, nothing to publish");
        return BatchReport::default();
    }

    info!(accounts = accounts.len(), "Batch firing");
    let mut report = BatchReport::default();
    let mut ran_any = false;

    for account in accounts {
        match ctx.ledger.has_quota(&account) {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    account_id = %account.id,
                    posts_per_day = account.posts_per_day,
                    "Daily quota reached, skipping"
                );
                continue;
            }
            Err(e) => {
                error!(account_id = %account.id, error = %e, "Quota check failed, skipping");
                continue;
            }
        }

        if ran_any {
            let delay = jitter_delay(ctx.delay_min_minutes, ctx.delay_max_minutes);
            info!(
                account_id = %account.id,
                delay_secs = delay.as_secs(),
                "Waiting before next account"
            );
            tokio::time::sleep(delay).await;
        }

        let outcome = ctx.runner.run(&account, RunKind::Publish).await;
        match &outcome {
            Ok(o) => info!(account_id = %account.id, status = %o.status, "Account run finished"),
            Err(e) => warn!(account_id = %account.id, error = %e, "Account run failed"),
        }
        report.entries.push(BatchEntry {
            account_id: account.id.clone(),
            outcome,
        });
        ran_any = true;
    }

    report
}

/// One daily-slot firing: re-read the account, check quota, run it
async fn run_slot(ctx: BatchContext, account_id: String) {
    let account = match ctx.accounts.get(&account_id) {
        Ok(Some(account)) if account.active => account,
        Ok(Some(_)) => {
            info!(account_id = %account_id, "Account inactive, skipping slot fire");
            return;
        }
        Ok(None) => {
            warn!(account_id = %account_id, "Account no longer configured, skipping slot fire");
            return;
        }
        Err(e) => {
            error!(account_id = %account_id, error = %e, "Could not re-read account");
            return;
        }
    };

    match ctx.ledger.has_quota(&account) {
        Ok(true) => {}
        Ok(false) => {
            info!(account_id = %account.id, "Daily quota reached, skipping slot fire");
            return;
        }
        Err(e) => {
            error!(account_id = %account.id, error = %e, "Quota check failed, skipping slot fire");
            return;
        }
    }

    if let Err(e) = ctx.runner.run(&account, RunKind::Publish).await {
        warn!(account_id = %account.id, error = %e, "Slot run failed");
    }
}

/// Uniform random pause between two accounts of the same batch
fn jitter_delay(min_minutes: u64, max_minutes: u64) -> StdDuration {
    let min_secs = min_minutes * 60;
    let max_secs = max_minutes.max(min_minutes) * 60;
    let secs = if max_secs > min_secs {
        rand::thread_rng().gen_range(min_secs..=max_secs)
    } else {
        min_secs
    };
    StdDuration::from_secs(secs)
}
