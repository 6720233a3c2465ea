//! Randomized one-shot send planning
//!
//! Given explicit account ids and a time window, the planner draws one
//! uniform fire instant per account and arms a one-shot timer for each.
//! Planned sends are deliberately spread out so a burst of notifications
//! never lands at the same second.
//!
//! Pending one-shots live only in memory; a process exit drops them.

use chrono::{Duration, NaiveDateTime};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::timer::{self, TimerHandle};
use crate::models::RunKind;
use crate::runner::AccountRunner;
use crate::storage::AccountStore;

/// One planned one-shot send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSend {
    pub account_id: String,
    pub fire_at: NaiveDateTime,
}

/// Draws and arms randomized one-shot sends
pub struct RandomPlanner {
    runner: Arc<AccountRunner>,
    accounts: Arc<AccountStore>,
    timers: Mutex<Vec<TimerHandle>>,
}

impl RandomPlanner {
    pub fn new(runner: Arc<AccountRunner>, accounts: Arc<AccountStore>) -> Self {
        Self {
            runner,
            accounts,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Draw one uniform fire instant per id within `[from, to)`.
    ///
    /// Each draw is independent: instants may collide and the returned order
    /// is the input order, not fire order.
    pub fn plan(
        &self,
        account_ids: &[String],
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SchedulerResult<Vec<PlannedSend>> {
        if to <= from {
            return Err(SchedulerError::invalid_window(
                from.to_string(),
                to.to_string(),
            ));
        }

        let window_secs = (to - from).num_seconds();
        let mut rng = rand::thread_rng();
        Ok(account_ids
            .iter()
            .map(|id| PlannedSend {
                account_id: id.clone(),
                fire_at: from + Duration::seconds(rng.gen_range(0..window_secs)),
            })
            .collect())
    }

    /// Arm one one-shot timer per planned send
    pub fn arm(&self, plan: Vec<PlannedSend>) {
        let mut timers = self.timers.lock();
        timers.retain(|t| !t.is_finished());

        for send in plan {
            info!(
                account_id = %send.account_id,
                fire_at = %send.fire_at,
                "Arming planned send"
            );
            let runner = Arc::clone(&self.runner);
            let accounts = Arc::clone(&self.accounts);
            let account_id = send.account_id.clone();

            let handle = timer::arm_at(
                format!("plan-{}", send.account_id),
                send.fire_at,
                move || async move {
                    // Detached so cancel_all only stops sends still waiting
                    tokio::spawn(fire_planned(runner, accounts, account_id));
                },
            );
            timers.push(handle);
        }
    }

    /// Convenience: plan and arm in one step, returning the drawn plan
    pub fn plan_and_arm(
        &self,
        account_ids: &[String],
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SchedulerResult<Vec<PlannedSend>> {
        let plan = self.plan(account_ids, from, to)?;
        self.arm(plan.clone());
        Ok(plan)
    }

    /// Number of armed sends that have not fired yet
    pub fn pending(&self) -> usize {
        self.timers.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort every armed send that has not fired, returning how many
    pub fn cancel_all(&self) -> usize {
        let mut timers = self.timers.lock();
        let pending = timers.iter().filter(|t| !t.is_finished()).count();
        for timer in timers.drain(..) {
            timer.cancel();
        }
        if pending > 0 {
            info!(cancelled = pending, "Cancelled planned sends");
        }
        pending
    }
}

/// Fire path of one planned send: the account is re-read at fire time so
/// edits and deactivations between planning and firing are honored.
async fn fire_planned(
    runner: Arc<AccountRunner>,
    accounts: Arc<AccountStore>,
    account_id: String,
) {
    let account = match accounts.get(&account_id) {
        Ok(Some(account)) if account.active => account,
        Ok(Some(_)) => {
            info!(account_id = %account_id, "Account inactive, dropping planned send");
            return;
        }
        Ok(None) => {
            warn!(account_id = %account_id, "Account no longer configured, dropping planned send");
            return;
        }
        Err(e) => {
            error!(account_id = %account_id, error = %e, "Could not re-read account for planned send");
            return;
        }
    };

    match runner.run(&account, RunKind::Notification).await {
        Ok(outcome) => {
            info!(account_id = %account.id, status = %outcome.status, "Planned send finished")
        }
        Err(e) => warn!(account_id = %account.id, error = %e, "Planned send failed"),
    }
}
