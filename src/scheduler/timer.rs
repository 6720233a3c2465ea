//! Timer primitives for armed schedules
//!
//! Every armed schedule is an explicit `TimerHandle` owned by whichever
//! component armed it, so stopping a scheduler is a plain iteration over its
//! own handles rather than a trip through a global timer registry.
//!
//! Timer callbacks must return quickly: a repeating timer awaits its callback
//! before timing the next fire, so long-running work (a batch, a publish)
//! belongs in a task the callback spawns itself. Cancelling a handle then
//! only ever cancels future firings, never work already in flight.

use std::future::Future;
use std::time::Duration as StdDuration;

use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cron::{CronSpec, DailyTime};

/// Handle to one armed timer task
#[derive(Debug)]
pub struct TimerHandle {
    label: String,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Cancel future firings of this timer
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the timer task has exited (fired, cancelled, or exhausted)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn wait_for(target: NaiveDateTime) -> StdDuration {
    (target - Local::now().naive_local())
        .to_std()
        .unwrap_or(StdDuration::ZERO)
}

/// Arm a single-fire timer for a wall-clock instant. Instants already in the
/// past fire immediately.
pub fn arm_at<F, Fut>(label: impl Into<String>, fire_at: NaiveDateTime, callback: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let label = label.into();
    let task_label = label.clone();
    let task = tokio::spawn(async move {
        let wait = wait_for(fire_at);
        debug!(timer = %task_label, at = %fire_at, wait_secs = wait.as_secs(), "one-shot armed");
        tokio::time::sleep(wait).await;
        callback().await;
    });
    TimerHandle { label, task }
}

/// Arm a repeating timer driven by a cron descriptor
pub fn arm_cron<F, Fut>(label: impl Into<String>, spec: CronSpec, callback: F) -> TimerHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    let label = label.into();
    let task_label = label.clone();
    let task = tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let Some(next) = spec.next_after(now) else {
                warn!(timer = %task_label, expr = spec.expr(), "no further fire times, timer exiting");
                break;
            };
            let wait = wait_for(next);
            debug!(timer = %task_label, at = %next, wait_secs = wait.as_secs(), "next fire scheduled");
            tokio::time::sleep(wait).await;
            callback().await;
        }
    });
    TimerHandle { label, task }
}

/// Arm a repeating timer that fires once per day at a fixed slot
pub fn arm_daily<F, Fut>(label: impl Into<String>, slot: DailyTime, callback: F) -> TimerHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    let label = label.into();
    let task_label = label.clone();
    let task = tokio::spawn(async move {
        loop {
            let wait = slot
                .duration_until(Local::now().naive_local())
                .to_std()
                .unwrap_or(StdDuration::ZERO);
            debug!(timer = %task_label, slot = %slot, wait_secs = wait.as_secs(), "next fire scheduled");
            tokio::time::sleep(wait).await;
            callback().await;
        }
    });
    TimerHandle { label, task }
}
