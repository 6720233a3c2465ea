use anyhow::{bail, Result};
use chrono::Local;
use std::time::Duration;

use herald::config::Config;
use herald::scheduler::{DailyTime, RandomPlanner};

use crate::commands::context::EngineContext;

/// Draw a random send plan for the given accounts inside today's
/// `[from, to)` window; with `execute`, arm it and wait for the sends.
pub async fn plan(
    config: Config,
    accounts: String,
    from: String,
    to: String,
    execute: bool,
) -> Result<()> {
    println!("Random send plan");
    println!("================");

    let ids: Vec<String> = accounts
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if ids.is_empty() {
        bail!("No account ids given (expected --accounts a,b,c)");
    }

    let today = Local::now().date_naive();
    let window_from = today.and_time(DailyTime::parse(&from)?.time());
    let window_to = today.and_time(DailyTime::parse(&to)?.time());

    let now = Local::now().naive_local();
    if window_to <= now {
        bail!("Window [{from}, {to}) has already passed today");
    }
    if window_from < now {
        println!("Note: window start is in the past; those sends fire immediately.");
    }

    let ctx = EngineContext::build(config)?;
    let planner = RandomPlanner::new(ctx.runner.clone(), ctx.accounts.clone());

    let plan = if execute {
        planner.plan_and_arm(&ids, window_from, window_to)?
    } else {
        planner.plan(&ids, window_from, window_to)?
    };

    println!();
    for send in &plan {
        println!("  {:<20} {}", send.account_id, send.fire_at.format("%H:%M:%S"));
    }

    if !execute {
        println!("\nDry run only; pass --execute to arm these sends.");
        return Ok(());
    }

    let latest = plan.iter().map(|s| s.fire_at).max().unwrap_or(window_to);
    println!("\nArmed {} send(s); waiting until {}...", plan.len(), latest.format("%H:%M:%S"));

    // Sleep until the last send fires, then let in-flight runs finish
    let wait = (latest - Local::now().naive_local()).num_seconds().max(0) as u64;
    tokio::time::sleep(Duration::from_secs(wait + 2)).await;

    while ids.iter().any(|id| ctx.state_table.is_running(id)) {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    println!("All planned sends completed.");
    Ok(())
}
