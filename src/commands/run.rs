use anyhow::{Context, Result};
use std::sync::Arc;

use herald::config::Config;

use crate::commands::context::EngineContext;

/// Long-running daemon: arm from persisted intent (or force with
/// `--activate`), then wait for Ctrl-C.
///
/// Shutdown cancels timers and drains in-flight batches but leaves the run
/// flag untouched, so a supervisor restart resumes the operator's intent.
pub async fn run(config: Config, activate: bool) -> Result<()> {
    println!("Herald Publishing Engine");
    println!("========================");

    let ctx = EngineContext::build(config)?;
    let scheduler = ctx.scheduler();

    let armed = if activate {
        scheduler.start()?;
        true
    } else {
        scheduler.restore()?
    };

    if armed {
        println!("Schedule armed.");
    } else {
        println!("Run flag is unset; engine stays idle.");
        println!("Use `herald enable` (or rerun with --activate) to arm the schedule.");
    }

    let facade = ctx.facade().with_scheduler(Arc::clone(&scheduler));
    print!("{}", facade.status(3));

    tracing::info!(armed = %armed, "Engine ready, waiting for Ctrl-C");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    println!("\nShutting down...");
    scheduler.shutdown().await;
    println!("Shutdown complete. Run flag left as-is for the next start.");

    Ok(())
}
