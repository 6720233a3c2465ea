use anyhow::Result;

use herald::config::Config;

use crate::commands::context::EngineContext;

/// Execute one full batch immediately and print the per-account report
pub async fn once(config: Config) -> Result<()> {
    println!("Running one batch");
    println!("=================");

    let ctx = EngineContext::build(config)?;
    let scheduler = ctx.scheduler();
    let report = scheduler.run_batch_now().await;

    if report.entries.is_empty() {
        println!("No accounts ran (none active, or all at quota).");
        return Ok(());
    }

    println!();
    for entry in &report.entries {
        match &entry.outcome {
            Ok(outcome) => println!(
                "  {:<20} {:<12} \"{}\" [{}]",
                entry.account_id,
                outcome.status.as_str(),
                outcome.title,
                outcome.resource
            ),
            Err(e) => println!("  {:<20} failed       {e}", entry.account_id),
        }
    }

    println!(
        "\nBatch complete: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );

    Ok(())
}
