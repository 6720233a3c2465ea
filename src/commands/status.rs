use anyhow::Result;

use herald::config::Config;

use crate::commands::context::EngineContext;

/// Snapshot of persisted intent, per-account state, upcoming fires, and the
/// recent history tail.
///
/// Runs standalone, without a live scheduler in-process, so the lifecycle
/// state always reads `stopped` here; `running` is the persisted intent.
pub async fn status(config: Config, next_n: usize, tail: usize) -> Result<()> {
    println!("Herald Status");
    println!("=============");

    let ctx = EngineContext::build(config)?;
    print!("{}", ctx.facade().status(next_n));

    let recent = ctx.history.recent(tail)?;
    if recent.is_empty() {
        println!("Recent runs: none recorded");
        return Ok(());
    }

    println!("Recent runs:");
    for record in &recent {
        let title = record
            .content
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or("-");
        println!(
            "  {} {:<20} {:<12} {:<12} {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.account_id,
            record.kind.as_str(),
            record.status.as_str(),
            title
        );
    }

    Ok(())
}
