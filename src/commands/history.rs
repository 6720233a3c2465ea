use anyhow::{bail, Result};
use chrono::NaiveDate;

use herald::config::Config;
use herald::models::RunKind;
use herald::storage::HistoryFilter;

use crate::commands::context::EngineContext;

/// Query the run history, most recent first
pub async fn history(
    config: Config,
    account: Option<String>,
    kind: Option<String>,
    date: Option<String>,
    limit: usize,
) -> Result<()> {
    let mut filter = HistoryFilter::new().latest(limit);

    if let Some(account_id) = account {
        filter = filter.for_account(account_id);
    }
    if let Some(kind) = kind {
        let Some(parsed) = RunKind::parse(&kind) else {
            bail!("Unknown run kind '{kind}'. Valid: publish, notification");
        };
        filter = filter.of_kind(parsed);
    }
    if let Some(date) = date {
        let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid date '{date}' (expected YYYY-MM-DD): {e}"))?;
        filter = filter.on_date(parsed);
    }

    let ctx = EngineContext::build(config)?;
    let records = ctx.history.query(&filter)?;

    println!("Run History");
    println!("===========");
    if records.is_empty() {
        println!("No matching records.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{} {:<20} {:<12} {:<12}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.account_id,
            record.kind.as_str(),
            record.status.as_str()
        );
        if let Some(content) = &record.content {
            println!(
                "    \"{}\" ({} chars) [{} / {} / {}]",
                content.title,
                content.char_count,
                content.resource,
                content.channel.as_str(),
                content.visibility.as_str()
            );
        }
        if let Some(message) = &record.message {
            println!("    {message}");
        }
    }
    println!("\n{} record(s).", records.len());

    Ok(())
}
