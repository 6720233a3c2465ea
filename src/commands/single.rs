use anyhow::{bail, Result};

use herald::config::Config;
use herald::models::RunKind;

use crate::commands::context::EngineContext;

/// Manual run-now for one account.
///
/// Bypasses the quota check on purpose: an operator forcing a run gets the
/// run. The per-account lock still applies.
pub async fn single(config: Config, account_id: String) -> Result<()> {
    println!("Running account: {account_id}");
    println!("================");

    let ctx = EngineContext::build(config)?;

    let Some(account) = ctx.accounts.get(&account_id)? else {
        bail!("Account '{account_id}' not found in {}", ctx.accounts.path().display());
    };
    if !account.active {
        println!("Note: account is marked inactive; running anyway.");
    }

    match ctx.runner.run(&account, RunKind::Publish).await {
        Ok(outcome) => {
            println!("Status:   {}", outcome.status.as_str());
            println!("Title:    {}", outcome.title);
            println!("Resource: {}", outcome.resource);
        }
        Err(e) => {
            println!("Run failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
