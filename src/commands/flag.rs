use anyhow::Result;

use herald::config::Config;
use herald::storage::RunFlagStore;

/// Write the persisted run flag; the next daemon start honors it
pub fn set_flag(config: Config, running: bool) -> Result<()> {
    let store = RunFlagStore::new(config.storage.run_flag_path());
    let previous = store.get();
    store.set(running)?;

    let verb = if running { "enabled" } else { "disabled" };
    println!("Scheduler {verb} (flag was {previous}).");
    if running {
        println!("A running daemon picks this up on its next start; `herald run` arms it.");
    }

    Ok(())
}
