//! Shared engine assembly for CLI commands
//!
//! Commands construct one context from loaded configuration and pass the
//! pieces down explicitly; nothing engine-wide lives in globals.

use anyhow::{Context, Result};
use std::sync::Arc;

use herald::config::Config;
use herald::generator::HttpGenerator;
use herald::poster::HttpPoster;
use herald::resources::{DirImageStore, ResourceRotator};
use herald::runner::{AccountRunner, RunStateTable};
use herald::scheduler::{RecurringScheduler, SchedulerFacade};
use herald::storage::{AccountStore, HistoryStore, QuotaLedger, RunFlagStore};

/// Fully wired engine dependencies for one command invocation
pub struct EngineContext {
    pub config: Config,
    pub accounts: Arc<AccountStore>,
    pub history: Arc<HistoryStore>,
    pub run_flag: Arc<RunFlagStore>,
    pub state_table: Arc<RunStateTable>,
    pub runner: Arc<AccountRunner>,
}

impl EngineContext {
    /// Build every collaborator from configuration
    pub fn build(config: Config) -> Result<Self> {
        let storage = &config.storage;

        let accounts = Arc::new(AccountStore::new(storage.accounts_path()));
        let history = Arc::new(HistoryStore::new(storage.history_path())?);
        let run_flag = Arc::new(RunFlagStore::new(storage.run_flag_path()));
        let state_table = Arc::new(RunStateTable::new());

        let generator = Arc::new(
            HttpGenerator::new(&config.generator).context("Failed to build content generator")?,
        );
        let poster =
            Arc::new(HttpPoster::new(&config.poster).context("Failed to build poster client")?);
        let rotator = Arc::new(ResourceRotator::new(Arc::new(DirImageStore::new(
            storage.images_root(),
        ))));

        let runner = Arc::new(AccountRunner::new(
            generator,
            poster,
            rotator,
            Arc::clone(&history),
            Arc::clone(&state_table),
            config.runner.posting_enabled,
        ));

        Ok(Self {
            config,
            accounts,
            history,
            run_flag,
            state_table,
            runner,
        })
    }

    /// Quota view over the shared history store
    pub fn ledger(&self) -> QuotaLedger {
        QuotaLedger::new(Arc::clone(&self.history))
    }

    /// Fresh recurring scheduler over this context's collaborators
    pub fn scheduler(&self) -> Arc<RecurringScheduler> {
        Arc::new(RecurringScheduler::new(
            self.config.scheduler.clone(),
            Arc::clone(&self.runner),
            Arc::clone(&self.accounts),
            self.ledger(),
            Arc::clone(&self.run_flag),
        ))
    }

    /// Status facade; attach a live scheduler with `with_scheduler`
    pub fn facade(&self) -> SchedulerFacade {
        SchedulerFacade::new(
            Arc::clone(&self.run_flag),
            Arc::clone(&self.state_table),
            self.config.scheduler.cron.clone(),
        )
    }
}
