use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herald::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Quota-aware multi-account publishing engine with randomized scheduling",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file (environment variables when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduling daemon until Ctrl-C
    Run {
        /// Arm the schedule even if the persisted run flag is unset
        #[arg(long, default_value = "false")]
        activate: bool,
    },

    /// Execute one full batch immediately and print the report
    Once,

    /// Run a single account now, bypassing the quota check
    Single {
        /// Account id from the accounts file
        #[arg(short, long)]
        account: String,
    },

    /// Draw a random send plan inside a time window
    Plan {
        /// Comma-separated account ids
        #[arg(long)]
        accounts: String,

        /// Window start, HH:MM today
        #[arg(long)]
        from: String,

        /// Window end (exclusive), HH:MM today
        #[arg(long)]
        to: String,

        /// Arm the plan and wait for the sends instead of printing only
        #[arg(long, default_value = "false")]
        execute: bool,
    },

    /// Show scheduler, account, and recent-history status
    Status {
        /// Upcoming fire times to estimate
        #[arg(long, default_value = "3")]
        next: usize,

        /// Recent history records to show
        #[arg(long, default_value = "10")]
        tail: usize,
    },

    /// Query the run history
    History {
        /// Filter by account id
        #[arg(short, long)]
        account: Option<String>,

        /// Filter by run kind (publish, notification)
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by stored calendar date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Maximum records to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Persist run flag = true for the next daemon start
    Enable,

    /// Persist run flag = false
    Disable,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    tracing::info!("herald publishing engine starting");

    match cli.command {
        Commands::Run { activate } => {
            tracing::info!(activate = %activate, "Starting run command");
            commands::run(config, activate).await?;
        }

        Commands::Once => {
            tracing::info!("Starting once command");
            commands::once(config).await?;
        }

        Commands::Single { account } => {
            tracing::info!(account_id = %account, "Starting single command");
            commands::single(config, account).await?;
        }

        Commands::Plan {
            accounts,
            from,
            to,
            execute,
        } => {
            tracing::info!(
                accounts = %accounts,
                from = %from,
                to = %to,
                execute = %execute,
                "Starting plan command"
            );
            commands::plan(config, accounts, from, to, execute).await?;
        }

        Commands::Status { next, tail } => {
            commands::status(config, next, tail).await?;
        }

        Commands::History {
            account,
            kind,
            date,
            limit,
        } => {
            commands::history(config, account, kind, date, limit).await?;
        }

        Commands::Enable => {
            commands::set_flag(config, true)?;
        }

        Commands::Disable => {
            commands::set_flag(config, false)?;
        }
    }

    tracing::info!("herald completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("herald=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new(format!("herald={level},warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
