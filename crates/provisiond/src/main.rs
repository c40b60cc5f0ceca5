//! provisiond: the capacity control loop binary.
//!
//! Reads CloudWatch alarm events (bare, SNS-wrapped, or `{"Message": ..}`),
//! and for each one resizes the table or index behind the alarm and
//! re-centres its threshold alarms.
//!
//! # Usage
//!
//! ```text
//! provisiond handle --event alarm.json --config provisioner.toml
//! provisiond seed --data-dir ./state --fixture fixtures/orders.json
//! provisiond local --data-dir ./state --event alarm.json --now 1700000600
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "provisiond",
    about = "Metric-driven DynamoDB capacity provisioner",
    version
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle alarm events against DynamoDB and CloudWatch.
    Handle {
        /// Event payload file, `-` for stdin.
        #[arg(long, default_value = "-")]
        event: PathBuf,

        /// provisioner.toml with policy and AWS overrides.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Handle alarm events against the local redb backend.
    Local {
        /// Directory holding provisioner.redb.
        #[arg(long)]
        data_dir: PathBuf,

        /// Event payload file, `-` for stdin.
        #[arg(long, default_value = "-")]
        event: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Evaluate the metric window as of this unix time instead of now.
        #[arg(long)]
        now: Option<u64>,
    },
    /// Load tables, alarms and datapoints into the local backend.
    Seed {
        #[arg(long)]
        data_dir: PathBuf,

        /// JSON fixture file.
        #[arg(long)]
        fixture: PathBuf,
    },
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => "info,provisiond=debug,provisioner=debug".parse()?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    match cli.command {
        Command::Handle { event, config } => {
            commands::handle::aws(&event, config.as_deref()).await
        }
        Command::Local {
            data_dir,
            event,
            config,
            now,
        } => commands::handle::local(&data_dir, &event, config.as_deref(), now).await,
        Command::Seed { data_dir, fixture } => commands::seed::seed(&data_dir, &fixture),
    }
}
