//! `daedalus`: submit an order and follow the design pipeline it starts.

mod config;
mod labels;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use daedalus_monitor::observability::init_observability;
use daedalus_monitor::prelude::*;
use daedalus_monitor::session::FileUserIdStore;
use daedalus_monitor::vendors::adk::{AdkBackend, AdkClientConfig};
use daedalus_monitor::vendors::plutus::{OrderClient, order_prompt};
use tracing::{info, warn};

use crate::render::{OutputFormat, render_summary, render_update};

#[derive(Parser, Debug)]
#[command(name = "daedalus", version, about = "Follow Daedalus design pipeline runs")]
struct Cli {
    /// Agent engine base URL.
    #[arg(long, global = true, env = "DAEDALUS_BASE_URL")]
    base_url: Option<String>,

    /// Engine application name.
    #[arg(long, global = true, env = "DAEDALUS_APP_NAME")]
    app_name: Option<String>,

    /// File holding the persisted user id.
    #[arg(long, global = true, env = "DAEDALUS_USER_ID_PATH")]
    user_id_path: Option<PathBuf>,

    /// Output format for progress updates.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log at debug level unless a filter is set in the environment.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline with a free-form prompt.
    Monitor {
        #[arg(long)]
        prompt: String,
    },
    /// Create an order from a JSON file and follow the run it starts.
    Order {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    let cli = Cli::parse();
    init_observability(if cli.verbose { "debug" } else { "warn" });

    let prompt = match &cli.command {
        Command::Monitor { prompt } => prompt.clone(),
        Command::Order { file } => {
            let raw = std::fs::read_to_string(file)
                .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
            let order: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| format!("{} is not valid JSON: {e}", file.display()))?;
            let order_id = OrderClient::from_env()?.create_order(&order).await?;
            info!(%order_id, "order created");
            if cli.format == OutputFormat::Text {
                println!("order {order_id} created");
            }
            order_prompt(&order_id)
        }
    };

    let monitor = build_monitor(&cli)?;
    let report = follow(&monitor, &prompt, cli.format).await?;

    if cli.format == OutputFormat::Text {
        println!("{}", render_summary(&report));
    }
    match report.failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

fn build_monitor(cli: &Cli) -> Result<Monitor, MonitorError> {
    let mut config = AdkClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.base_url(base_url.clone());
    }
    if let Some(app_name) = &cli.app_name {
        config = config.app_name(app_name.clone());
    }
    let user_ids = match &cli.user_id_path {
        Some(path) => FileUserIdStore::new(path.clone()),
        None => FileUserIdStore::from_env(),
    };
    Monitor::builder()
        .backend(Arc::new(AdkBackend::new(config)?))
        .user_id_store(Arc::new(user_ids))
        .build()
}

/// Prints updates until the run ends; Ctrl-C cancels it.
async fn follow(
    monitor: &Monitor,
    prompt: &str,
    format: OutputFormat,
) -> Result<RunReport, MonitorError> {
    let mut run = monitor.start_run(prompt).await?;
    let abort = run.abort_handle();
    let mut interrupted = false;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                interrupted = true;
                abort.abort();
            }
            update = run.next_update() => {
                let Some(update) = update else { break };
                if let Some(line) = render_update(&update, format) {
                    println!("{line}");
                }
                if let MonitorUpdate::Failed { failure, .. } = &update {
                    eprintln!("{}", failure.alert());
                }
                if update.is_terminal() {
                    break;
                }
            }
        }
    }

    run.finish().await
}
