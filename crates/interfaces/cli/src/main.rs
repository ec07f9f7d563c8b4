mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sentinel_config::SentinelConfig;
use sentinel_memory::Sentinel;

const DEFAULT_CONFIG_PATH: &str = "config/sentinel.toml";

#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Evidence-chain journal and notification gate for a markdown knowledge base"
)]
struct Cli {
    /// Project root (overrides `[paths] root` and SENTINEL_ROOT).
    #[arg(long, global = true)]
    root: Option<String>,
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Record a physical action in today's raw action log.
    Action {
        #[arg(long)]
        command: String,
        #[arg(long)]
        task: Option<String>,
        /// Path the action relied on; repeat for several.
        #[arg(long = "cite", value_name = "PATH")]
        citations: Vec<String>,
        /// Mark the action as failed.
        #[arg(long)]
        failed: bool,
    },
    /// Append a narrative entry to today's journal.
    Log {
        /// Entry body; `-` reads it from stdin.
        #[arg(long)]
        body: String,
        #[arg(long)]
        title: Option<String>,
        /// Evidence trace item; repeat for several.
        #[arg(long = "source", value_name = "SOURCE")]
        sources: Vec<String>,
        /// Also send the entry through the notification gate.
        #[arg(long)]
        notify: bool,
    },
    /// Send a notification directly and report which gate decided.
    Notify {
        #[arg(long)]
        body: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Append a JSON object to the context handoff buffer.
    Push {
        #[arg(value_name = "JSON")]
        data: String,
    },
    /// Drain the context handoff buffer and print it as JSON.
    Consume,
    /// Print the pending context backlog without draining it.
    Peek,
    /// Print the current locale timestamp.
    Timestamp,
    /// Show resolved paths and notification state.
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = SentinelConfig::load_from(&cli.config)?;
    if let Some(root) = cli.root {
        config.paths.root = root;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        config = %cli.config.display(),
        root = %config.paths.root,
        "configuration loaded"
    );
    let sentinel = Sentinel::from_config(&config)?;

    match cli.command {
        Commands::Action {
            command,
            task,
            citations,
            failed,
        } => commands::run_action(&sentinel, command, task, citations, !failed)?,
        Commands::Log {
            body,
            title,
            sources,
            notify,
        } => commands::run_log(&sentinel, body, title, sources, notify).await?,
        Commands::Notify { body, title } => {
            commands::run_notify(&sentinel, &body, title.as_deref()).await
        }
        Commands::Push { data } => commands::run_push(&sentinel, &data)?,
        Commands::Consume => commands::run_consume(&sentinel)?,
        Commands::Peek => commands::run_peek(&sentinel)?,
        Commands::Timestamp => println!("{}", sentinel.current_timestamp()),
        Commands::Doctor => commands::run_doctor(&sentinel, &config),
    }

    Ok(())
}
