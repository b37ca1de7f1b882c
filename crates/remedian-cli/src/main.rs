//! remedian CLI.
//!
//! `remedian process` runs one alert through the orchestration engine
//! against a live predictive service; `remedian logs` queries the
//! file-backed decision log.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use remedian_core::{Alert, FileLogStore};
use remedian_runtime::{
    ApiCredential, EngineConfig, HttpPropositionService, OrchestrationEngineBuilder,
    DEFAULT_LOG_LIMIT,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "remedian", version, about = "Alert remediation pipeline")]
struct Cli {
    /// Engine configuration file (YAML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Decision log file (JSONL).
    #[arg(long, global = true, default_value = "remedian-decisions.jsonl")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process an alert from a JSON file and print the propositions.
    Process {
        /// Path to the alert JSON file.
        #[arg(long)]
        alert: PathBuf,

        /// Base URL of the predictive service.
        #[arg(long, default_value = "http://localhost:8001")]
        service_url: String,

        /// Override the per-call timeout, e.g. "10s" or "500ms".
        #[arg(long, value_parser = humantime::parse_duration)]
        call_timeout: Option<Duration>,

        /// Environment variable holding the service bearer token.
        #[arg(long, default_value = "REMEDIAN_SERVICE_TOKEN")]
        token_env: String,
    },

    /// Query recorded decisions, most recent first.
    Logs {
        /// Filter by alert id.
        #[arg(long)]
        alert_id: Option<String>,

        #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Process {
            alert,
            service_url,
            call_timeout,
            token_env,
        } => {
            if let Some(timeout) = call_timeout {
                config.fetch.call_timeout = timeout;
            }

            let text = std::fs::read_to_string(&alert)
                .with_context(|| format!("reading alert from {}", alert.display()))?;
            let alert: Alert = serde_json::from_str(&text).context("parsing alert JSON")?;
            alert.validate().context("invalid alert")?;

            let mut service =
                HttpPropositionService::new(&service_url, config.fetch.call_timeout)?;
            if let Ok(credential) = ApiCredential::from_env(&token_env) {
                service = service.with_credential(credential);
            }

            let store = Arc::new(FileLogStore::open(&cli.log_file)?);
            let engine = OrchestrationEngineBuilder::new()
                .service(Arc::new(service))
                .config(config)
                .log_store(store)
                .build()?;

            let result = engine.process_alert(alert).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Logs { alert_id, limit } => {
            let store = FileLogStore::open(&cli.log_file)?;
            let entries = remedian_core::DecisionLogStore::query(&store, alert_id.as_deref(), limit);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}
