//! Market Digest - command line entry point

use chrono::Utc;
use clap::{Parser, Subcommand};
use market_digest::config::{ConfigError, Credentials, PipelineConfig};
use market_digest::normalize::{self, StageInput};
use market_digest::observability::init_default_logging;
use market_digest::pipeline::{run_simplified, run_with_fallback, RunMode, StageSet};
use market_digest::stages::deliver::{format_message, ist_timestamp};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

const EXIT_CONFIG: i32 = 1;
const EXIT_PIPELINE: i32 = 2;

/// Daily market news digest delivered to Telegram
#[derive(Parser)]
#[command(name = "market-digest")]
#[command(about = "Summarize, translate and deliver the daily market news")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once
    Run {
        /// Skip the orchestrator and its failure notice
        #[arg(long)]
        simple: bool,

        /// Search query (defaults to the configured query)
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
    /// Normalize a stage payload into a report and preview the message
    Inspect {
        /// JSON value or plain text
        payload: String,

        /// Treat the payload as an opaque object representation
        #[arg(long)]
        opaque: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }

    let cli = Cli::parse();
    init_default_logging();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(EXIT_CONFIG);
        }
    };

    match cli.command {
        Commands::Run { simple, query } => run_pipeline(&config, simple, query).await,
        Commands::Config { show } => show_config(&config, show),
        Commands::Inspect { payload, opaque } => inspect(payload, opaque),
    }
}

fn load_configuration(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    if let Some(path) = path {
        info!("Loading configuration from: {}", path.display());
        return PipelineConfig::load_from_file(path);
    }

    for candidate in ["market-digest.toml", "config/market-digest.toml"] {
        let path = Path::new(candidate);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return PipelineConfig::load_from_file(path);
        }
    }

    info!("No configuration file found, using defaults");
    let config = PipelineConfig::default();
    config.validate()?;
    Ok(config)
}

async fn run_pipeline(config: &PipelineConfig, simple: bool, query: Option<String>) {
    let credentials = match Credentials::resolve(config) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Missing credentials: {}", e);
            process::exit(EXIT_CONFIG);
        }
    };
    if !credentials.has_search_provider() {
        info!("No search API key configured, headlines will come from the fallback list");
    }

    let query = StageInput::from(query.as_deref());

    let (mode, result) = if simple {
        let result = match StageSet::from_config(config, &credentials) {
            Ok(stages) => run_simplified(&stages, query).await,
            Err(e) => Err(e),
        };
        (RunMode::Simplified, result)
    } else {
        run_with_fallback(config, &credentials, query).await
    };

    match result {
        Ok(outcome) => {
            info!(%mode, "{}", outcome);
            println!("{outcome}");
        }
        Err(e) => {
            error!(%mode, "Pipeline failed: {}", e.sanitized());
            process::exit(EXIT_PIPELINE);
        }
    }
}

fn show_config(config: &PipelineConfig, show: bool) {
    if !show {
        println!("Configuration is valid");
        return;
    }
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            error!("Failed to render configuration: {}", e);
            process::exit(EXIT_CONFIG);
        }
    }
}

fn inspect(payload: String, opaque: bool) {
    let input = if opaque {
        StageInput::opaque(payload)
    } else {
        serde_json::from_str::<serde_json::Value>(&payload)
            .map(StageInput::from)
            .unwrap_or_else(|_| StageInput::from(payload))
    };

    let report = normalize::report(&input);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to render report: {}", e),
    }

    if report.is_empty() {
        println!("\n(nothing to send)");
    } else {
        println!("\n{}", format_message(&report, &ist_timestamp(Utc::now())));
    }
}
