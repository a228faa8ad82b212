//! chartdeckd — the Chartdeck daemon.
//!
//! Assembles the record store (redb), chart store (object_store), build
//! trigger (Jenkins) and orchestrator behind the REST API.
//!
//! # Usage
//!
//! ```text
//! chartdeckd serve --config /etc/chartdeck/chartdeck.toml --port 8000
//! chartdeckd check-config --config /etc/chartdeck/chartdeck.toml
//! ```

mod serve;

use std::path::{Path, PathBuf};

use chartdeck_core::config::TRIGGER_TOKEN_ENV;
use chartdeck_core::DaemonConfig;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

#[derive(Parser)]
#[command(name = "chartdeckd", about = "Chartdeck daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server.
    Serve {
        /// Configuration file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the record store (overrides the config file).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file and print the effective settings.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            serve::run(config).await
        }
        Command::CheckConfig { config } => {
            let config = load_config(Some(&config))?;
            print!("{}", config.to_toml_string()?);
            if config.trigger.token.is_none() {
                eprintln!("warning: no trigger token; set {TRIGGER_TOKEN_ENV} before serving");
            }
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,chartdeckd=debug,chartdeck=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DaemonConfig> {
    let mut config = match path {
        Some(path) => {
            info!(path = ?path, "loading configuration");
            DaemonConfig::from_file(path)?
        }
        None => DaemonConfig::default(),
    };
    config.resolve_trigger_token(|key| std::env::var(key).ok());
    Ok(config)
}
