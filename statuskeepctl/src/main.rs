//! `statuskeepctl`: run the status saver against a storage tree on disk.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use statuskeep_config::{ConfigLoad, ConfigLoader, ConfigSource, SaverConfig};
use statuskeep_core::{
    Collaborators, InstalledPackages, RealFs, StatusSaver,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod host;

const DEFAULT_LOG_FILTER: &str = "info,statuskeep_core=info";

#[derive(Parser, Debug)]
#[command(name = "statuskeepctl")]
#[command(about = "List, save and watch recent status media on a storage tree")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
struct GlobalArgs {
    /// Config file (TOML or JSON); overrides STATUSKEEP_CONFIG_PATH
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage root to scan (overrides config)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// .env file to load before reading configuration
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show resolved status source paths and the save directory
    Paths,
    /// Run one refresh and print the statuses found
    Scan {
        /// Print the published snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save statuses by file name into the save directory
    Download {
        /// Base names of the statuses to save
        #[arg(required_unless_present = "all")]
        names: Vec<String>,
        /// Save every status not yet saved
        #[arg(long)]
        all: bool,
    },
    /// Print every published list until interrupted
    Watch {
        /// Seconds between refresh requests
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.global.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.global.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        source,
        env_file_loaded,
        warnings,
    } = loader.load().context("failed to load configuration")?;
    if let Some(root) = cli.global.root.clone() {
        config.settings.storage_root = root;
    }

    init_tracing(&config);

    if env_file_loaded {
        info!("loaded .env file");
    }
    match &source {
        ConfigSource::Default => info!("using default configuration"),
        ConfigSource::EnvInline => {
            info!("configuration loaded from inline environment json")
        }
        ConfigSource::Explicit(path)
        | ConfigSource::EnvPath(path)
        | ConfigSource::File(path) => {
            info!(path = %path.display(), "configuration loaded from file")
        }
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(
                message = %warning.message,
                hint = %hint,
                "configuration warning"
            ),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    let saver = start_saver(&config).await;
    let outcome = match cli.command {
        Command::Paths => commands::paths(&saver).await,
        Command::Scan { json } => commands::scan(&saver, json).await,
        Command::Download { names, all } => {
            commands::download(&saver, &names, all).await
        }
        Command::Watch { interval } => commands::watch(&saver, interval).await,
    };
    saver.shutdown().await;
    outcome
}

fn init_tracing(config: &SaverConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            config
                .log_filter
                .as_deref()
                .unwrap_or(DEFAULT_LOG_FILTER)
                .into()
        });
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn start_saver(config: &SaverConfig) -> StatusSaver {
    let root = &config.settings.storage_root;
    let probe = match &config.installed_packages {
        Some(packages) => InstalledPackages::new(packages.iter().cloned()),
        None => host::detect_installed(root),
    };
    let collaborators = Collaborators {
        fs: Arc::new(RealFs::new()),
        access: Arc::new(config.access()),
        media_index: Arc::new(host::NoMediaIndex),
        registrar: Arc::new(host::LoggingRegistrar),
    };
    StatusSaver::start(config.settings.clone(), &probe, collaborators).await
}
