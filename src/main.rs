use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fyyur::config::{Config, DatabaseBackend, DEFAULT_CONFIG_PATH};
use fyyur::logging;
use fyyur::server;
use fyyur::storage::{open_storage, SqliteStorage};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fyyur")]
#[command(about = "Venue, artist and show booking directory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web application
    Serve {
        /// Path to the TOML configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Port to listen on, overriding configuration and PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply database migrations and exit
    Migrate {
        /// Path to the TOML configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    config.apply_env_overrides()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            let mut config = load_config(&config)?;
            if let Some(port) = port {
                config.server.port = port;
            }
            let _guard = logging::init_logging(&config.logging);

            let storage = open_storage(&config.database).context("opening storage")?;
            info!(backend = ?config.database.backend, "Storage ready");
            server::start_server(storage, &config).await?;
        }
        Commands::Migrate { config } => {
            let config = load_config(&config)?;
            let _guard = logging::init_logging(&config.logging);

            if config.database.backend == DatabaseBackend::Memory {
                warn!("In-memory backend has no schema to migrate");
                return Ok(());
            }
            let storage = SqliteStorage::open(&config.database.path)?;
            storage.run_migrations()?;
            info!(path = %config.database.path.display(), "Migrations applied");
        }
    }

    Ok(())
}
