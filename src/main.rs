use clap::Parser;
use log::{error, info};
use nps_poll::commands::{self, Cli};
use nps_poll::config::Config;
use nps_poll::db::{SqliteStore, Store};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);
    info!("Submission mode: {}", config.submission_mode);

    // Initialize database
    let store: Arc<dyn Store> = match SqliteStore::connect(&config.database_url, config.refresh).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            eprintln!("Could not connect to the vote store. Please try again.");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = commands::handle_command(store, &config, cli.command).await {
        error!("Command failed: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
