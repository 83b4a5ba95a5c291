mod display;
mod vote;

pub use display::DisplayArgs;
pub use vote::VoteArgs;

use crate::config::Config;
use crate::db::Store;
use clap::{Parser, Subcommand};
use log::info;
use std::sync::Arc;

/// Live Net Promoter Score poll.
#[derive(Debug, Parser)]
#[command(name = "nps-poll", author, version, about)]
pub struct Cli {
    /// Vote database, overrides DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a score for a poll session
    Vote(VoteArgs),

    /// Show the live NPS of a poll session
    Display(DisplayArgs),
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Command::Vote(args) = &self.command {
            args.apply_overrides(config);
        }
    }
}

pub async fn handle_command(
    store: Arc<dyn Store>,
    config: &Config,
    command: Command,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match command {
        Command::Vote(args) => {
            info!("Running vote for session {}", args.session);
            vote::handle_vote(store, config, args).await?
        }
        Command::Display(args) => {
            info!("Running display for session {}", args.session);
            display::handle_display(store, args).await?
        }
    }

    Ok(())
}
