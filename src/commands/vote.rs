use crate::config::Config;
use crate::db::Store;
use crate::handlers::{SubmissionMode, SubmitOutcome, VoteSubmitter};
use crate::identity::DeviceId;
use crate::models::{Score, SessionId};
use crate::voting::Category;
use clap::Args;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct VoteArgs {
    /// Poll session to vote in
    pub session: String,

    /// How likely you are to recommend it, 0 (not at all) to 10 (extremely)
    #[arg(value_parser = clap::value_parser!(u8).range(0..=10))]
    pub score: u8,

    /// Optional contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Allow repeat votes from this device (demo/testing)
    #[arg(long)]
    pub unrestricted: bool,
}

impl VoteArgs {
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.unrestricted {
            config.submission_mode = SubmissionMode::Unrestricted;
        }
    }
}

/// Submission screen. In normal mode it reads the device's slot first, so a
/// second vote from the same device is reported and not written.
pub async fn handle_vote(
    store: Arc<dyn Store>,
    config: &Config,
    args: VoteArgs,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let session = SessionId::parse(&args.session)?;
    let score = Score::try_from(args.score)?;
    let device = DeviceId::load_or_create(&config.device_file)?;

    let mut submitter = match VoteSubmitter::open(store, session, device, config.submission_mode).await {
        Ok(submitter) => submitter,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    if config.submission_mode == SubmissionMode::Unrestricted {
        println!("TEST MODE: multiple submissions allowed.");
    }

    match submitter.submit(score, args.email.as_deref().unwrap_or("")).await {
        Ok(SubmitOutcome::Recorded(record)) => {
            let category = Category::of(record.score.value());
            println!(
                "Thanks! Your score of {} ({}) was recorded.",
                record.score,
                category.name()
            );
            Ok(())
        }
        Ok(SubmitOutcome::AlreadySubmitted(previous)) => {
            println!(
                "You already voted {} in this session. One response per device.",
                previous
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}
