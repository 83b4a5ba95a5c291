use super::SubmissionMode;
use crate::db::{Store, StoreError};
use crate::identity::DeviceId;
use crate::models::{Email, NewVote, Score, SessionId, ValueError, VoteRecord};
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;

/// What this device has done in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    NoVote,
    Submitted(Score),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Recorded(VoteRecord),
    /// Normal mode only: this device already voted, nothing was written.
    AlreadySubmitted(Score),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidEmail(ValueError),
    #[error("could not reach the vote store: {0}")]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// Message safe to show to the voter.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::InvalidEmail(e) => format!("{}. Fix it and try again.", e),
            SubmitError::Store(_) => {
                "Something went wrong while recording your vote. Please try again.".to_string()
            }
        }
    }
}

/// Submission side of one session for one device.
pub struct VoteSubmitter {
    store: Arc<dyn Store>,
    session: SessionId,
    device: DeviceId,
    mode: SubmissionMode,
    state: SlotState,
}

impl VoteSubmitter {
    /// Starts with an empty slot without asking the store.
    pub fn new(
        store: Arc<dyn Store>,
        session: SessionId,
        device: DeviceId,
        mode: SubmissionMode,
    ) -> Self {
        Self {
            store,
            session,
            device,
            mode,
            state: SlotState::NoVote,
        }
    }

    /// Like `new`, but first reads whether this device already voted.
    /// Unrestricted mode never blocks, so it skips the read.
    pub async fn open(
        store: Arc<dyn Store>,
        session: SessionId,
        device: DeviceId,
        mode: SubmissionMode,
    ) -> Result<Self, SubmitError> {
        let mut submitter = Self::new(store, session, device, mode);
        if mode == SubmissionMode::Normal {
            let existing = submitter
                .store
                .get_vote(&submitter.session, submitter.device.as_str())
                .await;
            match existing {
                Ok(Some(record)) => submitter.state = SlotState::Submitted(record.score),
                Ok(None) => {}
                // an unreadable slot does not count as a vote; the next put overwrites it
                Err(e @ StoreError::Corrupt { .. }) => {
                    warn!(
                        "Treating unreadable vote in session {} as empty: {}",
                        submitter.session, e
                    );
                }
                Err(e) => {
                    error!(
                        "Failed to check prior vote in session {}: {}",
                        submitter.session, e
                    );
                    return Err(e.into());
                }
            }
        }
        Ok(submitter)
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn mode(&self) -> SubmissionMode {
        self.mode
    }

    /// Validates and writes one vote.
    ///
    /// The email is checked before anything else; a bad one means no write.
    /// The check against a prior vote and the write are separate store calls,
    /// so two racing submissions from one device can both land; the later
    /// one overwrites the earlier.
    pub async fn submit(&mut self, score: Score, email: &str) -> Result<SubmitOutcome, SubmitError> {
        let email = Email::parse_optional(email).map_err(|e| {
            warn!("Rejected vote in session {}: {}", self.session, e);
            SubmitError::InvalidEmail(e)
        })?;

        if self.mode == SubmissionMode::Normal {
            if let SlotState::Submitted(previous) = self.state {
                info!(
                    "Device {} already voted in session {}, ignoring",
                    self.device, self.session
                );
                return Ok(SubmitOutcome::AlreadySubmitted(previous));
            }
        }

        let vote = NewVote { score, email };
        let written = match self.mode {
            SubmissionMode::Normal => {
                self.store
                    .put_vote(&self.session, self.device.as_str(), &vote)
                    .await
            }
            SubmissionMode::Unrestricted => self.store.add_vote(&self.session, &vote).await,
        };

        let record = written.map_err(|e| {
            error!("Failed to record vote in session {}: {}", self.session, e);
            SubmitError::Store(e)
        })?;

        self.state = SlotState::Submitted(score);
        info!(
            "Recorded score {} in session {} ({} mode)",
            score, self.session, self.mode
        );
        Ok(SubmitOutcome::Recorded(record))
    }
}
