mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{NewVote, SessionId, Snapshot, VoteRecord};
use async_trait::async_trait;
use log::debug;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored vote {key} is unreadable: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The four primitives the poll needs from a live document store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Point read of one voter's record.
    async fn get_vote(
        &self,
        session: &SessionId,
        key: &str,
    ) -> Result<Option<VoteRecord>, StoreError>;

    /// Create-or-overwrite under `key`. The store stamps `created_at`.
    async fn put_vote(
        &self,
        session: &SessionId,
        key: &str,
        vote: &NewVote,
    ) -> Result<VoteRecord, StoreError>;

    /// Create under a freshly generated key.
    async fn add_vote(&self, session: &SessionId, vote: &NewVote)
        -> Result<VoteRecord, StoreError>;

    /// Live feed of the full vote set of a session.
    async fn subscribe(&self, session: &SessionId) -> Result<Subscription, StoreError>;
}

/// Handle on a live snapshot feed.
///
/// The first `next()` yields the current vote set. After that every change
/// yields a new snapshot; changes that land faster than they are read
/// collapse into the latest one. Dropping the handle releases the feed.
pub struct Subscription {
    session: SessionId,
    snapshots: watch::Receiver<Snapshot>,
    feed: Option<JoinHandle<()>>,
}

impl Subscription {
    /// `snapshots` must already be marked changed if it holds a value the
    /// subscriber has not seen.
    pub(crate) fn new(
        session: SessionId,
        snapshots: watch::Receiver<Snapshot>,
        feed: Option<JoinHandle<()>>,
    ) -> Self {
        debug!("Subscribed to votes of session {}", session);
        Self {
            session,
            snapshots,
            feed,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Next snapshot, or `None` once the feed has shut down.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.changed().await.ok()?;
        Some(self.snapshots.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Extra receiver on the same feed, to observe when it shuts down.
    #[cfg(test)]
    pub(crate) fn watcher(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }
        debug!("Released subscription to session {}", self.session);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::Score;

    pub(crate) fn session(name: &str) -> SessionId {
        SessionId::parse(name).expect("valid session")
    }

    pub(crate) fn vote(score: u8) -> NewVote {
        NewVote {
            score: Score::try_from(score).expect("score in range"),
            email: None,
        }
    }

    pub(crate) fn scores(snapshot: &Snapshot) -> Vec<u8> {
        snapshot.iter().map(|record| record.score.value()).collect()
    }

    /// A store whose every call fails, for exercising error paths.
    pub(crate) struct UnreachableStore;

    #[async_trait]
    impl Store for UnreachableStore {
        async fn get_vote(
            &self,
            _session: &SessionId,
            _key: &str,
        ) -> Result<Option<VoteRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn put_vote(
            &self,
            _session: &SessionId,
            _key: &str,
            _vote: &NewVote,
        ) -> Result<VoteRecord, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn add_vote(
            &self,
            _session: &SessionId,
            _vote: &NewVote,
        ) -> Result<VoteRecord, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn subscribe(&self, _session: &SessionId) -> Result<Subscription, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }
}
