use super::{Store, StoreError, Subscription};
use crate::models::{sort_snapshot, NewVote, SessionId, Snapshot, VoteRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

struct SessionVotes {
    votes: BTreeMap<String, VoteRecord>,
    feed: watch::Sender<Snapshot>,
}

impl SessionVotes {
    fn new() -> Self {
        let (feed, _) = watch::channel(Snapshot::default());
        Self {
            votes: BTreeMap::new(),
            feed,
        }
    }

    fn publish(&self) {
        let mut records: Vec<VoteRecord> = self.votes.values().cloned().collect();
        sort_snapshot(&mut records);
        self.feed.send_replace(Arc::new(records));
    }
}

/// In-process store. Writes are pushed to subscribers straight away.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionId, SessionVotes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SessionVotes>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self, session: &SessionId, record: VoteRecord) -> Result<VoteRecord, StoreError> {
        let mut sessions = self.sessions()?;
        let slot = sessions
            .entry(session.clone())
            .or_insert_with(SessionVotes::new);
        slot.votes.insert(record.key.clone(), record.clone());
        slot.publish();
        Ok(record)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_vote(
        &self,
        session: &SessionId,
        key: &str,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let sessions = self.sessions()?;
        Ok(sessions
            .get(session)
            .and_then(|slot| slot.votes.get(key))
            .cloned())
    }

    async fn put_vote(
        &self,
        session: &SessionId,
        key: &str,
        vote: &NewVote,
    ) -> Result<VoteRecord, StoreError> {
        self.write(session, VoteRecord::stamp(key.to_string(), vote, Utc::now()))
    }

    async fn add_vote(
        &self,
        session: &SessionId,
        vote: &NewVote,
    ) -> Result<VoteRecord, StoreError> {
        let key = Uuid::new_v4().to_string();
        self.write(session, VoteRecord::stamp(key, vote, Utc::now()))
    }

    async fn subscribe(&self, session: &SessionId) -> Result<Subscription, StoreError> {
        let mut sessions = self.sessions()?;
        let slot = sessions
            .entry(session.clone())
            .or_insert_with(SessionVotes::new);
        let mut snapshots = slot.feed.subscribe();
        snapshots.mark_changed();
        Ok(Subscription::new(session.clone(), snapshots, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{scores, session, vote};

    #[tokio::test]
    async fn put_overwrites_under_the_same_key() {
        let store = MemoryStore::new();
        let keynote = session("keynote");

        store.put_vote(&keynote, "device-1", &vote(8)).await.unwrap();
        store.put_vote(&keynote, "device-1", &vote(5)).await.unwrap();

        let stored = store.get_vote(&keynote, "device-1").await.unwrap().unwrap();
        assert_eq!(stored.score.value(), 5);

        let mut feed = store.subscribe(&keynote).await.unwrap();
        let snapshot = feed.next().await.unwrap();
        assert_eq!(scores(&snapshot), vec![5]);
    }

    #[tokio::test]
    async fn add_always_creates_a_new_record() {
        let store = MemoryStore::new();
        let keynote = session("keynote");

        let first = store.add_vote(&keynote, &vote(8)).await.unwrap();
        let second = store.add_vote(&keynote, &vote(5)).await.unwrap();
        assert_ne!(first.key, second.key);

        let mut feed = store.subscribe(&keynote).await.unwrap();
        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn missing_vote_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_vote(&session("x"), "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscribers_see_current_set_then_each_write() {
        let store = MemoryStore::new();
        let keynote = session("keynote");
        store.put_vote(&keynote, "a", &vote(9)).await.unwrap();

        let mut feed = store.subscribe(&keynote).await.unwrap();
        assert_eq!(scores(&feed.next().await.unwrap()), vec![9]);

        store.put_vote(&keynote, "b", &vote(3)).await.unwrap();
        assert_eq!(scores(&feed.next().await.unwrap()), vec![9, 3]);
    }

    #[tokio::test]
    async fn empty_session_yields_empty_snapshot() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe(&session("quiet")).await.unwrap();
        assert!(feed.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = MemoryStore::new();
        store.put_vote(&session("a"), "k", &vote(10)).await.unwrap();
        store.put_vote(&session("b"), "k", &vote(0)).await.unwrap();

        let mut feed = store.subscribe(&session("a")).await.unwrap();
        assert_eq!(scores(&feed.next().await.unwrap()), vec![10]);
        assert_eq!(
            store.get_vote(&session("b"), "k").await.unwrap().map(|r| r.score.value()),
            Some(0)
        );
    }
}
