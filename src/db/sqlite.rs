use super::{Store, StoreError, Subscription};
use crate::models::{Email, NewVote, Score, SessionId, Snapshot, VoteRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

/// SQLite-backed store. Subscriptions re-read their session on every refresh
/// tick and right after writes made through this store, and publish only
/// when the vote set changed. Writes from other processes show up on the
/// next tick.
pub struct SqliteStore {
    pool: SqlitePool,
    refresh: Duration,
    written: Arc<Notify>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, refresh: Duration) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // every connection to an in-memory database is a separate database
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Self::init_schema(&pool).await?;
        info!("Connected to vote database at {}", database_url);

        Ok(Self {
            pool,
            refresh,
            written: Arc::new(Notify::new()),
        })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                session_id TEXT NOT NULL,
                voter_key TEXT NOT NULL,
                score INTEGER NOT NULL,
                email TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (session_id, voter_key)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, session: &SessionId, record: &VoteRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO votes (session_id, voter_key, score, email, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(session_id, voter_key)
            DO UPDATE SET score = excluded.score, email = excluded.email, created_at = excluded.created_at
            "#,
        )
        .bind(session.as_str())
        .bind(&record.key)
        .bind(i64::from(record.score.value()))
        .bind(record.email.as_ref().map(Email::as_str))
        .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        self.written.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_vote(
        &self,
        session: &SessionId,
        key: &str,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT voter_key, score, email, created_at
            FROM votes
            WHERE session_id = ? AND voter_key = ?
            "#,
        )
        .bind(session.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn put_vote(
        &self,
        session: &SessionId,
        key: &str,
        vote: &NewVote,
    ) -> Result<VoteRecord, StoreError> {
        let record = VoteRecord::stamp(key.to_string(), vote, Utc::now());
        self.upsert(session, &record).await?;
        Ok(record)
    }

    async fn add_vote(
        &self,
        session: &SessionId,
        vote: &NewVote,
    ) -> Result<VoteRecord, StoreError> {
        let record = VoteRecord::stamp(Uuid::new_v4().to_string(), vote, Utc::now());
        self.upsert(session, &record).await?;
        Ok(record)
    }

    async fn subscribe(&self, session: &SessionId) -> Result<Subscription, StoreError> {
        let initial = load_snapshot(&self.pool, session).await?;
        let (snapshots_tx, mut snapshots) = watch::channel(Arc::new(initial));
        snapshots.mark_changed();

        let pool = self.pool.clone();
        let written = Arc::clone(&self.written);
        let refresh = self.refresh;
        let watched = session.clone();

        let feed = tokio::spawn(async move {
            let mut ticker = interval(refresh);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = written.notified() => {}
                }
                if snapshots_tx.is_closed() {
                    break;
                }

                match load_snapshot(&pool, &watched).await {
                    Ok(records) => {
                        let changed = snapshots_tx.send_if_modified(|current: &mut Snapshot| {
                            if **current == records {
                                return false;
                            }
                            *current = Arc::new(records);
                            true
                        });
                        if changed {
                            debug!("Published new snapshot of session {}", watched);
                        }
                    }
                    // the next tick tries again
                    Err(e) => warn!("Failed to refresh votes of session {}: {}", watched, e),
                }
            }
        });

        Ok(Subscription::new(session.clone(), snapshots, Some(feed)))
    }
}

async fn load_snapshot(pool: &SqlitePool, session: &SessionId) -> Result<Vec<VoteRecord>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT voter_key, score, email, created_at
        FROM votes
        WHERE session_id = ?
        ORDER BY created_at, voter_key
        "#,
    )
    .bind(session.as_str())
    .fetch_all(pool)
    .await?;

    let records = rows
        .iter()
        .filter_map(|row| match record_from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping vote in session {}: {}", session, e);
                None
            }
        })
        .collect();

    Ok(records)
}

fn record_from_row(row: &SqliteRow) -> Result<VoteRecord, StoreError> {
    let key: String = row.try_get("voter_key")?;
    let corrupt = |reason: String| StoreError::Corrupt {
        key: key.clone(),
        reason,
    };

    let score = Score::try_from(row.try_get::<i64, _>("score")?).map_err(|e| corrupt(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&row.try_get::<String, _>("created_at")?)
        .map_err(|e| corrupt(format!("bad created_at: {}", e)))?
        .with_timezone(&Utc);

    // an unreadable email does not invalidate the score
    let email = match row.try_get::<Option<String>, _>("email")? {
        Some(raw) => match Email::try_from(raw) {
            Ok(email) => Some(email),
            Err(e) => {
                warn!("Ignoring email on vote {}: {}", key, e);
                None
            }
        },
        None => None,
    };

    Ok(VoteRecord {
        key,
        score,
        email,
        created_at,
    })
}
