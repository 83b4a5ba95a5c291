use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

lazy_static! {
    // local@label(.label)+ with no whitespace and a non-empty last label
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@(?:[^\s@.]+\.)+[^\s@.]+$")
        .expect("email pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("score must be between 0 and 10, got {0}")]
    ScoreOutOfRange(i64),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("session id must not be empty")]
    EmptySession,
}

/// Name of a poll session. Votes of different sessions never mix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self, ValueError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValueError::EmptySession);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 10;

    pub fn value(self) -> u8 {
        self.0
    }

    /// All selectable scores, lowest first.
    pub fn all() -> impl Iterator<Item = Score> {
        (0..=Self::MAX).map(Score)
    }
}

impl TryFrom<i64> for Score {
    type Error = ValueError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match u8::try_from(raw) {
            Ok(value) if value <= Self::MAX => Ok(Score(value)),
            _ => Err(ValueError::ScoreOutOfRange(raw)),
        }
    }
}

impl TryFrom<u8> for Score {
    type Error = ValueError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Score::try_from(i64::from(raw))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses the optional email field. Blank input means "no email" and is
    /// always accepted.
    pub fn parse_optional(raw: &str) -> Result<Option<Email>, ValueError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Email::try_from(trimmed.to_string()).map(Some)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ValueError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if EMAIL_RE.is_match(&raw) {
            Ok(Email(raw))
        } else {
            Err(ValueError::InvalidEmail(raw))
        }
    }
}

impl From<Email> for String {
    fn from(email: Email) -> String {
        email.0
    }
}

/// A vote as written by a client. The store assigns key and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVote {
    pub score: Score,
    pub email: Option<Email>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub key: String,
    pub score: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    pub created_at: DateTime<Utc>,
}

impl VoteRecord {
    pub fn stamp(key: String, vote: &NewVote, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            score: vote.score,
            email: vote.email.clone(),
            created_at,
        }
    }
}

/// Full current vote set of one session, ordered by `created_at` then key.
pub type Snapshot = Arc<Vec<VoteRecord>>;

pub fn sort_snapshot(records: &mut [VoteRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.key.cmp(&b.key))
    });
}
