use crate::types::{AccountId, UserId};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisputeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown bureau '{raw}' on account {account_id}")]
    UnknownBureau { account_id: String, raw: String },

    #[error("Invalid round number {0}")]
    InvalidRound(i64),

    #[error("Dispute round '{round_id}' not found")]
    RoundNotFound { round_id: String },

    #[error("Account {account_id} is locked until {unlocks_at}")]
    AccountLocked { account_id: AccountId, unlocks_at: DateTime<Utc> },

    #[error("Rate limit exceeded for user {user_id}; retry in {retry_after_secs}s")]
    RateLimited { user_id: UserId, retry_after_secs: i64 },

    #[error("Corrupt stored value in {column}: {value}")]
    CorruptRecord { column: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DisputeResult<T> = Result<T, DisputeError>;
