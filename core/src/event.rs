//! The engine's audit trail.
//!
//! RULE: every write the round manager performs appends one event per
//! affected record. Allocation reads never emit events, so re-running
//! them leaves the log untouched.

use crate::{
    round_manager::OutcomeResult,
    types::{AccountId, Round, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variants are appended over time, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisputeEvent {
    AccountsImported {
        user_id: UserId,
        count: usize,
    },
    RoundRecorded {
        user_id: UserId,
        round_id: String,
        round: Round,
        account_ids: Vec<AccountId>,
        letters: usize,
    },
    RoundMailed {
        user_id: UserId,
        round_id: String,
        round: Round,
        mailed_at: DateTime<Utc>,
    },
    OutcomeRecorded {
        user_id: UserId,
        account_id: AccountId,
        round: Round,
        result: OutcomeResult,
        letter_id: String,
        created: bool,
    },
    OutcomeSkipped {
        user_id: UserId,
        account_id: AccountId,
        round: Round,
        reason: String,
    },
    DisputeRefused {
        user_id: UserId,
        account_id: AccountId,
        round: Round,
        unlocks_at: DateTime<Utc>,
    },
}

impl DisputeEvent {
    pub fn user_id(&self) -> &str {
        match self {
            DisputeEvent::AccountsImported { user_id, .. }
            | DisputeEvent::RoundRecorded { user_id, .. }
            | DisputeEvent::RoundMailed { user_id, .. }
            | DisputeEvent::OutcomeRecorded { user_id, .. }
            | DisputeEvent::OutcomeSkipped { user_id, .. }
            | DisputeEvent::DisputeRefused { user_id, .. } => user_id,
        }
    }

    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            DisputeEvent::AccountsImported { .. } => "accounts_imported",
            DisputeEvent::RoundRecorded { .. }    => "round_recorded",
            DisputeEvent::RoundMailed { .. }      => "round_mailed",
            DisputeEvent::OutcomeRecorded { .. }  => "outcome_recorded",
            DisputeEvent::OutcomeSkipped { .. }   => "outcome_skipped",
            DisputeEvent::DisputeRefused { .. }   => "dispute_refused",
        }
    }
}

/// A persisted event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub user_id: UserId,
    pub event_type: String,
    pub payload: String,
    pub created_at: String,
}

impl EventLogEntry {
    pub fn from_event(event: &DisputeEvent, at: DateTime<Utc>) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            user_id: event.user_id().to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
            created_at: at.to_rfc3339(),
        })
    }

    pub fn decode(&self) -> serde_json::Result<DisputeEvent> {
        serde_json::from_str(&self.payload)
    }
}
