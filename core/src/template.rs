//! Template selector: which correspondence structure a round uses.
//!
//! Pure and total: every (round, error types, escalation) combination
//! resolves to exactly one identifier. No text is rendered here.

use crate::{
    conflict::{ConflictCategory, ConflictType},
    types::Round,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TemplateId {
    /// Factual inaccuracy: timeline, balance, status or reporting-window errors.
    #[serde(rename = "1A")]
    FactualDispute,
    #[serde(rename = "1B")]
    DuplicateReporting,
    /// Generic request that the bureau verify the item.
    #[serde(rename = "1C")]
    VerificationRequest,
    #[serde(rename = "1D")]
    MedicalDebt,
    #[serde(rename = "1E")]
    IdentityDispute,
    #[serde(rename = "2A")]
    SecondRoundDispute,
    /// Method-of-verification demand for items a bureau verified.
    #[serde(rename = "2C")]
    MethodOfVerification,
    #[serde(rename = "3A")]
    FinalDemand,
    /// Regulatory-complaint track for items verified after an MOV demand.
    #[serde(rename = "3B-2")]
    RegulatoryComplaint,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::FactualDispute       => "1A",
            TemplateId::DuplicateReporting   => "1B",
            TemplateId::VerificationRequest  => "1C",
            TemplateId::MedicalDebt          => "1D",
            TemplateId::IdentityDispute      => "1E",
            TemplateId::SecondRoundDispute   => "2A",
            TemplateId::MethodOfVerification => "2C",
            TemplateId::FinalDemand          => "3A",
            TemplateId::RegulatoryComplaint  => "3B-2",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            TemplateId::FactualDispute,
            TemplateId::DuplicateReporting,
            TemplateId::VerificationRequest,
            TemplateId::MedicalDebt,
            TemplateId::IdentityDispute,
            TemplateId::SecondRoundDispute,
            TemplateId::MethodOfVerification,
            TemplateId::FinalDemand,
            TemplateId::RegulatoryComplaint,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    /// The fallback used when no error type maps to something specific.
    pub fn generic_for(round: Round) -> Self {
        match round {
            Round::One   => TemplateId::VerificationRequest,
            Round::Two   => TemplateId::SecondRoundDispute,
            Round::Three => TemplateId::FinalDemand,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the template for one account in one round.
///
/// Escalation decides rounds 2 and 3 outright. In round 1 the first error
/// type (in detection order) with a specific template wins.
pub fn select_template(round: Round, error_types: &[ConflictType], escalated: bool) -> TemplateId {
    match (round, escalated) {
        (Round::Two, true)   => TemplateId::MethodOfVerification,
        (Round::Three, true) => TemplateId::RegulatoryComplaint,
        (Round::One, _) => error_types
            .iter()
            .find_map(|t| first_round_template(*t))
            .unwrap_or_else(|| TemplateId::generic_for(Round::One)),
        (other, false) => TemplateId::generic_for(other),
    }
}

fn first_round_template(t: ConflictType) -> Option<TemplateId> {
    match t.category() {
        ConflictCategory::Timeline
        | ConflictCategory::Balance
        | ConflictCategory::Status
        | ConflictCategory::Reporting => Some(TemplateId::FactualDispute),
        ConflictCategory::Duplicate   => Some(TemplateId::DuplicateReporting),
        ConflictCategory::Medical     => Some(TemplateId::MedicalDebt),
        ConflictCategory::Identity    => Some(TemplateId::IdentityDispute),
        ConflictCategory::Procedural | ConflictCategory::Generic => None,
    }
}
