//! The closed conflict taxonomy.
//!
//! RULE: every member has an exhaustively matched severity, round and
//! category. Adding a member without deciding all three does not compile.
//! The only deliberate fallback is `Unrecognized`, which parsing produces
//! for names outside the taxonomy and which maps to the slowest round.

use crate::types::{AccountId, Round};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points contributed to an account's severity score.
    pub fn points(&self) -> u8 {
        match self {
            Severity::Critical => 10,
            Severity::High     => 8,
            Severity::Medium   => 6,
            Severity::Low      => 5,
        }
    }
}

/// Grouping used for template selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCategory {
    Timeline,
    Balance,
    Status,
    Reporting,
    Duplicate,
    Medical,
    Identity,
    Procedural,
    Generic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    // ── Timeline ──────────────────────────────────
    ImpossibleTimeline,
    ClosedBeforeOpened,
    FutureDated,
    DateOpenedEqualsClosed,
    DateOpenedMismatch,
    DelinquencyBeforeOpened,
    DateClosedMismatch,
    LastActivityMismatch,
    ActivityAfterClosed,
    MissingDateOpened,

    // ── Balance ───────────────────────────────────
    MathErrorBalanceExceedsHighBalance,
    BalanceMismatch,
    PastDueExceedsBalance,
    PaidWithBalance,
    NegativeBalance,
    HighBalanceMismatch,
    CreditLimitMismatch,
    BalanceExceedsCreditLimit,

    // ── Status ────────────────────────────────────
    StatusContradiction,
    StatusMismatch,
    CurrentWithPastDue,
    OpenClosedMismatch,
    AccountTypeMismatch,
    PaymentHistoryConflict,

    // ── Reporting window ──────────────────────────
    ObsoleteReporting,
    ReAging,
    MissingFirstDelinquency,
    AccountNumberMismatch,
    StaleReporting,
    IncompleteReporting,

    // ── Duplicates ────────────────────────────────
    Duplicate,
    DuplicateAccountNumber,
    DuplicateCollection,

    // ── Medical debt ──────────────────────────────
    MedicalDebtUnderThreshold,
    PaidMedicalDebt,
    MedicalDebtTooRecent,

    // ── Identity ──────────────────────────────────
    MixedFile,
    IdentityMismatch,
    EcoaCodeMismatch,
    UnauthorizedInquiry,

    // ── Procedural (from prior rounds) ────────────
    ReinsertedWithoutNotice,
    NoResponseWithin30Days,
    VerifiedWithoutMethodOfVerification,
    FrivolousRejection,
    FailureToMarkDisputed,
    FurnisherFailureToInvestigate,
    ContinuedReportingAfterDeletion,

    // ── Generic ───────────────────────────────────
    UnverifiableRequestVerification,
    Unrecognized,
}

impl ConflictType {
    pub const ALL: [ConflictType; 49] = [
        ConflictType::ImpossibleTimeline,
        ConflictType::ClosedBeforeOpened,
        ConflictType::FutureDated,
        ConflictType::DateOpenedEqualsClosed,
        ConflictType::DateOpenedMismatch,
        ConflictType::DelinquencyBeforeOpened,
        ConflictType::DateClosedMismatch,
        ConflictType::LastActivityMismatch,
        ConflictType::ActivityAfterClosed,
        ConflictType::MissingDateOpened,
        ConflictType::MathErrorBalanceExceedsHighBalance,
        ConflictType::BalanceMismatch,
        ConflictType::PastDueExceedsBalance,
        ConflictType::PaidWithBalance,
        ConflictType::NegativeBalance,
        ConflictType::HighBalanceMismatch,
        ConflictType::CreditLimitMismatch,
        ConflictType::BalanceExceedsCreditLimit,
        ConflictType::StatusContradiction,
        ConflictType::StatusMismatch,
        ConflictType::CurrentWithPastDue,
        ConflictType::OpenClosedMismatch,
        ConflictType::AccountTypeMismatch,
        ConflictType::PaymentHistoryConflict,
        ConflictType::ObsoleteReporting,
        ConflictType::ReAging,
        ConflictType::MissingFirstDelinquency,
        ConflictType::AccountNumberMismatch,
        ConflictType::StaleReporting,
        ConflictType::IncompleteReporting,
        ConflictType::Duplicate,
        ConflictType::DuplicateAccountNumber,
        ConflictType::DuplicateCollection,
        ConflictType::MedicalDebtUnderThreshold,
        ConflictType::PaidMedicalDebt,
        ConflictType::MedicalDebtTooRecent,
        ConflictType::MixedFile,
        ConflictType::IdentityMismatch,
        ConflictType::EcoaCodeMismatch,
        ConflictType::UnauthorizedInquiry,
        ConflictType::ReinsertedWithoutNotice,
        ConflictType::NoResponseWithin30Days,
        ConflictType::VerifiedWithoutMethodOfVerification,
        ConflictType::FrivolousRejection,
        ConflictType::FailureToMarkDisputed,
        ConflictType::FurnisherFailureToInvestigate,
        ConflictType::ContinuedReportingAfterDeletion,
        ConflictType::UnverifiableRequestVerification,
        ConflictType::Unrecognized,
    ];

    pub fn as_str(&self) -> &'static str {
        use ConflictType::*;
        match self {
            ImpossibleTimeline                  => "impossible_timeline",
            ClosedBeforeOpened                  => "closed_before_opened",
            FutureDated                         => "future_dated",
            DateOpenedEqualsClosed              => "date_opened_equals_closed",
            DateOpenedMismatch                  => "date_opened_mismatch",
            DelinquencyBeforeOpened             => "delinquency_before_opened",
            DateClosedMismatch                  => "date_closed_mismatch",
            LastActivityMismatch                => "last_activity_mismatch",
            ActivityAfterClosed                 => "activity_after_closed",
            MissingDateOpened                   => "missing_date_opened",
            MathErrorBalanceExceedsHighBalance  => "math_error_balance_exceeds_high_balance",
            BalanceMismatch                     => "balance_mismatch",
            PastDueExceedsBalance               => "past_due_exceeds_balance",
            PaidWithBalance                     => "paid_with_balance",
            NegativeBalance                     => "negative_balance",
            HighBalanceMismatch                 => "high_balance_mismatch",
            CreditLimitMismatch                 => "credit_limit_mismatch",
            BalanceExceedsCreditLimit           => "balance_exceeds_credit_limit",
            StatusContradiction                 => "status_contradiction",
            StatusMismatch                      => "status_mismatch",
            CurrentWithPastDue                  => "current_with_past_due",
            OpenClosedMismatch                  => "open_closed_mismatch",
            AccountTypeMismatch                 => "account_type_mismatch",
            PaymentHistoryConflict              => "payment_history_conflict",
            ObsoleteReporting                   => "obsolete_reporting",
            ReAging                             => "re_aging",
            MissingFirstDelinquency             => "missing_first_delinquency",
            AccountNumberMismatch               => "account_number_mismatch",
            StaleReporting                      => "stale_reporting",
            IncompleteReporting                 => "incomplete_reporting",
            Duplicate                           => "duplicate",
            DuplicateAccountNumber              => "duplicate_account_number",
            DuplicateCollection                 => "duplicate_collection",
            MedicalDebtUnderThreshold           => "medical_debt_under_threshold",
            PaidMedicalDebt                     => "paid_medical_debt",
            MedicalDebtTooRecent                => "medical_debt_too_recent",
            MixedFile                           => "mixed_file",
            IdentityMismatch                    => "identity_mismatch",
            EcoaCodeMismatch                    => "ecoa_code_mismatch",
            UnauthorizedInquiry                 => "unauthorized_inquiry",
            ReinsertedWithoutNotice             => "reinserted_without_notice",
            NoResponseWithin30Days              => "no_response_within_30_days",
            VerifiedWithoutMethodOfVerification => "verified_without_method_of_verification",
            FrivolousRejection                  => "frivolous_rejection",
            FailureToMarkDisputed               => "failure_to_mark_disputed",
            FurnisherFailureToInvestigate       => "furnisher_failure_to_investigate",
            ContinuedReportingAfterDeletion     => "continued_reporting_after_deletion",
            UnverifiableRequestVerification     => "unverifiable_request_verification",
            Unrecognized                        => "unrecognized",
        }
    }

    pub fn severity(&self) -> Severity {
        use ConflictType::*;
        use Severity::*;
        match self {
            ImpossibleTimeline | ClosedBeforeOpened | FutureDated => Critical,
            DateOpenedEqualsClosed | DateOpenedMismatch | DelinquencyBeforeOpened => High,
            DateClosedMismatch | LastActivityMismatch | ActivityAfterClosed | MissingDateOpened => Medium,

            MathErrorBalanceExceedsHighBalance => Critical,
            BalanceMismatch | PastDueExceedsBalance | PaidWithBalance => High,
            NegativeBalance | HighBalanceMismatch | CreditLimitMismatch
            | BalanceExceedsCreditLimit => Medium,

            StatusContradiction | StatusMismatch | CurrentWithPastDue => High,
            OpenClosedMismatch | PaymentHistoryConflict => Medium,
            AccountTypeMismatch => Low,

            ObsoleteReporting | ReAging => Critical,
            MissingFirstDelinquency | AccountNumberMismatch => Medium,
            StaleReporting | IncompleteReporting => Low,

            Duplicate | DuplicateAccountNumber | DuplicateCollection => High,

            MedicalDebtUnderThreshold | PaidMedicalDebt => Critical,
            MedicalDebtTooRecent => High,

            MixedFile => Critical,
            IdentityMismatch => High,
            EcoaCodeMismatch | UnauthorizedInquiry => Medium,

            ReinsertedWithoutNotice | ContinuedReportingAfterDeletion => Critical,
            NoResponseWithin30Days | VerifiedWithoutMethodOfVerification => High,
            FrivolousRejection | FailureToMarkDisputed | FurnisherFailureToInvestigate => Medium,

            UnverifiableRequestVerification | Unrecognized => Low,
        }
    }

    /// The escalation round an item carrying this conflict starts in.
    pub fn round(&self) -> Round {
        use ConflictType::*;
        match self {
            ImpossibleTimeline
            | ClosedBeforeOpened
            | FutureDated
            | DateOpenedEqualsClosed
            | DateOpenedMismatch
            | DelinquencyBeforeOpened
            | DateClosedMismatch
            | MathErrorBalanceExceedsHighBalance
            | BalanceMismatch
            | PastDueExceedsBalance
            | PaidWithBalance
            | NegativeBalance
            | StatusContradiction
            | StatusMismatch
            | CurrentWithPastDue
            | OpenClosedMismatch
            | ObsoleteReporting
            | ReAging
            | Duplicate
            | DuplicateAccountNumber
            | DuplicateCollection
            | MedicalDebtUnderThreshold
            | PaidMedicalDebt
            | MedicalDebtTooRecent
            | MixedFile
            | IdentityMismatch
            | UnverifiableRequestVerification => Round::One,

            LastActivityMismatch
            | ActivityAfterClosed
            | MissingDateOpened
            | HighBalanceMismatch
            | CreditLimitMismatch
            | BalanceExceedsCreditLimit
            | AccountTypeMismatch
            | PaymentHistoryConflict
            | MissingFirstDelinquency
            | AccountNumberMismatch
            | EcoaCodeMismatch
            | UnauthorizedInquiry
            | ReinsertedWithoutNotice
            | NoResponseWithin30Days
            | VerifiedWithoutMethodOfVerification
            | FrivolousRejection
            | FailureToMarkDisputed => Round::Two,

            StaleReporting
            | IncompleteReporting
            | FurnisherFailureToInvestigate
            | ContinuedReportingAfterDeletion
            | Unrecognized => Round::Three,
        }
    }

    pub fn category(&self) -> ConflictCategory {
        use ConflictCategory as C;
        use ConflictType::*;
        match self {
            ImpossibleTimeline | ClosedBeforeOpened | FutureDated | DateOpenedEqualsClosed
            | DateOpenedMismatch | DelinquencyBeforeOpened | DateClosedMismatch
            | LastActivityMismatch | ActivityAfterClosed | MissingDateOpened => C::Timeline,

            MathErrorBalanceExceedsHighBalance | BalanceMismatch | PastDueExceedsBalance
            | PaidWithBalance | NegativeBalance | HighBalanceMismatch | CreditLimitMismatch
            | BalanceExceedsCreditLimit => C::Balance,

            StatusContradiction | StatusMismatch | CurrentWithPastDue | OpenClosedMismatch
            | AccountTypeMismatch | PaymentHistoryConflict => C::Status,

            ObsoleteReporting | ReAging | MissingFirstDelinquency | AccountNumberMismatch
            | StaleReporting | IncompleteReporting => C::Reporting,

            Duplicate | DuplicateAccountNumber | DuplicateCollection => C::Duplicate,

            MedicalDebtUnderThreshold | PaidMedicalDebt | MedicalDebtTooRecent => C::Medical,

            MixedFile | IdentityMismatch | EcoaCodeMismatch | UnauthorizedInquiry => C::Identity,

            ReinsertedWithoutNotice | NoResponseWithin30Days | VerifiedWithoutMethodOfVerification
            | FrivolousRejection | FailureToMarkDisputed | FurnisherFailureToInvestigate
            | ContinuedReportingAfterDeletion => C::Procedural,

            UnverifiableRequestVerification | Unrecognized => C::Generic,
        }
    }
}

impl FromStr for ConflictType {
    type Err = std::convert::Infallible;

    /// Names outside the taxonomy parse to `Unrecognized`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Ok(ConflictType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == key)
            .unwrap_or(ConflictType::Unrecognized))
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected inconsistency in or across account snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    /// Creditor name the conflict concerns; the scorer matches on it.
    pub account_name: String,
    pub account_ids: Vec<AccountId>,
    pub detail: String,
}

impl Conflict {
    pub fn new(
        conflict_type: ConflictType,
        account_name: &str,
        account_ids: Vec<AccountId>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            severity: conflict_type.severity(),
            account_name: account_name.to_string(),
            account_ids,
            detail: detail.into(),
        }
    }
}
