//! Account scorer. Turns conflict and duplicate signals into a severity,
//! an escalation round and a template per account.
//!
//! Overrides only tighten: they can lower the round or raise the severity,
//! never the reverse.

use crate::{
    account::{names_match, AccountSnapshot},
    config::DetectionConfig,
    conflict::{Conflict, ConflictType},
    conflict_detector::detect_conflicts,
    duplicate_finder::{find_duplicate_groups, DuplicateGroup},
    template::{select_template, TemplateId},
    types::{AccountId, Bureau, Round},
};
use serde::{Deserialize, Serialize};

pub const MIN_SEVERITY: u8 = 3;
pub const MAX_SEVERITY: u8 = 10;
/// Severity of an account with no detected problem.
pub const BASELINE_SEVERITY: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredAccount {
    pub account_id: AccountId,
    pub creditor_name: String,
    pub bureau: Bureau,
    pub severity: u8,
    pub round: Round,
    /// Distinct, in detection order.
    pub error_types: Vec<ConflictType>,
    pub template_id: TemplateId,
    pub is_duplicate: bool,
    pub duplicate_group: Option<Vec<AccountId>>,
}

/// Score every account against precomputed conflicts and duplicate groups.
pub fn score_accounts(
    accounts: &[AccountSnapshot],
    conflicts: &[Conflict],
    duplicates: &[DuplicateGroup],
) -> Vec<ScoredAccount> {
    accounts
        .iter()
        .map(|account| score_one(account, conflicts, duplicates))
        .collect()
}

/// Detector, duplicate finder and scorer in one pass.
pub fn score_snapshots(accounts: &[AccountSnapshot], config: &DetectionConfig) -> Vec<ScoredAccount> {
    let conflicts = detect_conflicts(accounts, config);
    let duplicates = find_duplicate_groups(accounts);
    score_accounts(accounts, &conflicts, &duplicates)
}

fn score_one(
    account: &AccountSnapshot,
    conflicts: &[Conflict],
    duplicates: &[DuplicateGroup],
) -> ScoredAccount {
    let mut error_types: Vec<ConflictType> = Vec::new();
    let mut round: Option<Round> = None;
    let mut severity: Option<u8> = None;

    for conflict in conflicts
        .iter()
        .filter(|c| names_match(&c.account_name, &account.creditor_name))
    {
        let t = conflict.conflict_type;
        round = Some(round.map_or(t.round(), |r| r.min(t.round())));
        severity = Some(severity.map_or(conflict.severity.points(), |s| s.max(conflict.severity.points())));
        push_distinct(&mut error_types, t);
    }

    let group = duplicates.iter().find(|g| g.contains(&account.account_id));
    let had_signal = round.is_some() || group.is_some();

    let mut tighten = |t: ConflictType, floor: u8| {
        round = Some(Round::One);
        severity = Some(severity.map_or(floor, |s| s.max(floor)));
        push_distinct(&mut error_types, t);
    };

    if let (Some(opened), Some(closed)) = (account.date_opened, account.date_closed) {
        if opened == closed {
            tighten(ConflictType::DateOpenedEqualsClosed, 7);
        }
    }
    if account.high_balance > 0.0 && account.balance > account.high_balance {
        tighten(ConflictType::MathErrorBalanceExceedsHighBalance, 9);
    }
    if group.is_some() {
        tighten(ConflictType::Duplicate, 8);
    }

    if !had_signal && error_types.is_empty() {
        round = Some(Round::One);
        severity = Some(BASELINE_SEVERITY);
        error_types.push(ConflictType::UnverifiableRequestVerification);
    }

    let round = round.unwrap_or(Round::One);
    let severity = severity
        .unwrap_or(BASELINE_SEVERITY)
        .clamp(MIN_SEVERITY, MAX_SEVERITY);
    let template_id = select_template(round, &error_types, false);

    ScoredAccount {
        account_id: account.account_id.clone(),
        creditor_name: account.creditor_name.clone(),
        bureau: account.bureau,
        severity,
        round,
        error_types,
        template_id,
        is_duplicate: group.is_some(),
        duplicate_group: group.map(|g| g.account_ids.clone()),
    }
}

fn push_distinct(types: &mut Vec<ConflictType>, t: ConflictType) {
    if !types.contains(&t) {
        types.push(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn snap(id: &str, name: &str) -> AccountSnapshot {
        AccountSnapshot {
            account_id: id.into(),
            user_id: "u1".into(),
            bureau: Bureau::Equifax,
            creditor_name: name.into(),
            account_number: None,
            account_type: None,
            status: Some("Current".into()),
            responsibility: None,
            reported_consumer_name: None,
            balance: 100.0,
            high_balance: 500.0,
            credit_limit: 0.0,
            past_due: 0.0,
            date_opened: d("2018-01-01"),
            date_closed: None,
            last_activity: d("2023-01-01"),
            first_delinquency: None,
            date_reported: d("2024-01-01"),
            is_medical: false,
        }
    }

    #[test]
    fn no_signal_gets_the_baseline() {
        let scored = score_accounts(&[snap("a", "ABC")], &[], &[]);
        assert_eq!(scored[0].round, Round::One);
        assert_eq!(scored[0].severity, 5);
        assert_eq!(scored[0].error_types, vec![ConflictType::UnverifiableRequestVerification]);
        assert_eq!(scored[0].template_id, TemplateId::VerificationRequest);
    }

    #[test]
    fn round_is_min_and_severity_is_max() {
        let conflicts = vec![
            Conflict::new(ConflictType::StaleReporting, "ABC", vec!["a".into()], ""),
            Conflict::new(ConflictType::CreditLimitMismatch, "ABC BANK", vec!["a".into()], ""),
        ];
        let scored = score_accounts(&[snap("a", "ABC BANK")], &conflicts, &[]);
        assert_eq!(scored[0].round, Round::Two);
        assert_eq!(scored[0].severity, 6);
        assert_eq!(
            scored[0].error_types,
            vec![ConflictType::StaleReporting, ConflictType::CreditLimitMismatch]
        );
        assert_eq!(scored[0].template_id, TemplateId::SecondRoundDispute);
    }

    #[test]
    fn unrecognized_conflicts_stay_in_round_three() {
        let conflicts = vec![Conflict::new(ConflictType::Unrecognized, "ABC", vec![], "")];
        let scored = score_accounts(&[snap("a", "ABC")], &conflicts, &[]);
        assert_eq!(scored[0].round, Round::Three);
        assert_eq!(scored[0].severity, 5);
        assert_eq!(scored[0].template_id, TemplateId::FinalDemand);
    }

    #[test]
    fn open_equals_close_tightens() {
        let mut a = snap("a", "ABC");
        a.date_closed = a.date_opened;
        let conflicts = vec![Conflict::new(ConflictType::IncompleteReporting, "ABC", vec![], "")];
        let scored = score_accounts(&[a], &conflicts, &[]);
        assert_eq!(scored[0].round, Round::One);
        assert_eq!(scored[0].severity, 7);
        assert!(scored[0].error_types.contains(&ConflictType::DateOpenedEqualsClosed));
    }

    #[test]
    fn balance_over_high_balance_tightens() {
        let mut a = snap("a", "ABC");
        a.balance = 900.0;
        let scored = score_accounts(&[a], &[], &[]);
        assert_eq!(scored[0].round, Round::One);
        assert_eq!(scored[0].severity, 9);
        assert_eq!(scored[0].error_types, vec![ConflictType::MathErrorBalanceExceedsHighBalance]);
        assert_eq!(scored[0].template_id, TemplateId::FactualDispute);
    }

    #[test]
    fn overrides_never_lower_severity() {
        let mut a = snap("a", "ABC");
        a.date_closed = a.date_opened;
        let conflicts = vec![Conflict::new(ConflictType::ObsoleteReporting, "ABC", vec![], "")];
        let scored = score_accounts(&[a], &conflicts, &[]);
        assert_eq!(scored[0].severity, 10);
    }

    #[test]
    fn duplicate_members_are_first_round() {
        let group = DuplicateGroup { key: "k".into(), account_ids: vec!["a".into(), "b".into()] };
        let scored = score_accounts(&[snap("a", "ABC"), snap("b", "ABC")], &[], &[group]);
        for s in &scored {
            assert!(s.is_duplicate);
            assert_eq!(s.round, Round::One);
            assert_eq!(s.severity, 8);
            assert_eq!(s.template_id, TemplateId::DuplicateReporting);
            assert_eq!(s.duplicate_group.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
        }
    }
}
