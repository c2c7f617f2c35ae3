//! Conflict detector: exhaustive deterministic rule evaluation.
//!
//! Given every snapshot for one user across bureaus, emits typed conflicts.
//! Rules are either single-record checks or pairwise checks between two
//! snapshots of the same obligation.
//!
//! "Same obligation" is decided by `names_match`: normalized creditor-name
//! equality or substring containment either way. This is a best-effort
//! heuristic, not an identity join; "ABC" will pair with "ABC BANK OF USA".
//!
//! Pure function of its input: no I/O, no clock. Anything time-relative is
//! measured against the snapshot's own `date_reported`.

use crate::{
    account::{names_match, normalize_name, AccountSnapshot, StatusCategory},
    config::DetectionConfig,
    conflict::{Conflict, ConflictType},
};
use chrono::{Duration, Months, NaiveDate};

/// Run every rule over `accounts`.
///
/// Output order: single-record conflicts in input order, then pairwise
/// conflicts in (i, j) order. The scorer relies on this order being stable.
pub fn detect_conflicts(accounts: &[AccountSnapshot], config: &DetectionConfig) -> Vec<Conflict> {
    let mut detector = Detector { config, out: Vec::new() };

    for account in accounts {
        detector.check_timeline(account);
        detector.check_amounts(account);
        detector.check_status(account);
        detector.check_reporting_window(account);
        detector.check_medical(account);
    }

    for (i, a) in accounts.iter().enumerate() {
        for b in &accounts[i + 1..] {
            if !names_match(&a.creditor_name, &b.creditor_name) {
                continue;
            }
            if a.bureau != b.bureau {
                detector.check_cross_source(a, b);
            } else {
                detector.check_same_source(a, b);
            }
        }
    }

    log::debug!(
        "conflict_detector: {} accounts -> {} conflicts",
        accounts.len(),
        detector.out.len()
    );
    detector.out
}

struct Detector<'a> {
    config: &'a DetectionConfig,
    out: Vec<Conflict>,
}

impl Detector<'_> {
    fn single(&mut self, t: ConflictType, a: &AccountSnapshot, detail: String) {
        log::debug!("conflict_detector: {t} on {} ({})", a.account_id, detail);
        self.out.push(Conflict::new(t, &a.creditor_name, vec![a.account_id.clone()], detail));
    }

    fn pair(&mut self, t: ConflictType, a: &AccountSnapshot, b: &AccountSnapshot, detail: String) {
        log::debug!(
            "conflict_detector: {t} between {} and {} ({})",
            a.account_id, b.account_id, detail
        );
        self.out.push(Conflict::new(
            t,
            &a.creditor_name,
            vec![a.account_id.clone(), b.account_id.clone()],
            detail,
        ));
    }

    // ── Single-record rules ───────────────────────────────────────

    fn check_timeline(&mut self, a: &AccountSnapshot) {
        if let (Some(last), Some(opened)) = (a.last_activity, a.date_opened) {
            if last < opened {
                self.single(
                    ConflictType::ImpossibleTimeline,
                    a,
                    format!("last activity {last} precedes open date {opened}"),
                );
            }
        }

        if let (Some(closed), Some(opened)) = (a.date_closed, a.date_opened) {
            if closed < opened {
                self.single(
                    ConflictType::ClosedBeforeOpened,
                    a,
                    format!("closed {closed} before opened {opened}"),
                );
            } else if closed == opened {
                self.single(
                    ConflictType::DateOpenedEqualsClosed,
                    a,
                    format!("opened and closed on {opened}"),
                );
            }
        }

        if let Some(reported) = a.date_reported {
            let future = [a.date_opened, a.date_closed, a.last_activity, a.first_delinquency]
                .into_iter()
                .flatten()
                .find(|d| *d > reported);
            if let Some(d) = future {
                self.single(
                    ConflictType::FutureDated,
                    a,
                    format!("date {d} is after the report date {reported}"),
                );
            }
        }

        if let (Some(dofd), Some(opened)) = (a.first_delinquency, a.date_opened) {
            if dofd < opened {
                self.single(
                    ConflictType::DelinquencyBeforeOpened,
                    a,
                    format!("first delinquency {dofd} precedes open date {opened}"),
                );
            }
        }

        if let (Some(last), Some(closed)) = (a.last_activity, a.date_closed) {
            if last > closed && a.balance > 0.0 {
                self.single(
                    ConflictType::ActivityAfterClosed,
                    a,
                    format!("activity {last} after close date {closed} with balance {:.2}", a.balance),
                );
            }
        }

        if a.date_opened.is_none() {
            self.single(ConflictType::MissingDateOpened, a, "no open date reported".into());
        }
    }

    fn check_amounts(&mut self, a: &AccountSnapshot) {
        let tol = self.config.balance_tolerance;
        let cats = a.status_categories();

        if a.high_balance > 0.0 && a.balance > a.high_balance {
            self.single(
                ConflictType::MathErrorBalanceExceedsHighBalance,
                a,
                format!("balance {:.2} exceeds high balance {:.2}", a.balance, a.high_balance),
            );
        }

        // Collections reported at zero balance are exempt.
        if a.past_due > tol
            && a.past_due > a.balance + tol
            && (a.balance > 0.0 || !a.is_collection())
        {
            self.single(
                ConflictType::PastDueExceedsBalance,
                a,
                format!("past due {:.2} exceeds balance {:.2}", a.past_due, a.balance),
            );
        }

        let paid = cats.contains(&StatusCategory::Paid) || cats.contains(&StatusCategory::Settled);
        if paid && a.balance > 0.0 {
            self.single(
                ConflictType::PaidWithBalance,
                a,
                format!("reported paid/settled with balance {:.2}", a.balance),
            );
        }

        if a.balance < 0.0 {
            self.single(
                ConflictType::NegativeBalance,
                a,
                format!("negative balance {:.2}", a.balance),
            );
        }

        if a.is_revolving() && a.credit_limit > 0.0 && a.balance > a.credit_limit + tol {
            self.single(
                ConflictType::BalanceExceedsCreditLimit,
                a,
                format!("balance {:.2} over limit {:.2}", a.balance, a.credit_limit),
            );
        }
    }

    fn check_status(&mut self, a: &AccountSnapshot) {
        let cats = a.status_categories();
        let current = cats.contains(&StatusCategory::Current);
        let derogatory = a.is_derogatory();

        if current && derogatory {
            self.single(
                ConflictType::StatusContradiction,
                a,
                format!("status '{}' is both current and derogatory", a.status.as_deref().unwrap_or("")),
            );
        } else if current && a.past_due > self.config.balance_tolerance {
            self.single(
                ConflictType::CurrentWithPastDue,
                a,
                format!("current status with past due {:.2}", a.past_due),
            );
        }

        if derogatory && a.first_delinquency.is_none() {
            self.single(
                ConflictType::MissingFirstDelinquency,
                a,
                "derogatory status without a first delinquency date".into(),
            );
        }
    }

    fn check_reporting_window(&mut self, a: &AccountSnapshot) {
        if let (Some(dofd), Some(reported)) = (a.first_delinquency, a.date_reported) {
            let years = if a.status_categories().contains(&StatusCategory::Bankruptcy) {
                self.config.bankruptcy_retention_years
            } else {
                self.config.retention_years
            };
            if let Some(expiry) = retention_expiry(dofd, self.config.delinquency_grace_days, years) {
                if reported > expiry {
                    self.single(
                        ConflictType::ObsoleteReporting,
                        a,
                        format!("retention period ended {expiry}, still reported {reported}"),
                    );
                }
            }
        }

        if a.date_reported.is_none() && a.last_activity.is_none() {
            self.single(
                ConflictType::IncompleteReporting,
                a,
                "neither report date nor last activity present".into(),
            );
        }
    }

    fn check_medical(&mut self, a: &AccountSnapshot) {
        if !a.is_medical || !a.is_collection() {
            return;
        }
        let cats = a.status_categories();

        if a.balance > 0.0 && a.balance < self.config.medical_debt_threshold {
            self.single(
                ConflictType::MedicalDebtUnderThreshold,
                a,
                format!(
                    "medical collection of {:.2} under {:.2}",
                    a.balance, self.config.medical_debt_threshold
                ),
            );
        }

        if a.balance <= 0.0 || cats.contains(&StatusCategory::Paid) {
            self.single(ConflictType::PaidMedicalDebt, a, "paid medical collection still reported".into());
        }

        if let (Some(dofd), Some(reported)) = (a.first_delinquency, a.date_reported) {
            let age = (reported - dofd).num_days();
            if age >= 0 && age < self.config.medical_seasoning_days {
                self.single(
                    ConflictType::MedicalDebtTooRecent,
                    a,
                    format!("medical collection reported {age} days after delinquency"),
                );
            }
        }
    }

    // ── Pairwise rules ────────────────────────────────────────────

    fn check_cross_source(&mut self, a: &AccountSnapshot, b: &AccountSnapshot) {
        let tol = self.config.balance_tolerance;

        if let (Some(x), Some(y)) = (a.date_opened, b.date_opened) {
            if x != y {
                self.pair(
                    ConflictType::DateOpenedMismatch,
                    a, b,
                    format!("opened {x} at {} vs {y} at {}", a.bureau, b.bureau),
                );
            }
        }
        if let (Some(x), Some(y)) = (a.date_closed, b.date_closed) {
            if x != y {
                self.pair(
                    ConflictType::DateClosedMismatch,
                    a, b,
                    format!("closed {x} at {} vs {y} at {}", a.bureau, b.bureau),
                );
            }
        }
        if let (Some(x), Some(y)) = (a.last_activity, b.last_activity) {
            if x != y {
                self.pair(
                    ConflictType::LastActivityMismatch,
                    a, b,
                    format!("last activity {x} at {} vs {y} at {}", a.bureau, b.bureau),
                );
            }
        }

        if (a.balance - b.balance).abs() > tol {
            self.pair(
                ConflictType::BalanceMismatch,
                a, b,
                format!("balance {:.2} at {} vs {:.2} at {}", a.balance, a.bureau, b.balance, b.bureau),
            );
        }
        if a.high_balance > 0.0 && b.high_balance > 0.0 && (a.high_balance - b.high_balance).abs() > tol {
            self.pair(
                ConflictType::HighBalanceMismatch,
                a, b,
                format!("high balance {:.2} vs {:.2}", a.high_balance, b.high_balance),
            );
        }
        if a.credit_limit > 0.0 && b.credit_limit > 0.0 && (a.credit_limit - b.credit_limit).abs() > tol {
            self.pair(
                ConflictType::CreditLimitMismatch,
                a, b,
                format!("credit limit {:.2} vs {:.2}", a.credit_limit, b.credit_limit),
            );
        }

        self.check_status_pair(a, b);

        if a.is_closed() != b.is_closed() {
            self.pair(
                ConflictType::OpenClosedMismatch,
                a, b,
                format!(
                    "{} reports {}, {} reports {}",
                    a.bureau, open_word(a), b.bureau, open_word(b)
                ),
            );
        }

        if let (Some(x), Some(y)) = (a.account_type.as_deref(), b.account_type.as_deref()) {
            if normalize_name(x) != normalize_name(y) {
                self.pair(ConflictType::AccountTypeMismatch, a, b, format!("type '{x}' vs '{y}'"));
            }
        }

        if let (Some(x), Some(y)) = (a.first_delinquency, b.first_delinquency) {
            if days_apart(x, y) > self.config.reaging_tolerance_days {
                self.pair(
                    ConflictType::ReAging,
                    a, b,
                    format!("first delinquency {x} at {} vs {y} at {}", a.bureau, b.bureau),
                );
            }
        }

        if let (Some(x), Some(y)) = (a.date_reported, b.date_reported) {
            if days_apart(x, y) > self.config.stale_reporting_days {
                self.pair(
                    ConflictType::StaleReporting,
                    a, b,
                    format!("reported {x} at {} vs {y} at {}", a.bureau, b.bureau),
                );
            }
        }

        if let (Some(x), Some(y)) = (a.visible_account_digits(), b.visible_account_digits()) {
            let overlaps = x.starts_with(&y) || y.starts_with(&x) || x.ends_with(&y) || y.ends_with(&x);
            if !overlaps {
                self.pair(
                    ConflictType::AccountNumberMismatch,
                    a, b,
                    format!("account digits {x} vs {y}"),
                );
            }
        }

        if let (Some(x), Some(y)) = (a.reported_consumer_name.as_deref(), b.reported_consumer_name.as_deref()) {
            if normalize_name(x) != normalize_name(y) {
                self.pair(ConflictType::IdentityMismatch, a, b, format!("consumer '{x}' vs '{y}'"));
            }
        }

        if let (Some(x), Some(y)) = (a.responsibility.as_deref(), b.responsibility.as_deref()) {
            if normalize_name(x) != normalize_name(y) {
                self.pair(ConflictType::EcoaCodeMismatch, a, b, format!("responsibility '{x}' vs '{y}'"));
            }
        }
    }

    fn check_status_pair(&mut self, a: &AccountSnapshot, b: &AccountSnapshot) {
        let (sa, sb) = (a.primary_status(), b.primary_status());
        let major = |s: StatusCategory| s.is_derogatory() && s != StatusCategory::Late;
        let clean = |s: StatusCategory| matches!(s, StatusCategory::Current | StatusCategory::Paid);

        if (major(sa) && clean(sb)) || (major(sb) && clean(sa)) {
            self.pair(
                ConflictType::StatusMismatch,
                a, b,
                format!("status {sa:?} at {} vs {sb:?} at {}", a.bureau, b.bureau),
            );
        } else if (sa == StatusCategory::Late && sb == StatusCategory::Current)
            || (sb == StatusCategory::Late && sa == StatusCategory::Current)
        {
            self.pair(
                ConflictType::PaymentHistoryConflict,
                a, b,
                format!("late at one bureau, current at the other ({} / {})", a.bureau, b.bureau),
            );
        }
    }

    fn check_same_source(&mut self, a: &AccountSnapshot, b: &AccountSnapshot) {
        if let (Some(x), Some(y)) = (a.visible_account_digits(), b.visible_account_digits()) {
            if x == y {
                self.pair(
                    ConflictType::DuplicateAccountNumber,
                    a, b,
                    format!("{} lists account {x} twice", a.bureau),
                );
            }
        }

        if a.is_collection() && b.is_collection() {
            let same_balance = (a.balance - b.balance).abs() <= self.config.balance_tolerance;
            let same_open = a.date_opened.is_some() && a.date_opened == b.date_opened;
            if same_balance || same_open {
                self.pair(
                    ConflictType::DuplicateCollection,
                    a, b,
                    format!("{} lists the same collection twice", a.bureau),
                );
            }
        }
    }
}

/// Last day an item may be reported: grace period after first delinquency,
/// then the retention period in years.
fn retention_expiry(dofd: NaiveDate, grace_days: i64, years: i64) -> Option<NaiveDate> {
    let start = dofd.checked_add_signed(Duration::days(grace_days))?;
    let months = u32::try_from(years.checked_mul(12)?).ok()?;
    start.checked_add_months(Months::new(months))
}

fn days_apart(x: NaiveDate, y: NaiveDate) -> i64 {
    (x - y).num_days().abs()
}

fn open_word(a: &AccountSnapshot) -> &'static str {
    if a.is_closed() { "closed" } else { "open" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bureau;

    fn d(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn snap(id: &str, bureau: Bureau, name: &str) -> AccountSnapshot {
        AccountSnapshot {
            account_id: id.into(),
            user_id: "u1".into(),
            bureau,
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

    fn types(conflicts: &[Conflict]) -> Vec<ConflictType> {
        conflicts.iter().map(|c| c.conflict_type).collect()
    }

    #[test]
    fn clean_account_has_no_conflicts() {
        let c = detect_conflicts(&[snap("a", Bureau::Equifax, "ABC BANK")], &DetectionConfig::default());
        assert!(c.is_empty(), "{c:?}");
    }

    #[test]
    fn activity_before_open_is_impossible() {
        let mut a = snap("a", Bureau::Equifax, "ABC BANK");
        a.last_activity = d("2017-06-01");
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert_eq!(types(&c), vec![ConflictType::ImpossibleTimeline]);
        assert_eq!(c[0].account_ids, vec!["a".to_string()]);
    }

    #[test]
    fn cross_source_balance_drift() {
        let a = snap("a", Bureau::Equifax, "ABC BANK");
        let mut b = snap("b", Bureau::Experian, "ABC BANK OF USA");
        b.balance = 350.0;
        let c = detect_conflicts(&[a, b], &DetectionConfig::default());
        assert_eq!(types(&c), vec![ConflictType::BalanceMismatch]);
        assert_eq!(c[0].account_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn small_balance_differences_are_tolerated() {
        let a = snap("a", Bureau::Equifax, "ABC BANK");
        let mut b = snap("b", Bureau::Experian, "ABC BANK");
        b.balance = 100.75;
        assert!(detect_conflicts(&[a, b], &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn unrelated_creditors_are_not_compared() {
        let a = snap("a", Bureau::Equifax, "ABC BANK");
        let mut b = snap("b", Bureau::Experian, "XYZ FINANCE");
        b.balance = 9000.0;
        b.high_balance = 9000.0;
        assert!(detect_conflicts(&[a, b], &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn re_aged_delinquency() {
        let mut a = snap("a", Bureau::Equifax, "COLLECTOR");
        let mut b = snap("b", Bureau::TransUnion, "COLLECTOR");
        for s in [&mut a, &mut b] {
            s.status = Some("Collection".into());
        }
        a.first_delinquency = d("2019-01-01");
        b.first_delinquency = d("2021-01-01");
        let c = detect_conflicts(&[a, b], &DetectionConfig::default());
        assert!(types(&c).contains(&ConflictType::ReAging));
    }

    #[test]
    fn obsolete_after_retention_period() {
        let mut a = snap("a", Bureau::Equifax, "OLD CARD");
        a.status = Some("Charged off".into());
        a.first_delinquency = d("2015-01-01");
        a.date_reported = d("2023-01-01");
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert!(types(&c).contains(&ConflictType::ObsoleteReporting));
    }

    #[test]
    fn within_retention_period_is_not_obsolete() {
        let mut a = snap("a", Bureau::Equifax, "OLD CARD");
        a.status = Some("Charged off".into());
        a.first_delinquency = d("2017-01-01");
        a.date_reported = d("2024-01-01");
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert!(!types(&c).contains(&ConflictType::ObsoleteReporting));
    }

    #[test]
    fn contradictory_status() {
        let mut a = snap("a", Bureau::Experian, "ABC BANK");
        a.status = Some("Current / Charged Off".into());
        a.first_delinquency = d("2022-01-01");
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert_eq!(types(&c), vec![ConflictType::StatusContradiction]);
    }

    #[test]
    fn small_medical_collection() {
        let mut a = snap("a", Bureau::Experian, "MERCY HOSPITAL");
        a.is_medical = true;
        a.status = Some("Collection".into());
        a.balance = 240.0;
        a.high_balance = 240.0;
        a.first_delinquency = d("2020-01-01");
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert_eq!(types(&c), vec![ConflictType::MedicalDebtUnderThreshold]);
    }

    #[test]
    fn same_bureau_duplicate_number() {
        let mut a = snap("a", Bureau::Equifax, "ABC BANK");
        let mut b = snap("b", Bureau::Equifax, "ABC BANK");
        a.account_number = Some("XXXX1234".into());
        b.account_number = Some("****1234".into());
        let c = detect_conflicts(&[a, b], &DetectionConfig::default());
        assert_eq!(types(&c), vec![ConflictType::DuplicateAccountNumber]);
    }

    #[test]
    fn masked_numbers_that_overlap_agree() {
        let mut a = snap("a", Bureau::Equifax, "ABC BANK");
        let mut b = snap("b", Bureau::Experian, "ABC BANK");
        a.account_number = Some("4111XXXXXXXX1234".into());
        b.account_number = Some("XXXX1234".into());
        let c = detect_conflicts(&[a, b], &DetectionConfig::default());
        assert!(!types(&c).contains(&ConflictType::AccountNumberMismatch));
    }

    #[test]
    fn zero_balance_collection_keeps_past_due() {
        let mut a = snap("a", Bureau::TransUnion, "COLLECTOR");
        a.status = Some("Collection".into());
        a.account_type = Some("Collection".into());
        a.balance = 0.0;
        a.past_due = 300.0;
        a.first_delinquency = d("2022-01-01");
        let c = detect_conflicts(&[a.clone()], &DetectionConfig::default());
        assert!(!types(&c).contains(&ConflictType::PastDueExceedsBalance), "{c:?}");

        a.balance = 50.0;
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert!(types(&c).contains(&ConflictType::PastDueExceedsBalance));
    }

    #[test]
    fn past_due_over_zero_balance_on_open_account() {
        let mut a = snap("a", Bureau::Equifax, "ABC BANK");
        a.status = Some("30 days late".into());
        a.balance = 0.0;
        a.past_due = 120.0;
        a.first_delinquency = d("2023-06-01");
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert!(types(&c).contains(&ConflictType::PastDueExceedsBalance));
    }

    #[test]
    fn any_balance_on_paid_or_closed_accounts() {
        let mut a = snap("a", Bureau::Equifax, "ABC BANK");
        a.status = Some("Paid, current".into());
        a.balance = 0.5;
        let c = detect_conflicts(&[a.clone()], &DetectionConfig::default());
        assert!(types(&c).contains(&ConflictType::PaidWithBalance));

        a.status = Some("Closed".into());
        a.date_closed = d("2022-01-01");
        a.last_activity = d("2022-03-01");
        let c = detect_conflicts(&[a.clone()], &DetectionConfig::default());
        assert!(types(&c).contains(&ConflictType::ActivityAfterClosed));

        a.balance = 0.0;
        let c = detect_conflicts(&[a], &DetectionConfig::default());
        assert!(!types(&c).contains(&ConflictType::ActivityAfterClosed));
    }

    #[test]
    fn detection_is_deterministic() {
        let mut a = snap("a", Bureau::Equifax, "ABC BANK");
        let mut b = snap("b", Bureau::Experian, "ABC BANK");
        a.last_activity = d("2010-01-01");
        b.balance = 900.0;
        b.date_opened = d("2018-03-01");
        let accounts = vec![a, b];
        let config = DetectionConfig::default();
        assert_eq!(detect_conflicts(&accounts, &config), detect_conflicts(&accounts, &config));
    }
}
