//! Account snapshots: one bureau's report of one obligation.
//!
//! Raw records arrive as loosely formatted text. Parsing never fails on
//! field content: a malformed date becomes `None`, a malformed amount
//! becomes `0.0`. Only the bureau must be recognizable.

use crate::{
    error::{DisputeError, DisputeResult},
    types::{AccountId, Bureau, UserId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A record as imported from a report, before parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAccountRecord {
    pub account_id: String,
    pub bureau: String,
    pub creditor_name: String,
    pub account_number: Option<String>,
    pub account_type: Option<String>,
    pub status: Option<String>,
    pub responsibility: Option<String>,
    pub reported_consumer_name: Option<String>,
    pub balance: Option<String>,
    pub high_balance: Option<String>,
    pub credit_limit: Option<String>,
    pub past_due: Option<String>,
    pub date_opened: Option<String>,
    pub date_closed: Option<String>,
    pub last_activity: Option<String>,
    pub first_delinquency: Option<String>,
    pub date_reported: Option<String>,
    pub is_medical: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub bureau: Bureau,
    pub creditor_name: String,
    pub account_number: Option<String>,
    pub account_type: Option<String>,
    pub status: Option<String>,
    pub responsibility: Option<String>,
    pub reported_consumer_name: Option<String>,
    pub balance: f64,
    pub high_balance: f64,
    pub credit_limit: f64,
    pub past_due: f64,
    pub date_opened: Option<NaiveDate>,
    pub date_closed: Option<NaiveDate>,
    pub last_activity: Option<NaiveDate>,
    pub first_delinquency: Option<NaiveDate>,
    pub date_reported: Option<NaiveDate>,
    pub is_medical: bool,
}

impl AccountSnapshot {
    /// Parse a raw record for `user_id`.
    pub fn from_raw(user_id: &str, raw: &RawAccountRecord) -> DisputeResult<Self> {
        let bureau = Bureau::parse(&raw.bureau).ok_or_else(|| DisputeError::UnknownBureau {
            account_id: raw.account_id.clone(),
            raw: raw.bureau.clone(),
        })?;

        let account_type = non_empty(raw.account_type.as_deref());
        let creditor_name = raw.creditor_name.trim().to_string();
        let is_medical = raw.is_medical.unwrap_or_else(|| {
            looks_medical(&creditor_name) || account_type.as_deref().is_some_and(looks_medical)
        });

        Ok(Self {
            account_id: raw.account_id.trim().to_string(),
            user_id: user_id.to_string(),
            bureau,
            creditor_name,
            account_number: non_empty(raw.account_number.as_deref()),
            account_type,
            status: non_empty(raw.status.as_deref()),
            responsibility: non_empty(raw.responsibility.as_deref()),
            reported_consumer_name: non_empty(raw.reported_consumer_name.as_deref()),
            balance: parse_amount(raw.balance.as_deref()),
            high_balance: parse_amount(raw.high_balance.as_deref()),
            credit_limit: parse_amount(raw.credit_limit.as_deref()),
            past_due: parse_amount(raw.past_due.as_deref()),
            date_opened: parse_date(raw.date_opened.as_deref()),
            date_closed: parse_date(raw.date_closed.as_deref()),
            last_activity: parse_date(raw.last_activity.as_deref()),
            first_delinquency: parse_date(raw.first_delinquency.as_deref()),
            date_reported: parse_date(raw.date_reported.as_deref()),
            is_medical,
        })
    }

    /// The categories the free-text status mentions.
    pub fn status_categories(&self) -> Vec<StatusCategory> {
        self.status.as_deref().map(StatusCategory::classify).unwrap_or_default()
    }

    /// Dominant category: the most severe one mentioned.
    pub fn primary_status(&self) -> StatusCategory {
        self.status_categories()
            .into_iter()
            .max_by_key(|c| c.rank())
            .unwrap_or(StatusCategory::Unknown)
    }

    pub fn is_derogatory(&self) -> bool {
        self.status_categories().iter().any(|c| c.is_derogatory())
    }

    pub fn is_collection(&self) -> bool {
        self.status_categories().contains(&StatusCategory::Collection)
            || self
                .account_type
                .as_deref()
                .is_some_and(|t| t.to_ascii_lowercase().contains("collection"))
    }

    pub fn is_closed(&self) -> bool {
        self.date_closed.is_some() || self.status_categories().contains(&StatusCategory::Closed)
    }

    pub fn is_revolving(&self) -> bool {
        self.account_type.as_deref().is_some_and(|t| {
            let t = t.to_ascii_lowercase();
            t.contains("revolving") || t.contains("credit card") || t.contains("line of credit")
        })
    }

    /// The digits of the account number that are not masked out.
    pub fn visible_account_digits(&self) -> Option<String> {
        let digits: String = self
            .account_number
            .as_deref()?
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() { None } else { Some(digits) }
    }
}

/// Coarse status buckets recognized in free-text bureau statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Current,
    Paid,
    Closed,
    Transferred,
    Late,
    Settled,
    Collection,
    ChargedOff,
    Repossession,
    Foreclosure,
    Bankruptcy,
    Unknown,
}

impl StatusCategory {
    /// Every category mentioned in `text`, in a fixed order.
    pub fn classify(text: &str) -> Vec<StatusCategory> {
        let t = text.to_ascii_lowercase();
        let mut found = Vec::new();
        let mut mark = |hit: bool, cat: StatusCategory| {
            if hit && !found.contains(&cat) {
                found.push(cat);
            }
        };
        mark(
            t.contains("current") || t.contains("as agreed") || t.contains("never late"),
            StatusCategory::Current,
        );
        mark(t.contains("paid") && !t.contains("unpaid"), StatusCategory::Paid);
        mark(t.contains("closed"), StatusCategory::Closed);
        mark(t.contains("transferred") || t.contains("sold"), StatusCategory::Transferred);
        mark(
            mentions_late(&t),
            StatusCategory::Late,
        );
        mark(t.contains("settled"), StatusCategory::Settled);
        mark(t.contains("collection"), StatusCategory::Collection);
        mark(
            t.contains("charge off") || t.contains("charged off") || t.contains("chargeoff")
                || t.contains("charge-off"),
            StatusCategory::ChargedOff,
        );
        mark(t.contains("repossess"), StatusCategory::Repossession);
        mark(t.contains("foreclos"), StatusCategory::Foreclosure);
        mark(t.contains("bankrupt") || t.contains("chapter 7") || t.contains("chapter 13"),
            StatusCategory::Bankruptcy);
        found
    }

    pub fn is_derogatory(&self) -> bool {
        matches!(
            self,
            StatusCategory::Late
                | StatusCategory::Settled
                | StatusCategory::Collection
                | StatusCategory::ChargedOff
                | StatusCategory::Repossession
                | StatusCategory::Foreclosure
                | StatusCategory::Bankruptcy
        )
    }

    fn rank(&self) -> u8 {
        match self {
            StatusCategory::Unknown      => 0,
            StatusCategory::Current      => 1,
            StatusCategory::Transferred  => 2,
            StatusCategory::Closed       => 3,
            StatusCategory::Paid         => 4,
            StatusCategory::Late         => 5,
            StatusCategory::Settled      => 6,
            StatusCategory::Collection   => 7,
            StatusCategory::ChargedOff   => 8,
            StatusCategory::Repossession => 9,
            StatusCategory::Foreclosure  => 10,
            StatusCategory::Bankruptcy   => 11,
        }
    }
}

/// Parse a report date. Unparseable input yields `None`.
///
/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY`, `MM/YYYY` and `YYYY-MM`; month-only
/// forms resolve to the first of the month.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    // Month precision.
    let (month, year) = if let Some((m, y)) = s.split_once('/') {
        (m, y)
    } else if let Some((y, m)) = s.split_once('-') {
        (m, y)
    } else {
        return None;
    };
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    if year < 1000 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parse a currency amount. Accepts `$`, thousands separators, a leading
/// minus and accounting parentheses; anything else yields `0.0`.
pub fn parse_amount(raw: Option<&str>) -> f64 {
    let Some(s) = raw else { return 0.0 };
    let mut text = s.trim();
    let mut negative = false;
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negative = true;
        text = inner.trim();
    }
    if let Some(rest) = text.strip_prefix('-') {
        negative = !negative;
        text = rest.trim_start();
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => if negative { -v } else { v },
        _ => 0.0,
    }
}

/// Late when a "N days late" / "N days past due" count is non-zero, or,
/// without any count, when the text says late, past due or delinquent.
fn mentions_late(t: &str) -> bool {
    let counts: Vec<u32> = t
        .match_indices("days")
        .filter(|(i, _)| {
            let rest = t[i + 4..].trim_start();
            rest.starts_with("late") || rest.starts_with("past due")
        })
        .filter_map(|(i, _)| {
            let before = t[..i].trim_end();
            let prefix = before.trim_end_matches(|c: char| c.is_ascii_digit());
            before[prefix.len()..].parse().ok()
        })
        .collect();
    if !counts.is_empty() {
        return counts.iter().any(|&n| n > 0);
    }
    t.contains("late") && !t.contains("never late")
        || t.contains("past due")
        || t.contains("delinquent")
}

/// Lower-case and strip everything that is not ASCII alphanumeric.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Best-effort "same creditor" test: normalized equality or either name
/// containing the other. Empty names never match.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn looks_medical(text: &str) -> bool {
    let t = text.to_ascii_lowercase();
    ["medical", "hospital", "health", "clinic", "physician", "radiology", "ambulance"]
        .iter()
        .any(|k| t.contains(k))
}
