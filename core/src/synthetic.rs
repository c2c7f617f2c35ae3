//! Synthetic tri-bureau credit reports.
//!
//! Produces plausible raw records for one consumer with a controlled rate
//! of injected anomalies: broken timelines, balance drift between bureaus,
//! re-aged delinquencies, small medical collections, garbled fields.
//! Same seed and arguments ⇒ identical output.

use crate::{
    account::{AccountSnapshot, RawAccountRecord},
    error::DisputeResult,
    rng::{ReportRng, Stream},
    types::Bureau,
};
use chrono::{Duration, NaiveDate};

const CREDITORS: &[(&str, &str)] = &[
    ("Capital One", "Revolving"),
    ("Chase Card Services", "Revolving"),
    ("Discover Financial", "Revolving"),
    ("Synchrony Bank", "Revolving"),
    ("Ally Financial", "Installment"),
    ("Santander Consumer", "Installment"),
    ("Navient", "Student Loan"),
    ("Wells Fargo Home Mtg", "Mortgage"),
    ("Midland Credit Mgmt", "Collection"),
    ("Portfolio Recovery Associates", "Collection"),
    ("LVNV Funding", "Collection"),
    ("Regional Medical Center", "Medical Collection"),
];

const ANOMALY_RATE: f64 = 0.30;

/// Raw records for `obligations` debts, each reported by one to three bureaus.
pub fn generate_raw_report(seed: u64, obligations: usize, as_of: NaiveDate) -> Vec<RawAccountRecord> {
    let mut tradeline = ReportRng::new(seed, Stream::Tradeline);
    let mut bureau_rng = ReportRng::new(seed, Stream::Bureau);
    let mut anomaly = ReportRng::new(seed, Stream::Anomaly);
    let mut out = Vec::new();

    for n in 0..obligations {
        let (creditor, account_type) = *tradeline.pick(CREDITORS);
        let is_collection = account_type.contains("Collection");
        let opened = as_of - Duration::days(tradeline.range_i64(200, 4_000));
        let last_activity = opened + Duration::days(tradeline.range_i64(30, (as_of - opened).num_days()));
        let high_balance = (tradeline.pareto(300.0, 1.6) * 100.0).round() / 100.0;
        let balance = (high_balance * tradeline.next_f64() * 100.0).round() / 100.0;
        let dofd = if is_collection || tradeline.chance(0.15) {
            Some(last_activity)
        } else {
            None
        };
        let status = match (is_collection, dofd.is_some()) {
            (true, _)     => "Collection",
            (false, true) => *tradeline.pick(&["Charged off", "30 days late", "Settled"]),
            _             => "Current",
        };
        let digits = format!("{:04}", tradeline.next_u64_below(10_000));

        let bureau_count = bureau_rng.range_i64(1, 3) as usize;
        let skip = bureau_rng.next_u64_below(3) as usize;
        let bureaus: Vec<Bureau> = (0..3)
            .map(|i| Bureau::ALL[(skip + i) % 3])
            .take(bureau_count)
            .collect();

        for bureau in bureaus {
            let mut rec = RawAccountRecord {
                account_id: format!("acct-{n:04}-{bureau}"),
                bureau: bureau.as_str().to_string(),
                creditor_name: creditor.to_string(),
                account_number: Some(format!("XXXX{digits}")),
                account_type: Some(account_type.to_string()),
                status: Some(status.to_string()),
                balance: Some(format!("${balance:.2}")),
                high_balance: Some(format!("{high_balance:.2}")),
                date_opened: Some(opened.format("%Y-%m-%d").to_string()),
                last_activity: Some(last_activity.format("%m/%d/%Y").to_string()),
                first_delinquency: dofd.map(|d| d.format("%Y-%m-%d").to_string()),
                date_reported: Some(as_of.format("%Y-%m-%d").to_string()),
                ..RawAccountRecord::default()
            };

            if anomaly.chance(ANOMALY_RATE) {
                inject_anomaly(&mut rec, &mut anomaly, opened, balance);
            }
            out.push(rec);
        }
    }
    out
}

/// Parsed snapshots for `user_id`. Account ids are prefixed with the user
/// id so several users' reports can share one store.
pub fn generate_report(
    user_id: &str,
    seed: u64,
    obligations: usize,
    as_of: NaiveDate,
) -> DisputeResult<Vec<AccountSnapshot>> {
    generate_raw_report(seed, obligations, as_of)
        .iter()
        .map(|raw| {
            let mut snapshot = AccountSnapshot::from_raw(user_id, raw)?;
            snapshot.account_id = format!("{user_id}-{}", snapshot.account_id);
            Ok(snapshot)
        })
        .collect()
}

fn inject_anomaly(rec: &mut RawAccountRecord, rng: &mut ReportRng, opened: NaiveDate, balance: f64) {
    match rng.next_u64_below(6) {
        0 => {
            let before = opened - Duration::days(rng.range_i64(30, 400));
            rec.last_activity = Some(before.format("%Y-%m-%d").to_string());
        }
        1 => {
            let drift = balance * (0.1 + rng.next_f64()) + 25.0;
            rec.balance = Some(format!("{:.2}", balance + drift));
        }
        2 => {
            let parsed = rec
                .first_delinquency
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            if let Some(dofd) = parsed {
                let later = dofd + Duration::days(rng.range_i64(180, 900));
                rec.first_delinquency = Some(later.format("%Y-%m-%d").to_string());
            } else {
                rec.status = Some("Current; charged off".into());
            }
        }
        3 => {
            rec.date_closed = rec.date_opened.clone();
        }
        4 => {
            rec.creditor_name = "Regional Medical Center".into();
            rec.account_type = Some("Medical Collection".into());
            rec.status = Some("Collection".into());
            rec.balance = Some(format!("{:.2}", rng.range_i64(50, 480) as f64));
        }
        _ => {
            rec.date_opened = Some("13/45/2020".into());
            rec.balance = Some("n/a".into());
        }
    }
}
