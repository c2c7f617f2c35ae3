//! dispute-runner: headless driver for the dispute strategy engine.
//!
//! Usage:
//!   dispute-runner --user u1 --synthetic 15 --seed 7
//!   dispute-runner --db disputes.db --user u1 --import report.json --mail-round 1
//!   dispute-runner --db disputes.db --user u1 --results round1.json
//!
//! Prints scored accounts, the three-round allocation, locks and round
//! readiness for the user as JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use dispute_core::{
    account::RawAccountRecord,
    account_scorer::ScoredAccount,
    config::EngineConfig,
    round_manager::{
        LockedAccount, OutcomeResult, RoundAllocation, RoundManager, RoundReadiness,
    },
    store::DisputeStore,
    synthetic::generate_report,
    types::{AccountId, Round},
};
use std::{env, fs};

/// One line of a `--results` file.
#[derive(serde::Deserialize)]
struct ResultRow {
    account_id: AccountId,
    result: String,
    #[serde(default = "first_round")]
    round: i64,
}

fn first_round() -> i64 {
    1
}

#[derive(serde::Serialize)]
struct Report {
    user_id: String,
    accounts: usize,
    scored: Vec<ScoredAccount>,
    allocation: RoundAllocation,
    locked: Vec<LockedAccount>,
    round2_readiness: RoundReadiness,
    round3_readiness: RoundReadiness,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let synthetic = parse_arg(&args, "--synthetic", 0usize);
    let mail_round = parse_arg(&args, "--mail-round", 0i64);
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let user_id = str_arg(&args, "--user").unwrap_or("demo-user");

    let config = match str_arg(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let store = DisputeStore::open(db).with_context(|| format!("opening {db}"))?;
    store.migrate()?;
    let mut manager = RoundManager::new(store, config);

    if let Some(path) = str_arg(&args, "--import") {
        let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let raws: Vec<RawAccountRecord> =
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
        manager.import_accounts(user_id, &raws)?;
    }

    let synthetic = if synthetic == 0 && manager.store.count_accounts(user_id)? == 0 {
        log::info!("user={user_id} runner: no accounts on file, generating a synthetic report");
        12
    } else {
        synthetic
    };
    if synthetic > 0 {
        let snapshots = generate_report(user_id, seed, synthetic, Utc::now().date_naive())?;
        manager.import_snapshots(user_id, &snapshots)?;
    }

    if let Some(path) = str_arg(&args, "--results") {
        apply_results(&mut manager, user_id, path)?;
    }

    if mail_round > 0 {
        let round = Round::from_number(mail_round)?;
        let allocation = manager.allocate_all_rounds(user_id)?;
        let targets = allocation.for_round(round);
        if targets.is_empty() {
            log::warn!("user={user_id} runner: round {round} has no targets, nothing mailed");
        } else {
            let recorded = manager.record_round(user_id, round, targets)?;
            manager.mark_round_mailed(&recorded.round_id, Utc::now())?;
        }
    }

    let report = Report {
        user_id: user_id.to_string(),
        accounts: manager.store.count_accounts(user_id)?,
        scored: manager.score_user(user_id)?,
        allocation: manager.allocate_all_rounds(user_id)?,
        locked: manager.get_locked_accounts(user_id)?,
        round2_readiness: manager.round_readiness(user_id, Round::Two)?,
        round3_readiness: manager.round_readiness(user_id, Round::Three)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Group rows by round and record each batch.
fn apply_results(manager: &mut RoundManager, user_id: &str, path: &str) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let rows: Vec<ResultRow> = serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    for row in &rows {
        Round::from_number(row.round).with_context(|| format!("result for {}", row.account_id))?;
    }

    for round in [Round::One, Round::Two, Round::Three] {
        let mut batch: Vec<(AccountId, OutcomeResult)> = Vec::new();
        for row in rows.iter().filter(|r| r.round == i64::from(round.number())) {
            match OutcomeResult::parse(&row.result) {
                Some(result) => batch.push((row.account_id.clone(), result)),
                None => log::warn!(
                    "user={user_id} runner: unknown result '{}' for {}",
                    row.result, row.account_id
                ),
            }
        }
        if batch.is_empty() {
            continue;
        }
        let summary = manager.update_after_round_results(user_id, round, &batch)?;
        log::info!(
            "user={user_id} runner: round {round} results recorded={} skipped={}",
            summary.recorded, summary.skipped
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
