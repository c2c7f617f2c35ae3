//! Round manager. Allocates accounts to escalation rounds, records rounds
//! and letters, tracks bureau outcomes and enforces the dispute lock.
//!
//! RULE: allocation is read-only. `get_round{1,2,3}_targets` and
//! `allocate_all_rounds` never write and never emit events, so repeating
//! them against unchanged state yields identical results.
//!
//! All writes go through the store inside one transaction per call and
//! append to the event log. The optional rate limiter is consulted on
//! writes only.

use crate::{
    account::{AccountSnapshot, RawAccountRecord},
    account_scorer::{score_snapshots, ScoredAccount},
    clock::{Clock, SystemClock},
    config::{EngineConfig, MAX_TARGETS_PER_ROUND},
    conflict::ConflictType,
    error::{DisputeError, DisputeResult},
    event::DisputeEvent,
    rate_limit::RateLimiter,
    store::DisputeStore,
    template::{select_template, TemplateId},
    types::{AccountId, Bureau, Round, UserId},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
};
use uuid::Uuid;

// ── Records ────────────────────────────────────────────────────

/// A bureau's answer to one disputed item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeResult {
    Pending,
    Deleted,
    Verified,
    Updated,
    NoResponse,
}

impl OutcomeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeResult::Pending    => "pending",
            OutcomeResult::Deleted    => "deleted",
            OutcomeResult::Verified   => "verified",
            OutcomeResult::Updated    => "updated",
            OutcomeResult::NoResponse => "no_response",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending"     => Some(OutcomeResult::Pending),
            "deleted"     => Some(OutcomeResult::Deleted),
            "verified"    => Some(OutcomeResult::Verified),
            "updated"     => Some(OutcomeResult::Updated),
            "no_response" => Some(OutcomeResult::NoResponse),
            _ => None,
        }
    }

    /// Only these results are recorded by the outcome update.
    pub fn is_recordable(&self) -> bool {
        matches!(
            self,
            OutcomeResult::Deleted | OutcomeResult::Verified | OutcomeResult::NoResponse
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisputeRound {
    pub round_id: String,
    pub user_id: UserId,
    pub round: Round,
    pub disputed_item_ids: Vec<AccountId>,
    pub created_at: DateTime<Utc>,
    /// `None` until the letters are confirmed sent.
    pub mailed_at: Option<DateTime<Utc>>,
}

/// One bureau's letter within a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisputeLetter {
    pub letter_id: String,
    pub round_id: String,
    pub user_id: UserId,
    pub round: Round,
    pub bureau: Bureau,
    /// Distinct, in target order.
    pub template_ids: Vec<TemplateId>,
    pub disputed_item_ids: Vec<AccountId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisputeOutcome {
    pub outcome_id: String,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub round: Round,
    pub result: OutcomeResult,
    pub letter_id: String,
    pub recorded_at: DateTime<Utc>,
}

// ── Allocation output ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundTarget {
    pub account_id: AccountId,
    pub creditor_name: String,
    pub bureau: Bureau,
    pub template_id: TemplateId,
    pub error_types: Vec<ConflictType>,
    pub severity: u8,
    /// True when the account is here because of a previous round's outcome.
    pub escalated: bool,
}

impl RoundTarget {
    fn from_scored(s: &ScoredAccount, round: Round, escalated: bool) -> Self {
        let template_id = match round {
            Round::One => s.template_id,
            _ => select_template(round, &s.error_types, escalated),
        };
        Self {
            account_id: s.account_id.clone(),
            creditor_name: s.creditor_name.clone(),
            bureau: s.bureau,
            template_id,
            error_types: s.error_types.clone(),
            severity: s.severity,
            escalated,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoundAllocation {
    pub round1: Vec<RoundTarget>,
    pub round2: Vec<RoundTarget>,
    pub round3: Vec<RoundTarget>,
}

impl RoundAllocation {
    pub fn for_round(&self, round: Round) -> &[RoundTarget] {
        match round {
            Round::One   => &self.round1,
            Round::Two   => &self.round2,
            Round::Three => &self.round3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub recorded: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisputeEligibility {
    pub can_dispute: bool,
    pub reason: Option<String>,
    pub unlocks_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedAccount {
    pub account_id: AccountId,
    pub unlocks_at: DateTime<Utc>,
    /// Whole days, rounded up.
    pub days_remaining: i64,
}

/// Whether the next round may begin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundReadiness {
    Ready,
    PreviousNotRecorded { previous: Round },
    PreviousNotMailed { previous: Round, round_id: String },
    AwaitingResponse { previous: Round, opens_at: DateTime<Utc> },
}

impl RoundReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, RoundReadiness::Ready)
    }
}

// ── Allocation planning ────────────────────────────────────────

/// Severity descending, then account id ascending.
fn by_priority(a: &&ScoredAccount, b: &&ScoredAccount) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| a.account_id.cmp(&b.account_id))
}

/// Round 1: every round-1 account, one representative per duplicate group.
pub fn plan_round1(scored: &[ScoredAccount], cap: usize) -> Vec<RoundTarget> {
    let mut candidates: Vec<&ScoredAccount> =
        scored.iter().filter(|s| s.round == Round::One).collect();
    candidates.sort_by(by_priority);

    // Sorted first, so the first member seen is the group's highest severity.
    let mut seen_groups: HashSet<Vec<AccountId>> = HashSet::new();
    candidates
        .into_iter()
        .filter(|s| match &s.duplicate_group {
            Some(group) => seen_groups.insert(group.clone()),
            None => true,
        })
        .take(cap)
        .map(|s| RoundTarget::from_scored(s, Round::One, false))
        .collect()
}

/// Rounds 2 and 3: accounts scored for this round first, then accounts
/// escalated by the previous round's outcomes. Deleted accounts never return.
pub fn plan_escalation_round(
    round: Round,
    scored: &[ScoredAccount],
    outcomes: &[DisputeOutcome],
    cap: usize,
) -> Vec<RoundTarget> {
    let Some(previous) = round.previous() else {
        return plan_round1(scored, cap);
    };

    let deleted: HashSet<&str> = outcomes
        .iter()
        .filter(|o| o.result == OutcomeResult::Deleted)
        .map(|o| o.account_id.as_str())
        .collect();

    let mut fresh: Vec<&ScoredAccount> = scored
        .iter()
        .filter(|s| s.round == round && !deleted.contains(s.account_id.as_str()))
        .collect();
    fresh.sort_by(by_priority);

    let escalating: HashSet<&str> = outcomes
        .iter()
        .filter(|o| o.round == previous && escalates_into(round, o.result))
        .map(|o| o.account_id.as_str())
        .collect();
    let mut escalated: Vec<&ScoredAccount> = scored
        .iter()
        .filter(|s| {
            escalating.contains(s.account_id.as_str()) && !deleted.contains(s.account_id.as_str())
        })
        .collect();
    escalated.sort_by(by_priority);

    let mut seen: HashSet<AccountId> = HashSet::new();
    fresh
        .into_iter()
        .take(cap)
        .map(|s| RoundTarget::from_scored(s, round, false))
        .chain(
            escalated
                .into_iter()
                .take(cap)
                .map(|s| RoundTarget::from_scored(s, round, true)),
        )
        .filter(|t| seen.insert(t.account_id.clone()))
        .take(cap)
        .collect()
}

fn escalates_into(round: Round, result: OutcomeResult) -> bool {
    match round {
        Round::One   => false,
        Round::Two   => matches!(result, OutcomeResult::Verified | OutcomeResult::NoResponse),
        Round::Three => result == OutcomeResult::Verified,
    }
}

/// Whole days until `until`, rounded up. Zero once it has passed.
fn days_until(now: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let secs = (until - now).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 86_399) / 86_400
    }
}

// ── Manager ────────────────────────────────────────────────────

pub struct RoundManager {
    pub store: DisputeStore,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    limiter: Option<RateLimiter>,
}

impl RoundManager {
    /// Uses the system clock. A rate limiter is attached when enabled in config.
    pub fn new(store: DisputeStore, config: EngineConfig) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::from_config(&config.rate_limit));
        Self {
            store,
            config,
            clock: Box::new(SystemClock),
            limiter,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn lock_period(&self) -> Duration {
        Duration::days(self.config.lock_period_days)
    }

    fn throttle(&mut self, user_id: &str) -> DisputeResult<()> {
        let now = self.clock.now();
        match self.limiter.as_mut() {
            Some(limiter) => limiter.check(user_id, now),
            None => Ok(()),
        }
    }

    // ── Import ─────────────────────────────────────────────────

    /// Parse and store raw records for a user. All or nothing.
    pub fn import_accounts(&mut self, user_id: &str, raws: &[RawAccountRecord]) -> DisputeResult<usize> {
        let snapshots = raws
            .iter()
            .map(|raw| AccountSnapshot::from_raw(user_id, raw))
            .collect::<DisputeResult<Vec<_>>>()?;
        self.import_snapshots(user_id, &snapshots)
    }

    pub fn import_snapshots(&mut self, user_id: &str, snapshots: &[AccountSnapshot]) -> DisputeResult<usize> {
        self.throttle(user_id)?;
        let now = self.clock.now();
        self.store.transaction(|store| {
            for snapshot in snapshots {
                store.insert_account(snapshot)?;
            }
            store.record_event(
                &DisputeEvent::AccountsImported {
                    user_id: user_id.to_string(),
                    count: snapshots.len(),
                },
                now,
            )
        })?;
        log::info!("user={user_id} round_manager: imported {} snapshots", snapshots.len());
        Ok(snapshots.len())
    }

    // ── Read-only allocation ───────────────────────────────────

    /// Configs built in code skip `validate`, so the hard limit applies here too.
    fn target_cap(&self) -> usize {
        self.config.max_targets_per_round.min(MAX_TARGETS_PER_ROUND)
    }

    pub fn score_user(&self, user_id: &str) -> DisputeResult<Vec<ScoredAccount>> {
        let accounts = self.store.accounts_for_user(user_id)?;
        Ok(score_snapshots(&accounts, &self.config.detection))
    }

    pub fn get_round1_targets(&self, user_id: &str) -> DisputeResult<Vec<RoundTarget>> {
        let scored = self.score_user(user_id)?;
        Ok(plan_round1(&scored, self.target_cap()))
    }

    pub fn get_round2_targets(&self, user_id: &str) -> DisputeResult<Vec<RoundTarget>> {
        self.escalation_targets(user_id, Round::Two)
    }

    pub fn get_round3_targets(&self, user_id: &str) -> DisputeResult<Vec<RoundTarget>> {
        self.escalation_targets(user_id, Round::Three)
    }

    fn escalation_targets(&self, user_id: &str, round: Round) -> DisputeResult<Vec<RoundTarget>> {
        let scored = self.score_user(user_id)?;
        let outcomes = self.store.outcomes_for_user(user_id)?;
        Ok(plan_escalation_round(round, &scored, &outcomes, self.target_cap()))
    }

    /// All three rounds from one scoring pass.
    pub fn allocate_all_rounds(&self, user_id: &str) -> DisputeResult<RoundAllocation> {
        let scored = self.score_user(user_id)?;
        let outcomes = self.store.outcomes_for_user(user_id)?;
        let cap = self.target_cap();
        let allocation = RoundAllocation {
            round1: plan_round1(&scored, cap),
            round2: plan_escalation_round(Round::Two, &scored, &outcomes, cap),
            round3: plan_escalation_round(Round::Three, &scored, &outcomes, cap),
        };
        log::info!(
            "user={user_id} round_manager: allocated {}/{}/{} targets from {} accounts",
            allocation.round1.len(),
            allocation.round2.len(),
            allocation.round3.len(),
            scored.len()
        );
        Ok(allocation)
    }

    // ── Round recording ────────────────────────────────────────

    /// Persist a round and one letter per bureau for `targets`.
    ///
    /// Refused with `AccountLocked` if any target is still inside its lock
    /// period; the refusal is logged as an event and nothing else is written.
    pub fn record_round(
        &mut self,
        user_id: &str,
        round: Round,
        targets: &[RoundTarget],
    ) -> DisputeResult<DisputeRound> {
        self.throttle(user_id)?;
        let now = self.clock.now();

        for target in targets {
            let eligibility = self.can_dispute_account_at(user_id, &target.account_id, now)?;
            if let (false, Some(unlocks_at)) = (eligibility.can_dispute, eligibility.unlocks_at) {
                log::warn!(
                    "user={user_id} round_manager: refused round {round}, {} locked until {unlocks_at}",
                    target.account_id
                );
                self.store.record_event(
                    &DisputeEvent::DisputeRefused {
                        user_id: user_id.to_string(),
                        account_id: target.account_id.clone(),
                        round,
                        unlocks_at,
                    },
                    now,
                )?;
                return Err(DisputeError::AccountLocked {
                    account_id: target.account_id.clone(),
                    unlocks_at,
                });
            }
        }

        let dispute_round = DisputeRound {
            round_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            round,
            disputed_item_ids: targets.iter().map(|t| t.account_id.clone()).collect(),
            created_at: now,
            mailed_at: None,
        };

        let mut by_bureau: BTreeMap<Bureau, Vec<&RoundTarget>> = BTreeMap::new();
        for target in targets {
            by_bureau.entry(target.bureau).or_default().push(target);
        }
        let letters: Vec<DisputeLetter> = by_bureau
            .into_iter()
            .map(|(bureau, items)| {
                let mut template_ids: Vec<TemplateId> = Vec::new();
                for t in &items {
                    if !template_ids.contains(&t.template_id) {
                        template_ids.push(t.template_id);
                    }
                }
                DisputeLetter {
                    letter_id: Uuid::new_v4().to_string(),
                    round_id: dispute_round.round_id.clone(),
                    user_id: user_id.to_string(),
                    round,
                    bureau,
                    template_ids,
                    disputed_item_ids: items.iter().map(|t| t.account_id.clone()).collect(),
                    created_at: now,
                }
            })
            .collect();

        self.store.transaction(|store| {
            store.insert_round(&dispute_round)?;
            for letter in &letters {
                store.insert_letter(letter)?;
            }
            store.record_event(
                &DisputeEvent::RoundRecorded {
                    user_id: user_id.to_string(),
                    round_id: dispute_round.round_id.clone(),
                    round,
                    account_ids: dispute_round.disputed_item_ids.clone(),
                    letters: letters.len(),
                },
                now,
            )
        })?;

        log::info!(
            "user={user_id} round_manager: recorded round {round} ({} items, {} letters)",
            dispute_round.disputed_item_ids.len(),
            letters.len()
        );
        Ok(dispute_round)
    }

    /// Confirm a round's letters were sent. Starts the lock period.
    pub fn mark_round_mailed(&mut self, round_id: &str, mailed_at: DateTime<Utc>) -> DisputeResult<DisputeRound> {
        let mut dispute_round = self
            .store
            .get_round(round_id)?
            .ok_or_else(|| DisputeError::RoundNotFound { round_id: round_id.to_string() })?;
        self.throttle(&dispute_round.user_id)?;
        let now = self.clock.now();

        self.store.transaction(|store| {
            store.set_round_mailed(round_id, mailed_at)?;
            store.record_event(
                &DisputeEvent::RoundMailed {
                    user_id: dispute_round.user_id.clone(),
                    round_id: round_id.to_string(),
                    round: dispute_round.round,
                    mailed_at,
                },
                now,
            )
        })?;

        log::info!(
            "user={} round_manager: round {} mailed at {mailed_at}",
            dispute_round.user_id, dispute_round.round
        );
        dispute_round.mailed_at = Some(mailed_at);
        Ok(dispute_round)
    }

    // ── Outcomes ───────────────────────────────────────────────

    pub fn update_after_round1_results(
        &mut self,
        user_id: &str,
        results: &[(AccountId, OutcomeResult)],
    ) -> DisputeResult<OutcomeSummary> {
        self.update_after_round_results(user_id, Round::One, results)
    }

    /// Record bureau answers for one round.
    ///
    /// Results other than deleted, verified or no_response are skipped, as
    /// is any account that no letter in that round disputed. Re-recording an
    /// account replaces its previous result.
    pub fn update_after_round_results(
        &mut self,
        user_id: &str,
        round: Round,
        results: &[(AccountId, OutcomeResult)],
    ) -> DisputeResult<OutcomeSummary> {
        self.throttle(user_id)?;
        let now = self.clock.now();
        let letters = self.store.letters_for_user_round(user_id, round)?;

        let summary = self.store.transaction(|store| {
            let mut summary = OutcomeSummary::default();
            for (account_id, result) in results {
                let letter = letters
                    .iter()
                    .find(|l| l.disputed_item_ids.iter().any(|id| id == account_id));

                let skip_reason = match (result.is_recordable(), letter) {
                    (false, _) => Some(format!("result {} is not recorded", result.as_str())),
                    (true, None) => Some(format!("no round {round} letter disputes this account")),
                    (true, Some(_)) => None,
                };
                if let Some(reason) = skip_reason {
                    log::warn!("user={user_id} round_manager: skipped outcome for {account_id}: {reason}");
                    store.record_event(
                        &DisputeEvent::OutcomeSkipped {
                            user_id: user_id.to_string(),
                            account_id: account_id.clone(),
                            round,
                            reason,
                        },
                        now,
                    )?;
                    summary.skipped += 1;
                    continue;
                }
                let Some(letter) = letter else { continue };

                let existing = store.find_outcome(user_id, account_id, round)?;
                let created = existing.is_none();
                let outcome = DisputeOutcome {
                    outcome_id: existing
                        .map(|o| o.outcome_id)
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    user_id: user_id.to_string(),
                    account_id: account_id.clone(),
                    round,
                    result: *result,
                    letter_id: letter.letter_id.clone(),
                    recorded_at: now,
                };
                if created {
                    store.insert_outcome(&outcome)?;
                } else {
                    store.update_outcome(&outcome)?;
                }
                store.record_event(
                    &DisputeEvent::OutcomeRecorded {
                        user_id: user_id.to_string(),
                        account_id: account_id.clone(),
                        round,
                        result: *result,
                        letter_id: letter.letter_id.clone(),
                        created,
                    },
                    now,
                )?;
                summary.recorded += 1;
            }
            Ok(summary)
        })?;

        log::info!(
            "user={user_id} round_manager: round {round} outcomes recorded={} skipped={}",
            summary.recorded, summary.skipped
        );
        Ok(summary)
    }

    // ── Locks ──────────────────────────────────────────────────

    /// Latest unlock time among mailed rounds listing each account, keeping
    /// only those still in the future.
    fn active_locks(&self, user_id: &str, now: DateTime<Utc>) -> DisputeResult<BTreeMap<AccountId, DateTime<Utc>>> {
        let lock = self.lock_period();
        let mut locks: BTreeMap<AccountId, DateTime<Utc>> = BTreeMap::new();
        for r in self.store.rounds_for_user(user_id)? {
            let Some(mailed_at) = r.mailed_at else { continue };
            let unlocks_at = mailed_at + lock;
            if unlocks_at <= now {
                continue;
            }
            for id in r.disputed_item_ids {
                let entry = locks.entry(id).or_insert(unlocks_at);
                if unlocks_at > *entry {
                    *entry = unlocks_at;
                }
            }
        }
        Ok(locks)
    }

    pub fn can_dispute_account(&self, user_id: &str, account_id: &str) -> DisputeResult<DisputeEligibility> {
        self.can_dispute_account_at(user_id, account_id, self.clock.now())
    }

    pub fn can_dispute_account_at(
        &self,
        user_id: &str,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> DisputeResult<DisputeEligibility> {
        let locks = self.active_locks(user_id, now)?;
        Ok(match locks.get(account_id) {
            Some(unlocks_at) => DisputeEligibility {
                can_dispute: false,
                reason: Some(format!(
                    "disputed within the last {} days; locked for {} more day(s)",
                    self.config.lock_period_days,
                    days_until(now, *unlocks_at)
                )),
                unlocks_at: Some(*unlocks_at),
            },
            None => DisputeEligibility {
                can_dispute: true,
                reason: None,
                unlocks_at: None,
            },
        })
    }

    pub fn get_locked_accounts(&self, user_id: &str) -> DisputeResult<Vec<LockedAccount>> {
        self.get_locked_accounts_at(user_id, self.clock.now())
    }

    /// Sorted by account id.
    pub fn get_locked_accounts_at(&self, user_id: &str, now: DateTime<Utc>) -> DisputeResult<Vec<LockedAccount>> {
        Ok(self
            .active_locks(user_id, now)?
            .into_iter()
            .map(|(account_id, unlocks_at)| LockedAccount {
                account_id,
                unlocks_at,
                days_remaining: days_until(now, unlocks_at),
            })
            .collect())
    }

    // ── Readiness ──────────────────────────────────────────────

    pub fn round_readiness(&self, user_id: &str, round: Round) -> DisputeResult<RoundReadiness> {
        self.round_readiness_at(user_id, round, self.clock.now())
    }

    /// Round N+1 may begin once round N was recorded, mailed, and the
    /// response window has elapsed. The latest round N record decides.
    pub fn round_readiness_at(
        &self,
        user_id: &str,
        round: Round,
        now: DateTime<Utc>,
    ) -> DisputeResult<RoundReadiness> {
        let Some(previous) = round.previous() else {
            return Ok(RoundReadiness::Ready);
        };
        let latest = self
            .store
            .rounds_for_user(user_id)?
            .into_iter()
            .filter(|r| r.round == previous)
            .last();

        Ok(match latest {
            None => RoundReadiness::PreviousNotRecorded { previous },
            Some(r) => match r.mailed_at {
                None => RoundReadiness::PreviousNotMailed { previous, round_id: r.round_id },
                Some(mailed_at) => {
                    let opens_at = mailed_at + Duration::days(self.config.response_window_days);
                    if now < opens_at {
                        RoundReadiness::AwaitingResponse { previous, opens_at }
                    } else {
                        RoundReadiness::Ready
                    }
                }
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, round: Round, severity: u8) -> ScoredAccount {
        ScoredAccount {
            account_id: id.into(),
            creditor_name: format!("Creditor {id}"),
            bureau: Bureau::Experian,
            severity,
            round,
            error_types: vec![ConflictType::BalanceMismatch],
            template_id: TemplateId::FactualDispute,
            is_duplicate: false,
            duplicate_group: None,
        }
    }

    fn outcome(id: &str, round: Round, result: OutcomeResult) -> DisputeOutcome {
        DisputeOutcome {
            outcome_id: format!("o-{id}"),
            user_id: "u1".into(),
            account_id: id.into(),
            round,
            result,
            letter_id: "l".into(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn round1_sorts_by_severity_then_id() {
        let accounts = vec![
            scored("c", Round::One, 6),
            scored("b", Round::One, 9),
            scored("a", Round::One, 6),
            scored("z", Round::Two, 10),
        ];
        let ids: Vec<_> = plan_round1(&accounts, 7).into_iter().map(|t| t.account_id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn round1_collapses_duplicate_groups() {
        let group = vec!["d1".to_string(), "d2".to_string(), "d3".to_string()];
        let mut accounts: Vec<ScoredAccount> = ["d1", "d2", "d3"]
            .iter()
            .map(|id| {
                let mut s = scored(id, Round::One, 8);
                s.is_duplicate = true;
                s.duplicate_group = Some(group.clone());
                s
            })
            .collect();
        accounts[2].severity = 10;
        accounts.push(scored("x", Round::One, 9));

        let ids: Vec<_> = plan_round1(&accounts, 7).into_iter().map(|t| t.account_id).collect();
        assert_eq!(ids, vec!["d3", "x"]);
    }

    #[test]
    fn allocations_respect_the_cap() {
        let accounts: Vec<_> = (0..12).map(|i| scored(&format!("a{i:02}"), Round::One, 5)).collect();
        assert_eq!(plan_round1(&accounts, 7).len(), 7);
    }

    #[test]
    fn round2_puts_new_accounts_before_escalations() {
        let accounts = vec![
            scored("new", Round::Two, 6),
            scored("ver", Round::One, 9),
            scored("quiet", Round::One, 7),
            scored("gone", Round::One, 10),
        ];
        let outcomes = vec![
            outcome("ver", Round::One, OutcomeResult::Verified),
            outcome("quiet", Round::One, OutcomeResult::NoResponse),
            outcome("gone", Round::One, OutcomeResult::Deleted),
        ];
        let targets = plan_escalation_round(Round::Two, &accounts, &outcomes, 7);
        let summary: Vec<_> = targets
            .iter()
            .map(|t| (t.account_id.as_str(), t.template_id.as_str(), t.escalated))
            .collect();
        assert_eq!(
            summary,
            vec![("new", "2A", false), ("ver", "2C", true), ("quiet", "2C", true)]
        );
    }

    #[test]
    fn round3_escalates_only_verified() {
        let accounts = vec![
            scored("ver", Round::One, 9),
            scored("quiet", Round::One, 7),
            scored("old", Round::Three, 5),
        ];
        let outcomes = vec![
            outcome("ver", Round::Two, OutcomeResult::Verified),
            outcome("quiet", Round::Two, OutcomeResult::NoResponse),
        ];
        let targets = plan_escalation_round(Round::Three, &accounts, &outcomes, 7);
        let summary: Vec<_> = targets
            .iter()
            .map(|t| (t.account_id.as_str(), t.template_id.as_str()))
            .collect();
        assert_eq!(summary, vec![("old", "3A"), ("ver", "3B-2")]);
    }

    #[test]
    fn deleted_in_any_round_is_excluded_later() {
        let accounts = vec![scored("a", Round::Three, 5)];
        let outcomes = vec![outcome("a", Round::One, OutcomeResult::Deleted)];
        assert!(plan_escalation_round(Round::Three, &accounts, &outcomes, 7).is_empty());
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = Utc::now();
        assert_eq!(days_until(now, now + Duration::hours(1)), 1);
        assert_eq!(days_until(now, now + Duration::days(2)), 2);
        assert_eq!(days_until(now, now + Duration::days(2) + Duration::seconds(1)), 3);
        assert_eq!(days_until(now, now - Duration::days(1)), 0);
    }

    #[test]
    fn outcome_results_parse_leniently() {
        assert_eq!(OutcomeResult::parse("No Response"), Some(OutcomeResult::NoResponse));
        assert_eq!(OutcomeResult::parse("VERIFIED"), Some(OutcomeResult::Verified));
        assert_eq!(OutcomeResult::parse("lost"), None);
        assert!(!OutcomeResult::Updated.is_recordable());
    }
}
