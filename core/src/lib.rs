//! Dispute strategy engine.
//!
//! Detects inconsistencies across tri-bureau account snapshots, scores
//! each account, and schedules dispute correspondence into three
//! escalation rounds with a lock period between disputes of one item.

pub mod account;
pub mod account_scorer;
pub mod cache;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod conflict_detector;
pub mod duplicate_finder;
pub mod error;
pub mod event;
pub mod rate_limit;
pub mod rng;
pub mod round_manager;
pub mod store;
pub mod synthetic;
pub mod template;
pub mod types;

pub use account_scorer::score_accounts;
pub use error::{DisputeError, DisputeResult};
pub use round_manager::RoundManager;
