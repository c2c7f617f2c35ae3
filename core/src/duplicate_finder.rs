//! Duplicate finder: groups snapshots that look like one obligation
//! reported more than once.
//!
//! The key requires exact open-date and balance equality; records with no
//! open date are never grouped.

use crate::{
    account::{normalize_name, AccountSnapshot},
    types::AccountId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized creditor names are truncated to this many characters.
pub const NAME_KEY_LENGTH: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: String,
    pub account_ids: Vec<AccountId>,
}

impl DuplicateGroup {
    pub fn contains(&self, account_id: &str) -> bool {
        self.account_ids.iter().any(|id| id == account_id)
    }
}

/// `normalize(name)[..20] | date_opened | balance`, or `None` when the
/// snapshot has no open date and therefore cannot be matched exactly.
pub fn duplicate_key(account: &AccountSnapshot) -> Option<String> {
    let opened = account.date_opened?;
    let name: String = normalize_name(&account.creditor_name)
        .chars()
        .take(NAME_KEY_LENGTH)
        .collect();
    if name.is_empty() {
        return None;
    }
    Some(format!("{name}|{}|{:.2}", opened.format("%Y-%m-%d"), account.balance))
}

/// Groups with two or more members, ordered by key. Members keep input order.
pub fn find_duplicate_groups(accounts: &[AccountSnapshot]) -> Vec<DuplicateGroup> {
    let mut by_key: BTreeMap<String, Vec<AccountId>> = BTreeMap::new();
    for account in accounts {
        if let Some(key) = duplicate_key(account) {
            by_key.entry(key).or_default().push(account.account_id.clone());
        }
    }

    let groups: Vec<DuplicateGroup> = by_key
        .into_iter()
        .filter(|(_, ids)| ids.len() >= 2)
        .map(|(key, account_ids)| DuplicateGroup { key, account_ids })
        .collect();

    if !groups.is_empty() {
        log::debug!("duplicate_finder: {} groups among {} accounts", groups.len(), accounts.len());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountSnapshot, RawAccountRecord};

    fn snap(id: &str, bureau: &str, name: &str, opened: &str, balance: &str) -> AccountSnapshot {
        let raw = RawAccountRecord {
            account_id: id.into(),
            bureau: bureau.into(),
            creditor_name: name.into(),
            date_opened: Some(opened.into()),
            balance: Some(balance.into()),
            ..RawAccountRecord::default()
        };
        AccountSnapshot::from_raw("u1", &raw).unwrap()
    }

    #[test]
    fn identical_reports_group_together() {
        let accounts = vec![
            snap("a", "equifax", "Midland Credit Mgmt", "2020-05-01", "$1,200.00"),
            snap("b", "experian", "MIDLAND CREDIT MGMT.", "05/01/2020", "1200"),
            snap("c", "experian", "Capital One", "2020-05-01", "1200"),
        ];
        let groups = find_duplicate_groups(&accounts);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].account_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(groups[0].key, "midlandcreditmgmt|2020-05-01|1200.00");
    }

    #[test]
    fn different_balance_is_not_a_duplicate() {
        let accounts = vec![
            snap("a", "equifax", "Midland", "2020-05-01", "1200"),
            snap("b", "experian", "Midland", "2020-05-01", "1201"),
        ];
        assert!(find_duplicate_groups(&accounts).is_empty());
    }

    #[test]
    fn long_names_are_truncated_before_comparison() {
        let accounts = vec![
            snap("a", "equifax", "Portfolio Recovery Associates LLC", "2019-01-01", "50"),
            snap("b", "trans union", "Portfolio Recovery Associates Inc", "2019-01-01", "50"),
        ];
        assert_eq!(find_duplicate_groups(&accounts).len(), 1);
    }

    #[test]
    fn missing_open_date_never_groups() {
        let accounts = vec![
            snap("a", "equifax", "Midland", "unknown", "0"),
            snap("b", "experian", "Midland", "", "0"),
        ];
        assert!(find_duplicate_groups(&accounts).is_empty());
    }
}
