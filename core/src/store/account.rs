use super::{encode_date, get_bureau, get_date, DisputeStore};
use crate::{account::AccountSnapshot, error::DisputeResult};
use rusqlite::{params, OptionalExtension};

const SNAPSHOT_COLUMNS: &str = "account_id, user_id, bureau, creditor_name, account_number,
    account_type, status, responsibility, reported_consumer_name, balance, high_balance,
    credit_limit, past_due, date_opened, date_closed, last_activity, first_delinquency,
    date_reported, is_medical";

fn snapshot_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountSnapshot> {
    Ok(AccountSnapshot {
        account_id: row.get(0)?,
        user_id: row.get(1)?,
        bureau: get_bureau(row, 2)?,
        creditor_name: row.get(3)?,
        account_number: row.get(4)?,
        account_type: row.get(5)?,
        status: row.get(6)?,
        responsibility: row.get(7)?,
        reported_consumer_name: row.get(8)?,
        balance: row.get(9)?,
        high_balance: row.get(10)?,
        credit_limit: row.get(11)?,
        past_due: row.get(12)?,
        date_opened: get_date(row, 13, "date_opened")?,
        date_closed: get_date(row, 14, "date_closed")?,
        last_activity: get_date(row, 15, "last_activity")?,
        first_delinquency: get_date(row, 16, "first_delinquency")?,
        date_reported: get_date(row, 17, "date_reported")?,
        is_medical: row.get::<_, i32>(18)? != 0,
    })
}

impl DisputeStore {
    // ── Account snapshots ──────────────────────────────────────

    /// Snapshots are immutable: inserting an id the user already has is an error.
    pub fn insert_account(&self, a: &AccountSnapshot) -> DisputeResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO account_snapshot ({SNAPSHOT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19)"
            ),
            params![
                &a.account_id,
                &a.user_id,
                a.bureau.as_str(),
                &a.creditor_name,
                a.account_number.as_deref(),
                a.account_type.as_deref(),
                a.status.as_deref(),
                a.responsibility.as_deref(),
                a.reported_consumer_name.as_deref(),
                a.balance,
                a.high_balance,
                a.credit_limit,
                a.past_due,
                encode_date(a.date_opened),
                encode_date(a.date_closed),
                encode_date(a.last_activity),
                encode_date(a.first_delinquency),
                encode_date(a.date_reported),
                if a.is_medical { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(())
    }

    /// All snapshots for a user in import order.
    pub fn accounts_for_user(&self, user_id: &str) -> DisputeResult<Vec<AccountSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM account_snapshot
             WHERE user_id = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], snapshot_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_account(
        &self,
        user_id: &str,
        account_id: &str,
    ) -> DisputeResult<Option<AccountSnapshot>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM account_snapshot
                     WHERE user_id = ?1 AND account_id = ?2"
                ),
                params![user_id, account_id],
                snapshot_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn count_accounts(&self, user_id: &str) -> DisputeResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM account_snapshot WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        account::{AccountSnapshot, RawAccountRecord},
        error::DisputeResult,
        store::DisputeStore,
        types::Bureau,
    };

    #[test]
    fn snapshot_survives_storage() -> DisputeResult<()> {
        let store = DisputeStore::in_memory()?;
        store.migrate()?;
        let raw = RawAccountRecord {
            account_id: "tu-1".into(),
            bureau: "TransUnion".into(),
            creditor_name: "Regional Medical Center".into(),
            account_type: Some("Medical Collection".into()),
            balance: Some("$240.00".into()),
            date_opened: Some("03/2021".into()),
            last_activity: Some("garbage".into()),
            ..RawAccountRecord::default()
        };
        let snap = AccountSnapshot::from_raw("u1", &raw)?;
        store.insert_account(&snap)?;

        let loaded = store.get_account("u1", "tu-1")?.expect("stored");
        assert_eq!(loaded, snap);
        assert_eq!(loaded.bureau, Bureau::TransUnion);
        assert!(loaded.last_activity.is_none());
        assert_eq!(store.count_accounts("u1")?, 1);
        assert!(store.insert_account(&snap).is_err());

        let other = AccountSnapshot::from_raw("u2", &raw)?;
        store.insert_account(&other)?;
        assert_eq!(store.get_account("u2", "tu-1")?.map(|a| a.user_id), Some("u2".to_string()));
        assert!(store.get_account("u3", "tu-1")?.is_none());
        assert_eq!(store.count_accounts("u1")?, 1);
        Ok(())
    }
}
