//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The round manager calls store methods; it never executes SQL directly.

use crate::{
    error::{DisputeError, DisputeResult},
    event::{DisputeEvent, EventLogEntry},
    types::{Bureau, Round},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, types::Type, Connection, Row};

mod account;
mod outcome;
mod round;

pub struct DisputeStore {
    conn: Connection,
}

impl DisputeStore {
    pub fn open(path: &str) -> DisputeResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DisputeResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to call repeatedly.
    pub fn migrate(&self) -> DisputeResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_accounts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_rounds.sql"))?;
        Ok(())
    }

    /// Run `f` inside one transaction. Any error rolls everything back.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> DisputeResult<T>) -> DisputeResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> DisputeResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (user_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![&entry.user_id, &entry.event_type, &entry.payload, &entry.created_at],
        )?;
        Ok(())
    }

    pub fn record_event(&self, event: &DisputeEvent, at: DateTime<Utc>) -> DisputeResult<()> {
        self.append_event(&EventLogEntry::from_event(event, at)?)
    }

    pub fn events_for_user(&self, user_id: &str) -> DisputeResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, event_type, payload, created_at
             FROM event_log WHERE user_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(EventLogEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                event_type: row.get(2)?,
                payload: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_events(&self, user_id: &str) -> DisputeResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

// ── Column codecs ──────────────────────────────────────────────
// Decoding failures surface as rusqlite conversion errors so row mappers
// keep the `rusqlite::Result` signature.

fn corrupt(idx: usize, column: &'static str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(DisputeError::CorruptRecord { column, value: value.to_string() }),
    )
}

fn encode_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn get_date(row: &Row<'_>, idx: usize, column: &'static str) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| corrupt(idx, column, &raw)),
    }
}

fn parse_timestamp(idx: usize, column: &'static str, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| corrupt(idx, column, raw))
}

fn get_timestamp(row: &Row<'_>, idx: usize, column: &'static str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, column, &raw)
}

fn get_opt_timestamp(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_timestamp(idx, column, &raw))
        .transpose()
}

fn encode_list<T: serde::Serialize>(items: &[T]) -> DisputeResult<String> {
    Ok(serde_json::to_string(items)?)
}

fn get_list<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
) -> rusqlite::Result<Vec<T>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|_| corrupt(idx, column, &raw))
}

fn get_round(row: &Row<'_>, idx: usize) -> rusqlite::Result<Round> {
    let n: i64 = row.get(idx)?;
    u8::try_from(n)
        .ok()
        .and_then(|n| Round::try_from(n).ok())
        .ok_or_else(|| corrupt(idx, "round_number", &n.to_string()))
}

fn get_bureau(row: &Row<'_>, idx: usize) -> rusqlite::Result<Bureau> {
    let raw: String = row.get(idx)?;
    Bureau::parse(&raw).ok_or_else(|| corrupt(idx, "bureau", &raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_repeatable() -> DisputeResult<()> {
        let store = DisputeStore::in_memory()?;
        store.migrate()?;
        store.migrate()?;
        Ok(())
    }

    #[test]
    fn failed_transaction_rolls_back() -> DisputeResult<()> {
        let store = DisputeStore::in_memory()?;
        store.migrate()?;
        let event = DisputeEvent::AccountsImported { user_id: "u1".into(), count: 3 };
        let result: DisputeResult<()> = store.transaction(|s| {
            s.record_event(&event, Utc::now())?;
            Err(DisputeError::InvalidRound(9))
        });
        assert!(result.is_err());
        assert_eq!(store.count_events("u1")?, 0);

        store.transaction(|s| s.record_event(&event, Utc::now()))?;
        let events = store.events_for_user("u1")?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "accounts_imported");
        assert_eq!(events[0].decode()?, event);
        Ok(())
    }
}
