use super::{encode_list, get_bureau, get_list, get_opt_timestamp, get_round, get_timestamp, DisputeStore};
use crate::{
    error::DisputeResult,
    round_manager::{DisputeLetter, DisputeRound},
    types::Round,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

fn round_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<DisputeRound> {
    Ok(DisputeRound {
        round_id: row.get(0)?,
        user_id: row.get(1)?,
        round: get_round(row, 2)?,
        disputed_item_ids: get_list(row, 3, "disputed_item_ids")?,
        created_at: get_timestamp(row, 4, "created_at")?,
        mailed_at: get_opt_timestamp(row, 5, "mailed_at")?,
    })
}

fn letter_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<DisputeLetter> {
    Ok(DisputeLetter {
        letter_id: row.get(0)?,
        round_id: row.get(1)?,
        user_id: row.get(2)?,
        round: get_round(row, 3)?,
        bureau: get_bureau(row, 4)?,
        template_ids: get_list(row, 5, "template_ids")?,
        disputed_item_ids: get_list(row, 6, "disputed_item_ids")?,
        created_at: get_timestamp(row, 7, "created_at")?,
    })
}

impl DisputeStore {
    // ── Dispute rounds ─────────────────────────────────────────

    pub fn insert_round(&self, r: &DisputeRound) -> DisputeResult<()> {
        self.conn.execute(
            "INSERT INTO dispute_round (
                round_id, user_id, round_number, disputed_item_ids, created_at, mailed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &r.round_id,
                &r.user_id,
                r.round.number() as i64,
                encode_list(&r.disputed_item_ids)?,
                r.created_at.to_rfc3339(),
                r.mailed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn get_round(&self, round_id: &str) -> DisputeResult<Option<DisputeRound>> {
        self.conn
            .query_row(
                "SELECT round_id, user_id, round_number, disputed_item_ids, created_at, mailed_at
                 FROM dispute_round WHERE round_id = ?1",
                params![round_id],
                round_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Ordered by round number, then creation time.
    pub fn rounds_for_user(&self, user_id: &str) -> DisputeResult<Vec<DisputeRound>> {
        let mut stmt = self.conn.prepare(
            "SELECT round_id, user_id, round_number, disputed_item_ids, created_at, mailed_at
             FROM dispute_round WHERE user_id = ?1
             ORDER BY round_number ASC, created_at ASC, round_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], round_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Returns false when no round has this id.
    pub fn set_round_mailed(&self, round_id: &str, mailed_at: DateTime<Utc>) -> DisputeResult<bool> {
        let changed = self.conn.execute(
            "UPDATE dispute_round SET mailed_at = ?1 WHERE round_id = ?2",
            params![mailed_at.to_rfc3339(), round_id],
        )?;
        Ok(changed > 0)
    }

    // ── Dispute letters ────────────────────────────────────────

    pub fn insert_letter(&self, l: &DisputeLetter) -> DisputeResult<()> {
        self.conn.execute(
            "INSERT INTO dispute_letter (
                letter_id, round_id, user_id, round_number, bureau,
                template_ids, disputed_item_ids, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &l.letter_id,
                &l.round_id,
                &l.user_id,
                l.round.number() as i64,
                l.bureau.as_str(),
                encode_list(&l.template_ids)?,
                encode_list(&l.disputed_item_ids)?,
                l.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn letters_for_round(&self, round_id: &str) -> DisputeResult<Vec<DisputeLetter>> {
        let mut stmt = self.conn.prepare(
            "SELECT letter_id, round_id, user_id, round_number, bureau,
                    template_ids, disputed_item_ids, created_at
             FROM dispute_letter WHERE round_id = ?1 ORDER BY bureau ASC",
        )?;
        let rows = stmt.query_map(params![round_id], letter_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every letter a user was sent in one round, newest first.
    pub fn letters_for_user_round(&self, user_id: &str, round: Round) -> DisputeResult<Vec<DisputeLetter>> {
        let mut stmt = self.conn.prepare(
            "SELECT letter_id, round_id, user_id, round_number, bureau,
                    template_ids, disputed_item_ids, created_at
             FROM dispute_letter WHERE user_id = ?1 AND round_number = ?2
             ORDER BY created_at DESC, letter_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id, round.number() as i64], letter_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
