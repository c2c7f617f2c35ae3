use super::{get_round, get_timestamp, DisputeStore};
use crate::{
    error::DisputeResult,
    round_manager::{DisputeOutcome, OutcomeResult},
    types::Round,
};
use rusqlite::{params, OptionalExtension};

fn outcome_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<DisputeOutcome> {
    let raw_result: String = row.get(4)?;
    let result = OutcomeResult::parse(&raw_result)
        .ok_or_else(|| super::corrupt(4, "result", &raw_result))?;
    Ok(DisputeOutcome {
        outcome_id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        round: get_round(row, 3)?,
        result,
        letter_id: row.get(5)?,
        recorded_at: get_timestamp(row, 6, "recorded_at")?,
    })
}

impl DisputeStore {
    // ── Dispute outcomes ───────────────────────────────────────

    pub fn find_outcome(
        &self,
        user_id: &str,
        account_id: &str,
        round: Round,
    ) -> DisputeResult<Option<DisputeOutcome>> {
        self.conn
            .query_row(
                "SELECT outcome_id, user_id, account_id, round_number, result, letter_id, recorded_at
                 FROM dispute_outcome
                 WHERE user_id = ?1 AND account_id = ?2 AND round_number = ?3",
                params![user_id, account_id, round.number() as i64],
                outcome_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_outcome(&self, o: &DisputeOutcome) -> DisputeResult<()> {
        self.conn.execute(
            "INSERT INTO dispute_outcome (
                outcome_id, user_id, account_id, round_number, result, letter_id, recorded_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &o.outcome_id,
                &o.user_id,
                &o.account_id,
                o.round.number() as i64,
                o.result.as_str(),
                &o.letter_id,
                o.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Overwrites result, letter and timestamp; the outcome id is kept.
    pub fn update_outcome(&self, o: &DisputeOutcome) -> DisputeResult<()> {
        self.conn.execute(
            "UPDATE dispute_outcome SET result = ?1, letter_id = ?2, recorded_at = ?3
             WHERE outcome_id = ?4",
            params![o.result.as_str(), &o.letter_id, o.recorded_at.to_rfc3339(), &o.outcome_id],
        )?;
        Ok(())
    }

    pub fn outcomes_for_user(&self, user_id: &str) -> DisputeResult<Vec<DisputeOutcome>> {
        let mut stmt = self.conn.prepare(
            "SELECT outcome_id, user_id, account_id, round_number, result, letter_id, recorded_at
             FROM dispute_outcome WHERE user_id = ?1
             ORDER BY round_number ASC, account_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], outcome_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
