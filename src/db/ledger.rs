//! The vote ledger: one row per (voter, item), flipped in place on a
//! direction change and deleted on removal. Every mutation recomputes the
//! item's tally before its transaction commits.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::{AppError, Result};
use crate::models::{Direction, VoteOutcome, VoteResult};

use super::repository::now_string;
use super::tally;
use super::Repository;

enum LedgerOutcome {
    Applied(VoteResult),
    UnknownVoter,
    UnknownItem,
}

impl Repository {
    /// Record `direction` for (voter, item).
    ///
    /// Casting the direction already on record succeeds without changing
    /// anything; casting the opposite one flips the existing row.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        item_id: &str,
        direction: Direction,
    ) -> Result<VoteResult> {
        let voter = voter_id.to_string();
        let item = item_id.to_string();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                if let Some(rejected) = check_participants(&tx, &voter, &item)? {
                    return Ok(rejected);
                }

                let existing: Option<bool> = tx
                    .query_row(
                        "SELECT is_up FROM votes WHERE voter_id = ?1 AND item_id = ?2",
                        params![voter, item],
                        |row| row.get(0),
                    )
                    .optional()?;

                let outcome = match existing.map(Direction::from_is_up) {
                    None => {
                        tx.execute(
                            r#"INSERT INTO votes (voter_id, item_id, is_up, voted_at)
                               VALUES (?1, ?2, ?3, ?4)"#,
                            params![voter, item, direction.is_up(), now_string()],
                        )?;
                        VoteOutcome::Created
                    }
                    Some(current) if current == direction => VoteOutcome::Unchanged,
                    Some(_) => {
                        tx.execute(
                            r#"UPDATE votes SET is_up = ?1, voted_at = ?2
                               WHERE voter_id = ?3 AND item_id = ?4"#,
                            params![direction.is_up(), now_string(), voter, item],
                        )?;
                        VoteOutcome::Switched
                    }
                };

                let tally = tally::recompute(&tx, &item)?;
                tx.commit()?;
                Ok(LedgerOutcome::Applied(VoteResult { outcome, tally }))
            })
            .await?;

        let result = resolve(outcome, item_id)?;
        tracing::debug!(
            "Vote {} by {} on {}: {:?}",
            direction,
            voter_id,
            item_id,
            result.outcome
        );
        Ok(result)
    }

    /// Delete the voter's record for the item. Missing records are a no-op.
    pub async fn remove_vote(&self, voter_id: &str, item_id: &str) -> Result<VoteResult> {
        let voter = voter_id.to_string();
        let item = item_id.to_string();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                if let Some(rejected) = check_participants(&tx, &voter, &item)? {
                    return Ok(rejected);
                }

                let deleted = tx.execute(
                    "DELETE FROM votes WHERE voter_id = ?1 AND item_id = ?2",
                    params![voter, item],
                )?;
                let outcome = if deleted == 0 {
                    VoteOutcome::NotFound
                } else {
                    VoteOutcome::Removed
                };

                let tally = tally::recompute(&tx, &item)?;
                tx.commit()?;
                Ok(LedgerOutcome::Applied(VoteResult { outcome, tally }))
            })
            .await?;

        resolve(outcome, item_id)
    }

    /// The direction on record for (voter, item), if any.
    #[cfg(test)]
    pub async fn get_vote(&self, voter_id: &str, item_id: &str) -> Result<Option<Direction>> {
        let voter = voter_id.to_string();
        let item = item_id.to_string();
        let vote = self
            .conn
            .call(move |conn| {
                let is_up: Option<bool> = conn
                    .query_row(
                        "SELECT is_up FROM votes WHERE voter_id = ?1 AND item_id = ?2",
                        params![voter, item],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(is_up.map(Direction::from_is_up))
            })
            .await?;
        Ok(vote)
    }
}

fn check_participants(
    conn: &Connection,
    voter_id: &str,
    item_id: &str,
) -> rusqlite::Result<Option<LedgerOutcome>> {
    let voter_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![voter_id],
        |row| row.get(0),
    )?;
    if !voter_exists {
        return Ok(Some(LedgerOutcome::UnknownVoter));
    }

    let item_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1)",
        params![item_id],
        |row| row.get(0),
    )?;
    if !item_exists {
        return Ok(Some(LedgerOutcome::UnknownItem));
    }

    Ok(None)
}

fn resolve(outcome: LedgerOutcome, item_id: &str) -> Result<VoteResult> {
    match outcome {
        LedgerOutcome::Applied(result) => Ok(result),
        LedgerOutcome::UnknownVoter => Err(AppError::Unauthenticated),
        LedgerOutcome::UnknownItem => Err(AppError::InvalidItem(item_id.to_string())),
    }
}
