//! Tally aggregation: the cached `upvotes`/`downvotes` columns on `items`
//! are only ever written from a fresh count of the `votes` ledger.

use rusqlite::{params, Connection, TransactionBehavior};

use crate::error::{AppError, Result};
use crate::models::Tally;

use super::Repository;

/// Count the ledger rows for `item_id` and write the result onto the item.
///
/// Callers run this inside the same write transaction as the ledger change,
/// so the count and the write see one snapshot.
pub(super) fn recompute(conn: &Connection, item_id: &str) -> rusqlite::Result<Tally> {
    let tally = conn.query_row(
        r#"SELECT COALESCE(SUM(is_up = 1), 0), COALESCE(SUM(is_up = 0), 0)
           FROM votes WHERE item_id = ?1"#,
        params![item_id],
        |row| {
            Ok(Tally {
                upvotes: row.get(0)?,
                downvotes: row.get(1)?,
            })
        },
    )?;

    conn.execute(
        "UPDATE items SET upvotes = ?1, downvotes = ?2 WHERE id = ?3",
        params![tally.upvotes, tally.downvotes, item_id],
    )?;

    Ok(tally)
}

impl Repository {
    /// Rebuild one item's cached tally from the ledger.
    pub async fn recompute_tally(&self, item_id: &str) -> Result<Tally> {
        let id = item_id.to_string();
        let tally = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1)",
                    params![id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Ok(None);
                }
                let tally = recompute(&tx, &id)?;
                tx.commit()?;
                Ok(Some(tally))
            })
            .await?;

        tally.ok_or_else(|| AppError::InvalidItem(item_id.to_string()))
    }
}
