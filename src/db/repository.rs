use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Direction, Item, NewItem, User};

use super::schema::SCHEMA;

pub(super) const ITEM_COLUMNS: &str =
    "id, owner_id, url, extracted_id, kind, title, small_img, big_img, upvotes, downvotes, created_at";

const CONTENT_KIND: &str = "youtube";

pub struct Repository {
    pub(super) conn: Connection,
}

enum InsertOutcome {
    Inserted(Item),
    Duplicate,
    UnknownOwner,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    /// Insert the user on first sign-in, return the existing row afterwards.
    pub async fn upsert_user(&self, email: String, provider: String) -> Result<User> {
        let user = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, email, provider, created_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(email) DO NOTHING",
                    params![Uuid::new_v4().to_string(), email, provider, now_string()],
                )?;
                let user = conn.query_row(
                    "SELECT id, email, provider, created_at FROM users WHERE email = ?1",
                    params![email],
                    user_from_row,
                )?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, email, provider, created_at FROM users WHERE id = ?1",
                        params![id],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    // Item operations

    /// Insert a new item unless the owner already queued the same content.
    ///
    /// The existence check and the insert share one IMMEDIATE transaction;
    /// the UNIQUE(owner_id, extracted_id) constraint is the backstop when a
    /// second connection races in between.
    pub async fn insert_item(&self, item: NewItem) -> Result<Item> {
        let extracted_id = item.extracted_id.clone();
        let owner_id = item.owner_id.clone();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let owner_exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                    params![item.owner_id],
                    |row| row.get(0),
                )?;
                if !owner_exists {
                    return Ok(InsertOutcome::UnknownOwner);
                }

                let already_queued: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM items WHERE owner_id = ?1 AND extracted_id = ?2)",
                    params![item.owner_id, item.extracted_id],
                    |row| row.get(0),
                )?;
                if already_queued {
                    return Ok(InsertOutcome::Duplicate);
                }

                let created = Item {
                    id: Uuid::new_v4().to_string(),
                    owner_id: item.owner_id,
                    url: item.url,
                    extracted_id: item.extracted_id,
                    kind: CONTENT_KIND.to_string(),
                    title: item.metadata.title,
                    small_img: item.metadata.small_img,
                    big_img: item.metadata.big_img,
                    upvotes: 0,
                    downvotes: 0,
                    created_at: Utc::now(),
                };

                let inserted = tx.execute(
                    r#"INSERT INTO items (id, owner_id, url, extracted_id, kind, title, small_img, big_img, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                    params![
                        created.id,
                        created.owner_id,
                        created.url,
                        created.extracted_id,
                        created.kind,
                        created.title,
                        created.small_img,
                        created.big_img,
                        format_datetime(&created.created_at),
                    ],
                );

                match inserted {
                    Ok(_) => {}
                    Err(e) if is_unique_violation(&e) => return Ok(InsertOutcome::Duplicate),
                    Err(e) => return Err(e.into()),
                }

                tx.commit()?;
                Ok(InsertOutcome::Inserted(created))
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted(item) => {
                tracing::debug!("Queued {} for {}", item.extracted_id, item.owner_id);
                Ok(item)
            }
            InsertOutcome::Duplicate => Err(AppError::Duplicate(extracted_id)),
            InsertOutcome::UnknownOwner => {
                Err(AppError::Validation(format!("Unknown creator: {}", owner_id)))
            }
        }
    }

    /// Whether `owner_id` already has an item for this content reference.
    pub async fn content_queued(&self, owner_id: &str, extracted_id: &str) -> Result<bool> {
        let owner_id = owner_id.to_string();
        let extracted_id = extracted_id.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM items WHERE owner_id = ?1 AND extracted_id = ?2)",
                    params![owner_id, extracted_id],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    #[cfg(test)]
    pub async fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let id = id.to_string();
        let item = self
            .conn
            .call(move |conn| {
                let item = conn
                    .query_row(
                        &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
                        params![id],
                        item_from_row,
                    )
                    .optional()?;
                Ok(item)
            })
            .await?;
        Ok(item)
    }

    /// Every item in one collection, in storage order. Ranking happens in the caller.
    pub async fn get_items_for_owner(&self, owner_id: &str) -> Result<Vec<Item>> {
        let owner_id = owner_id.to_string();
        let items = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM items WHERE owner_id = ?1",
                    ITEM_COLUMNS
                ))?;
                let items = stmt
                    .query_map(params![owner_id], item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    /// The viewer's own votes across one collection, keyed by item id.
    pub async fn get_viewer_votes(
        &self,
        viewer_id: &str,
        owner_id: &str,
    ) -> Result<HashMap<String, Direction>> {
        let viewer_id = viewer_id.to_string();
        let owner_id = owner_id.to_string();
        let votes = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT v.item_id, v.is_up
                       FROM votes v
                       JOIN items i ON v.item_id = i.id
                       WHERE v.voter_id = ?1 AND i.owner_id = ?2"#,
                )?;
                let votes = stmt
                    .query_map(params![viewer_id, owner_id], |row| {
                        let item_id: String = row.get(0)?;
                        let is_up: bool = row.get(1)?;
                        Ok((item_id, Direction::from_is_up(is_up)))
                    })?
                    .collect::<std::result::Result<HashMap<_, _>, _>>()?;
                Ok(votes)
            })
            .await?;
        Ok(votes)
    }
}

pub(super) fn now_string() -> String {
    format_datetime(&Utc::now())
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.123456789Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        provider: row.get(2)?,
        created_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

pub(super) fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        url: row.get(2)?,
        extracted_id: row.get(3)?,
        kind: row.get(4)?,
        title: row.get(5)?,
        small_img: row.get(6)?,
        big_img: row.get(7)?,
        upvotes: row.get(8)?,
        downvotes: row.get(9)?,
        created_at: row
            .get::<_, String>(10)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::new_item;

    #[tokio::test]
    async fn upsert_user_is_idempotent_per_email() {
        let repo = Repository::in_memory().await.unwrap();
        let first = repo
            .upsert_user("a@example.com".into(), "google".into())
            .await
            .unwrap();
        let second = repo
            .upsert_user("a@example.com".into(), "google".into())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(repo.get_user(&first.id).await.unwrap(), Some(first));
        assert!(repo.get_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected_per_owner() {
        let repo = Repository::in_memory().await.unwrap();
        let u1 = repo.upsert_user("u1@example.com".into(), "google".into()).await.unwrap();
        let u2 = repo.upsert_user("u2@example.com".into(), "google".into()).await.unwrap();

        repo.insert_item(new_item(&u1.id, "abc123abc12")).await.unwrap();
        let err = repo.insert_item(new_item(&u1.id, "abc123abc12")).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(ref id) if id == "abc123abc12"));

        repo.insert_item(new_item(&u2.id, "abc123abc12")).await.unwrap();
        assert!(repo.content_queued(&u1.id, "abc123abc12").await.unwrap());
        assert!(!repo.content_queued(&u1.id, "zzzzzzzzzzz").await.unwrap());
        assert_eq!(repo.get_items_for_owner(&u1.id).await.unwrap().len(), 1);
        assert_eq!(repo.get_items_for_owner(&u2.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_owner_is_a_validation_error() {
        let repo = Repository::in_memory().await.unwrap();
        let err = repo.insert_item(new_item("ghost", "abc123abc12")).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn inserted_item_reads_back_with_zero_tally() {
        let repo = Repository::in_memory().await.unwrap();
        let owner = repo.upsert_user("o@example.com".into(), "google".into()).await.unwrap();
        let item = repo.insert_item(new_item(&owner.id, "dQw4w9WgXcQ")).await.unwrap();

        let stored = repo.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored, item);
        assert_eq!(stored.kind, "youtube");
        assert_eq!((stored.upvotes, stored.downvotes), (0, 0));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let path = path.to_str().unwrap();

        let owner_id = {
            let repo = Repository::new(path).await.unwrap();
            let owner = repo.upsert_user("o@example.com".into(), "google".into()).await.unwrap();
            repo.insert_item(new_item(&owner.id, "dQw4w9WgXcQ")).await.unwrap();
            owner.id
        };

        let repo = Repository::new(path).await.unwrap();
        let items = repo.get_items_for_owner(&owner_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].extracted_id, "dQw4w9WgXcQ");
    }
}
