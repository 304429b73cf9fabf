//! mien-store — SQLite-backed identity store.
//!
//! Implements the relational contract from `mien_core::identity` over a
//! single `people` table. Timestamps are stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use mien_core::identity::{Identity, IdentityStore, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite implementation of [`IdentityStore`].
pub struct SqliteIdentityStore {
    conn: Connection,
}

impl SqliteIdentityStore {
    /// Open or create the database at `path`, creating parent directories
    /// and the schema as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Backend(format!("open {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "opened identity database");

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS people (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    age INTEGER,
                    gender TEXT,
                    notes TEXT DEFAULT '',
                    created_at TEXT NOT NULL
                )
                "#,
                [],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Identity> {
        let created_at: String = row.get(5)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(Identity {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            gender: row.get(3)?,
            notes: row.get(4)?,
            created_at,
        })
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl IdentityStore for SqliteIdentityStore {
    fn next_id(&self) -> Result<i64, StoreError> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM people", [], |row| row.get(0))
            .map_err(backend)?;
        Ok(max.map_or(1, |m| m + 1))
    }

    fn upsert(&self, identity: &Identity) -> Result<(), StoreError> {
        // created_at is set once; conflicts replace every other field.
        self.conn
            .execute(
                r#"
                INSERT INTO people (id, name, age, gender, notes, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    age = excluded.age,
                    gender = excluded.gender,
                    notes = excluded.notes
                "#,
                params![
                    identity.id,
                    identity.name,
                    identity.age,
                    identity.gender,
                    identity.notes,
                    identity.created_at.to_rfc3339(),
                ],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, age, gender, notes, created_at FROM people WHERE id = ?1",
                params![id],
                Self::map_row,
            )
            .optional()
            .map_err(backend)
    }

    fn list_all(&self) -> Result<Vec<Identity>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, age, gender, notes, created_at FROM people ORDER BY id")
            .map_err(backend)?;
        let rows = stmt.query_map([], Self::map_row).map_err(backend)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(backend)
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM people WHERE id = ?1", params![id])
            .map_err(backend)?;
        Ok(())
    }
}
