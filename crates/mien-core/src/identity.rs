//! Identity records and the relational store contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity store: {0}")]
    Backend(String),
}

/// A named individual's metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Positive, unique, assigned by the next-id policy. Immutable once set.
    pub id: i64,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub notes: String,
    /// Set once at creation; preserved across upserts.
    pub created_at: DateTime<Utc>,
}

/// Contract for the relational identity store.
///
/// Each call is individually atomic; no transaction spans multiple
/// identities.
pub trait IdentityStore {
    /// `max(existing ids) + 1`, or 1 when the store is empty.
    ///
    /// Monotonic only with respect to the rows currently present: an id freed
    /// by deletion can be handed out again once the maximum drops below it.
    fn next_id(&self) -> Result<i64, StoreError>;

    /// Replace-by-primary-key. All fields except `created_at` are replaced
    /// for an existing row.
    fn upsert(&self, identity: &Identity) -> Result<(), StoreError>;

    fn get(&self, id: i64) -> Result<Option<Identity>, StoreError>;

    /// All records, ordered by id.
    fn list_all(&self) -> Result<Vec<Identity>, StoreError>;

    fn delete(&self, id: i64) -> Result<(), StoreError>;
}
