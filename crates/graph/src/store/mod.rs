//! The store seam: five primitives over untyped records.
//!
//! The resolution layer treats persistence as an opaque dependency
//! satisfying exactly five operations: find-one, find-many-with-filter,
//! create-with-relations, update-by-id, and relation-traversal from a
//! record. Anything implementing [`Store`] can back the resolver; the
//! in-memory implementation doubles as the test substitute.
//!
//! Records are untyped maps keyed by API field name. Foreign keys live in
//! the record under the relation's `fk_field` but are an implementation
//! detail: the resolver never exposes them, it derives relation fields by
//! traversal at resolution time.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::catalog::{Entity, RelationDef};

pub use memory::MemoryStore;
pub use postgres::{PgStore, create_pool};

/// An untyped stored record, keyed by API field name.
pub type Record = BTreeMap<String, Value>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A `connect` link named a record that does not exist.
    #[error("no {entity} with {field} = {value}")]
    MissingRelated {
        /// Target entity type name.
        entity: &'static str,
        /// Unique field used for the lookup.
        field: &'static str,
        /// The value that failed to resolve, rendered as JSON.
        value: String,
    },

    /// A filter or field value did not match the declared scalar type.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Data in the store is corrupted or structurally invalid.
    #[error("data corruption: {0}")]
    Corrupt(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A field-equality filter for `find_many`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// API field name to compare.
    pub field: String,
    /// Value the field must equal.
    pub value: Value,
}

impl Filter {
    /// Filter rows where `field` equals `value`.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A link from a new record to an existing one, resolved by a unique field
/// on the relation's target. A miss fails the whole create with
/// [`StoreError::MissingRelated`] and leaves no partial write.
#[derive(Debug, Clone)]
pub struct Connect {
    /// Relation name on the created entity.
    pub relation: &'static str,
    /// Unique field on the target used for the lookup.
    pub field: &'static str,
    /// Value to look up.
    pub value: Value,
}

/// Child rows created together with a parent, linked through a one-to-many
/// relation's foreign key.
#[derive(Debug, Clone)]
pub struct Nested {
    /// Relation name on the created entity.
    pub relation: &'static str,
    /// Scalar fields of each child row.
    pub rows: Vec<Record>,
}

/// Payload for `create`: scalar fields plus relation links.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    /// Scalar field values (no identity; the store assigns it).
    pub fields: Record,
    /// Links to existing records.
    pub connect: Vec<Connect>,
    /// Child records to create atomically with the parent.
    pub nested: Vec<Nested>,
}

impl NewRecord {
    /// A record with only scalar fields.
    #[must_use]
    pub const fn with_fields(fields: Record) -> Self {
        Self {
            fields,
            connect: Vec::new(),
            nested: Vec::new(),
        }
    }
}

/// Result of traversing a relation from a record.
#[derive(Debug, Clone)]
pub enum Related {
    /// Many-to-one traversal: the referenced record, if any.
    One(Option<Record>),
    /// One-to-many traversal: all records referencing the parent.
    Many(Vec<Record>),
}

/// The five store primitives.
///
/// Implementations must make single-record create and update atomic; the
/// resolution layer adds no locking of its own.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch one record by identity. `None` is an absence, not a failure.
    async fn find_one(&self, entity: Entity, id: i32) -> Result<Option<Record>, StoreError>;

    /// Fetch all records of an entity, optionally filtered by field
    /// equality. No ordering guarantee.
    async fn find_many(
        &self,
        entity: Entity,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Create a record, resolving `connect` links and creating `nested`
    /// children atomically. Returns the created record.
    async fn create(&self, entity: Entity, new: NewRecord) -> Result<Record, StoreError>;

    /// Apply a partial update by identity. Returns the updated record, or
    /// `None` if the identity does not exist.
    async fn update(
        &self,
        entity: Entity,
        id: i32,
        patch: Record,
    ) -> Result<Option<Record>, StoreError>;

    /// Re-fetch the record with the given identity and traverse one of its
    /// relations, reflecting current store state.
    async fn related(
        &self,
        entity: Entity,
        id: i32,
        relation: &RelationDef,
    ) -> Result<Related, StoreError>;
}
