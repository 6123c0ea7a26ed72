//! The parsed operation tree handed over by the transport.
//!
//! The transport collaborator validates an inbound request document against
//! the declared type system and hands the resolution layer a parsed
//! [`Operation`]: a root field name, its arguments, and the tree of
//! requested fields. This module also declares the structured input shapes
//! for mutations (`UserCreateInput`, `DraftInput`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether an operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Read-only root field.
    Query,
    /// Side-effecting root field.
    Mutation,
}

/// A requested field: its name, arguments, and sub-selection.
///
/// An empty `fields` list on an entity-typed result means "all declared
/// scalar fields"; relation fields are only resolved when explicitly
/// selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Field name as declared in the type catalog.
    pub name: String,
    /// Field arguments, keyed by argument name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, Value>,
    /// Requested sub-fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Selection>,
}

impl Selection {
    /// A selection of `name` with no arguments and no sub-fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
            fields: Vec::new(),
        }
    }

    /// Add an argument.
    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Add a requested sub-field.
    #[must_use]
    pub fn field(mut self, field: Self) -> Self {
        self.fields.push(field);
        self
    }
}

/// A single inbound operation: one root field of the query or mutation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Query or mutation.
    pub kind: OperationKind,
    /// The root field with its arguments and selection.
    pub field: Selection,
}

impl Operation {
    /// Build a query operation.
    #[must_use]
    pub const fn query(field: Selection) -> Self {
        Self {
            kind: OperationKind::Query,
            field,
        }
    }

    /// Build a mutation operation.
    #[must_use]
    pub const fn mutation(field: Selection) -> Self {
        Self {
            kind: OperationKind::Mutation,
            field,
        }
    }
}

/// Input shape for `createUser`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCreateInput {
    /// Unique email address.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Draft posts to create atomically, already linked to the new user.
    #[serde(default)]
    pub posts: Vec<DraftInput>,
}

/// Input shape for a draft post, used standalone by `createDraft` and nested
/// inside [`UserCreateInput`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftInput {
    /// Post title.
    pub title: String,
    /// Optional body text.
    #[serde(default)]
    pub content: Option<String>,
    /// Accepted for compatibility with the declared input shape, but every
    /// draft is created unpublished regardless of this value.
    #[serde(default)]
    pub published: Option<bool>,
}
