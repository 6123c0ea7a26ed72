//! Error taxonomy for the resolution layer.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the resolution layer.
///
/// A lookup by identity that legitimately finds nothing is *not* an error:
/// `post(id)` and `publish(id)` resolve to an explicit null instead. Errors
/// are reserved for requests that could not be honored.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A referenced related entity does not exist (e.g. `authorEmail` names
    /// no user). The caller expressed an explicit reference that could not
    /// be honored, so this is a failure, not a null result.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or required-field constraint was violated on create.
    /// Surfaced verbatim from the store.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A non-nullable declared field could not be populated for an existing
    /// record. Indicates a modeling or store-consistency bug; fatal to the
    /// single operation only.
    #[error("data integrity fault: {0}")]
    DataIntegrity(String),

    /// The operation tree itself is invalid: unknown operation or field,
    /// missing or malformed arguments.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other store-layer failure, propagated unchanged.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::ConstraintViolation(message),
            StoreError::MissingRelated {
                entity,
                field,
                value,
            } => Self::NotFound(format!("no {entity} with {field} = {value}")),
            other => Self::Store(other),
        }
    }
}

/// Result alias for resolution layer operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_becomes_constraint_violation() {
        let err = GraphError::from(StoreError::Conflict("email already exists".to_owned()));
        assert!(matches!(err, GraphError::ConstraintViolation(_)));
    }

    #[test]
    fn test_missing_related_becomes_not_found() {
        let err = GraphError::from(StoreError::MissingRelated {
            entity: "User",
            field: "email",
            value: "\"missing@x.com\"".to_owned(),
        });
        let GraphError::NotFound(message) = err else {
            panic!("expected NotFound");
        };
        assert!(message.contains("missing@x.com"));
    }

    #[test]
    fn test_corruption_propagates_as_store_error() {
        let err = GraphError::from(StoreError::Corrupt("bad row".to_owned()));
        assert!(matches!(err, GraphError::Store(StoreError::Corrupt(_))));
    }
}
