//! Errors for query and mutation translation.

use thiserror::Error;

/// A type for translation errors. Translation is pure and deterministic,
/// so none of these are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Field '{field}' does not map to a column on resource '{resource_type}'.")]
    FieldUnavailable {
        resource_type: String,
        field: String,
    },
    #[error("Relationship '{relationship}' is not defined on resource '{resource_type}'.")]
    RelationshipUnavailable {
        resource_type: String,
        relationship: String,
    },
    #[error("Relationship '{relationship}' on resource '{resource_type}' is to-many and cannot be traversed to address an attribute.")]
    ToManyTraversal {
        resource_type: String,
        relationship: String,
    },
    #[error("Queries containing pagination are not supported.")]
    PaginationNotSupported,
    #[error("Filtering on derived resource types is not supported.")]
    TypeNarrowingNotSupported,
    #[error("Resource type '{0}' is not registered in the resource graph.")]
    ResourceTypeNotFound(String),
    #[error("Statement builder invariant breached: {0}")]
    InvariantBroken(String),
}

/// The three failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request targets something the data model does not expose.
    ClientInput,
    /// The request uses a feature that is categorically unimplemented.
    UnsupportedFeature,
    /// A compiler bug; aborting is preferable to emitting incorrect SQL.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FieldUnavailable { .. }
            | Error::RelationshipUnavailable { .. }
            | Error::ToManyTraversal { .. } => ErrorKind::ClientInput,
            Error::PaginationNotSupported | Error::TypeNarrowingNotSupported => {
                ErrorKind::UnsupportedFeature
            }
            Error::ResourceTypeNotFound(_) | Error::InvariantBroken(_) => ErrorKind::Internal,
        }
    }
}
