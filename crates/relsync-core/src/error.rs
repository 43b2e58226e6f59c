use crate::types::ObjectId;
use serde::Serialize;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Every failure of the relation core surfaces synchronously as one of these;
/// nothing is swallowed or logged-and-ignored.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a load failure; data sources use this to report fetch errors.
    pub fn load_failure(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::LoadFailure, origin, message)
    }

    /// Construct a persist failure; data sources use this to report write errors.
    pub fn persist_failure(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::PersistFailure, origin, message)
    }

    /// Construct a not-found error for a specific origin.
    pub fn not_found(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, origin, message)
    }

    /// Construct an invariant violation for a specific origin.
    pub fn invariant(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, origin, message)
    }

    /// Construct a load-state invariant violation.
    pub(crate) fn load_state_invariant(message: impl Into<String>) -> Self {
        Self::invariant(ErrorOrigin::LoadState, message)
    }

    /// Construct a data-manager invariant violation.
    pub(crate) fn data_manager_invariant(message: impl Into<String>) -> Self {
        Self::invariant(ErrorOrigin::DataManager, message)
    }

    /// Construct a registry invariant violation.
    pub(crate) fn registry_invariant(message: impl Into<String>) -> Self {
        Self::invariant(ErrorOrigin::Registry, message)
    }

    /// Construct a transaction-origin invariant violation.
    pub(crate) fn transaction_invariant(message: impl Into<String>) -> Self {
        Self::invariant(ErrorOrigin::Transaction, message)
    }

    /// Construct a state conflict (the current state prohibits the operation).
    pub(crate) fn conflict(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, origin, message)
    }

    /// Construct an argument validation error.
    pub(crate) fn invalid_argument(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, origin, message)
    }

    /// Construct a consistency violation for an operation attempted on an
    /// out-of-sync relation.
    pub(crate) fn consistency_violation(operation: &str, detail: RelationErrorDetail) -> Self {
        Self {
            class: ErrorClass::ConsistencyViolation,
            origin: ErrorOrigin::EndPoint,
            message: format!(
                "cannot {operation}: {detail}; synchronize the relation or unload one side first"
            ),
            detail: Some(ErrorDetail::Relation(detail)),
        }
    }

    /// Construct a synchronization conflict raised by the sync service.
    pub(crate) fn synchronization_conflict(detail: RelationErrorDetail) -> Self {
        Self {
            class: ErrorClass::SynchronizationConflict,
            origin: ErrorOrigin::Sync,
            message: detail.to_string(),
            detail: Some(ErrorDetail::Relation(detail)),
        }
    }

    #[must_use]
    pub const fn is_consistency_violation(&self) -> bool {
        matches!(self.class, ErrorClass::ConsistencyViolation)
    }

    #[must_use]
    pub const fn is_synchronization_conflict(&self) -> bool {
        matches!(self.class, ErrorClass::SynchronizationConflict)
    }

    #[must_use]
    pub const fn is_load_failure(&self) -> bool {
        matches!(self.class, ErrorClass::LoadFailure)
    }

    #[must_use]
    pub const fn is_persist_failure(&self) -> bool {
        matches!(self.class, ErrorClass::PersistFailure)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn relation_detail(&self) -> Option<&RelationErrorDetail> {
        match &self.detail {
            Some(ErrorDetail::Relation(detail)) => Some(detail),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Relation(RelationErrorDetail),
}

///
/// RelationErrorDetail
///
/// Identities involved in a relation consistency failure.
/// Property names are fully qualified (`Class.Property`).
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, ThisError)]
pub enum RelationErrorDetail {
    #[error(
        "relation property '{property}' of object '{object}' is out of sync with the opposite property '{opposite_property}' of object '{opposite_object}'"
    )]
    OutOfSync {
        object: ObjectId,
        property: String,
        opposite_object: ObjectId,
        opposite_property: String,
    },

    #[error(
        "relation property '{property}' of object '{object}' cannot be synchronized with the virtual property '{virtual_property}' of object '{virtual_object}' because it already refers to object '{conflicting_object}'; unload object '{conflicting_object}' or the virtual end-point first"
    )]
    SyncConflict {
        object: ObjectId,
        property: String,
        virtual_object: ObjectId,
        virtual_property: String,
        conflicting_object: ObjectId,
    },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// A mutation or delete touched a relation known to be out of sync.
    ConsistencyViolation,

    /// Reconciliation would overwrite a differently-pointing virtual reference.
    SynchronizationConflict,

    /// The external data source failed; the end-point stays Incomplete.
    LoadFailure,

    /// The external data source refused a commit; local state is unchanged.
    PersistFailure,

    /// Programming error; not meant to be caught by application code.
    InvariantViolation,

    NotFound,

    /// The current state prohibits the operation (e.g. unloading changed data).
    Conflict,

    InvalidArgument,
    Unsupported,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConsistencyViolation => "consistency_violation",
            Self::SynchronizationConflict => "synchronization_conflict",
            Self::LoadFailure => "load_failure",
            Self::PersistFailure => "persist_failure",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid_argument",
            Self::Unsupported => "unsupported",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    EndPoint,
    LoadState,
    DataManager,
    Registry,
    Sync,
    Unload,
    Transaction,
    Store,
    Mapping,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EndPoint => "end_point",
            Self::LoadState => "load_state",
            Self::DataManager => "data_manager",
            Self::Registry => "registry",
            Self::Sync => "sync",
            Self::Unload => "unload",
            Self::Transaction => "transaction",
            Self::Store => "store",
            Self::Mapping => "mapping",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

impl From<relsync_config::ConfigError> for InternalError {
    fn from(err: relsync_config::ConfigError) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Config, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = InternalError::load_failure(ErrorOrigin::Store, "disk on fire");

        assert_eq!(err.display_with_class(), "store:load_failure: disk on fire");
        assert!(err.is_load_failure());
        assert!(err.relation_detail().is_none());
    }

    #[test]
    fn consistency_violation_carries_relation_detail() {
        let object = ObjectId::from_u128("Computer", 1);
        let opposite = ObjectId::from_u128("Employee", 2);
        let err = InternalError::consistency_violation(
            "delete object",
            RelationErrorDetail::OutOfSync {
                object,
                property: "Computer.Employee".to_string(),
                opposite_object: opposite,
                opposite_property: "Employee.Computer".to_string(),
            },
        );

        assert!(err.is_consistency_violation());
        assert!(err.message.starts_with("cannot delete object: "));
        assert!(err.message.contains("Computer.Employee"));
        assert!(err.message.contains(&opposite.to_string()));
        assert!(matches!(
            err.relation_detail(),
            Some(RelationErrorDetail::OutOfSync { .. })
        ));
    }
}
