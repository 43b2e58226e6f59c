use derive_more::Display;
use relsync_core::error::{
    ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError, RelationErrorDetail,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Identities of the relation sides involved, for relation errors.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub detail: Option<RelationErrorDetail>,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: RelationErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    #[must_use]
    pub const fn is_relation_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Relation(_))
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let detail = err.relation_detail().cloned();

        Self {
            detail,
            ..Self::new(err.class.into(), err.origin.into(), err.message)
        }
    }
}

impl From<relsync_config::ConfigError> for Error {
    fn from(err: relsync_config::ConfigError) -> Self {
        Self::new(ErrorKind::InvalidArgument, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Relation(RelationErrorKind),
    Store(StoreErrorKind),

    /// The current state prohibits the operation; the caller can retry after
    /// committing, rolling back or unloading.
    Conflict,

    InvalidArgument,
    Unsupported,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::ConsistencyViolation => Self::Relation(RelationErrorKind::OutOfSync),
            ErrorClass::SynchronizationConflict => Self::Relation(RelationErrorKind::SyncConflict),
            ErrorClass::LoadFailure => Self::Store(StoreErrorKind::Unavailable),
            ErrorClass::PersistFailure => Self::Store(StoreErrorKind::PersistFailed),
            ErrorClass::NotFound => Self::Store(StoreErrorKind::NotFound),
            ErrorClass::Conflict => Self::Conflict,
            ErrorClass::InvalidArgument => Self::InvalidArgument,
            ErrorClass::Unsupported => Self::Unsupported,
            ErrorClass::InvariantViolation | ErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// RelationErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RelationErrorKind {
    /// A mutation touched a relation whose two sides disagree.
    OutOfSync,

    /// Synchronizing would overwrite another object's 1:1 reference.
    SyncConflict,
}

///
/// StoreErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StoreErrorKind {
    NotFound,

    /// Loading from the data source failed.
    Unavailable,

    /// The data source rejected a commit.
    PersistFailed,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    EndPoint,
    Sync,
    Unload,
    Transaction,
    Store,
    Mapping,
    Config,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::EndPoint
            | CoreErrorOrigin::LoadState
            | CoreErrorOrigin::DataManager
            | CoreErrorOrigin::Registry => Self::EndPoint,
            CoreErrorOrigin::Sync => Self::Sync,
            CoreErrorOrigin::Unload => Self::Unload,
            CoreErrorOrigin::Transaction => Self::Transaction,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Mapping => Self::Mapping,
            CoreErrorOrigin::Config => Self::Config,
        }
    }
}

///
/// TESTS
///
