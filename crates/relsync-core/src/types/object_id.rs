use crate::{error::InternalError, types::generate};
use derive_more::Display;
use serde::{Serialize, Serializer};
use ulid::Ulid;

///
/// ObjectId
///
/// Identity of one domain object: its mapped class plus a ULID key.
/// Value equality; ordering is by class, then key.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{class}|{key}")]
pub struct ObjectId {
    class: &'static str,
    key: Ulid,
}

impl ObjectId {
    #[must_use]
    pub const fn new(class: &'static str, key: Ulid) -> Self {
        Self { class, key }
    }

    /// Build an id from a raw `u128` key; handy for fixtures and stable test data.
    #[must_use]
    pub const fn from_u128(class: &'static str, key: u128) -> Self {
        Self::new(class, Ulid(key))
    }

    /// Build an id with a freshly generated, monotonic key.
    pub fn generate(class: &'static str) -> Result<Self, InternalError> {
        Ok(Self::new(class, generate()?))
    }

    #[must_use]
    pub const fn class(&self) -> &'static str {
        self.class
    }

    #[must_use]
    pub const fn key(&self) -> Ulid {
        self.key
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
