//! Core runtime for relsync: relation end-point identity, virtual end-point
//! load states, data managers, the per-transaction end-point registry, and the
//! sync and unload services that keep both sides of a bidirectional relation
//! consistent.
#![warn(unreachable_pub)]

#[macro_use]
pub(crate) mod macros;

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod types;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use relsync_config as config;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, registries, or metrics plumbing are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            ClientTransaction, CollectionHandle, DataSource, MemoryStore, ObjectRecord,
            ObjectState, RelationEndPointId, SyncState, sync, unload,
        },
        model::{MappingConfiguration, RelationEndPointDefinition},
        types::{ObjectId, Value},
    };
}
