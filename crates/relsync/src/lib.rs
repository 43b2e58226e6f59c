//! ## Crate layout
//! - `core`: relation end-points, load states, the client transaction, and
//!   the sync and unload services.
//! - `config`: typed TOML configuration for transactions.
//! - `error`: the public error type with a stable kind + origin taxonomy.
//!
//! The `prelude` module mirrors the surface application code works with.

pub use relsync_config as config;
pub use relsync_core as core;

pub mod error;


//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::{db, model, obs, types};
pub use crate::core::error::RelationErrorDetail;
pub use error::{Error, ErrorKind, ErrorOrigin, RelationErrorKind, StoreErrorKind};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::RelsyncConfig,
        core::{
            db::{
                ClientTransaction, CollectionHandle, DataSource, MemoryStore, ObjectRecord,
                ObjectState, RelationEndPointId, SyncState, sync, unload,
            },
            model::{
                EndPointModel, MappingConfiguration, RelationEndPointDefinition, RelationModel,
                SortedPropertyModel,
            },
            types::{ObjectId, Value},
        },
        error::Error,
    };
}
