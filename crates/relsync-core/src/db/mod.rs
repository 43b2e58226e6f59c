//! Transaction-scoped relation state and the services that act on it.

pub mod end_point;
pub mod store;
pub mod sync;
pub mod transaction;
pub mod unload;

pub use end_point::{RelationEndPointId, SyncState};
pub use store::{DataSource, MemoryStore, ObjectRecord};
pub use transaction::{ClientTransaction, CollectionHandle, ObjectState};
