//! Runtime relation metadata.
//!
//! Models are plain `'static` data declared once per application: which
//! classes are related, which side stores the foreign key, and how loaded
//! collections are ordered. End-points and transactions only read them.

pub mod mapping;
pub mod relation;

pub use mapping::{MappingConfiguration, MappingError, RelationEndPointDefinition};
pub use relation::{
    Cardinality, EndPointKind, EndPointModel, RelationModel, SortDirection, SortedPropertyModel,
};
