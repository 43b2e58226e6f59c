//! Data source boundary: what the core asks of storage and what it hands
//! back on commit.

mod memory;


pub use memory::MemoryStore;

use crate::{
    db::{end_point::RelationEndPointId, transaction::ObjectState},
    error::InternalError,
    types::{ObjectId, Value},
};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// DataSource
///
/// Synchronous collaborator that loads real-side rows and persists change
/// sets. Errors are propagated unchanged by the core.
///

pub trait DataSource {
    /// Load one object; `Ok(None)` if it does not exist.
    fn load_object(&mut self, id: ObjectId) -> Result<Option<ObjectRecord>, InternalError>;

    /// Load every object whose foreign key references the owner of the given
    /// virtual end-point.
    fn load_related_objects(
        &mut self,
        end_point: RelationEndPointId,
    ) -> Result<RelatedObjects, InternalError>;

    fn persist(&mut self, changes: &ChangeSet) -> Result<(), InternalError>;
}

impl<T: DataSource + ?Sized> DataSource for &mut T {
    fn load_object(&mut self, id: ObjectId) -> Result<Option<ObjectRecord>, InternalError> {
        (**self).load_object(id)
    }

    fn load_related_objects(
        &mut self,
        end_point: RelationEndPointId,
    ) -> Result<RelatedObjects, InternalError> {
        (**self).load_related_objects(end_point)
    }

    fn persist(&mut self, changes: &ChangeSet) -> Result<(), InternalError> {
        (**self).persist(changes)
    }
}

///
/// ObjectRecord
///
/// One stored object: foreign keys by real relation property (absent means
/// null) and scalar values by property.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub relations: BTreeMap<&'static str, ObjectId>,
    pub values: BTreeMap<&'static str, Value>,
}

impl ObjectRecord {
    #[must_use]
    pub const fn new(id: ObjectId) -> Self {
        Self {
            id,
            relations: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_relation(mut self, property: &'static str, opposite: Option<ObjectId>) -> Self {
        self.set_relation(property, opposite);
        self
    }

    #[must_use]
    pub fn with_value(mut self, property: &'static str, value: impl Into<Value>) -> Self {
        self.values.insert(property, value.into());
        self
    }

    pub fn set_relation(&mut self, property: &'static str, opposite: Option<ObjectId>) {
        match opposite {
            Some(opposite) => self.relations.insert(property, opposite),
            None => self.relations.remove(property),
        };
    }

    #[must_use]
    pub fn relation(&self, property: &str) -> Option<ObjectId> {
        self.relations.get(property).copied()
    }

    #[must_use]
    pub fn value(&self, property: &str) -> Value {
        self.values.get(property).cloned().unwrap_or_default()
    }
}

///
/// RecordOrdering
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordOrdering {
    /// Storage order; the core applies the declared sort expression.
    Storage,

    /// Already in the order the collection must expose.
    Final,
}

///
/// RelatedObjects
///

#[derive(Clone, Debug)]
pub struct RelatedObjects {
    pub records: Vec<ObjectRecord>,
    pub ordering: RecordOrdering,
}

///
/// ChangeSet
///
/// Everything a commit hands to its data source.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct ChangeSet {
    pub objects: Vec<ObjectChange>,
    pub virtual_end_points: Vec<VirtualEndPointChange>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.virtual_end_points.is_empty()
    }
}

///
/// ObjectChange
///
/// `relations` carries the current value of every real relation property,
/// including nulls.
///

#[derive(Clone, Debug, Serialize)]
pub struct ObjectChange {
    pub id: ObjectId,
    pub state: ObjectState,
    pub relations: BTreeMap<&'static str, Option<ObjectId>>,
    pub values: BTreeMap<&'static str, Value>,
}

impl ObjectChange {
    /// The stored form of this change; `None` for deletions.
    #[must_use]
    pub fn to_record(&self) -> Option<ObjectRecord> {
        if self.state == ObjectState::Deleted {
            return None;
        }

        let mut record = ObjectRecord::new(self.id);
        for (property, opposite) in &self.relations {
            record.set_relation(*property, *opposite);
        }
        record.values.clone_from(&self.values);

        Some(record)
    }
}

///
/// VirtualEndPointChange
///

#[derive(Clone, Debug, Serialize)]
pub struct VirtualEndPointChange {
    pub end_point: RelationEndPointId,
    pub original_items: Vec<ObjectId>,
    pub current_items: Vec<ObjectId>,
}
