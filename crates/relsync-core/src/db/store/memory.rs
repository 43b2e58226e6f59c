use crate::{
    db::{
        end_point::RelationEndPointId,
        store::{ChangeSet, DataSource, ObjectRecord, RecordOrdering, RelatedObjects},
    },
    error::{ErrorOrigin, InternalError},
    types::ObjectId,
};
use std::{cell::RefCell, rc::Rc};

///
/// MemoryStore
///
/// Shared in-memory data source. Clones share the same rows, so a test can
/// keep one handle to write "out of band" while a transaction reads through
/// another. Rows keep insertion order.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    rows: Vec<ObjectRecord>,
    fail_next_load: Option<String>,
    fail_next_persist: Option<String>,
    loads: u64,
    persisted: Vec<ChangeSet>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row; replacing keeps the row's position.
    pub fn insert(&self, record: ObjectRecord) {
        let mut inner = self.inner.borrow_mut();
        match inner.rows.iter().position(|r| r.id == record.id) {
            Some(index) => inner.rows[index] = record,
            None => inner.rows.push(record),
        }
    }

    /// Rewrite one foreign key, as a concurrent writer would.
    pub fn set_relation(
        &self,
        id: ObjectId,
        property: &'static str,
        opposite: Option<ObjectId>,
    ) -> Result<(), InternalError> {
        let mut inner = self.inner.borrow_mut();
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| missing_row(id))?;
        row.set_relation(property, opposite);

        Ok(())
    }

    pub fn remove(&self, id: ObjectId) -> Option<ObjectRecord> {
        let mut inner = self.inner.borrow_mut();
        let index = inner.rows.iter().position(|r| r.id == id)?;

        Some(inner.rows.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<ObjectRecord> {
        self.inner
            .borrow()
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().rows.is_empty()
    }

    /// Number of load calls served (object and related-object loads).
    #[must_use]
    pub fn load_count(&self) -> u64 {
        self.inner.borrow().loads
    }

    /// Change sets persisted so far, oldest first.
    #[must_use]
    pub fn persisted(&self) -> Vec<ChangeSet> {
        self.inner.borrow().persisted.clone()
    }

    /// Make the next load call fail with a load failure.
    pub fn fail_next_load(&self, message: impl Into<String>) {
        self.inner.borrow_mut().fail_next_load = Some(message.into());
    }

    /// Make the next persist call fail with a persist failure.
    pub fn fail_next_persist(&self, message: impl Into<String>) {
        self.inner.borrow_mut().fail_next_persist = Some(message.into());
    }

    fn begin_load(&self) -> Result<(), InternalError> {
        let mut inner = self.inner.borrow_mut();
        inner.loads = inner.loads.saturating_add(1);

        match inner.fail_next_load.take() {
            Some(message) => Err(InternalError::load_failure(ErrorOrigin::Store, message)),
            None => Ok(()),
        }
    }
}

impl DataSource for MemoryStore {
    fn load_object(&mut self, id: ObjectId) -> Result<Option<ObjectRecord>, InternalError> {
        self.begin_load()?;

        Ok(self.get(id))
    }

    fn load_related_objects(
        &mut self,
        end_point: RelationEndPointId,
    ) -> Result<RelatedObjects, InternalError> {
        self.begin_load()?;

        let real = end_point.definition().opposite();
        let owner = end_point.object();
        let records = self
            .inner
            .borrow()
            .rows
            .iter()
            .filter(|r| r.id.class() == real.class() && r.relation(real.property()) == Some(owner))
            .cloned()
            .collect();

        Ok(RelatedObjects {
            records,
            ordering: RecordOrdering::Storage,
        })
    }

    fn persist(&mut self, changes: &ChangeSet) -> Result<(), InternalError> {
        if let Some(message) = self.inner.borrow_mut().fail_next_persist.take() {
            return Err(InternalError::persist_failure(ErrorOrigin::Store, message));
        }

        for change in &changes.objects {
            match change.to_record() {
                Some(record) => self.insert(record),
                None => {
                    self.remove(change.id);
                }
            }
        }
        self.inner.borrow_mut().persisted.push(changes.clone());

        Ok(())
    }
}

fn missing_row(id: ObjectId) -> InternalError {
    InternalError::not_found(ErrorOrigin::Store, format!("object '{id}' is not stored"))
}
