use crate::{
    db::{
        end_point::{RealObjectEndPoint, RelationEndPoint, RelationEndPointId},
        store::{DataSource, ObjectRecord},
        transaction::ClientTransaction,
    },
    error::{ErrorOrigin, InternalError},
    types::{ObjectId, Value},
};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// ObjectState
///
/// Commit-relevant state of a loaded object. `Changed` covers property
/// values, real relations, and the data of complete virtual end-points.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum ObjectState {
    Unchanged,
    Changed,
    New,
    Deleted,
}

///
/// Lifecycle
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Lifecycle {
    New,
    Existing,
    Deleted,
}

///
/// ObjectData
///

#[derive(Clone, Debug)]
pub(crate) struct ObjectData {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) original_values: BTreeMap<&'static str, Value>,
    pub(crate) current_values: BTreeMap<&'static str, Value>,
}

impl ObjectData {
    fn existing(values: BTreeMap<&'static str, Value>) -> Self {
        Self {
            lifecycle: Lifecycle::Existing,
            original_values: values.clone(),
            current_values: values,
        }
    }

    fn new(values: BTreeMap<&'static str, Value>) -> Self {
        Self {
            lifecycle: Lifecycle::New,
            original_values: BTreeMap::new(),
            current_values: values,
        }
    }

    fn values_changed(&self) -> bool {
        self.original_values != self.current_values
    }
}

impl<S: DataSource> ClientTransaction<S> {
    #[must_use]
    pub fn is_loaded(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Ids of every object known to this transaction, deleted ones included.
    #[must_use]
    pub fn loaded_objects(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// `None` if the object is not loaded.
    #[must_use]
    pub fn object_state(&self, id: ObjectId) -> Option<ObjectState> {
        let data = self.objects.get(&id)?;

        let state = match data.lifecycle {
            Lifecycle::New => ObjectState::New,
            Lifecycle::Deleted => ObjectState::Deleted,
            Lifecycle::Existing => {
                let relations_changed = self.mapping.end_point_definitions(id.class()).any(|def| {
                    self.end_points
                        .get(&RelationEndPointId::new(id, def))
                        .is_some_and(RelationEndPoint::has_changed)
                });

                if data.values_changed() || relations_changed {
                    ObjectState::Changed
                } else {
                    ObjectState::Unchanged
                }
            }
        };

        Some(state)
    }

    /// Load an object and its real end-points if it is not known yet.
    /// Virtual end-points are registered lazily.
    pub fn ensure_object_loaded(&mut self, id: ObjectId) -> Result<(), InternalError> {
        if self.objects.contains_key(&id) {
            return Ok(());
        }

        let record = self.source.load_object(id)?.ok_or_else(|| {
            InternalError::not_found(ErrorOrigin::Transaction, format!("object '{id}' does not exist"))
        })?;
        if record.id != id {
            return Err(InternalError::transaction_invariant(format!(
                "data source returned object '{}' when asked for '{id}'",
                record.id
            )));
        }

        self.register_loaded_object(record)
    }

    pub(crate) fn register_loaded_object(&mut self, record: ObjectRecord) -> Result<(), InternalError> {
        let id = record.id;
        let reals: Vec<_> = self
            .mapping
            .end_point_definitions(id.class())
            .filter(|def| !def.is_virtual())
            .collect();

        for def in reals {
            let end_point =
                RealObjectEndPoint::new(RelationEndPointId::new(id, def), record.relation(def.property()));
            self.end_points.register_real_end_point(end_point)?;
        }
        self.objects.insert(id, ObjectData::existing(record.values));
        self.debug_log(format!("loaded object {id}"));

        Ok(())
    }

    /// The current state of a loaded object as a stored record.
    pub(crate) fn current_record(&self, id: ObjectId) -> Result<ObjectRecord, InternalError> {
        let data = self.object_data(id)?;
        let mut record = ObjectRecord::new(id);

        for def in self.mapping.end_point_definitions(id.class()) {
            if def.is_virtual() {
                continue;
            }
            let opposite = self
                .end_points
                .real(&RelationEndPointId::new(id, def))?
                .current_opposite();
            record.set_relation(def.property(), opposite);
        }
        record.values.clone_from(&data.current_values);

        Ok(record)
    }

    pub(crate) fn object_data(&self, id: ObjectId) -> Result<&ObjectData, InternalError> {
        self.objects.get(&id).ok_or_else(|| {
            InternalError::transaction_invariant(format!("object '{id}' is not loaded"))
        })
    }

    pub(crate) fn check_not_deleted(&self, id: ObjectId, operation: &str) -> Result<(), InternalError> {
        if self.object_data(id)?.lifecycle == Lifecycle::Deleted {
            return Err(InternalError::conflict(
                ErrorOrigin::Transaction,
                format!("cannot {operation}: object '{id}' is deleted"),
            ));
        }

        Ok(())
    }

    // ─────────────────────────────────────────────
    // Values
    // ─────────────────────────────────────────────

    /// Current value of a plain property; `Value::Null` when unset.
    pub fn get_value(&mut self, id: ObjectId, property: &str) -> Result<Value, InternalError> {
        self.ensure_object_loaded(id)?;
        let value = self
            .object_data(id)?
            .current_values
            .get(property)
            .cloned()
            .unwrap_or_default();

        Ok(value)
    }

    pub fn set_value(
        &mut self,
        id: ObjectId,
        property: &'static str,
        value: impl Into<Value>,
    ) -> Result<(), InternalError> {
        self.ensure_object_loaded(id)?;
        self.check_not_deleted(id, &format!("set property '{property}'"))?;

        if let Some(data) = self.objects.get_mut(&id) {
            data.current_values.insert(property, value.into());
        }

        Ok(())
    }

    // ─────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────

    /// Create a new object. Its real relations start null and its virtual
    /// end-points start complete and empty.
    pub fn new_object(
        &mut self,
        class: &'static str,
        values: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Result<ObjectId, InternalError> {
        let id = ObjectId::generate(class)?;
        self.insert_new_object(id, values.into_iter().collect())?;
        self.debug_log(format!("created object {id}"));

        Ok(id)
    }

    pub(crate) fn insert_new_object(
        &mut self,
        id: ObjectId,
        values: BTreeMap<&'static str, Value>,
    ) -> Result<(), InternalError> {
        if self.objects.contains_key(&id) {
            return Err(InternalError::conflict(
                ErrorOrigin::Transaction,
                format!("object '{id}' already exists"),
            ));
        }

        let definitions: Vec<_> = self.mapping.end_point_definitions(id.class()).collect();
        for def in definitions {
            let end_point_id = RelationEndPointId::new(id, def);
            if def.is_virtual() {
                self.end_points.get_or_create_virtual(end_point_id, true)?;
            } else {
                self.end_points
                    .insert(RelationEndPoint::RealObject(RealObjectEndPoint::new(end_point_id, None)))?;
            }
        }
        self.objects.insert(id, ObjectData::new(values));

        Ok(())
    }

    /// Delete an object, detaching it from every relation first.
    ///
    /// Fails with a consistency violation, leaving everything untouched, if
    /// any relation of the object is out of sync. A new object is discarded
    /// outright.
    pub fn delete(&mut self, id: ObjectId) -> Result<(), InternalError> {
        const OPERATION: &str = "delete object";

        self.ensure_object_loaded(id)?;
        self.check_not_deleted(id, OPERATION)?;

        let definitions: Vec<_> = self.mapping.end_point_definitions(id.class()).collect();

        // check everything before touching anything
        let mut plans = Vec::new();
        for def in &definitions {
            let end_point_id = RelationEndPointId::new(id, *def);
            if def.is_virtual() {
                self.ensure_data_complete(end_point_id)?;
                let items = self.end_points.virtual_end_point(&end_point_id)?.current_items();
                self.ensure_items_loaded(&items)?;
                self.check_virtual_synchronized(end_point_id, OPERATION)?;
                for item in items {
                    let real = RelationEndPointId::new(item, def.opposite());
                    plans.extend(self.prepare_relink(real, None, OPERATION)?);
                }
            } else {
                plans.extend(self.prepare_relink(end_point_id, None, OPERATION)?);
            }
        }

        for plan in plans {
            self.apply_relink(plan)?;
        }

        let lifecycle = self.object_data(id)?.lifecycle;
        if lifecycle == Lifecycle::New {
            self.discard_object(id);
        } else if let Some(data) = self.objects.get_mut(&id) {
            data.lifecycle = Lifecycle::Deleted;
        }
        self.debug_log(format!("deleted object {id}"));

        Ok(())
    }

    /// Drop an object and every end-point it owns without registration
    /// side effects.
    pub(crate) fn discard_object(&mut self, id: ObjectId) {
        for end_point_id in self.end_points.ids_for_object(id) {
            self.end_points.remove(&end_point_id);
            self.proxies.forget(&end_point_id);
        }
        self.objects.remove(&id);
    }
}
