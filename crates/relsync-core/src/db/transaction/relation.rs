use crate::{
    db::{
        end_point::{
            CollectionEndPointData, RelationEndPoint, RelationEndPointId, SyncState,
            VirtualObjectEndPointData,
        },
        store::{DataSource, ObjectRecord, RecordOrdering},
        transaction::ClientTransaction,
    },
    error::{ErrorOrigin, InternalError, RelationErrorDetail},
    model::{RelationEndPointDefinition, SortDirection, SortedPropertyModel},
    obs::sink::MetricsEvent,
    types::ObjectId,
};
use std::cmp::Ordering;

///
/// RelinkPlan
///
/// A checked move of one real end-point to a new opposite, plus the 1:1
/// end-point it displaces. Built before anything is mutated.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct RelinkPlan {
    real: RelationEndPointId,
    old: Option<ObjectId>,
    new: Option<ObjectId>,
    displaced: Option<RelationEndPointId>,
    index: Option<usize>,
}

impl RelinkPlan {
    pub(crate) const fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl<S: DataSource> ClientTransaction<S> {
    // ─────────────────────────────────────────────
    // End-point access
    // ─────────────────────────────────────────────

    #[must_use]
    pub fn get_relation_end_point_without_loading(
        &self,
        id: RelationEndPointId,
    ) -> Option<&RelationEndPoint> {
        self.end_points.get(&id)
    }

    /// Load the owning object if needed and register a virtual end-point
    /// Incomplete if it does not exist yet. Does not load virtual data.
    pub fn get_relation_end_point_with_lazy_load(
        &mut self,
        id: RelationEndPointId,
    ) -> Result<&RelationEndPoint, InternalError> {
        self.ensure_object_loaded(id.object())?;
        if id.is_virtual() {
            self.end_points.get_or_create_virtual(id, false)?;
        }

        self.end_points.get(&id).ok_or_else(|| {
            InternalError::transaction_invariant(format!("end-point '{id}' is not registered"))
        })
    }

    /// Sync state of a registered real end-point.
    #[must_use]
    pub fn sync_state(&self, id: RelationEndPointId) -> Option<SyncState> {
        self.end_points.real(&id).ok().map(|ep| ep.sync_state())
    }

    /// Make sure the end-point's data is loaded. Real end-points are complete
    /// once their owner is loaded.
    pub fn ensure_data_complete(&mut self, id: RelationEndPointId) -> Result<(), InternalError> {
        self.get_relation_end_point_with_lazy_load(id)?;
        if !id.is_virtual() || self.end_points.virtual_end_point(&id)?.is_data_complete() {
            return Ok(());
        }

        if !self.loading.insert(id) {
            return Err(InternalError::transaction_invariant(format!(
                "end-point '{id}' is already being loaded"
            )));
        }
        let result = self.load_virtual_end_point(id);
        self.loading.remove(&id);

        result
    }

    fn load_virtual_end_point(&mut self, id: RelationEndPointId) -> Result<(), InternalError> {
        let def = id.definition();

        let related = match self.source.load_related_objects(id) {
            Ok(related) => related,
            Err(err) => {
                self.record(MetricsEvent::LoadFailure {
                    class: def.class(),
                    property: def.property(),
                });
                self.debug_log(format!("loading {id} failed: {err}"));
                return Err(err);
            }
        };

        let mut records = related.records;
        if related.ordering == RecordOrdering::Storage
            && self.config.load.apply_sort_expressions
            && !def.sort().is_empty()
        {
            sort_records(&mut records, def.sort());
        }

        let rows = records.len();
        let items: Vec<ObjectId> = records.iter().map(|record| record.id).collect();
        for record in records {
            if !self.objects.contains_key(&record.id) {
                self.register_loaded_object(record)?;
            }
        }

        self.end_points.get_or_create_virtual(id, false)?;
        self.end_points.mark_data_complete(&id, items)?;

        self.record(MetricsEvent::EndPointLoad {
            class: def.class(),
            property: def.property(),
            rows: rows as u64,
        });
        self.debug_log(format!("loaded {rows} related objects for {id}"));

        Ok(())
    }

    // ─────────────────────────────────────────────
    // Consistency checks
    // ─────────────────────────────────────────────

    /// Fail if the real end-point is out of sync. An Unknown state is
    /// resolved first by loading the opposite virtual end-point.
    pub(crate) fn check_real_synchronized(
        &mut self,
        id: RelationEndPointId,
        operation: &str,
    ) -> Result<(), InternalError> {
        self.ensure_object_loaded(id.object())?;

        let real = self.end_points.real(&id)?;
        if real.sync_state() == SyncState::Unknown
            && let Some(opposite) = real.original_opposite_end_point_id()
        {
            self.ensure_data_complete(opposite)?;
        }

        if let Err(err) = self.end_points.real(&id)?.check_mutable(operation) {
            self.record_violation(id.definition());
            return Err(err);
        }

        Ok(())
    }

    /// Fail if the (loaded) virtual end-point has out-of-sync items. The
    /// current item of a 1:1 end-point is loaded first.
    pub(crate) fn check_virtual_synchronized(
        &mut self,
        id: RelationEndPointId,
        operation: &str,
    ) -> Result<(), InternalError> {
        self.ensure_data_complete(id)?;
        if !id.definition().is_collection() {
            let current = self.end_points.virtual_end_point(&id)?.current_items();
            self.ensure_items_loaded(&current)?;
        }

        if let Some(opposite) = self.out_of_sync_opposite(id) {
            let def = id.definition();
            self.record_violation(def);

            return Err(InternalError::consistency_violation(
                operation,
                RelationErrorDetail::OutOfSync {
                    object: id.object(),
                    property: def.qualified_name(),
                    opposite_object: opposite,
                    opposite_property: def.opposite().qualified_name(),
                },
            ));
        }

        Ok(())
    }

    /// Load items of a virtual end-point that were unloaded, so a foreign
    /// key rewritten in storage meanwhile is registered before any check.
    pub(crate) fn ensure_items_loaded(&mut self, items: &[ObjectId]) -> Result<(), InternalError> {
        for item in items {
            self.ensure_object_loaded(*item)?;
        }

        Ok(())
    }

    /// First opposite object that disagrees with a complete virtual
    /// end-point: a registered unsynchronized end-point, or an item whose
    /// real end-point is loaded but not attached.
    pub(crate) fn out_of_sync_opposite(&self, id: RelationEndPointId) -> Option<ObjectId> {
        let end_point = self.end_points.virtual_end_point(&id).ok()?;
        if !end_point.is_data_complete() {
            return None;
        }
        let real = id.definition().opposite();

        end_point
            .unsynchronized_opposite_end_points()
            .first()
            .map(RelationEndPointId::object)
            .or_else(|| {
                end_point
                    .items_without_end_points()
                    .into_iter()
                    .find(|item| self.end_points.contains(&RelationEndPointId::new(*item, real)))
            })
    }

    fn record_violation(&self, def: RelationEndPointDefinition) {
        self.record(MetricsEvent::ConsistencyViolation {
            class: def.class(),
            property: def.property(),
        });
    }

    // ─────────────────────────────────────────────
    // Relinking
    // ─────────────────────────────────────────────

    /// Check every end-point a move of `real` to `new` would touch, loading
    /// what is needed. `None` if nothing would change.
    pub(crate) fn prepare_relink(
        &mut self,
        real: RelationEndPointId,
        new: Option<ObjectId>,
        operation: &str,
    ) -> Result<Option<RelinkPlan>, InternalError> {
        let class = real.definition().class();
        if real.object().class() != class {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Transaction,
                format!("cannot {operation}: object '{}' is not a '{class}'", real.object()),
            ));
        }
        self.check_real_synchronized(real, operation)?;
        self.check_not_deleted(real.object(), operation)?;

        let old = self.end_points.real(&real)?.current_opposite();
        if old == new {
            return Ok(None);
        }
        if let Some(old) = old {
            self.check_virtual_synchronized(real.opposite_for(old), operation)?;
        }

        let mut displaced = None;
        if let Some(new) = new {
            let opposite_class = real.definition().opposite().class();
            if new.class() != opposite_class {
                return Err(InternalError::invalid_argument(
                    ErrorOrigin::Transaction,
                    format!(
                        "cannot {operation}: object '{new}' is not a '{opposite_class}'"
                    ),
                ));
            }

            let target = real.opposite_for(new);
            self.check_virtual_synchronized(target, operation)?;
            self.check_not_deleted(new, operation)?;

            if !target.definition().is_collection() {
                let current = self
                    .end_points
                    .virtual_end_point(&target)?
                    .current_items()
                    .first()
                    .copied();
                if let Some(current) = current.filter(|current| *current != real.object()) {
                    let other = RelationEndPointId::new(current, real.definition());
                    self.check_real_synchronized(other, operation)?;
                    displaced = Some(other);
                }
            }
        }

        Ok(Some(RelinkPlan {
            real,
            old,
            new,
            displaced,
            index: None,
        }))
    }

    /// Apply a prepared move to both sides.
    pub(crate) fn apply_relink(&mut self, plan: RelinkPlan) -> Result<(), InternalError> {
        let item = plan.real.object();
        let mut touched = Vec::with_capacity(2);

        if let Some(old) = plan.old {
            let source = plan.real.opposite_for(old);
            if source.definition().is_collection() {
                self.collection_data_mut(source)?.remove(item);
            } else {
                self.virtual_object_data_mut(source)?.set_opposite(None);
            }
            touched.push(source);
        }

        if let Some(displaced) = plan.displaced {
            self.end_points.real_mut(&displaced)?.set_opposite(None);
        }

        if let Some(new) = plan.new {
            let target = plan.real.opposite_for(new);
            if target.definition().is_collection() {
                let data = self.collection_data_mut(target)?;
                let index = plan.index.unwrap_or_else(|| data.count());
                data.insert(index, item)?;
            } else {
                self.virtual_object_data_mut(target)?.set_opposite(Some(item));
            }
            touched.push(target);
        }

        self.end_points.real_mut(&plan.real)?.set_opposite(plan.new);

        let def = plan.real.definition();
        self.record(MetricsEvent::Mutation {
            class: def.class(),
            property: def.property(),
        });
        for id in touched {
            self.notify(id);
        }

        Ok(())
    }

    fn collection_data_mut(
        &mut self,
        id: RelationEndPointId,
    ) -> Result<&mut CollectionEndPointData, InternalError> {
        self.end_points
            .collection_mut(&id)?
            .data_mut()
            .ok_or_else(|| not_complete(id))
    }

    fn virtual_object_data_mut(
        &mut self,
        id: RelationEndPointId,
    ) -> Result<&mut VirtualObjectEndPointData, InternalError> {
        self.end_points
            .virtual_object_mut(&id)?
            .data_mut()
            .ok_or_else(|| not_complete(id))
    }

    // ─────────────────────────────────────────────
    // Relation properties
    // ─────────────────────────────────────────────

    /// Current opposite of a 1:1 relation property, from either side.
    pub fn get_related_object(
        &mut self,
        object: ObjectId,
        property: &str,
    ) -> Result<Option<ObjectId>, InternalError> {
        self.related_object(object, property, false)
    }

    /// Opposite as last loaded or committed.
    pub fn get_original_related_object(
        &mut self,
        object: ObjectId,
        property: &str,
    ) -> Result<Option<ObjectId>, InternalError> {
        self.related_object(object, property, true)
    }

    fn related_object(
        &mut self,
        object: ObjectId,
        property: &str,
        original: bool,
    ) -> Result<Option<ObjectId>, InternalError> {
        let id = RelationEndPointId::resolve(&self.mapping, object, property)?;
        let def = id.definition();
        if def.is_collection() {
            return Err(not_single(def));
        }
        self.ensure_data_complete(id)?;

        if def.is_virtual() {
            let end_point = self.end_points.virtual_end_point(&id)?;
            let items = if original {
                end_point.original_items()
            } else {
                end_point.current_items()
            };
            return Ok(items.first().copied());
        }

        let real = self.end_points.real(&id)?;
        Ok(if original {
            real.original_opposite()
        } else {
            real.current_opposite()
        })
    }

    /// Current items of a collection property.
    pub fn get_related_objects(
        &mut self,
        object: ObjectId,
        property: &str,
    ) -> Result<Vec<ObjectId>, InternalError> {
        let id = self.resolve_collection(object, property)?;
        self.ensure_data_complete(id)?;

        Ok(self.end_points.virtual_end_point(&id)?.current_items())
    }

    pub fn get_original_related_objects(
        &mut self,
        object: ObjectId,
        property: &str,
    ) -> Result<Vec<ObjectId>, InternalError> {
        let id = self.resolve_collection(object, property)?;
        self.ensure_data_complete(id)?;

        Ok(self.end_points.virtual_end_point(&id)?.original_items())
    }

    pub(crate) fn resolve_collection(
        &self,
        object: ObjectId,
        property: &str,
    ) -> Result<RelationEndPointId, InternalError> {
        let id = RelationEndPointId::resolve(&self.mapping, object, property)?;
        if !id.definition().is_collection() {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Transaction,
                format!("'{}' is not a collection property", id.definition()),
            ));
        }

        Ok(id)
    }

    /// Set a 1:1 relation property from either side; the opposite side and
    /// any displaced relation follow.
    pub fn set_related_object(
        &mut self,
        object: ObjectId,
        property: &str,
        value: Option<ObjectId>,
    ) -> Result<(), InternalError> {
        let id = RelationEndPointId::resolve(&self.mapping, object, property)?;
        let def = id.definition();
        if def.is_collection() {
            return Err(not_single(def));
        }
        let operation = format!("set relation property '{def}'");

        let plan = if def.is_virtual() {
            self.check_virtual_synchronized(id, &operation)?;
            self.check_not_deleted(object, &operation)?;

            let current = self
                .end_points
                .virtual_end_point(&id)?
                .current_items()
                .first()
                .copied();
            match (current, value) {
                (current, value) if current == value => None,
                (_, Some(item)) => self.prepare_relink(
                    RelationEndPointId::new(item, def.opposite()),
                    Some(object),
                    &operation,
                )?,
                (Some(current), None) => self.prepare_relink(
                    RelationEndPointId::new(current, def.opposite()),
                    None,
                    &operation,
                )?,
                (None, None) => None,
            }
        } else {
            self.prepare_relink(id, value, &operation)?
        };

        if let Some(plan) = plan {
            self.apply_relink(plan)?;
        }

        Ok(())
    }
}

fn not_complete(id: RelationEndPointId) -> InternalError {
    InternalError::transaction_invariant(format!("end-point '{id}' is not complete"))
}

fn not_single(def: RelationEndPointDefinition) -> InternalError {
    InternalError::invalid_argument(
        ErrorOrigin::Transaction,
        format!("'{def}' is a collection property"),
    )
}

/// Stable sort by the declared sort expression.
fn sort_records(records: &mut [ObjectRecord], sort: &[SortedPropertyModel]) {
    records.sort_by(|a, b| {
        sort.iter()
            .map(|term| {
                let ordering = a.value(term.property).cmp(&b.value(term.property));
                match term.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
