use crate::{
    db::{
        end_point::{RelationEndPoint, RelationEndPointId},
        store::{ChangeSet, DataSource, ObjectChange, VirtualEndPointChange},
        transaction::{
            ClientTransaction, ObjectState,
            object::Lifecycle,
        },
    },
    error::InternalError,
    obs::sink::MetricsEvent,
    types::ObjectId,
};
use std::collections::{BTreeMap, BTreeSet};

impl<S: DataSource> ClientTransaction<S> {
    /// Everything that would be handed to the data source on commit.
    pub fn change_set(&self) -> Result<ChangeSet, InternalError> {
        let mut objects = Vec::new();

        for (&id, data) in &self.objects {
            let Some(state) = self.object_state(id) else {
                continue;
            };
            if state == ObjectState::Unchanged {
                continue;
            }

            let mut relations = BTreeMap::new();
            for def in self.mapping.end_point_definitions(id.class()) {
                if def.is_virtual() {
                    continue;
                }
                let real = self.end_points.real(&RelationEndPointId::new(id, def))?;
                relations.insert(def.property(), real.current_opposite());
            }
            let values = match data.lifecycle {
                Lifecycle::Deleted => BTreeMap::new(),
                _ => data.current_values.clone(),
            };

            objects.push(ObjectChange {
                id,
                state,
                relations,
                values,
            });
        }

        let virtual_end_points = self
            .end_points
            .iter()
            .filter_map(RelationEndPoint::as_virtual)
            .filter(|ep| ep.is_data_complete() && ep.has_changed())
            .map(|ep| VirtualEndPointChange {
                end_point: ep.id(),
                original_items: ep.original_items(),
                current_items: ep.current_items(),
            })
            .collect();

        Ok(ChangeSet {
            objects,
            virtual_end_points,
        })
    }

    /// Persist all changes, then make the current state the new original
    /// state. If the data source fails nothing local changes.
    pub fn commit(&mut self) -> Result<(), InternalError> {
        let changes = self.change_set()?;
        self.source.persist(&changes)?;
        self.commit_local()?;

        self.record(MetricsEvent::Commit {
            objects: changes.objects.len() as u64,
            end_points: changes.virtual_end_points.len() as u64,
        });
        if self.depth > 0 {
            self.record(MetricsEvent::SubTransactionCommit);
        }
        self.debug_log(format!(
            "committed {} objects and {} virtual end-points at depth {}",
            changes.objects.len(),
            changes.virtual_end_points.len(),
            self.depth
        ));

        Ok(())
    }

    fn commit_local(&mut self) -> Result<(), InternalError> {
        // committed real end-points move their registration; complete
        // virtual end-points track this through their data
        let moves: Vec<_> = self
            .end_points
            .iter()
            .filter_map(RelationEndPoint::as_real)
            .filter(|ep| ep.has_changed())
            .map(|ep| {
                (
                    ep.object(),
                    ep.original_opposite_end_point_id(),
                    ep.current_opposite_end_point_id(),
                )
            })
            .collect();

        let mut emptied = Vec::new();
        for (item, from, to) in moves {
            if let Some(from) = from
                && let Ok(end_point) = self.end_points.virtual_end_point_mut(&from)
            {
                end_point.move_registration(item, false);
                emptied.push(from);
            }
            if let Some(to) = to {
                self.end_points
                    .get_or_create_virtual(to, false)?
                    .move_registration(item, true);
            }
        }

        let changed = self.changed_virtual_end_points();
        for end_point in self.end_points.iter_mut() {
            match end_point {
                RelationEndPoint::RealObject(ep) => ep.commit(),
                RelationEndPoint::VirtualObject(ep) => ep.load_state.commit(),
                RelationEndPoint::Collection(ep) => ep.load_state.commit(),
            }
        }
        for id in emptied {
            self.end_points.collect_if_unreferenced(&id);
        }

        let deleted: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, data)| data.lifecycle == Lifecycle::Deleted)
            .map(|(id, _)| *id)
            .collect();
        for id in deleted {
            self.remove_deleted_object(id)?;
        }

        for data in self.objects.values_mut() {
            data.lifecycle = Lifecycle::Existing;
            data.original_values.clone_from(&data.current_values);
        }

        for id in changed {
            if self.end_points.contains(&id) {
                self.notify(id);
            }
        }

        Ok(())
    }

    /// Drop a committed deletion. Late registrations on its virtual
    /// end-points fall back to Unknown.
    fn remove_deleted_object(&mut self, id: ObjectId) -> Result<(), InternalError> {
        for end_point_id in self.end_points.ids_for_object(id) {
            if end_point_id.is_virtual() {
                self.end_points.mark_data_incomplete(&end_point_id)?;
                self.end_points.collect_if_unreferenced(&end_point_id);
            } else {
                self.end_points.unregister_real_end_point(&end_point_id)?;
            }
            self.proxies.forget(&end_point_id);
        }
        self.objects.remove(&id);

        Ok(())
    }

    /// Discard every change since the last commit. Sync states are kept.
    pub fn rollback(&mut self) {
        let changed = self.changed_virtual_end_points();

        let new_objects: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, data)| data.lifecycle == Lifecycle::New)
            .map(|(id, _)| *id)
            .collect();
        for id in new_objects {
            self.discard_object(id);
        }

        for end_point in self.end_points.iter_mut() {
            match end_point {
                RelationEndPoint::RealObject(ep) => ep.rollback(),
                RelationEndPoint::VirtualObject(ep) => ep.load_state.rollback(),
                RelationEndPoint::Collection(ep) => ep.load_state.rollback(),
            }
        }
        for data in self.objects.values_mut() {
            data.lifecycle = Lifecycle::Existing;
            data.current_values.clone_from(&data.original_values);
        }

        for id in changed {
            if self.end_points.contains(&id) {
                self.notify(id);
            }
        }
        self.record(MetricsEvent::Rollback);
        self.debug_log(format!("rolled back transaction at depth {}", self.depth));
    }

    fn changed_virtual_end_points(&self) -> Vec<RelationEndPointId> {
        self.end_points
            .iter()
            .filter(|ep| ep.as_virtual().is_some() && ep.has_changed())
            .map(RelationEndPoint::id)
            .collect()
    }

    // ─────────────────────────────────────────────
    // Sub-transaction commit
    // ─────────────────────────────────────────────

    /// Apply a child's change set as uncommitted changes of this
    /// transaction. Everything needed is loaded before anything changes.
    pub(crate) fn apply_changes(&mut self, changes: &ChangeSet) -> Result<(), InternalError> {
        let created: BTreeSet<ObjectId> = changes
            .objects
            .iter()
            .filter(|change| change.state == ObjectState::New && !self.objects.contains_key(&change.id))
            .map(|change| change.id)
            .collect();

        for change in &changes.objects {
            if !created.contains(&change.id) {
                self.ensure_object_loaded(change.id)?;
            }
        }
        for change in &changes.virtual_end_points {
            if !created.contains(&change.end_point.object()) {
                self.ensure_data_complete(change.end_point)?;
            }
        }

        for change in changes.objects.iter().filter(|c| created.contains(&c.id)) {
            self.insert_new_object(change.id, change.values.clone())?;
        }

        for change in &changes.objects {
            if change.state != ObjectState::Deleted
                && let Some(data) = self.objects.get_mut(&change.id)
            {
                data.current_values.clone_from(&change.values);
            }
            for (property, opposite) in &change.relations {
                let id = RelationEndPointId::resolve(&self.mapping, change.id, property)?;
                self.end_points.real_mut(&id)?.set_opposite(*opposite);
            }
        }

        for change in &changes.virtual_end_points {
            self.end_points
                .virtual_end_point_mut(&change.end_point)?
                .set_current_items(change.current_items.clone())?;
            self.notify(change.end_point);
        }

        for change in &changes.objects {
            if change.state != ObjectState::Deleted {
                continue;
            }
            match self.object_data(change.id)?.lifecycle {
                Lifecycle::New => self.discard_object(change.id),
                _ => {
                    if let Some(data) = self.objects.get_mut(&change.id) {
                        data.lifecycle = Lifecycle::Deleted;
                    }
                }
            }
        }
        self.debug_log(format!(
            "applied {} object changes from a sub-transaction",
            changes.objects.len()
        ));

        Ok(())
    }
}
