use crate::{
    db::end_point::{
        CollectionEndPoint, RealObjectEndPoint, RelationEndPoint, RelationEndPointId, SyncUpdate,
        VirtualEndPoint, VirtualEndPointState, VirtualObjectEndPoint,
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    types::ObjectId,
};
use std::{collections::BTreeMap, fmt, rc::Rc};
use thiserror::Error as ThisError;

///
/// EndPointRegistryError
///

#[derive(Debug, ThisError)]
pub enum EndPointRegistryError {
    #[error("relation end-point '{0}' is not registered")]
    NotRegistered(RelationEndPointId),

    #[error("relation end-point '{0}' is already registered")]
    AlreadyRegistered(RelationEndPointId),

    #[error("relation end-point '{0}' is not a real end-point")]
    NotReal(RelationEndPointId),

    #[error("relation end-point '{0}' is not a virtual end-point")]
    NotVirtual(RelationEndPointId),

    #[error("relation end-point '{0}' is not a collection end-point")]
    NotCollection(RelationEndPointId),

    #[error("relation end-point '{0}' is not a virtual object end-point")]
    NotVirtualObject(RelationEndPointId),
}

impl EndPointRegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::NotRegistered(_) | Self::AlreadyRegistered(_) => ErrorClass::InvariantViolation,
            Self::NotReal(_)
            | Self::NotVirtual(_)
            | Self::NotCollection(_)
            | Self::NotVirtualObject(_) => ErrorClass::InvalidArgument,
        }
    }
}

impl From<EndPointRegistryError> for InternalError {
    fn from(err: EndPointRegistryError) -> Self {
        Self::new(err.class(), ErrorOrigin::Registry, err.to_string())
    }
}

///
/// EndPointStateListener
///
/// Observer notified after a virtual end-point's data changed state
/// (mutation, commit, rollback, unload).
///

pub trait EndPointStateListener {
    fn on_state_updated(&self, id: RelationEndPointId, has_changed: bool);
}

///
/// RelationEndPointRegistry
///
/// All end-points of one transaction, keyed by id.
///

#[derive(Default)]
pub struct RelationEndPointRegistry {
    end_points: BTreeMap<RelationEndPointId, RelationEndPoint>,
    listeners: Vec<Rc<dyn EndPointStateListener>>,
}

impl fmt::Debug for RelationEndPointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationEndPointRegistry")
            .field("end_points", &self.end_points)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RelationEndPointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end_points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end_points.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &RelationEndPointId) -> bool {
        self.end_points.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &RelationEndPointId) -> Option<&RelationEndPoint> {
        self.end_points.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationEndPoint> {
        self.end_points.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut RelationEndPoint> {
        self.end_points.values_mut()
    }

    /// Ids of every registered end-point owned by `object`.
    #[must_use]
    pub fn ids_for_object(&self, object: ObjectId) -> Vec<RelationEndPointId> {
        self.end_points
            .keys()
            .filter(|id| id.object() == object)
            .copied()
            .collect()
    }

    // ─────────────────────────────────────────────
    // Typed access
    // ─────────────────────────────────────────────

    pub fn real(&self, id: &RelationEndPointId) -> Result<&RealObjectEndPoint, InternalError> {
        self.end_points
            .get(id)
            .ok_or(EndPointRegistryError::NotRegistered(*id))?
            .as_real()
            .ok_or_else(|| EndPointRegistryError::NotReal(*id).into())
    }

    pub(crate) fn real_mut(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut RealObjectEndPoint, InternalError> {
        self.end_points
            .get_mut(id)
            .ok_or(EndPointRegistryError::NotRegistered(*id))?
            .as_real_mut()
            .ok_or_else(|| EndPointRegistryError::NotReal(*id).into())
    }

    pub fn virtual_end_point(
        &self,
        id: &RelationEndPointId,
    ) -> Result<&dyn VirtualEndPointState, InternalError> {
        self.end_points
            .get(id)
            .ok_or(EndPointRegistryError::NotRegistered(*id))?
            .as_virtual()
            .ok_or_else(|| EndPointRegistryError::NotVirtual(*id).into())
    }

    pub(crate) fn virtual_end_point_mut(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut dyn VirtualEndPointState, InternalError> {
        self.end_points
            .get_mut(id)
            .ok_or(EndPointRegistryError::NotRegistered(*id))?
            .as_virtual_mut()
            .ok_or_else(|| EndPointRegistryError::NotVirtual(*id).into())
    }

    pub(crate) fn collection_mut(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut CollectionEndPoint, InternalError> {
        match self.end_points.get_mut(id) {
            Some(RelationEndPoint::Collection(ep)) => Ok(ep),
            Some(_) => Err(EndPointRegistryError::NotCollection(*id).into()),
            None => Err(EndPointRegistryError::NotRegistered(*id).into()),
        }
    }

    pub(crate) fn virtual_object_mut(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut VirtualObjectEndPoint, InternalError> {
        match self.end_points.get_mut(id) {
            Some(RelationEndPoint::VirtualObject(ep)) => Ok(ep),
            Some(_) => Err(EndPointRegistryError::NotVirtualObject(*id).into()),
            None => Err(EndPointRegistryError::NotRegistered(*id).into()),
        }
    }

    // ─────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────

    /// Register a virtual end-point in the given state if absent.
    pub(crate) fn get_or_create_virtual(
        &mut self,
        id: RelationEndPointId,
        complete: bool,
    ) -> Result<&mut dyn VirtualEndPointState, InternalError> {
        if !id.is_virtual() {
            return Err(EndPointRegistryError::NotVirtual(id).into());
        }

        let end_point = self.end_points.entry(id).or_insert_with(|| {
            match (id.definition().is_collection(), complete) {
                (true, true) => RelationEndPoint::Collection(VirtualEndPoint::new_complete(id)),
                (true, false) => RelationEndPoint::Collection(VirtualEndPoint::new_incomplete(id)),
                (false, true) => RelationEndPoint::VirtualObject(VirtualEndPoint::new_complete(id)),
                (false, false) => {
                    RelationEndPoint::VirtualObject(VirtualEndPoint::new_incomplete(id))
                }
            }
        });

        end_point
            .as_virtual_mut()
            .ok_or_else(|| EndPointRegistryError::NotVirtual(id).into())
    }

    /// Insert a real end-point and register it with the virtual end-point of
    /// its original opposite, creating that one Incomplete if needed.
    pub(crate) fn register_real_end_point(
        &mut self,
        end_point: RealObjectEndPoint,
    ) -> Result<(), InternalError> {
        let id = end_point.id();
        if self.end_points.contains_key(&id) {
            return Err(EndPointRegistryError::AlreadyRegistered(id).into());
        }
        let opposite = end_point.original_opposite_end_point_id();
        self.end_points
            .insert(id, RelationEndPoint::RealObject(end_point));

        if let Some(opposite) = opposite {
            let sync_state = self
                .get_or_create_virtual(opposite, false)?
                .register_original_opposite_end_point(id.object())?;
            self.real_mut(&id)?.set_sync_state(sync_state);
        }

        Ok(())
    }

    /// Remove a real end-point and unregister it from its original opposite.
    /// Returns that opposite's id so the caller can collect it.
    pub(crate) fn unregister_real_end_point(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<Option<RelationEndPointId>, InternalError> {
        let opposite = self.real(id)?.original_opposite_end_point_id();
        self.end_points.remove(id);

        let Some(opposite) = opposite else {
            return Ok(None);
        };
        let updates = self
            .virtual_end_point_mut(&opposite)?
            .unregister_original_opposite_end_point(id.object())?;
        self.apply_sync_updates(&opposite, updates);

        Ok(Some(opposite))
    }

    /// Remove a virtual end-point if nothing refers to it. Returns whether it
    /// was removed.
    pub(crate) fn collect_if_unreferenced(&mut self, id: &RelationEndPointId) -> bool {
        let collectable = self
            .end_points
            .get(id)
            .and_then(RelationEndPoint::as_virtual)
            .is_some_and(|ep| ep.can_be_collected());
        if collectable {
            self.end_points.remove(id);
        }

        collectable
    }

    /// Insert any end-point without registration side effects (new objects,
    /// sub-transaction application).
    pub(crate) fn insert(&mut self, end_point: RelationEndPoint) -> Result<(), InternalError> {
        let id = end_point.id();
        if self.end_points.contains_key(&id) {
            return Err(EndPointRegistryError::AlreadyRegistered(id).into());
        }
        self.end_points.insert(id, end_point);

        Ok(())
    }

    pub(crate) fn remove(&mut self, id: &RelationEndPointId) -> Option<RelationEndPoint> {
        self.end_points.remove(id)
    }

    // ─────────────────────────────────────────────
    // Load state transitions
    // ─────────────────────────────────────────────

    pub(crate) fn mark_data_complete(
        &mut self,
        id: &RelationEndPointId,
        items: Vec<ObjectId>,
    ) -> Result<(), InternalError> {
        let updates = self.virtual_end_point_mut(id)?.mark_data_complete(items)?;
        self.apply_sync_updates(id, updates);

        Ok(())
    }

    pub(crate) fn mark_data_incomplete(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<(), InternalError> {
        let updates = self.virtual_end_point_mut(id)?.mark_data_incomplete()?;
        self.apply_sync_updates(id, updates);

        Ok(())
    }

    /// Push sync-state changes decided by a virtual end-point onto the real
    /// end-points it tracks.
    pub(crate) fn apply_sync_updates(
        &mut self,
        virtual_id: &RelationEndPointId,
        updates: Vec<SyncUpdate>,
    ) {
        let real = virtual_id.definition().opposite();

        for (item, sync_state) in updates {
            let id = RelationEndPointId::new(item, real);
            if let Some(RelationEndPoint::RealObject(ep)) = self.end_points.get_mut(&id) {
                ep.set_sync_state(sync_state);
            }
        }
    }

    // ─────────────────────────────────────────────
    // Listeners
    // ─────────────────────────────────────────────

    pub fn add_listener(&mut self, listener: Rc<dyn EndPointStateListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn notify(&self, id: RelationEndPointId, has_changed: bool) {
        for listener in &self.listeners {
            listener.on_state_updated(id, has_changed);
        }
    }
}
