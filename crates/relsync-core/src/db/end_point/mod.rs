//! Relation end-points: the real (foreign-key) side, the virtual 1:1 and 1:n
//! sides, their load states and the per-transaction registry.

pub mod data;
mod id;
mod load_state;
mod real;
mod registry;

#[cfg(test)]
mod tests;

pub use data::{CollectionEndPointData, VirtualEndPointData, VirtualObjectEndPointData};
pub use id::RelationEndPointId;
pub use load_state::{SyncUpdate, VirtualEndPointLoadState};
pub use real::RealObjectEndPoint;
pub use registry::{EndPointRegistryError, EndPointStateListener, RelationEndPointRegistry};

use crate::{error::InternalError, types::ObjectId};
use serde::Serialize;
use std::collections::BTreeSet;

///
/// SyncState
///
/// Whether a real end-point's recorded opposite agrees with what the virtual
/// side reflects. Unknown until the virtual side has been loaded.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum SyncState {
    Unknown,
    Synchronized,
    Unsynchronized,
}

///
/// RelationEndPoint
///

#[derive(Clone, Debug)]
pub enum RelationEndPoint {
    RealObject(RealObjectEndPoint),
    VirtualObject(VirtualObjectEndPoint),
    Collection(CollectionEndPoint),
}

impl RelationEndPoint {
    #[must_use]
    pub const fn id(&self) -> RelationEndPointId {
        match self {
            Self::RealObject(ep) => ep.id(),
            Self::VirtualObject(ep) => ep.id,
            Self::Collection(ep) => ep.id,
        }
    }

    #[must_use]
    pub const fn as_real(&self) -> Option<&RealObjectEndPoint> {
        match self {
            Self::RealObject(ep) => Some(ep),
            _ => None,
        }
    }

    pub const fn as_real_mut(&mut self) -> Option<&mut RealObjectEndPoint> {
        match self {
            Self::RealObject(ep) => Some(ep),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_virtual(&self) -> Option<&dyn VirtualEndPointState> {
        dispatch_virtual!(self, ep => ep as &dyn VirtualEndPointState)
    }

    pub fn as_virtual_mut(&mut self) -> Option<&mut dyn VirtualEndPointState> {
        dispatch_virtual!(self, ep => ep as &mut dyn VirtualEndPointState)
    }

    #[must_use]
    pub const fn as_collection(&self) -> Option<&CollectionEndPoint> {
        match self {
            Self::Collection(ep) => Some(ep),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_virtual_object(&self) -> Option<&VirtualObjectEndPoint> {
        match self {
            Self::VirtualObject(ep) => Some(ep),
            _ => None,
        }
    }

    /// Whether the data of this end-point differs from its original state.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        match self {
            Self::RealObject(ep) => ep.has_changed(),
            Self::VirtualObject(ep) => ep.load_state.has_changed(),
            Self::Collection(ep) => ep.load_state.has_changed(),
        }
    }
}

///
/// VirtualEndPoint
///
/// Virtual side of a relation for one owner: identity plus load state.
///

#[derive(Clone, Debug)]
pub struct VirtualEndPoint<D> {
    pub(crate) id: RelationEndPointId,
    pub(crate) load_state: VirtualEndPointLoadState<D>,
}

pub type VirtualObjectEndPoint = VirtualEndPoint<VirtualObjectEndPointData>;
pub type CollectionEndPoint = VirtualEndPoint<CollectionEndPointData>;

impl<D: VirtualEndPointData> VirtualEndPoint<D> {
    #[must_use]
    pub fn new_incomplete(id: RelationEndPointId) -> Self {
        Self {
            id,
            load_state: VirtualEndPointLoadState::default(),
        }
    }

    #[must_use]
    pub fn new_complete(id: RelationEndPointId) -> Self {
        Self {
            id,
            load_state: VirtualEndPointLoadState::new_complete(),
        }
    }

    #[must_use]
    pub const fn load_state(&self) -> &VirtualEndPointLoadState<D> {
        &self.load_state
    }

    #[must_use]
    pub const fn data(&self) -> Option<&D> {
        self.load_state.data()
    }

    pub(crate) const fn data_mut(&mut self) -> Option<&mut D> {
        self.load_state.data_mut()
    }

    fn to_end_point_ids(
        &self,
        items: impl IntoIterator<Item = ObjectId>,
    ) -> Vec<RelationEndPointId> {
        let real = self.id.definition().opposite();

        items
            .into_iter()
            .map(|item| RelationEndPointId::new(item, real))
            .collect()
    }
}

///
/// VirtualEndPointState
///
/// Object-safe view over either kind of virtual end-point.
///

pub trait VirtualEndPointState {
    fn id(&self) -> RelationEndPointId;
    fn is_data_complete(&self) -> bool;
    fn has_changed(&self) -> bool;
    fn can_be_collected(&self) -> bool;
    fn can_be_marked_incomplete(&self) -> bool;

    fn original_items(&self) -> Vec<ObjectId>;
    fn current_items(&self) -> Vec<ObjectId>;
    fn items_without_end_points(&self) -> Vec<ObjectId>;

    /// Real end-points attached to the original data.
    fn original_opposite_end_points(&self) -> Vec<RelationEndPointId>;

    /// Real end-points of the current data that are attached or were added.
    fn current_opposite_end_points(&self) -> Vec<RelationEndPointId>;

    fn unsynchronized_opposite_end_points(&self) -> Vec<RelationEndPointId>;
    fn registered_opposite_end_points(&self) -> BTreeSet<ObjectId>;

    fn register_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<SyncState, InternalError>;
    fn unregister_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<Vec<SyncUpdate>, InternalError>;
    fn unregister_original_item_without_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError>;
    fn mark_data_complete(&mut self, items: Vec<ObjectId>)
    -> Result<Vec<SyncUpdate>, InternalError>;
    fn mark_data_incomplete(&mut self) -> Result<Vec<SyncUpdate>, InternalError>;
    fn synchronize_opposite_end_point(&mut self, item: ObjectId) -> Result<(), InternalError>;
    fn set_current_items(&mut self, items: Vec<ObjectId>) -> Result<(), InternalError>;
    fn move_registration(&mut self, item: ObjectId, registered: bool);

    fn commit(&mut self);
    fn rollback(&mut self);
}

impl<D: VirtualEndPointData> VirtualEndPointState for VirtualEndPoint<D> {
    fn id(&self) -> RelationEndPointId {
        self.id
    }

    fn is_data_complete(&self) -> bool {
        self.load_state.is_data_complete()
    }

    fn has_changed(&self) -> bool {
        self.load_state.has_changed()
    }

    fn can_be_collected(&self) -> bool {
        self.load_state.can_be_collected()
    }

    fn can_be_marked_incomplete(&self) -> bool {
        self.load_state.can_be_marked_incomplete()
    }

    fn original_items(&self) -> Vec<ObjectId> {
        self.data().map(D::original_items).unwrap_or_default()
    }

    fn current_items(&self) -> Vec<ObjectId> {
        self.data().map(D::current_items).unwrap_or_default()
    }

    fn items_without_end_points(&self) -> Vec<ObjectId> {
        self.data()
            .map(D::items_without_end_points)
            .unwrap_or_default()
    }

    fn original_opposite_end_points(&self) -> Vec<RelationEndPointId> {
        let items = self.data().map(D::items_with_end_points).unwrap_or_default();

        self.to_end_point_ids(items)
    }

    fn current_opposite_end_points(&self) -> Vec<RelationEndPointId> {
        let Some(data) = self.data() else {
            return Vec::new();
        };
        let without = data.items_without_end_points();
        let items = data
            .current_items()
            .into_iter()
            .filter(|item| !without.contains(item));

        self.to_end_point_ids(items)
    }

    fn unsynchronized_opposite_end_points(&self) -> Vec<RelationEndPointId> {
        self.to_end_point_ids(self.load_state.unsynchronized_end_points())
    }

    fn registered_opposite_end_points(&self) -> BTreeSet<ObjectId> {
        self.load_state.registered_end_points()
    }

    fn register_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<SyncState, InternalError> {
        self.load_state.register_original_opposite_end_point(item)
    }

    fn unregister_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<Vec<SyncUpdate>, InternalError> {
        self.load_state.unregister_original_opposite_end_point(item)
    }

    fn unregister_original_item_without_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        let id = self.id;

        match self.data_mut() {
            Some(data) => data.unregister_original_item_without_end_point(item),
            None => Err(not_complete(id)),
        }
    }

    fn mark_data_complete(
        &mut self,
        items: Vec<ObjectId>,
    ) -> Result<Vec<SyncUpdate>, InternalError> {
        self.load_state.mark_data_complete(items)
    }

    fn mark_data_incomplete(&mut self) -> Result<Vec<SyncUpdate>, InternalError> {
        self.load_state.mark_data_incomplete()
    }

    fn synchronize_opposite_end_point(&mut self, item: ObjectId) -> Result<(), InternalError> {
        self.load_state.synchronize_opposite_end_point(item)
    }

    fn set_current_items(&mut self, items: Vec<ObjectId>) -> Result<(), InternalError> {
        let id = self.id;

        match self.data_mut() {
            Some(data) => data.set_current_items(items),
            None => Err(not_complete(id)),
        }
    }

    fn move_registration(&mut self, item: ObjectId, registered: bool) {
        self.load_state.move_registration(item, registered);
    }

    fn commit(&mut self) {
        self.load_state.commit();
    }

    fn rollback(&mut self) {
        self.load_state.rollback();
    }
}

fn not_complete(id: RelationEndPointId) -> InternalError {
    InternalError::load_state_invariant(format!("end-point '{id}' is not complete"))
}
