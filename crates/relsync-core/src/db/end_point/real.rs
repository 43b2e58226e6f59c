use crate::{
    db::end_point::{RelationEndPointId, SyncState},
    error::{InternalError, RelationErrorDetail},
    types::ObjectId,
};

///
/// RealObjectEndPoint
///
/// Foreign-key side of a relation for one object. `original_opposite` is the
/// value last loaded or committed; the owner is registered with the virtual
/// end-point of that original opposite.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RealObjectEndPoint {
    id: RelationEndPointId,
    original_opposite: Option<ObjectId>,
    current_opposite: Option<ObjectId>,
    sync_state: SyncState,
}

impl RealObjectEndPoint {
    /// End-point for a loaded object. A null foreign key has nothing to
    /// disagree with, so it starts Synchronized.
    #[must_use]
    pub const fn new(id: RelationEndPointId, opposite: Option<ObjectId>) -> Self {
        let sync_state = match opposite {
            Some(_) => SyncState::Unknown,
            None => SyncState::Synchronized,
        };

        Self {
            id,
            original_opposite: opposite,
            current_opposite: opposite,
            sync_state,
        }
    }

    #[must_use]
    pub const fn id(&self) -> RelationEndPointId {
        self.id
    }

    #[must_use]
    pub const fn object(&self) -> ObjectId {
        self.id.object()
    }

    #[must_use]
    pub const fn original_opposite(&self) -> Option<ObjectId> {
        self.original_opposite
    }

    #[must_use]
    pub const fn current_opposite(&self) -> Option<ObjectId> {
        self.current_opposite
    }

    #[must_use]
    pub const fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.original_opposite != self.current_opposite
    }

    /// Virtual end-point this one is registered with.
    #[must_use]
    pub fn original_opposite_end_point_id(&self) -> Option<RelationEndPointId> {
        self.original_opposite.map(|o| self.id.opposite_for(o))
    }

    #[must_use]
    pub fn current_opposite_end_point_id(&self) -> Option<RelationEndPointId> {
        self.current_opposite.map(|o| self.id.opposite_for(o))
    }

    /// Fail with a consistency violation if this end-point is known out of sync.
    pub(crate) fn check_mutable(&self, operation: &str) -> Result<(), InternalError> {
        match (self.sync_state, self.original_opposite) {
            (SyncState::Unsynchronized, Some(opposite)) => Err(InternalError::consistency_violation(
                operation,
                self.out_of_sync_detail(opposite),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn out_of_sync_detail(&self, opposite: ObjectId) -> RelationErrorDetail {
        let definition = self.id.definition();

        RelationErrorDetail::OutOfSync {
            object: self.object(),
            property: definition.qualified_name(),
            opposite_object: opposite,
            opposite_property: definition.opposite().qualified_name(),
        }
    }

    pub(crate) const fn set_sync_state(&mut self, sync_state: SyncState) {
        // null foreign keys never go out of sync
        self.sync_state = match self.original_opposite {
            Some(_) => sync_state,
            None => SyncState::Synchronized,
        };
    }

    pub(crate) const fn set_opposite(&mut self, opposite: Option<ObjectId>) {
        self.current_opposite = opposite;
    }

    pub(crate) const fn commit(&mut self) {
        self.original_opposite = self.current_opposite;
    }

    /// Restore the last loaded or committed opposite; sync state is untouched.
    pub(crate) const fn rollback(&mut self) {
        self.current_opposite = self.original_opposite;
    }
}
