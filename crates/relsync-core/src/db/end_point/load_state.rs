use crate::{
    db::end_point::{SyncState, data::VirtualEndPointData},
    error::{ErrorOrigin, InternalError},
    types::ObjectId,
};
use std::collections::BTreeSet;

///
/// SyncUpdate
/// A sync-state change the registry must apply to the real end-point owned by
/// `object`.
///

pub type SyncUpdate = (ObjectId, SyncState);

///
/// VirtualEndPointLoadState
///
/// Incomplete/Complete state machine of a virtual end-point. Opposite real
/// end-points are tracked by their owning object.
///

#[derive(Clone, Debug)]
pub enum VirtualEndPointLoadState<D> {
    /// Data not loaded. `registered` holds real end-points whose original
    /// opposite is this end-point's owner.
    Incomplete { registered: BTreeSet<ObjectId> },

    /// Data loaded. `unsynchronized` holds real end-points that claim this
    /// owner but are not part of the loaded data.
    Complete {
        data: D,
        unsynchronized: BTreeSet<ObjectId>,
    },
}

impl<D> Default for VirtualEndPointLoadState<D> {
    fn default() -> Self {
        Self::Incomplete {
            registered: BTreeSet::new(),
        }
    }
}

impl<D: VirtualEndPointData> VirtualEndPointLoadState<D> {
    /// Complete and empty; used for the end-points of new objects.
    #[must_use]
    pub fn new_complete() -> Self {
        Self::Complete {
            data: D::default(),
            unsynchronized: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn is_data_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    #[must_use]
    pub const fn data(&self) -> Option<&D> {
        match self {
            Self::Complete { data, .. } => Some(data),
            Self::Incomplete { .. } => None,
        }
    }

    pub const fn data_mut(&mut self) -> Option<&mut D> {
        match self {
            Self::Complete { data, .. } => Some(data),
            Self::Incomplete { .. } => None,
        }
    }

    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.data().is_some_and(VirtualEndPointData::has_data_changed)
    }

    /// Nothing refers to this end-point any more.
    #[must_use]
    pub fn can_be_collected(&self) -> bool {
        matches!(self, Self::Incomplete { registered } if registered.is_empty())
    }

    #[must_use]
    pub fn can_be_marked_incomplete(&self) -> bool {
        !self.has_changed()
    }

    /// Every real end-point currently tied to this one, attached or not.
    #[must_use]
    pub fn registered_end_points(&self) -> BTreeSet<ObjectId> {
        match self {
            Self::Incomplete { registered } => registered.clone(),
            Self::Complete {
                data,
                unsynchronized,
            } => data
                .items_with_end_points()
                .into_iter()
                .chain(unsynchronized.iter().copied())
                .collect(),
        }
    }

    #[must_use]
    pub fn unsynchronized_end_points(&self) -> BTreeSet<ObjectId> {
        match self {
            Self::Incomplete { .. } => BTreeSet::new(),
            Self::Complete { unsynchronized, .. } => unsynchronized.clone(),
        }
    }

    /// Register a real end-point whose original opposite is this owner and
    /// return the sync state it should take.
    pub fn register_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<SyncState, InternalError> {
        match self {
            Self::Incomplete { registered } => {
                if !registered.insert(item) {
                    return Err(duplicate_registration(item));
                }

                Ok(SyncState::Unknown)
            }
            Self::Complete {
                data,
                unsynchronized,
            } => {
                if data.has_item_without_end_point(item) {
                    data.register_original_opposite_end_point(item)?;

                    return Ok(SyncState::Synchronized);
                }
                if data.items_with_end_points().contains(&item) || !unsynchronized.insert(item) {
                    return Err(duplicate_registration(item));
                }

                Ok(SyncState::Unsynchronized)
            }
        }
    }

    /// Remove a real end-point (its object is being unloaded or removed).
    ///
    /// A complete end-point whose last attached opposite leaves becomes
    /// Incomplete when its data is unchanged; the remaining unsynchronized
    /// end-points are reset to Unknown.
    pub fn unregister_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<Vec<SyncUpdate>, InternalError> {
        match self {
            Self::Incomplete { registered } => {
                if !registered.remove(&item) {
                    return Err(missing_registration(item));
                }

                Ok(Vec::new())
            }
            Self::Complete {
                data,
                unsynchronized,
            } => {
                if unsynchronized.remove(&item) {
                    return Ok(Vec::new());
                }
                data.unregister_original_opposite_end_point(item)?;

                if data.items_with_end_points().is_empty() && !data.has_data_changed() {
                    let registered = std::mem::take(unsynchronized);
                    let updates = registered
                        .iter()
                        .map(|o| (*o, SyncState::Unknown))
                        .collect();
                    *self = Self::Incomplete { registered };

                    return Ok(updates);
                }

                Ok(Vec::new())
            }
        }
    }

    /// Transition Incomplete -> Complete with already-available data.
    ///
    /// Registered end-points found in `items` become Synchronized, the rest
    /// Unsynchronized. On a complete end-point identical data is a no-op and
    /// conflicting data is an invariant violation.
    pub fn mark_data_complete(
        &mut self,
        items: Vec<ObjectId>,
    ) -> Result<Vec<SyncUpdate>, InternalError> {
        match self {
            Self::Complete { data, .. } => {
                if data.original_items() == items {
                    return Ok(Vec::new());
                }

                Err(InternalError::load_state_invariant(
                    "cannot mark a complete end-point complete with conflicting data",
                ))
            }
            Self::Incomplete { registered } => {
                let mut data = D::from_loaded_items(items)?;
                let mut unsynchronized = BTreeSet::new();
                let mut updates = Vec::with_capacity(registered.len());

                for item in registered.iter().copied() {
                    if data.has_item_without_end_point(item) {
                        data.register_original_opposite_end_point(item)?;
                        updates.push((item, SyncState::Synchronized));
                    } else {
                        unsynchronized.insert(item);
                        updates.push((item, SyncState::Unsynchronized));
                    }
                }

                *self = Self::Complete {
                    data,
                    unsynchronized,
                };

                Ok(updates)
            }
        }
    }

    /// Transition Complete -> Incomplete, discarding the data. Every
    /// registered end-point is reset to Unknown.
    pub fn mark_data_incomplete(&mut self) -> Result<Vec<SyncUpdate>, InternalError> {
        match self {
            Self::Incomplete { .. } => Ok(Vec::new()),
            Self::Complete { data, .. } => {
                if data.has_data_changed() {
                    return Err(InternalError::conflict(
                        ErrorOrigin::LoadState,
                        "cannot mark an end-point with changed data incomplete",
                    ));
                }

                let registered = self.registered_end_points();
                let updates = registered
                    .iter()
                    .map(|o| (*o, SyncState::Unknown))
                    .collect();
                *self = Self::Incomplete { registered };

                Ok(updates)
            }
        }
    }

    /// Move an unsynchronized end-point into the data.
    pub fn synchronize_opposite_end_point(&mut self, item: ObjectId) -> Result<(), InternalError> {
        match self {
            Self::Incomplete { .. } => Err(InternalError::load_state_invariant(format!(
                "cannot synchronize '{item}' against an incomplete end-point"
            ))),
            Self::Complete {
                data,
                unsynchronized,
            } => {
                if !unsynchronized.contains(&item) {
                    return Err(InternalError::load_state_invariant(format!(
                        "end-point of '{item}' is not unsynchronized"
                    )));
                }
                data.register_original_opposite_end_point(item)?;
                unsynchronized.remove(&item);

                Ok(())
            }
        }
    }

    /// Record the registration move of a committed real end-point on an
    /// incomplete end-point (complete ones track it through their data).
    pub fn move_registration(&mut self, item: ObjectId, registered: bool) {
        if let Self::Incomplete { registered: set } = self {
            if registered {
                set.insert(item);
            } else {
                set.remove(&item);
            }
        }
    }

    pub fn commit(&mut self) {
        if let Some(data) = self.data_mut() {
            data.commit();
        }
    }

    pub fn rollback(&mut self) {
        if let Some(data) = self.data_mut() {
            data.rollback();
        }
    }
}

fn duplicate_registration(item: ObjectId) -> InternalError {
    InternalError::load_state_invariant(format!(
        "the end-point of '{item}' is already registered"
    ))
}

fn missing_registration(item: ObjectId) -> InternalError {
    InternalError::load_state_invariant(format!("the end-point of '{item}' is not registered"))
}
