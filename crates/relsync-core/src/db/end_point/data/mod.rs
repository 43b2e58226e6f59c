//! Data managers for complete virtual end-points.
//!
//! A data manager holds the original (last loaded or committed) and current
//! opposite objects of one virtual end-point, plus which original items have
//! no loaded real end-point attached. It is the single source of truth once
//! the end-point is complete.

mod collection;
mod object;


pub use collection::CollectionEndPointData;
pub use object::VirtualObjectEndPointData;

use crate::{error::InternalError, types::ObjectId};
use std::fmt::Debug;

///
/// VirtualEndPointData
///
/// Operations the load state needs from either data manager.
///

pub trait VirtualEndPointData: Clone + Debug + Default {
    /// Build from freshly loaded items; none has an end-point attached yet.
    fn from_loaded_items(items: Vec<ObjectId>) -> Result<Self, InternalError>;

    fn original_items(&self) -> Vec<ObjectId>;
    fn current_items(&self) -> Vec<ObjectId>;
    fn has_data_changed(&self) -> bool;

    /// Original items whose real end-point is not attached.
    fn items_without_end_points(&self) -> Vec<ObjectId>;
    fn has_item_without_end_point(&self, item: ObjectId) -> bool;

    /// Original items with an attached real end-point.
    fn items_with_end_points(&self) -> Vec<ObjectId>;

    /// Attach the end-point of an item already present without one, or add a
    /// new item to both the original and current data.
    fn register_original_opposite_end_point(&mut self, item: ObjectId)
    -> Result<(), InternalError>;

    /// Detach an item's end-point; the item stays in the data.
    fn unregister_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError>;

    /// Drop an item that has no end-point from both original and current data.
    fn unregister_original_item_without_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError>;

    /// Overwrite the current data wholesale (applying a sub-transaction).
    fn set_current_items(&mut self, items: Vec<ObjectId>) -> Result<(), InternalError>;

    fn commit(&mut self);
    fn rollback(&mut self);
}
