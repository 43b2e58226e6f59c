use crate::{
    db::end_point::data::VirtualEndPointData,
    error::{ErrorOrigin, InternalError},
    types::ObjectId,
};
use std::collections::BTreeSet;

///
/// CollectionEndPointData
///
/// Ordered original/current item sequences of a 1:n virtual end-point.
/// Order is significant: it is the order the collection exposes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CollectionEndPointData {
    original_items: Vec<ObjectId>,
    current_items: Vec<ObjectId>,
    items_without_end_points: BTreeSet<ObjectId>,
}

impl CollectionEndPointData {
    #[must_use]
    pub fn original(&self) -> &[ObjectId] {
        &self.original_items
    }

    #[must_use]
    pub fn current(&self) -> &[ObjectId] {
        &self.current_items
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.current_items.len()
    }

    #[must_use]
    pub fn contains(&self, item: ObjectId) -> bool {
        self.current_items.contains(&item)
    }

    #[must_use]
    pub fn index_of(&self, item: ObjectId) -> Option<usize> {
        self.current_items.iter().position(|i| *i == item)
    }

    pub fn add(&mut self, item: ObjectId) -> Result<(), InternalError> {
        self.insert(self.current_items.len(), item)
    }

    /// Insert at `index`, keeping the relative order of the other items.
    pub fn insert(&mut self, index: usize, item: ObjectId) -> Result<(), InternalError> {
        self.check_not_contained(item)?;
        if index > self.current_items.len() {
            return Err(self.index_error(index));
        }
        self.current_items.insert(index, item);

        Ok(())
    }

    pub fn remove(&mut self, item: ObjectId) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.current_items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace the item at `index`, returning the one it displaced.
    pub fn replace(&mut self, index: usize, item: ObjectId) -> Result<ObjectId, InternalError> {
        let old = *self
            .current_items
            .get(index)
            .ok_or_else(|| self.index_error(index))?;
        if old != item {
            self.check_not_contained(item)?;
            self.current_items[index] = item;
        }

        Ok(old)
    }

    /// Remove every item, returning them in collection order.
    pub fn clear(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.current_items)
    }

    fn check_not_contained(&self, item: ObjectId) -> Result<(), InternalError> {
        if self.contains(item) {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::DataManager,
                format!("collection already contains object '{item}'"),
            ));
        }

        Ok(())
    }

    fn index_error(&self, index: usize) -> InternalError {
        InternalError::invalid_argument(
            ErrorOrigin::DataManager,
            format!(
                "index {index} is out of range for a collection of {} items",
                self.current_items.len()
            ),
        )
    }
}

impl VirtualEndPointData for CollectionEndPointData {
    fn from_loaded_items(items: Vec<ObjectId>) -> Result<Self, InternalError> {
        let unique: BTreeSet<_> = items.iter().copied().collect();
        if unique.len() != items.len() {
            return Err(InternalError::load_failure(
                ErrorOrigin::DataManager,
                "loaded collection contains the same object more than once",
            ));
        }

        Ok(Self {
            original_items: items.clone(),
            current_items: items,
            items_without_end_points: unique,
        })
    }

    fn original_items(&self) -> Vec<ObjectId> {
        self.original_items.clone()
    }

    fn current_items(&self) -> Vec<ObjectId> {
        self.current_items.clone()
    }

    fn has_data_changed(&self) -> bool {
        self.original_items != self.current_items
    }

    fn items_without_end_points(&self) -> Vec<ObjectId> {
        self.original_items
            .iter()
            .filter(|i| self.items_without_end_points.contains(i))
            .copied()
            .collect()
    }

    fn has_item_without_end_point(&self, item: ObjectId) -> bool {
        self.items_without_end_points.contains(&item)
    }

    fn items_with_end_points(&self) -> Vec<ObjectId> {
        self.original_items
            .iter()
            .filter(|i| !self.items_without_end_points.contains(i))
            .copied()
            .collect()
    }

    fn register_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        if self.items_without_end_points.remove(&item) {
            return Ok(());
        }
        if self.original_items.contains(&item) {
            return Err(InternalError::data_manager_invariant(format!(
                "an end-point for object '{item}' is already registered"
            )));
        }
        if self.current_items.contains(&item) {
            return Err(InternalError::data_manager_invariant(format!(
                "object '{item}' was added to the current collection and cannot be registered as original"
            )));
        }

        self.original_items.push(item);
        self.current_items.push(item);

        Ok(())
    }

    fn unregister_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        if !self.original_items.contains(&item) || self.items_without_end_points.contains(&item) {
            return Err(InternalError::data_manager_invariant(format!(
                "no end-point for object '{item}' is registered"
            )));
        }
        self.items_without_end_points.insert(item);

        Ok(())
    }

    fn unregister_original_item_without_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        if !self.items_without_end_points.remove(&item) {
            return Err(InternalError::data_manager_invariant(format!(
                "object '{item}' is not an original item without end-point"
            )));
        }
        self.original_items.retain(|i| *i != item);
        self.current_items.retain(|i| *i != item);

        Ok(())
    }

    fn set_current_items(&mut self, items: Vec<ObjectId>) -> Result<(), InternalError> {
        let unique: BTreeSet<_> = items.iter().collect();
        if unique.len() != items.len() {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::DataManager,
                "collection items must be unique",
            ));
        }
        self.current_items = items;

        Ok(())
    }

    fn commit(&mut self) {
        self.original_items.clone_from(&self.current_items);
        let original = &self.original_items;
        self.items_without_end_points.retain(|i| original.contains(i));
    }

    fn rollback(&mut self) {
        self.current_items.clone_from(&self.original_items);
    }
}
