use crate::{
    db::end_point::data::VirtualEndPointData,
    error::{ErrorOrigin, InternalError},
    types::ObjectId,
};

///
/// VirtualObjectEndPointData
///
/// Original/current opposite object of a 1:1 virtual end-point.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VirtualObjectEndPointData {
    original_opposite: Option<ObjectId>,
    current_opposite: Option<ObjectId>,
    original_has_end_point: bool,
}

impl VirtualObjectEndPointData {
    #[must_use]
    pub const fn original_opposite(&self) -> Option<ObjectId> {
        self.original_opposite
    }

    #[must_use]
    pub const fn current_opposite(&self) -> Option<ObjectId> {
        self.current_opposite
    }

    /// Set the current opposite object, returning the previous one.
    pub const fn set_opposite(&mut self, opposite: Option<ObjectId>) -> Option<ObjectId> {
        std::mem::replace(&mut self.current_opposite, opposite)
    }
}

impl VirtualEndPointData for VirtualObjectEndPointData {
    fn from_loaded_items(items: Vec<ObjectId>) -> Result<Self, InternalError> {
        match items.as_slice() {
            [] => Ok(Self::default()),
            [item] => Ok(Self {
                original_opposite: Some(*item),
                current_opposite: Some(*item),
                original_has_end_point: false,
            }),
            [first, second, ..] => Err(InternalError::load_failure(
                ErrorOrigin::DataManager,
                format!(
                    "one-to-one relation loaded {} opposite objects ('{first}', '{second}', ...)",
                    items.len()
                ),
            )),
        }
    }

    fn original_items(&self) -> Vec<ObjectId> {
        self.original_opposite.into_iter().collect()
    }

    fn current_items(&self) -> Vec<ObjectId> {
        self.current_opposite.into_iter().collect()
    }

    fn has_data_changed(&self) -> bool {
        self.original_opposite != self.current_opposite
    }

    fn items_without_end_points(&self) -> Vec<ObjectId> {
        self.original_opposite
            .filter(|_| !self.original_has_end_point)
            .into_iter()
            .collect()
    }

    fn has_item_without_end_point(&self, item: ObjectId) -> bool {
        self.original_opposite == Some(item) && !self.original_has_end_point
    }

    fn items_with_end_points(&self) -> Vec<ObjectId> {
        self.original_opposite
            .filter(|_| self.original_has_end_point)
            .into_iter()
            .collect()
    }

    fn register_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        if self.has_item_without_end_point(item) {
            self.original_has_end_point = true;
            return Ok(());
        }
        if let Some(existing) = self.original_opposite {
            return Err(InternalError::data_manager_invariant(format!(
                "cannot register object '{item}': the original opposite is already '{existing}'"
            )));
        }
        if self.has_data_changed() {
            return Err(InternalError::data_manager_invariant(format!(
                "cannot register object '{item}' while the current opposite has changed"
            )));
        }

        self.original_opposite = Some(item);
        self.current_opposite = Some(item);
        self.original_has_end_point = true;

        Ok(())
    }

    fn unregister_original_opposite_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        if self.original_opposite != Some(item) || !self.original_has_end_point {
            return Err(InternalError::data_manager_invariant(format!(
                "no end-point for object '{item}' is registered"
            )));
        }
        self.original_has_end_point = false;

        Ok(())
    }

    fn unregister_original_item_without_end_point(
        &mut self,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        if !self.has_item_without_end_point(item) {
            return Err(InternalError::data_manager_invariant(format!(
                "object '{item}' is not an original item without end-point"
            )));
        }
        self.original_opposite = None;
        if self.current_opposite == Some(item) {
            self.current_opposite = None;
        }

        Ok(())
    }

    fn set_current_items(&mut self, items: Vec<ObjectId>) -> Result<(), InternalError> {
        match items.as_slice() {
            [] => self.current_opposite = None,
            [item] => self.current_opposite = Some(*item),
            _ => {
                return Err(InternalError::invalid_argument(
                    ErrorOrigin::DataManager,
                    "a one-to-one relation holds at most one opposite object",
                ));
            }
        }

        Ok(())
    }

    fn commit(&mut self) {
        if self.has_data_changed() {
            // a new current opposite was reached through its loaded end-point
            self.original_has_end_point = self.current_opposite.is_some();
            self.original_opposite = self.current_opposite;
        }
    }

    fn rollback(&mut self) {
        self.current_opposite = self.original_opposite;
    }
}
