use crate::{
    db::{
        end_point::RelationEndPointId, store::DataSource, transaction::ClientTransaction,
    },
    error::{ErrorOrigin, InternalError},
    types::ObjectId,
};
use std::collections::BTreeMap;

///
/// CollectionHandle
///
/// Stable handle to one collection end-point. The same handle is returned
/// for as long as the owning object stays loaded, even across unloading and
/// reloading of the collection's data.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CollectionHandle {
    proxy: u64,
    end_point: RelationEndPointId,
}

impl CollectionHandle {
    #[must_use]
    pub const fn end_point_id(&self) -> RelationEndPointId {
        self.end_point
    }

    #[must_use]
    pub const fn owner(&self) -> ObjectId {
        self.end_point.object()
    }

    /// Current items, loading the collection if needed.
    pub fn items<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
    ) -> Result<Vec<ObjectId>, InternalError> {
        tx.ensure_data_complete(self.end_point)?;

        Ok(tx.end_points.virtual_end_point(&self.end_point)?.current_items())
    }

    /// Items as last loaded or committed.
    pub fn original_items<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
    ) -> Result<Vec<ObjectId>, InternalError> {
        tx.ensure_data_complete(self.end_point)?;

        Ok(tx.end_points.virtual_end_point(&self.end_point)?.original_items())
    }

    pub fn count<S: DataSource>(&self, tx: &mut ClientTransaction<S>) -> Result<usize, InternalError> {
        self.items(tx).map(|items| items.len())
    }

    pub fn contains<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
        item: ObjectId,
    ) -> Result<bool, InternalError> {
        self.items(tx).map(|items| items.contains(&item))
    }

    /// Append `item`, moving it out of whatever collection held it before.
    pub fn add<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        tx.collection_insert(self.end_point, None, item)
    }

    pub fn insert<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
        index: usize,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        tx.collection_insert(self.end_point, Some(index), item)
    }

    /// Remove `item`; `false` if it was not in the collection.
    pub fn remove<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
        item: ObjectId,
    ) -> Result<bool, InternalError> {
        tx.collection_remove(self.end_point, item)
    }

    /// Replace the item at `index`, returning the one removed.
    pub fn replace<S: DataSource>(
        &self,
        tx: &mut ClientTransaction<S>,
        index: usize,
        item: ObjectId,
    ) -> Result<ObjectId, InternalError> {
        tx.collection_replace(self.end_point, index, item)
    }

    pub fn clear<S: DataSource>(&self, tx: &mut ClientTransaction<S>) -> Result<(), InternalError> {
        tx.collection_clear(self.end_point)
    }
}

///
/// CollectionProxyManager
///
/// Hands out one handle per collection end-point.
///

#[derive(Debug, Default)]
pub(crate) struct CollectionProxyManager {
    next: u64,
    handles: BTreeMap<RelationEndPointId, CollectionHandle>,
}

impl CollectionProxyManager {
    pub(crate) fn get_or_create(&mut self, end_point: RelationEndPointId) -> CollectionHandle {
        let next = &mut self.next;

        *self.handles.entry(end_point).or_insert_with(|| {
            *next += 1;
            CollectionHandle {
                proxy: *next,
                end_point,
            }
        })
    }

    pub(crate) fn forget(&mut self, end_point: &RelationEndPointId) {
        self.handles.remove(end_point);
    }
}

impl<S: DataSource> ClientTransaction<S> {
    /// Handle for a collection property. Loads the owner but not the items.
    pub fn collection(
        &mut self,
        object: ObjectId,
        property: &str,
    ) -> Result<CollectionHandle, InternalError> {
        let id = self.resolve_collection(object, property)?;
        self.get_relation_end_point_with_lazy_load(id)?;

        Ok(self.proxies.get_or_create(id))
    }

    pub(crate) fn collection_insert(
        &mut self,
        id: RelationEndPointId,
        index: Option<usize>,
        item: ObjectId,
    ) -> Result<(), InternalError> {
        let operation = format!("insert into collection '{}'", id.definition());

        self.ensure_data_complete(id)?;
        self.check_not_deleted(id.object(), &operation)?;

        let items = self.end_points.virtual_end_point(&id)?.current_items();
        if items.contains(&item) {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Transaction,
                format!("cannot {operation}: object '{item}' is already contained"),
            ));
        }
        if let Some(index) = index.filter(|index| *index > items.len()) {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Transaction,
                format!(
                    "cannot {operation}: index {index} is out of range for {} items",
                    items.len()
                ),
            ));
        }

        let real = RelationEndPointId::new(item, id.definition().opposite());
        let plan = self
            .prepare_relink(real, Some(id.object()), &operation)?
            .ok_or_else(|| {
                InternalError::transaction_invariant(format!(
                    "object '{item}' refers to '{}' but is not in its collection",
                    id.object()
                ))
            })?;

        self.apply_relink(match index {
            Some(index) => plan.at(index),
            None => plan,
        })
    }

    pub(crate) fn collection_remove(
        &mut self,
        id: RelationEndPointId,
        item: ObjectId,
    ) -> Result<bool, InternalError> {
        let operation = format!("remove from collection '{}'", id.definition());

        self.ensure_data_complete(id)?;
        if !self.end_points.virtual_end_point(&id)?.current_items().contains(&item) {
            return Ok(false);
        }
        self.check_not_deleted(id.object(), &operation)?;
        self.ensure_object_loaded(item)?;
        self.check_virtual_synchronized(id, &operation)?;

        let real = RelationEndPointId::new(item, id.definition().opposite());
        if let Some(plan) = self.prepare_relink(real, None, &operation)? {
            self.apply_relink(plan)?;
        }

        Ok(true)
    }

    pub(crate) fn collection_replace(
        &mut self,
        id: RelationEndPointId,
        index: usize,
        item: ObjectId,
    ) -> Result<ObjectId, InternalError> {
        let operation = format!("replace in collection '{}'", id.definition());

        self.ensure_data_complete(id)?;
        self.check_not_deleted(id.object(), &operation)?;

        let items = self.end_points.virtual_end_point(&id)?.current_items();
        let old = *items.get(index).ok_or_else(|| {
            InternalError::invalid_argument(
                ErrorOrigin::Transaction,
                format!(
                    "cannot {operation}: index {index} is out of range for {} items",
                    items.len()
                ),
            )
        })?;
        if old == item {
            return Ok(old);
        }
        if items.contains(&item) {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Transaction,
                format!("cannot {operation}: object '{item}' is already contained"),
            ));
        }
        self.ensure_object_loaded(old)?;
        self.check_virtual_synchronized(id, &operation)?;

        let real = id.definition().opposite();
        let removal = self.prepare_relink(RelationEndPointId::new(old, real), None, &operation)?;
        let addition =
            self.prepare_relink(RelationEndPointId::new(item, real), Some(id.object()), &operation)?;

        if let Some(plan) = removal {
            self.apply_relink(plan)?;
        }
        if let Some(plan) = addition {
            self.apply_relink(plan.at(index))?;
        }

        Ok(old)
    }

    pub(crate) fn collection_clear(&mut self, id: RelationEndPointId) -> Result<(), InternalError> {
        let operation = format!("clear collection '{}'", id.definition());

        self.ensure_data_complete(id)?;
        self.check_not_deleted(id.object(), &operation)?;

        let real = id.definition().opposite();
        let items = self.end_points.virtual_end_point(&id)?.current_items();
        self.ensure_items_loaded(&items)?;
        self.check_virtual_synchronized(id, &operation)?;

        let mut plans = Vec::new();
        for item in items {
            plans.extend(self.prepare_relink(RelationEndPointId::new(item, real), None, &operation)?);
        }
        for plan in plans {
            self.apply_relink(plan)?;
        }

        Ok(())
    }
}
