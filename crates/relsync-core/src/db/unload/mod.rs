//! Explicit eviction of loaded objects and virtual end-point data.
//!
//! Unloading never discards uncommitted changes. A virtual end-point is
//! removed from the registry only once nothing refers to it any more;
//! otherwise it is kept Incomplete and reloads on next access.


use crate::{
    db::{
        end_point::RelationEndPointId,
        store::DataSource,
        transaction::{ClientTransaction, Lifecycle, ObjectState},
    },
    error::{ErrorOrigin, InternalError},
    obs::sink::MetricsEvent,
    types::ObjectId,
};

/// Unload an unchanged object and its real end-points, cascading to
/// virtual end-points left without references. No-op if not loaded.
pub fn unload_data<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    object: ObjectId,
) -> Result<(), InternalError> {
    if let Some(reason) = object_unload_blocker(tx, object) {
        return Err(InternalError::conflict(
            ErrorOrigin::Unload,
            format!("cannot unload object '{object}': {reason}"),
        ));
    }
    if !tx.is_loaded(object) {
        return Ok(());
    }

    for id in tx.end_points.ids_for_object(object) {
        if id.is_virtual() {
            unload_end_point_data(tx, id)?;
        } else if let Some(opposite) = tx.end_points.unregister_real_end_point(&id)? {
            collect(tx, opposite);
        }
    }
    tx.objects.remove(&object);

    tx.record(MetricsEvent::ObjectUnload {
        class: object.class(),
    });
    tx.debug_log(format!("unloaded object {object}"));

    Ok(())
}

/// Like [`unload_data`], but returns `false` instead of failing when the
/// object has uncommitted changes.
pub fn try_unload_data<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    object: ObjectId,
) -> Result<bool, InternalError> {
    if object_unload_blocker(tx, object).is_some() {
        return Ok(false);
    }
    unload_data(tx, object)?;

    Ok(true)
}

/// Discard the data of an unchanged virtual end-point. It stays registered
/// Incomplete while real end-points refer to it.
pub fn unload_virtual_end_point<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    if let Some(reason) = end_point_unload_blocker(tx, id)? {
        return Err(InternalError::conflict(
            ErrorOrigin::Unload,
            format!("cannot unload end-point '{id}': {reason}"),
        ));
    }

    unload_end_point_data(tx, id)
}

pub fn try_unload_virtual_end_point<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<bool, InternalError> {
    if end_point_unload_blocker(tx, id)?.is_some() {
        return Ok(false);
    }
    unload_end_point_data(tx, id)?;

    Ok(true)
}

/// Unload a virtual end-point together with every item object it holds.
pub fn unload_virtual_end_point_and_item_data<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    if let Some(reason) = subgraph_unload_blocker(tx, id)? {
        return Err(InternalError::conflict(
            ErrorOrigin::Unload,
            format!("cannot unload end-point '{id}' with its items: {reason}"),
        ));
    }

    unload_subgraph(tx, id)
}

pub fn try_unload_virtual_end_point_and_item_data<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<bool, InternalError> {
    if subgraph_unload_blocker(tx, id)?.is_some() {
        return Ok(false);
    }
    unload_subgraph(tx, id)?;

    Ok(true)
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn object_unload_blocker<S: DataSource>(
    tx: &ClientTransaction<S>,
    object: ObjectId,
) -> Option<String> {
    match tx.object_state(object)? {
        ObjectState::Unchanged => None,
        state => Some(format!("its state is {state:?}")),
    }
}

fn end_point_unload_blocker<S: DataSource>(
    tx: &ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<Option<String>, InternalError> {
    if !id.is_virtual() {
        return Err(InternalError::invalid_argument(
            ErrorOrigin::Unload,
            format!("'{id}' is not a virtual end-point"),
        ));
    }
    let Ok(end_point) = tx.end_points.virtual_end_point(&id) else {
        return Ok(None);
    };

    if tx
        .objects
        .get(&id.object())
        .is_some_and(|data| data.lifecycle == Lifecycle::New)
    {
        return Ok(Some("its owner is new".to_string()));
    }
    if end_point.has_changed() {
        return Ok(Some("its data has uncommitted changes".to_string()));
    }

    Ok(None)
}

/// Loaded items of a virtual end-point: its current data when complete,
/// the registered real end-points otherwise.
fn loaded_items<S: DataSource>(tx: &ClientTransaction<S>, id: RelationEndPointId) -> Vec<ObjectId> {
    let Ok(end_point) = tx.end_points.virtual_end_point(&id) else {
        return Vec::new();
    };
    let items = if end_point.is_data_complete() {
        end_point.current_items()
    } else {
        end_point.registered_opposite_end_points().into_iter().collect()
    };

    items.into_iter().filter(|item| tx.is_loaded(*item)).collect()
}

fn subgraph_unload_blocker<S: DataSource>(
    tx: &ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<Option<String>, InternalError> {
    if let Some(reason) = end_point_unload_blocker(tx, id)? {
        return Ok(Some(reason));
    }

    Ok(loaded_items(tx, id).into_iter().find_map(|item| {
        object_unload_blocker(tx, item).map(|reason| format!("item '{item}': {reason}"))
    }))
}

fn unload_subgraph<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    for item in loaded_items(tx, id) {
        unload_data(tx, item)?;
    }
    if tx.end_points.contains(&id) {
        unload_end_point_data(tx, id)?;
    }

    Ok(())
}

/// Complete -> Incomplete, then collect if nothing refers to it.
fn unload_end_point_data<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    let Ok(end_point) = tx.end_points.virtual_end_point(&id) else {
        return Ok(());
    };

    if end_point.is_data_complete() {
        tx.end_points.mark_data_incomplete(&id)?;

        let def = id.definition();
        tx.record(MetricsEvent::EndPointUnload {
            class: def.class(),
            property: def.property(),
        });
        tx.notify(id);
        tx.debug_log(format!("unloaded data of {id}"));
    }
    collect(tx, id);

    Ok(())
}

fn collect<S: DataSource>(tx: &mut ClientTransaction<S>, id: RelationEndPointId) {
    if tx.end_points.collect_if_unreferenced(&id) {
        let def = id.definition();
        tx.record(MetricsEvent::EndPointCollected {
            class: def.class(),
            property: def.property(),
        });
        tx.debug_log(format!("collected {id}"));
    }
}
