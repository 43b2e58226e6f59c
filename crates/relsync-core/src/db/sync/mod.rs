//! Reconciliation of relations detected as out of sync.
//!
//! A real end-point becomes Unsynchronized when its loaded foreign key names
//! an owner whose (complete) virtual end-point does not reflect it, typically
//! after an out-of-process write. Synchronizing never steals an opposite
//! reference: a 1:1 slot already held by another object is refused.


use crate::{
    db::{
        end_point::{RelationEndPointId, SyncState},
        store::DataSource,
        transaction::ClientTransaction,
    },
    error::{ErrorOrigin, InternalError, RelationErrorDetail},
    obs::sink::MetricsEvent,
};

/// Whether a registered end-point agrees with its opposite side.
///
/// `None` when the end-point is not registered, a real end-point's state is
/// still Unknown, or a virtual end-point is not loaded.
#[must_use]
pub fn is_synchronized<S: DataSource>(
    tx: &ClientTransaction<S>,
    id: RelationEndPointId,
) -> Option<bool> {
    if id.is_virtual() {
        let end_point = tx.end_points.virtual_end_point(&id).ok()?;
        if !end_point.is_data_complete() {
            return None;
        }

        return Some(tx.out_of_sync_opposite(id).is_none());
    }

    match tx.sync_state(id)? {
        SyncState::Unknown => None,
        SyncState::Synchronized => Some(true),
        SyncState::Unsynchronized => Some(false),
    }
}

/// Bring an end-point back in sync with its opposite side.
pub fn synchronize<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    if id.is_virtual() {
        synchronize_virtual(tx, id)
    } else {
        synchronize_real(tx, id)
    }
}

fn synchronize_real<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    tx.ensure_object_loaded(id.object())?;

    let real = tx.end_points.real(&id)?;
    let Some(opposite) = real.original_opposite_end_point_id() else {
        return Ok(());
    };
    match real.sync_state() {
        SyncState::Synchronized => return Ok(()),
        SyncState::Unknown => {
            tx.ensure_data_complete(opposite)?;
            if tx.sync_state(id) == Some(SyncState::Synchronized) {
                return Ok(());
            }
        }
        SyncState::Unsynchronized => {}
    }

    tx.ensure_data_complete(opposite)?;
    let def = id.definition();
    let end_point = tx.end_points.virtual_end_point(&opposite)?;

    if !opposite.definition().is_collection() {
        if let Some(conflicting) = end_point.original_items().first().copied() {
            tx.record(MetricsEvent::SyncConflict {
                class: def.class(),
                property: def.property(),
            });
            tx.debug_log(format!("refused to synchronize {id}: slot held by {conflicting}"));

            return Err(InternalError::synchronization_conflict(
                RelationErrorDetail::SyncConflict {
                    object: id.object(),
                    property: def.qualified_name(),
                    virtual_object: opposite.object(),
                    virtual_property: opposite.definition().qualified_name(),
                    conflicting_object: conflicting,
                },
            ));
        }
        if end_point.has_changed() {
            return Err(InternalError::conflict(
                ErrorOrigin::Sync,
                format!(
                    "cannot synchronize '{id}': end-point '{opposite}' has uncommitted changes"
                ),
            ));
        }
    }

    tx.end_points
        .virtual_end_point_mut(&opposite)?
        .synchronize_opposite_end_point(id.object())?;
    tx.end_points
        .apply_sync_updates(&opposite, vec![(id.object(), SyncState::Synchronized)]);

    tx.record(MetricsEvent::Synchronize {
        class: def.class(),
        property: def.property(),
    });
    tx.notify(opposite);
    tx.debug_log(format!("synchronized {id} with {opposite}"));

    Ok(())
}

/// Load the virtual end-point, drop items whose real end-point is loaded
/// with another opposite, and attach unsynchronized members of a collection.
fn synchronize_virtual<S: DataSource>(
    tx: &mut ClientTransaction<S>,
    id: RelationEndPointId,
) -> Result<(), InternalError> {
    tx.ensure_data_complete(id)?;

    let def = id.definition();
    let real = def.opposite();
    let end_point = tx.end_points.virtual_end_point(&id)?;
    let stale: Vec<_> = end_point
        .items_without_end_points()
        .into_iter()
        .filter(|item| tx.end_points.contains(&RelationEndPointId::new(*item, real)))
        .collect();
    let unsynchronized: Vec<_> = if def.is_collection() {
        end_point
            .unsynchronized_opposite_end_points()
            .into_iter()
            .map(|ep| ep.object())
            .collect()
    } else {
        Vec::new()
    };
    if stale.is_empty() && unsynchronized.is_empty() {
        return Ok(());
    }

    let end_point = tx.end_points.virtual_end_point_mut(&id)?;
    for item in &stale {
        end_point.unregister_original_item_without_end_point(*item)?;
    }
    for item in &unsynchronized {
        end_point.synchronize_opposite_end_point(*item)?;
    }
    let updates = unsynchronized
        .iter()
        .map(|item| (*item, SyncState::Synchronized))
        .collect();
    tx.end_points.apply_sync_updates(&id, updates);

    tx.record(MetricsEvent::Synchronize {
        class: def.class(),
        property: def.property(),
    });
    tx.notify(id);
    tx.debug_log(format!(
        "synchronized {id}: pruned {} and attached {} end-points",
        stale.len(),
        unsynchronized.len()
    ));

    Ok(())
}
