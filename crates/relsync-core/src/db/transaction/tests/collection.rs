use super::*;
use crate::db::{sync, unload::unload_data};

#[test]
fn handle_is_stable_per_end_point() {
    let store = store();
    let mut tx = transaction(&store);

    let first = tx.collection(order(1), "OrderItems").unwrap();
    let second = tx.collection(order(1), "OrderItems").unwrap();
    let other = tx.collection(order(2), "OrderItems").unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(first.owner(), order(1));
    assert_eq!(first.end_point_id(), end_point(order(1), "OrderItems"));
}

#[test]
fn handle_for_single_property_is_rejected() {
    let store = store();
    let mut tx = transaction(&store);

    let err = tx.collection(employee(1), "Computer").unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidArgument);
}

#[test]
fn add_moves_item_between_collections() {
    let store = store();
    let mut tx = transaction(&store);
    let first = tx.collection(order(1), "OrderItems").unwrap();
    let second = tx.collection(order(2), "OrderItems").unwrap();

    second.add(&mut tx, item(1)).expect("add should succeed");

    assert_eq!(first.items(&mut tx).unwrap(), vec![item(2)]);
    assert_eq!(second.items(&mut tx).unwrap(), vec![item(3), item(1)]);
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), Some(order(2)));
    assert_eq!(
        tx.get_original_related_object(item(1), "Order").unwrap(),
        Some(order(1))
    );
    assert_eq!(first.original_items(&mut tx).unwrap(), vec![item(1), item(2)]);
    assert_eq!(tx.object_state(item(1)), Some(ObjectState::Changed));
    assert_eq!(tx.object_state(order(1)), Some(ObjectState::Changed));
    assert_eq!(tx.object_state(item(2)), Some(ObjectState::Unchanged));
}

#[test]
fn insert_at_index_then_rollback_restores_exact_sequence() {
    let store = store();
    let mut tx = transaction(&store);
    let items_id = end_point(order(1), "OrderItems");
    let handle = tx.collection(order(1), "OrderItems").unwrap();

    handle.insert(&mut tx, 1, item(3)).expect("insert should succeed");
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(3), item(2)]);
    assert_eq!(handle.count(&mut tx).unwrap(), 3);

    tx.rollback();

    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
    let end_point_state = tx.end_points().virtual_end_point(&items_id).unwrap();
    assert_eq!(
        end_point_state.original_opposite_end_points(),
        vec![end_point(item(1), "Order"), end_point(item(2), "Order")]
    );
    assert_eq!(
        end_point_state.current_opposite_end_points(),
        vec![end_point(item(1), "Order"), end_point(item(2), "Order")]
    );
    assert_eq!(tx.get_related_object(item(3), "Order").unwrap(), Some(order(2)));
    assert_eq!(items(&mut tx, order(2)), vec![item(3)]);
}

#[test]
fn duplicates_and_bad_indexes_are_rejected() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(1), "OrderItems").unwrap();

    let err = handle.add(&mut tx, item(1)).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvalidArgument);

    let err = handle.insert(&mut tx, 3, item(3)).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvalidArgument);

    let err = handle.replace(&mut tx, 2, item(3)).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvalidArgument);

    let err = handle.add(&mut tx, computer(1)).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvalidArgument);

    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
    assert!(tx.change_set().unwrap().is_empty());
}

#[test]
fn replace_swaps_in_place() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(1), "OrderItems").unwrap();

    let old = handle.replace(&mut tx, 0, item(3)).expect("replace should succeed");

    assert_eq!(old, item(1));
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(3), item(2)]);
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), None);
    assert_eq!(tx.get_related_object(item(3), "Order").unwrap(), Some(order(1)));
    assert!(items(&mut tx, order(2)).is_empty());

    // replacing an item with itself changes nothing
    assert_eq!(handle.replace(&mut tx, 1, item(2)).unwrap(), item(2));
}

#[test]
fn remove_and_clear_null_the_foreign_keys() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(1), "OrderItems").unwrap();

    assert!(handle.remove(&mut tx, item(2)).unwrap());
    assert!(!handle.remove(&mut tx, item(3)).unwrap());
    assert!(!handle.contains(&mut tx, item(2)).unwrap());
    assert_eq!(tx.get_related_object(item(2), "Order").unwrap(), None);

    handle.clear(&mut tx).expect("clear should succeed");

    assert_eq!(handle.count(&mut tx).unwrap(), 0);
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), None);
    assert_eq!(handle.original_items(&mut tx).unwrap(), vec![item(1), item(2)]);
}

#[test]
fn mutation_loads_an_incomplete_collection_first() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(2), "OrderItems").unwrap();
    assert_eq!(is_complete(&tx, handle.end_point_id()), Some(false));

    handle.add(&mut tx, item(2)).unwrap();

    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(3), item(2)]);
}

#[test]
fn out_of_sync_collection_refuses_mutation() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(1), "OrderItems").unwrap();
    handle.items(&mut tx).unwrap();

    // another writer moves item 3 into order 1
    store.set_relation(item(3), "Order", Some(order(1))).unwrap();
    tx.ensure_object_loaded(item(3)).unwrap();
    assert_eq!(
        tx.sync_state(end_point(item(3), "Order")),
        Some(SyncState::Unsynchronized)
    );

    let err = handle.remove(&mut tx, item(1)).unwrap_err();

    assert!(err.is_consistency_violation());
    assert!(matches!(
        err.relation_detail(),
        Some(RelationErrorDetail::OutOfSync { opposite_object, .. }) if *opposite_object == item(3)
    ));
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
}

// Order 1 stays complete through item 2 while item 1 is unloaded; another
// writer then moves item 1 to order 2.
fn unload_item_and_move_it_in_storage(
    store: &MemoryStore,
    tx: &mut ClientTransaction<MemoryStore>,
) -> CollectionHandle {
    let handle = tx.collection(order(1), "OrderItems").unwrap();
    assert_eq!(handle.items(tx).unwrap(), vec![item(1), item(2)]);

    unload_data(tx, item(1)).expect("unload should succeed");
    store.set_relation(item(1), "Order", Some(order(2))).unwrap();

    handle
}

fn assert_item_moved_out_of_band(err: &InternalError) {
    assert!(err.is_consistency_violation());
    assert!(matches!(
        err.relation_detail(),
        Some(RelationErrorDetail::OutOfSync { object, opposite_object, .. })
            if *object == order(1) && *opposite_object == item(1)
    ));
}

#[test]
fn remove_of_item_moved_in_storage_is_refused() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = unload_item_and_move_it_in_storage(&store, &mut tx);

    let err = handle.remove(&mut tx, item(1)).unwrap_err();

    assert_item_moved_out_of_band(&err);
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), Some(order(2)));
    assert_eq!(items(&mut tx, order(2)), vec![item(1), item(3)]);
    assert_eq!(tx.object_state(order(1)), Some(ObjectState::Unchanged));

    sync::synchronize(&mut tx, handle.end_point_id()).expect("sync should succeed");
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(2)]);
    assert!(!handle.remove(&mut tx, item(1)).unwrap());
}

#[test]
fn replace_of_item_moved_in_storage_is_refused() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = unload_item_and_move_it_in_storage(&store, &mut tx);

    let err = handle.replace(&mut tx, 0, item(3)).unwrap_err();

    assert_item_moved_out_of_band(&err);
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
    assert_eq!(items(&mut tx, order(2)), vec![item(1), item(3)]);
    assert_eq!(tx.get_related_object(item(3), "Order").unwrap(), Some(order(2)));
}

#[test]
fn clear_with_item_moved_in_storage_is_refused() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = unload_item_and_move_it_in_storage(&store, &mut tx);

    let err = handle.clear(&mut tx).unwrap_err();

    assert_item_moved_out_of_band(&err);
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
    assert_eq!(tx.get_related_object(item(2), "Order").unwrap(), Some(order(1)));
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), Some(order(2)));
}

#[test]
fn delete_of_owner_with_item_moved_in_storage_is_refused() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = unload_item_and_move_it_in_storage(&store, &mut tx);

    let err = tx.delete(order(1)).unwrap_err();

    assert_item_moved_out_of_band(&err);
    assert_eq!(tx.object_state(order(1)), Some(ObjectState::Unchanged));
    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(1), item(2)]);
    assert_eq!(tx.get_related_object(item(2), "Order").unwrap(), Some(order(1)));
}

#[test]
fn unloaded_item_with_unchanged_key_can_be_removed() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(1), "OrderItems").unwrap();
    handle.items(&mut tx).unwrap();
    unload_data(&mut tx, item(1)).expect("unload should succeed");

    assert!(handle.remove(&mut tx, item(1)).expect("remove should succeed"));

    assert_eq!(handle.items(&mut tx).unwrap(), vec![item(2)]);
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), None);
    assert_eq!(
        tx.get_original_related_object(item(1), "Order").unwrap(),
        Some(order(1))
    );
}

#[test]
fn unloaded_item_with_unchanged_key_can_be_cleared() {
    let store = store();
    let mut tx = transaction(&store);
    let handle = tx.collection(order(1), "OrderItems").unwrap();
    handle.items(&mut tx).unwrap();
    unload_data(&mut tx, item(1)).expect("unload should succeed");

    handle.clear(&mut tx).expect("clear should succeed");

    assert_eq!(handle.count(&mut tx).unwrap(), 0);
    assert_eq!(tx.get_related_object(item(1), "Order").unwrap(), None);
    assert_eq!(tx.get_related_object(item(2), "Order").unwrap(), None);
    assert_eq!(handle.original_items(&mut tx).unwrap(), vec![item(1), item(2)]);
}
