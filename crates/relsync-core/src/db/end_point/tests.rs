use super::*;
use crate::{
    error::{ErrorClass, ErrorOrigin},
    test_fixtures::{MAPPING, computer, employee, end_point, item, order},
};

type CollectionState = VirtualEndPointLoadState<CollectionEndPointData>;
type ObjectState = VirtualEndPointLoadState<VirtualObjectEndPointData>;

// ─────────────────────────────────────────────
// Load state
// ─────────────────────────────────────────────

#[test]
fn incomplete_registrations_are_unknown() {
    let mut state = CollectionState::default();

    assert!(state.can_be_collected());
    assert_eq!(
        state.register_original_opposite_end_point(item(1)).unwrap(),
        SyncState::Unknown
    );
    assert!(!state.can_be_collected());
    assert_eq!(state.registered_end_points().len(), 1);

    let err = state.register_original_opposite_end_point(item(1)).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn mark_complete_splits_registered_end_points() {
    let mut state = CollectionState::default();
    state.register_original_opposite_end_point(item(1)).unwrap();
    state.register_original_opposite_end_point(item(9)).unwrap();

    let mut updates = state.mark_data_complete(vec![item(2), item(1)]).unwrap();
    updates.sort_by_key(|(object, _)| *object);

    assert_eq!(
        updates,
        vec![
            (item(1), SyncState::Synchronized),
            (item(9), SyncState::Unsynchronized),
        ]
    );
    assert!(state.is_data_complete());
    assert_eq!(state.unsynchronized_end_points().len(), 1);
    assert_eq!(
        state.data().unwrap().items_without_end_points(),
        vec![item(2)]
    );
}

#[test]
fn mark_complete_twice_accepts_identical_data_only() {
    let mut state = CollectionState::default();
    state.mark_data_complete(vec![item(1), item(2)]).unwrap();

    assert!(state.mark_data_complete(vec![item(1), item(2)]).unwrap().is_empty());

    let err = state.mark_data_complete(vec![item(2)]).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert_eq!(err.origin, ErrorOrigin::LoadState);
}

#[test]
fn complete_registration_attaches_or_flags() {
    let mut state = CollectionState::default();
    state.mark_data_complete(vec![item(1)]).unwrap();

    assert_eq!(
        state.register_original_opposite_end_point(item(1)).unwrap(),
        SyncState::Synchronized
    );
    assert_eq!(
        state.register_original_opposite_end_point(item(2)).unwrap(),
        SyncState::Unsynchronized
    );
    assert!(state.register_original_opposite_end_point(item(2)).is_err());
    assert_eq!(
        state.registered_end_points().into_iter().collect::<Vec<_>>(),
        vec![item(1), item(2)]
    );
}

#[test]
fn losing_last_attached_end_point_goes_incomplete() {
    let mut state = CollectionState::default();
    state.register_original_opposite_end_point(item(1)).unwrap();
    state.register_original_opposite_end_point(item(3)).unwrap();
    state.mark_data_complete(vec![item(1)]).unwrap();

    // item 3 claims the owner but is not in the data
    let updates = state.unregister_original_opposite_end_point(item(1)).unwrap();

    assert_eq!(updates, vec![(item(3), SyncState::Unknown)]);
    assert!(!state.is_data_complete());
    assert_eq!(
        state.registered_end_points().into_iter().collect::<Vec<_>>(),
        vec![item(3)]
    );
}

#[test]
fn partial_unregister_keeps_complete() {
    let mut state = CollectionState::default();
    state.register_original_opposite_end_point(item(1)).unwrap();
    state.register_original_opposite_end_point(item(2)).unwrap();
    state.mark_data_complete(vec![item(1), item(2)]).unwrap();

    assert!(state.unregister_original_opposite_end_point(item(1)).unwrap().is_empty());

    assert!(state.is_data_complete());
    assert_eq!(state.data().unwrap().items_without_end_points(), vec![item(1)]);
}

#[test]
fn changed_data_stays_complete_and_refuses_incomplete() {
    let mut state = CollectionState::default();
    state.register_original_opposite_end_point(item(1)).unwrap();
    state.mark_data_complete(vec![item(1)]).unwrap();
    state.data_mut().unwrap().remove(item(1));

    state.unregister_original_opposite_end_point(item(1)).unwrap();
    assert!(state.is_data_complete());
    assert!(!state.can_be_marked_incomplete());

    let err = state.mark_data_incomplete().unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);

    state.rollback();
    assert!(state.mark_data_incomplete().unwrap().is_empty());
    assert!(state.can_be_collected());
}

#[test]
fn synchronize_moves_unsynchronized_into_data() {
    let mut state = CollectionState::default();
    state.mark_data_complete(vec![item(1)]).unwrap();
    state.register_original_opposite_end_point(item(2)).unwrap();

    state.synchronize_opposite_end_point(item(2)).unwrap();

    assert!(state.unsynchronized_end_points().is_empty());
    assert_eq!(state.data().unwrap().current_items(), vec![item(1), item(2)]);
    assert!(state.synchronize_opposite_end_point(item(2)).is_err());
}

#[test]
fn move_registration_only_touches_incomplete_state() {
    let mut state = ObjectState::default();
    state.move_registration(computer(1), true);
    assert!(!state.can_be_collected());

    state.move_registration(computer(1), false);
    assert!(state.can_be_collected());

    let mut complete = ObjectState::new_complete();
    complete.move_registration(computer(1), true);
    assert!(complete.registered_end_points().is_empty());
}

#[test]
fn one_to_one_load_rejects_two_rows() {
    let mut state = ObjectState::default();

    let err = state
        .mark_data_complete(vec![computer(1), computer(2)])
        .unwrap_err();

    assert!(err.is_load_failure());
    assert!(!state.is_data_complete());
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

fn real(object: ObjectId, property: &str, opposite: Option<ObjectId>) -> RealObjectEndPoint {
    RealObjectEndPoint::new(end_point(object, property), opposite)
}

#[test]
fn registering_real_creates_incomplete_virtual() {
    let mut registry = RelationEndPointRegistry::new();
    let id = end_point(item(1), "Order");
    let items = end_point(order(1), "OrderItems");

    registry
        .register_real_end_point(real(item(1), "Order", Some(order(1))))
        .unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.real(&id).unwrap().sync_state(), SyncState::Unknown);
    let virtual_end_point = registry.virtual_end_point(&items).unwrap();
    assert!(!virtual_end_point.is_data_complete());
    assert!(virtual_end_point.registered_opposite_end_points().contains(&item(1)));

    let err = registry
        .register_real_end_point(real(item(1), "Order", Some(order(1))))
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn null_real_end_point_registers_nowhere() {
    let mut registry = RelationEndPointRegistry::new();

    registry
        .register_real_end_point(real(computer(2), "Employee", None))
        .unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry
            .real(&end_point(computer(2), "Employee"))
            .unwrap()
            .sync_state(),
        SyncState::Synchronized
    );
}

#[test]
fn mark_complete_pushes_sync_states() {
    let mut registry = RelationEndPointRegistry::new();
    let employee_computer = end_point(employee(1), "Computer");
    registry
        .register_real_end_point(real(computer(1), "Employee", Some(employee(1))))
        .unwrap();
    registry
        .register_real_end_point(real(computer(2), "Employee", Some(employee(1))))
        .unwrap();

    registry
        .mark_data_complete(&employee_computer, vec![computer(1)])
        .unwrap();

    let state = |registry: &RelationEndPointRegistry, c| {
        registry
            .real(&end_point(c, "Employee"))
            .unwrap()
            .sync_state()
    };
    assert_eq!(state(&registry, computer(1)), SyncState::Synchronized);
    assert_eq!(state(&registry, computer(2)), SyncState::Unsynchronized);

    // unloading the attached one resets the other to Unknown
    let opposite = registry
        .unregister_real_end_point(&end_point(computer(1), "Employee"))
        .unwrap();
    assert_eq!(opposite, Some(employee_computer));
    assert_eq!(state(&registry, computer(2)), SyncState::Unknown);
    assert!(!registry.collect_if_unreferenced(&employee_computer));
}

#[test]
fn unreferenced_virtual_end_point_is_collected() {
    let mut registry = RelationEndPointRegistry::new();
    let id = end_point(item(1), "Order");
    let items = end_point(order(1), "OrderItems");
    registry
        .register_real_end_point(real(item(1), "Order", Some(order(1))))
        .unwrap();

    registry.unregister_real_end_point(&id).unwrap();

    assert!(registry.contains(&items));
    assert!(registry.collect_if_unreferenced(&items));
    assert!(registry.is_empty());
}

#[test]
fn typed_access_rejects_wrong_kind() {
    let mut registry = RelationEndPointRegistry::new();
    let id = end_point(item(1), "Order");
    let items = end_point(order(1), "OrderItems");
    registry
        .register_real_end_point(real(item(1), "Order", Some(order(1))))
        .unwrap();

    assert_eq!(
        registry.virtual_end_point(&id).err().unwrap().class,
        ErrorClass::InvalidArgument
    );
    assert_eq!(
        registry.real(&items).unwrap_err().class,
        ErrorClass::InvalidArgument
    );
    assert_eq!(
        registry.virtual_object_mut(&items).unwrap_err().class,
        ErrorClass::InvalidArgument
    );
    assert!(registry.collection_mut(&items).is_ok());
    assert_eq!(
        registry
            .real(&end_point(item(2), "Order"))
            .unwrap_err()
            .class,
        ErrorClass::InvariantViolation
    );
    assert!(registry.get_or_create_virtual(id, false).is_err());
}

#[test]
fn end_point_ids_resolve_through_mapping() {
    let id = RelationEndPointId::resolve(&MAPPING, order(1), "OrderItems").unwrap();

    assert!(id.is_virtual());
    assert_eq!(id.object(), order(1));
    assert_eq!(id.opposite_for(item(4)), end_point(item(4), "Order"));
    assert!(RelationEndPointId::resolve(&MAPPING, order(1), "Nope").is_err());
}
