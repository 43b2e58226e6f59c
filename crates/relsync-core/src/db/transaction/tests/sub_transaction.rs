use super::*;
use crate::config::RelsyncConfig;

#[test]
fn child_commit_becomes_uncommitted_parent_change() {
    let store = store();
    let mut parent = transaction(&store);
    assert_eq!(items(&mut parent, order(1)), vec![item(1), item(2)]);

    {
        let mut child = parent
            .create_sub_transaction()
            .expect("sub-transaction should open");
        assert_eq!(child.depth(), 1);

        let handle = child.collection(order(1), "OrderItems").unwrap();
        assert_eq!(handle.items(&mut child).unwrap(), vec![item(1), item(2)]);
        handle.remove(&mut child, item(1)).unwrap();
        handle.add(&mut child, item(3)).unwrap();

        child.commit().expect("child commit should succeed");
        assert_eq!(child.object_state(item(3)), Some(ObjectState::Unchanged));
    }

    assert_eq!(items(&mut parent, order(1)), vec![item(2), item(3)]);
    assert!(items(&mut parent, order(2)).is_empty());
    assert_eq!(
        parent
            .get_original_related_objects(order(1), "OrderItems")
            .unwrap(),
        vec![item(1), item(2)]
    );
    assert_eq!(parent.get_related_object(item(1), "Order").unwrap(), None);
    assert_eq!(
        parent.get_related_object(item(3), "Order").unwrap(),
        Some(order(1))
    );
    assert_eq!(parent.object_state(item(3)), Some(ObjectState::Changed));
    assert!(store.persisted().is_empty());

    parent.commit().expect("parent commit should succeed");
    assert_eq!(store.get(item(3)).unwrap().relation("Order"), Some(order(1)));
    assert_eq!(store.get(item(1)).unwrap().relation("Order"), None);
}

#[test]
fn dropped_child_leaves_parent_untouched() {
    let store = store();
    let mut parent = transaction(&store);

    {
        let mut child = parent.create_sub_transaction().unwrap();
        child.delete(item(1)).unwrap();
        child
            .set_value(order(1), "Number", Value::Int(10))
            .unwrap();
    }

    assert_eq!(items(&mut parent, order(1)), vec![item(1), item(2)]);
    assert_eq!(parent.get_value(order(1), "Number").unwrap(), Value::Int(1));
    assert_eq!(parent.object_state(order(1)), Some(ObjectState::Unchanged));
}

#[test]
fn child_reads_uncommitted_parent_state() {
    let store = store();
    let mut parent = transaction(&store);
    parent.delete(item(1)).unwrap();
    parent
        .set_value(order(1), "Number", Value::Int(7))
        .unwrap();

    let mut child = parent.create_sub_transaction().unwrap();

    let err = child.ensure_object_loaded(item(1)).unwrap_err();
    assert_eq!(err.class, ErrorClass::NotFound);
    assert_eq!(child.get_value(order(1), "Number").unwrap(), Value::Int(7));
    assert_eq!(
        child.get_related_objects(order(1), "OrderItems").unwrap(),
        vec![item(2)]
    );
    assert_eq!(child.object_state(order(1)), Some(ObjectState::Unchanged));
}

#[test]
fn child_new_object_reaches_parent() {
    let store = store();
    let mut parent = transaction(&store);

    let id = {
        let mut child = parent.create_sub_transaction().unwrap();
        let id = child
            .new_object("OrderItem", [("Position", Value::Int(5))])
            .unwrap();
        child.set_related_object(id, "Order", Some(order(2))).unwrap();
        child.commit().unwrap();
        id
    };

    assert_eq!(parent.object_state(id), Some(ObjectState::New));
    assert_eq!(parent.get_value(id, "Position").unwrap(), Value::Int(5));
    assert_eq!(parent.get_related_object(id, "Order").unwrap(), Some(order(2)));
    assert_eq!(items(&mut parent, order(2)), vec![item(3), id]);

    parent.commit().unwrap();
    assert_eq!(store.get(id).unwrap().relation("Order"), Some(order(2)));
}

#[test]
fn child_delete_marks_parent_object_deleted() {
    let store = store();
    let mut parent = transaction(&store);

    {
        let mut child = parent.create_sub_transaction().unwrap();
        child.delete(item(3)).unwrap();
        child.commit().unwrap();
    }

    assert_eq!(parent.object_state(item(3)), Some(ObjectState::Deleted));
    assert!(items(&mut parent, order(2)).is_empty());

    parent.rollback();
    assert_eq!(parent.object_state(item(3)), Some(ObjectState::Unchanged));
    assert_eq!(items(&mut parent, order(2)), vec![item(3)]);
}

#[test]
fn nesting_is_bounded_by_config() {
    let store = store();
    let mut config = RelsyncConfig::default();
    config.transaction.max_sub_transaction_depth = 1;
    let mut parent = ClientTransaction::with_config(store.clone(), MAPPING, config).unwrap();

    let mut child = parent.create_sub_transaction().unwrap();
    let err = child.create_sub_transaction().unwrap_err();

    assert_eq!(err.class, ErrorClass::Conflict);
    assert!(err.message.contains("exceeds"));
}

#[test]
fn zero_depth_config_is_rejected() {
    let store = store();
    let mut config = RelsyncConfig::default();
    config.transaction.max_sub_transaction_depth = 0;

    let err = ClientTransaction::with_config(store.clone(), MAPPING, config).unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidArgument);
}
