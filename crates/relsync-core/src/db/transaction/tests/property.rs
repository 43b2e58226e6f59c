use super::*;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Add { order: u128, item: u128 },
    Insert { order: u128, index: usize, item: u128 },
    Remove { order: u128, item: u128 },
    Replace { order: u128, index: usize, item: u128 },
    Clear { order: u128 },
}

fn arb_order() -> impl Strategy<Value = u128> {
    prop_oneof![Just(1_u128), Just(2_u128)]
}

fn arb_item() -> impl Strategy<Value = u128> {
    1_u128..=3
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_order(), arb_item()).prop_map(|(order, item)| Op::Add { order, item }),
        (arb_order(), 0_usize..4, arb_item())
            .prop_map(|(order, index, item)| Op::Insert { order, index, item }),
        (arb_order(), arb_item()).prop_map(|(order, item)| Op::Remove { order, item }),
        (arb_order(), 0_usize..4, arb_item())
            .prop_map(|(order, index, item)| Op::Replace { order, index, item }),
        arb_order().prop_map(|order| Op::Clear { order }),
    ]
}

fn apply(tx: &mut ClientTransaction<MemoryStore>, op: &Op) -> Result<(), InternalError> {
    let owner = match op {
        Op::Add { order: o, .. }
        | Op::Insert { order: o, .. }
        | Op::Remove { order: o, .. }
        | Op::Replace { order: o, .. }
        | Op::Clear { order: o } => order(*o),
    };
    let handle = tx.collection(owner, "OrderItems")?;

    match *op {
        Op::Add { item: i, .. } => handle.add(tx, item(i)),
        Op::Insert { index, item: i, .. } => handle.insert(tx, index, item(i)),
        Op::Remove { item: i, .. } => handle.remove(tx, item(i)).map(|_| ()),
        Op::Replace { index, item: i, .. } => handle.replace(tx, index, item(i)).map(|_| ()),
        Op::Clear { .. } => handle.clear(tx),
    }
}

// Every item is in exactly the collection its foreign key names.
fn assert_bidirectional(tx: &mut ClientTransaction<MemoryStore>) {
    for o in 1..=2 {
        for i in items(tx, order(o)) {
            assert_eq!(tx.get_related_object(i, "Order").unwrap(), Some(order(o)));
        }
    }
    for i in 1..=3 {
        let opposite = tx.get_related_object(item(i), "Order").unwrap();
        for o in 1..=2 {
            let contained = items(tx, order(o)).contains(&item(i));
            assert_eq!(contained, opposite == Some(order(o)));
        }
    }
}

fn loaded_transaction(store: &MemoryStore) -> ClientTransaction<MemoryStore> {
    let mut tx = transaction(store);
    items(&mut tx, order(1));
    items(&mut tx, order(2));
    tx
}

proptest! {
    #[test]
    fn collection_ops_keep_both_sides_consistent(
        ops in prop::collection::vec(arb_op(), 0..24)
    ) {
        let store = store();
        let mut tx = loaded_transaction(&store);

        for op in &ops {
            if let Err(err) = apply(&mut tx, op) {
                prop_assert_eq!(err.class, ErrorClass::InvalidArgument, "{:?}: {}", op, err);
            }
            assert_bidirectional(&mut tx);
        }

        tx.rollback();
        prop_assert_eq!(items(&mut tx, order(1)), vec![item(1), item(2)]);
        prop_assert_eq!(items(&mut tx, order(2)), vec![item(3)]);
        assert_bidirectional(&mut tx);
    }

    #[test]
    fn commit_makes_current_state_original(
        ops in prop::collection::vec(arb_op(), 1..16)
    ) {
        let store = store();
        let mut tx = loaded_transaction(&store);

        for op in &ops {
            let _ = apply(&mut tx, op);
        }
        let expected = [items(&mut tx, order(1)), items(&mut tx, order(2))];

        tx.commit().expect("commit should succeed");

        for (o, expected) in (1..=2).zip(expected) {
            let original = tx.get_original_related_objects(order(o), "OrderItems").unwrap();
            prop_assert_eq!(&original, &expected);
            for i in &expected {
                prop_assert_eq!(store.get(*i).unwrap().relation("Order"), Some(order(o)));
            }
        }
        for i in 1..=3 {
            prop_assert_eq!(tx.object_state(item(i)), Some(ObjectState::Unchanged));
        }
    }
}
