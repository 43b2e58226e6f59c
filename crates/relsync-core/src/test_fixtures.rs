//! Shared mapping and seeded store for unit tests.

use crate::{
    config::RelsyncConfig,
    db::{
        ClientTransaction, MemoryStore, ObjectRecord, RelationEndPointId,
        end_point::EndPointStateListener,
    },
    model::{EndPointModel, MappingConfiguration, RelationModel, SortedPropertyModel},
    types::ObjectId,
};
use std::cell::RefCell;

static ORDER_ITEMS_SORT: [SortedPropertyModel; 1] = [SortedPropertyModel::asc("Position")];

static RELATIONS: [RelationModel; 3] = [
    RelationModel::new(
        "OrderToOrderItem",
        EndPointModel::collection("Order", "OrderItems", &ORDER_ITEMS_SORT),
        EndPointModel::real("OrderItem", "Order"),
    ),
    RelationModel::new(
        "EmployeeToComputer",
        EndPointModel::virtual_object("Employee", "Computer"),
        EndPointModel::real("Computer", "Employee"),
    ),
    RelationModel::new(
        "CustomerToOrder",
        EndPointModel::collection("Customer", "Orders", &[]),
        EndPointModel::real("Order", "Customer"),
    ),
];

pub(crate) static MAPPING: MappingConfiguration = MappingConfiguration::new(&RELATIONS);

pub(crate) const fn order(n: u128) -> ObjectId {
    ObjectId::from_u128("Order", n)
}

pub(crate) const fn item(n: u128) -> ObjectId {
    ObjectId::from_u128("OrderItem", n)
}

pub(crate) const fn employee(n: u128) -> ObjectId {
    ObjectId::from_u128("Employee", n)
}

pub(crate) const fn computer(n: u128) -> ObjectId {
    ObjectId::from_u128("Computer", n)
}

pub(crate) const fn customer(n: u128) -> ObjectId {
    ObjectId::from_u128("Customer", n)
}

pub(crate) fn end_point(object: ObjectId, property: &str) -> RelationEndPointId {
    RelationEndPointId::resolve(&MAPPING, object, property).unwrap()
}

/// Seeded rows:
/// - Customer1 owns Order1 and Order2
/// - Order1 holds Item2 (position 2, stored first) and Item1 (position 1)
/// - Order2 holds Item3
/// - Computer1 belongs to Employee1; Employee2 and Computer2 are unrelated
pub(crate) fn store() -> MemoryStore {
    let store = MemoryStore::new();

    store.insert(ObjectRecord::new(customer(1)).with_value("Name", "Ada"));
    store.insert(
        ObjectRecord::new(order(1))
            .with_relation("Customer", Some(customer(1)))
            .with_value("Number", 1_i64),
    );
    store.insert(
        ObjectRecord::new(order(2))
            .with_relation("Customer", Some(customer(1)))
            .with_value("Number", 2_i64),
    );
    store.insert(
        ObjectRecord::new(item(2))
            .with_relation("Order", Some(order(1)))
            .with_value("Position", 2_i64),
    );
    store.insert(
        ObjectRecord::new(item(1))
            .with_relation("Order", Some(order(1)))
            .with_value("Position", 1_i64),
    );
    store.insert(
        ObjectRecord::new(item(3))
            .with_relation("Order", Some(order(2)))
            .with_value("Position", 1_i64),
    );
    store.insert(ObjectRecord::new(employee(1)).with_value("Name", "Grace"));
    store.insert(ObjectRecord::new(employee(2)).with_value("Name", "Linus"));
    store.insert(ObjectRecord::new(computer(1)).with_relation("Employee", Some(employee(1))));
    store.insert(ObjectRecord::new(computer(2)).with_relation("Employee", None));

    store
}

pub(crate) fn transaction(store: &MemoryStore) -> ClientTransaction<MemoryStore> {
    ClientTransaction::new(store.clone(), MAPPING).unwrap()
}

pub(crate) fn metered_transaction(store: &MemoryStore) -> ClientTransaction<MemoryStore> {
    ClientTransaction::with_config(
        store.clone(),
        MAPPING,
        RelsyncConfig::default().with_metrics(true),
    )
    .unwrap()
}

///
/// RecordingListener
///

#[derive(Debug, Default)]
pub(crate) struct RecordingListener {
    pub(crate) events: RefCell<Vec<(RelationEndPointId, bool)>>,
}

impl EndPointStateListener for RecordingListener {
    fn on_state_updated(&self, id: RelationEndPointId, has_changed: bool) {
        self.events.borrow_mut().push((id, has_changed));
    }
}
