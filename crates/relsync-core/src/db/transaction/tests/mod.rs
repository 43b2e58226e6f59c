mod collection;
mod property;
mod sub_transaction;

use super::*;
use crate::{
    db::{MemoryStore, SyncState, end_point::RelationEndPoint},
    error::{ErrorClass, RelationErrorDetail},
    test_fixtures::{
        MAPPING, RecordingListener, computer, customer, employee, end_point, item,
        metered_transaction, order, store, transaction,
    },
    types::Value,
};

fn items(tx: &mut ClientTransaction<MemoryStore>, owner: ObjectId) -> Vec<ObjectId> {
    tx.get_related_objects(owner, "OrderItems")
        .expect("collection load should succeed")
}

fn is_complete<S: DataSource>(tx: &ClientTransaction<S>, id: RelationEndPointId) -> Option<bool> {
    tx.get_relation_end_point_without_loading(id)
        .and_then(RelationEndPoint::as_virtual)
        .map(|ep| ep.is_data_complete())
}
