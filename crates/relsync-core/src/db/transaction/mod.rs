//! Client transaction: owns the loaded objects and the end-point registry,
//! and drives loading, mutation, commit and rollback.
//!
//! The transaction handle is passed explicitly to every operation; there is
//! no ambient "current" transaction. A transaction is itself a data source,
//! which is how sub-transactions read from and commit into their parent.

mod collection;
mod commit;
mod object;
mod relation;

#[cfg(test)]
mod tests;

pub use collection::CollectionHandle;
pub use object::ObjectState;

use crate::{
    config::RelsyncConfig,
    db::{
        end_point::{
            EndPointStateListener, RelationEndPoint, RelationEndPointId,
            RelationEndPointRegistry,
        },
        store::{ChangeSet, DataSource, ObjectRecord, RecordOrdering, RelatedObjects},
    },
    error::{ErrorOrigin, InternalError},
    model::MappingConfiguration,
    obs::sink::{self, MetricsEvent},
    types::ObjectId,
};
use collection::CollectionProxyManager;
use object::ObjectData;

pub(crate) use object::Lifecycle;
use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

///
/// ClientTransaction
///
/// Single-threaded unit of work over a data source. All end-point state
/// belongs to exactly one transaction.
///

#[derive(Debug)]
pub struct ClientTransaction<S> {
    source: S,
    mapping: MappingConfiguration,
    config: RelsyncConfig,
    depth: usize,
    pub(crate) objects: BTreeMap<ObjectId, ObjectData>,
    pub(crate) end_points: RelationEndPointRegistry,
    proxies: CollectionProxyManager,

    // virtual end-points with a load in progress
    loading: BTreeSet<RelationEndPointId>,
}

impl<S: DataSource> ClientTransaction<S> {
    /// Root transaction with default configuration.
    pub fn new(source: S, mapping: MappingConfiguration) -> Result<Self, InternalError> {
        Self::with_config(source, mapping, RelsyncConfig::default())
    }

    pub fn with_config(
        source: S,
        mapping: MappingConfiguration,
        config: RelsyncConfig,
    ) -> Result<Self, InternalError> {
        config.validate()?;
        mapping.validate()?;

        Ok(Self::from_parts(source, mapping, config, 0))
    }

    fn from_parts(
        source: S,
        mapping: MappingConfiguration,
        config: RelsyncConfig,
        depth: usize,
    ) -> Self {
        Self {
            source,
            mapping,
            config,
            depth,
            objects: BTreeMap::new(),
            end_points: RelationEndPointRegistry::new(),
            proxies: CollectionProxyManager::default(),
            loading: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn mapping(&self) -> &MappingConfiguration {
        &self.mapping
    }

    #[must_use]
    pub const fn config(&self) -> &RelsyncConfig {
        &self.config
    }

    /// Nesting depth; 0 for a root transaction.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn end_points(&self) -> &RelationEndPointRegistry {
        &self.end_points
    }

    /// Register an observer for virtual end-point state updates.
    pub fn add_state_listener(&mut self, listener: Rc<dyn EndPointStateListener>) {
        self.end_points.add_listener(listener);
    }

    /// Open a child transaction that loads from and commits into this one.
    /// The parent is borrowed until the child is dropped.
    pub fn create_sub_transaction(&mut self) -> Result<ClientTransaction<&mut Self>, InternalError> {
        let depth = self.depth + 1;
        let max = self.config.transaction.max_sub_transaction_depth;
        if depth > max {
            return Err(InternalError::conflict(
                ErrorOrigin::Transaction,
                format!("sub-transaction depth {depth} exceeds the configured maximum of {max}"),
            ));
        }

        let mapping = self.mapping;
        let config = self.config.clone();
        self.debug_log(format!("opening sub-transaction at depth {depth}"));

        Ok(ClientTransaction::from_parts(self, mapping, config, depth))
    }

    // ─────────────────────────────────────────────
    // Ambient helpers
    // ─────────────────────────────────────────────

    pub(crate) fn debug_log(&self, s: impl Into<String>) {
        if self.config.debug {
            println!("[debug] {}", s.into());
        }
    }

    pub(crate) fn record(&self, event: MetricsEvent) {
        if self.config.metrics {
            sink::record(event);
        }
    }

    pub(crate) fn notify(&self, id: RelationEndPointId) {
        let has_changed = self
            .end_points
            .get(&id)
            .is_some_and(RelationEndPoint::has_changed);

        self.end_points.notify(id, has_changed);
    }
}

///
/// A transaction serves its sub-transactions from its current state.
///

impl<S: DataSource> DataSource for ClientTransaction<S> {
    fn load_object(&mut self, id: ObjectId) -> Result<Option<ObjectRecord>, InternalError> {
        match self.ensure_object_loaded(id) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        }
        if self.object_state(id) == Some(ObjectState::Deleted) {
            return Ok(None);
        }

        self.current_record(id).map(Some)
    }

    fn load_related_objects(
        &mut self,
        end_point: RelationEndPointId,
    ) -> Result<RelatedObjects, InternalError> {
        self.ensure_data_complete(end_point)?;
        let items = self
            .end_points
            .virtual_end_point(&end_point)?
            .current_items();

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            self.ensure_object_loaded(item)?;
            records.push(self.current_record(item)?);
        }

        Ok(RelatedObjects {
            records,
            ordering: RecordOrdering::Final,
        })
    }

    fn persist(&mut self, changes: &ChangeSet) -> Result<(), InternalError> {
        self.apply_changes(changes)
    }
}
