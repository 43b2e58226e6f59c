//! Metrics sink boundary.
//!
//! Core relation logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///
/// `class`/`property` name the relation property the event concerns.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    EndPointLoad {
        class: &'static str,
        property: &'static str,
        rows: u64,
    },
    LoadFailure {
        class: &'static str,
        property: &'static str,
    },
    EndPointUnload {
        class: &'static str,
        property: &'static str,
    },
    EndPointCollected {
        class: &'static str,
        property: &'static str,
    },
    ObjectUnload {
        class: &'static str,
    },
    Mutation {
        class: &'static str,
        property: &'static str,
    },
    Synchronize {
        class: &'static str,
        property: &'static str,
    },
    SyncConflict {
        class: &'static str,
        property: &'static str,
    },
    ConsistencyViolation {
        class: &'static str,
        property: &'static str,
    },
    Commit {
        objects: u64,
        end_points: u64,
    },
    Rollback,
    SubTransactionCommit,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local counter state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::EndPointLoad {
                class,
                property,
                rows,
            } => {
                m.ops.end_point_loads = m.ops.end_point_loads.saturating_add(1);
                m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows);
                metrics::with_property_mut(m, class, property, |c| {
                    c.loads = c.loads.saturating_add(1);
                    c.rows_loaded = c.rows_loaded.saturating_add(rows);
                });
            }

            MetricsEvent::LoadFailure { class, property } => {
                m.ops.load_failures = m.ops.load_failures.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.load_failures = c.load_failures.saturating_add(1);
                });
            }

            MetricsEvent::EndPointUnload { class, property } => {
                m.ops.end_point_unloads = m.ops.end_point_unloads.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.unloads = c.unloads.saturating_add(1);
                });
            }

            MetricsEvent::EndPointCollected { class, property } => {
                m.ops.end_points_collected = m.ops.end_points_collected.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.collected = c.collected.saturating_add(1);
                });
            }

            MetricsEvent::ObjectUnload { .. } => {
                m.ops.object_unloads = m.ops.object_unloads.saturating_add(1);
            }

            MetricsEvent::Mutation { class, property } => {
                m.ops.mutations = m.ops.mutations.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.mutations = c.mutations.saturating_add(1);
                });
            }

            MetricsEvent::Synchronize { class, property } => {
                m.ops.synchronizations = m.ops.synchronizations.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.synchronizations = c.synchronizations.saturating_add(1);
                });
            }

            MetricsEvent::SyncConflict { class, property } => {
                m.ops.sync_conflicts = m.ops.sync_conflicts.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.sync_conflicts = c.sync_conflicts.saturating_add(1);
                });
            }

            MetricsEvent::ConsistencyViolation { class, property } => {
                m.ops.consistency_violations = m.ops.consistency_violations.saturating_add(1);
                metrics::with_property_mut(m, class, property, |c| {
                    c.consistency_violations = c.consistency_violations.saturating_add(1);
                });
            }

            MetricsEvent::Commit { .. } => {
                m.ops.commits = m.ops.commits.saturating_add(1);
            }

            MetricsEvent::Rollback => {
                m.ops.rollbacks = m.ops.rollbacks.saturating_add(1);
            }

            MetricsEvent::SubTransactionCommit => {
                m.ops.sub_transaction_commits = m.ops.sub_transaction_commits.saturating_add(1);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous slot on every exit, including unwind.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized, matching the original borrow.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The erased pointer is installed only for this dynamic scope; `Guard`
    //   restores the previous slot on all exits.
    // - `record` dereferences it synchronously and never persists it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::RefCell,
        panic::{AssertUnwindSafe, catch_unwind},
    };

    #[derive(Default)]
    struct CaptureSink {
        events: RefCell<Vec<MetricsEvent>>,
    }

    impl MetricsSink for CaptureSink {
        fn record(&self, event: MetricsEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    #[test]
    fn override_captures_events_and_restores() {
        metrics_reset_all();
        let sink = CaptureSink::default();

        with_metrics_sink(&sink, || record(MetricsEvent::Rollback));
        record(MetricsEvent::Rollback);

        assert_eq!(sink.events.borrow().as_slice(), &[MetricsEvent::Rollback]);
        assert_eq!(metrics::with_state(|m| m.ops.rollbacks), 1);
    }

    #[test]
    fn override_is_restored_after_panic() {
        metrics_reset_all();
        let sink = CaptureSink::default();

        let result = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || panic!("boom"));
        }));
        assert!(result.is_err());

        record(MetricsEvent::SubTransactionCommit);
        assert!(sink.events.borrow().is_empty());
        assert_eq!(metrics::with_state(|m| m.ops.sub_transaction_commits), 1);
    }

    #[test]
    fn global_sink_tracks_per_property_counters() {
        metrics_reset_all();

        record(MetricsEvent::EndPointLoad {
            class: "Order",
            property: "OrderItems",
            rows: 3,
        });
        record(MetricsEvent::Mutation {
            class: "Order",
            property: "OrderItems",
        });

        let report = metrics_report();
        let counters = report.counters.unwrap();
        assert_eq!(counters.ops.end_point_loads, 1);
        assert_eq!(counters.ops.rows_loaded, 3);
        assert_eq!(counters.properties["Order.OrderItems"].mutations, 1);
    }
}
