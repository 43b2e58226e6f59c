use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for relation end-point activity.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,

    /// Counters keyed by `Class.Property`.
    pub properties: BTreeMap<String, PropertyCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            properties: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Loading
    pub end_point_loads: u64,
    pub rows_loaded: u64,
    pub load_failures: u64,

    // Unloading
    pub end_point_unloads: u64,
    pub end_points_collected: u64,
    pub object_unloads: u64,

    // Mutation and consistency
    pub mutations: u64,
    pub synchronizations: u64,
    pub sync_conflicts: u64,
    pub consistency_violations: u64,

    // Transaction lifecycle
    pub commits: u64,
    pub rollbacks: u64,
    pub sub_transaction_commits: u64,
}

///
/// PropertyCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PropertyCounters {
    pub loads: u64,
    pub rows_loaded: u64,
    pub load_failures: u64,
    pub unloads: u64,
    pub collected: u64,
    pub mutations: u64,
    pub synchronizations: u64,
    pub sync_conflicts: u64,
    pub consistency_violations: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Borrow the counters of one relation property, creating them on first use.
pub(crate) fn with_property_mut(
    m: &mut EventState,
    class: &str,
    property: &str,
    f: impl FnOnce(&mut PropertyCounters),
) {
    f(m.properties.entry(format!("{class}.{property}")).or_default());
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,

    /// Per-property counters and averages.
    pub property_counters: Vec<PropertySummary>,
}

///
/// PropertySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PropertySummary {
    pub property: String,
    pub loads: u64,
    pub rows_loaded: u64,
    pub avg_rows_per_load: f64,
    pub load_failures: u64,
    pub unloads: u64,
    pub collected: u64,
    pub mutations: u64,
    pub synchronizations: u64,
    pub sync_conflicts: u64,
    pub consistency_violations: u64,
}

/// Build a metrics report from the in-memory counters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut property_counters: Vec<PropertySummary> = snap
        .properties
        .iter()
        .map(|(property, c)| PropertySummary {
            property: property.clone(),
            loads: c.loads,
            rows_loaded: c.rows_loaded,
            avg_rows_per_load: if c.loads > 0 {
                c.rows_loaded as f64 / c.loads as f64
            } else {
                0.0
            },
            load_failures: c.load_failures,
            unloads: c.unloads,
            collected: c.collected,
            mutations: c.mutations,
            synchronizations: c.synchronizations,
            sync_conflicts: c.sync_conflicts,
            consistency_violations: c.consistency_violations,
        })
        .collect();

    // busiest loaders first, ties broken by name
    property_counters.sort_by(|a, b| {
        match b
            .avg_rows_per_load
            .partial_cmp(&a.avg_rows_per_load)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => a.property.cmp(&b.property),
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        property_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.end_point_loads = 3;
            m.ops.commits = 2;
            with_property_mut(m, "Order", "OrderItems", |c| c.loads = 1);
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.end_point_loads, 0);
            assert_eq!(m.ops.commits, 0);
            assert!(m.properties.is_empty());
        });
    }

    #[test]
    fn report_sorts_properties_by_average_rows() {
        reset_all();
        with_state_mut(|m| {
            with_property_mut(m, "Order", "OrderItems", |c| {
                c.loads = 2;
                c.rows_loaded = 6;
            });
            with_property_mut(m, "Customer", "Orders", |c| {
                c.loads = 1;
                c.rows_loaded = 5;
            });
            with_property_mut(m, "Employee", "Computer", |c| {
                c.loads = 2;
                c.rows_loaded = 2;
            });
        });

        let report = report();
        let names: Vec<_> = report
            .property_counters
            .iter()
            .map(|p| p.property.as_str())
            .collect();

        assert_eq!(names, ["Customer.Orders", "Order.OrderItems", "Employee.Computer"]);
        assert_eq!(report.property_counters[0].avg_rows_per_load, 5.0);
        assert_eq!(report.property_counters[2].avg_rows_per_load, 1.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["property_counters"][1]["rows_loaded"], 6);
    }
}
