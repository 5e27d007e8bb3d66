//! Metrics sink boundary.
//!
//! Plan logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between coalescing logic
//! and the thread-local metrics state.

use crate::{obs::metrics, traits::InterceptDecision};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    /// A mutation event was folded into a per-key state.
    WorkMerged { entity_path: &'static str },

    /// A purge-all discarded a type's pending per-id work.
    PurgeAllRequested { entity_path: &'static str },

    /// The cascade walk queued implicit work for a containing entity.
    CascadeWorkAdded { entity_path: &'static str },

    /// Cascade attempted on a provided-id-only type; step skipped.
    CascadeSkippedProvidedId { entity_path: &'static str },

    /// The depth guard stopped a cascade path.
    CascadeDepthExhausted { entity_path: &'static str },

    /// The interception hook was consulted for cascade-discovered work.
    InterceptConsulted { decision: InterceptDecision },

    /// A plan was flattened into an operation list.
    PlanFlattened { operations: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
/// Default process-local sink that writes into thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::WorkMerged { entity_path } => {
                m.work_merged = m.work_merged.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.work_merged = entry.work_merged.saturating_add(1);
            }
            MetricsEvent::PurgeAllRequested { entity_path } => {
                m.purge_all_requests = m.purge_all_requests.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.purge_all_requests = entry.purge_all_requests.saturating_add(1);
            }
            MetricsEvent::CascadeWorkAdded { entity_path } => {
                m.cascade_work_added = m.cascade_work_added.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.cascade_work_added = entry.cascade_work_added.saturating_add(1);
            }
            MetricsEvent::CascadeSkippedProvidedId { .. } => {
                m.cascade_skipped_provided_id = m.cascade_skipped_provided_id.saturating_add(1);
            }
            MetricsEvent::CascadeDepthExhausted { .. } => {
                m.cascade_depth_exhausted = m.cascade_depth_exhausted.saturating_add(1);
            }
            MetricsEvent::InterceptConsulted { decision } => match decision {
                InterceptDecision::Skip => {
                    m.intercept_skips = m.intercept_skips.saturating_add(1);
                }
                InterceptDecision::Remove => {
                    m.intercept_removes = m.intercept_removes.saturating_add(1);
                }
                InterceptDecision::ApplyDefault | InterceptDecision::Update => {}
            },
            MetricsEvent::PlanFlattened { operations } => {
                m.plans_flattened = m.plans_flattened.saturating_add(1);
                m.operations_emitted = m.operations_emitted.saturating_add(operations);
            }
        });
    }
}

/// Record an event through the active sink.
pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|slot| *slot.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_sink`.
        // - `with_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - We materialize only a shared reference (`&dyn MetricsSink`),
        //   matching the original shared borrow used to install the override.
        // - No mutable alias to the same sink is created here.
        //
        // What would break this:
        // - If `with_sink` failed to restore on all exits (normal + panic),
        //   `ptr` could outlive the borrowed sink and become dangling.
        // - If `record` were changed to store or dispatch asynchronously using
        //   `ptr`, lifetime assumptions would no longer hold.
        unsafe { (&*ptr).record(event) };
    } else {
        GlobalMetricsSink.record(event);
    }
}

/// Run a closure with a scoped sink override on this thread.
///
/// Used by tests and embedders that want to capture events without touching
/// the global counters.
pub fn with_sink<R>(sink: &dyn MetricsSink, f: impl FnOnce() -> R) -> R {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|slot| {
                *slot.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // Preconditions:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` always restores the previous slot on all exits, including
    //   panic.
    // - `record` only dereferences synchronously and never persists
    //   `sink_ptr`.
    //
    // Aliasing:
    // - We erase lifetime to a raw pointer, but still only expose shared
    //   access.
    // - No mutable alias to the same sink is introduced by this conversion.
    //
    // What would break this:
    // - Any async/deferred use of `sink_ptr` beyond this scope.
    // - Any path that bypasses Guard restoration.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

/// Snapshot the thread-local counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the thread-local counters.
pub fn metrics_reset_all() {
    metrics::reset();
}
