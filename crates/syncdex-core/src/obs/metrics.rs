//! Thread-local metrics state behind the sink boundary.
//!
//! Counters are process-local diagnostics, not a stable API. All writes go
//! through `obs::sink`; nothing in the plan pipeline touches this module
//! directly.

use std::{cell::RefCell, collections::BTreeMap};

thread_local! {
    static STATE: RefCell<EventReport> = RefCell::new(EventReport::default());
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventReport) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

pub(crate) fn report() -> EventReport {
    STATE.with(|state| state.borrow().clone())
}

pub(crate) fn reset() {
    STATE.with(|state| *state.borrow_mut() = EventReport::default());
}

///
/// EventReport
/// Point-in-time snapshot of plan pipeline counters.
///

#[derive(Clone, Debug, Default)]
pub struct EventReport {
    pub work_merged: u64,
    pub purge_all_requests: u64,
    pub cascade_work_added: u64,
    pub cascade_skipped_provided_id: u64,
    pub cascade_depth_exhausted: u64,
    pub intercept_skips: u64,
    pub intercept_removes: u64,
    pub plans_flattened: u64,
    pub operations_emitted: u64,
    pub entities: BTreeMap<String, EntityEventReport>,
}

///
/// EntityEventReport
/// Per-entity-type slice of the counters.
///

#[derive(Clone, Debug, Default)]
pub struct EntityEventReport {
    pub work_merged: u64,
    pub purge_all_requests: u64,
    pub cascade_work_added: u64,
}
