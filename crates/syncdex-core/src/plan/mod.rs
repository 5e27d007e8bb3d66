//! The coalescing core: per-key work states, per-type collectors, and the
//! top-level [`IndexingPlan`] that turns a stream of mutation events into a
//! minimal ordered operation list.

mod cascade;
mod collector;
mod entity_state;

#[cfg(test)]
mod tests;

pub use cascade::DepthGuard;

use crate::{
    error::InternalError,
    event::MutationEvent,
    identity::EntityTypeId,
    obs::sink::{self, MetricsEvent},
    op::IndexOperation,
    plan::collector::{CascadeOutcome, PerTypeWorkCollector},
    registry::BuilderRegistry,
    traits::{EntityRef, IndexOperationSink},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// IndexingPlan
///
/// Top-level coalescing container, scoped to exactly one logical unit of
/// work. Built up, cascade-processed, and flattened sequentially by a single
/// logical thread of control; horizontal concurrency means one plan per
/// worker, never a shared plan.
///
/// Lifecycle: [`add_work`](Self::add_work) for every direct mutation event,
/// then [`process_contained_in_and_prepare_execution`](Self::process_contained_in_and_prepare_execution)
/// exactly once, then [`planned_operations`](Self::planned_operations) (or
/// [`execute_into`](Self::execute_into)) to hand off, then discard or
/// [`clear`](Self::clear).
///

pub struct IndexingPlan {
    registry: Arc<BuilderRegistry>,
    collectors: Vec<PerTypeWorkCollector>,
    by_type: BTreeMap<EntityTypeId, usize>,
    approximate_size: usize,
    cascades_processed: bool,
    cascade_depth: u32,
    debug: bool,
}

impl IndexingPlan {
    #[must_use]
    pub const fn new(registry: Arc<BuilderRegistry>) -> Self {
        Self {
            registry,
            collectors: Vec::new(),
            by_type: BTreeMap::new(),
            approximate_size: 0,
            cascades_processed: false,
            cascade_depth: crate::MAX_CASCADE_DEPTH,
            debug: false,
        }
    }

    /// Enable debug logging for this plan.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Override the cascade depth budget for this plan.
    #[must_use]
    pub const fn with_cascade_depth(mut self, depth: u32) -> Self {
        self.cascade_depth = depth;
        self
    }

    fn debug_log(&self, s: impl Into<String>) {
        if self.debug {
            println!("[debug] {}", s.into());
        }
    }

    /// Fold one mutation event into the plan.
    ///
    /// Rejected once the cascade pass has run: late events would escape the
    /// frozen-snapshot discipline that guarantees cascade termination.
    pub fn add_work(&mut self, event: MutationEvent) -> Result<(), InternalError> {
        if self.cascades_processed {
            return Err(InternalError::plan_invariant(
                "work added after contained-in processing",
            ));
        }

        self.approximate_size = self.approximate_size.saturating_add(1);
        self.debug_log(format!(
            "add_work: {} kind={}",
            event.entity_type,
            event.kind.label()
        ));

        let slot = self.collector_slot(event.entity_type)?;
        self.collectors[slot].add_work(event)
    }

    /// Cascade re-entry point: queue re-indexing work for a containing
    /// instance discovered by a document builder's contained-in walk.
    ///
    /// Crosses type boundaries: the instance's own containers are walked in
    /// turn, one depth-guard hop further down.
    pub fn recurse_contained_in(
        &mut self,
        entity_type: EntityTypeId,
        entity: EntityRef,
        guard: DepthGuard,
    ) -> Result<(), InternalError> {
        let slot = self.collector_slot(entity_type)?;

        match self.collectors[slot].recurse_contained_in(&entity)? {
            CascadeOutcome::SkippedProvidedId => {
                self.debug_log(format!(
                    "cascade skipped: {entity_type} requires a provided id"
                ));

                return Ok(());
            }
            CascadeOutcome::Stop => return Ok(()),
            CascadeOutcome::Recurse => {}
        }

        let Some(child_guard) = guard.descend() else {
            // Legitimate traversal boundary; the discovered entry stays
            // queued, only the walk beyond it stops.
            sink::record(MetricsEvent::CascadeDepthExhausted {
                entity_path: entity_type.as_str(),
            });

            return Ok(());
        };

        let builder = self.collectors[slot].builder();
        builder.append_cascade_work(entity.as_ref(), self, child_guard)
    }

    /// Walk the contained-in graph of every entry collected so far, queuing
    /// re-indexing work for containing entities.
    ///
    /// Must run exactly once per plan, after all direct events and before
    /// flattening. Both the collector array and each per-type frontier are
    /// frozen snapshots: entries appended during the walk are never
    /// revisited, which (with the depth guard) guarantees termination.
    pub fn process_contained_in_and_prepare_execution(&mut self) -> Result<(), InternalError> {
        if self.cascades_processed {
            return Err(InternalError::plan_invariant(
                "contained-in processing ran twice for one plan",
            ));
        }
        self.cascades_processed = true;

        let collector_count = self.collectors.len();
        for slot in 0..collector_count {
            let builder = self.collectors[slot].builder();
            let frontier = self.collectors[slot].take_cascade_frontier();

            for entity in frontier {
                builder.append_cascade_work(
                    entity.as_ref(),
                    self,
                    DepthGuard::new(self.cascade_depth),
                )?;
            }
        }

        Ok(())
    }

    /// Flatten all pending work into one ordered operation list.
    ///
    /// Per-type operation blocks appear in type-insertion order; within a
    /// type, per-id insertion order. Builder errors propagate uncaught.
    pub fn planned_operations(&self) -> Result<Vec<IndexOperation>, InternalError> {
        let mut out = Vec::new();

        for collector in &self.collectors {
            collector.flatten(&mut out)?;
        }

        sink::record(MetricsEvent::PlanFlattened {
            operations: out.len() as u64,
        });
        self.debug_log(format!("flattened {} operation(s)", out.len()));

        Ok(out)
    }

    /// Flatten and hand the operation list to a sink in one step.
    ///
    /// Sink failures propagate; retry policy belongs to the sink.
    pub fn execute_into(&self, sink: &mut dyn IndexOperationSink) -> Result<(), InternalError> {
        let operations = self.planned_operations()?;

        sink.apply(operations)
    }

    /// Discard all pending work; used when a unit of work is abandoned.
    pub fn clear(&mut self) {
        self.collectors.clear();
        self.by_type.clear();
        self.approximate_size = 0;
        self.cascades_processed = false;
    }

    /// Heuristic event counter for external auto-flush policies.
    ///
    /// Monotonic except across [`clear`](Self::clear); not a count of
    /// planned operations.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.approximate_size
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.approximate_size == 0
    }

    /// Resolve or create the collector slot for a type.
    fn collector_slot(&mut self, entity_type: EntityTypeId) -> Result<usize, InternalError> {
        if let Some(&slot) = self.by_type.get(&entity_type) {
            return Ok(slot);
        }

        let builder = self.registry.try_get(entity_type)?;
        let slot = self.collectors.len();
        self.collectors
            .push(PerTypeWorkCollector::new(entity_type, builder));
        self.by_type.insert(entity_type, slot);

        Ok(slot)
    }
}
