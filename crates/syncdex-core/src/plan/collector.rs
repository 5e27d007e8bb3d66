use crate::{
    error::InternalError,
    event::MutationEvent,
    identity::{EntityTypeId, IndexingId},
    obs::sink::{self, MetricsEvent},
    op::IndexOperation,
    plan::entity_state::EntityWorkState,
    traits::{DocumentBuilder, EntityRef, IdSource, InterceptDecision},
};
use std::{collections::HashMap, sync::Arc};

///
/// WorkSlot
/// One (indexing id, state) pair, held in insertion order.
///

struct WorkSlot {
    id: IndexingId,
    state: EntityWorkState,
}

///
/// CascadeOutcome
/// Whether the walk continues into the discovered instance's own containers.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CascadeOutcome {
    Recurse,
    Stop,
    SkippedProvidedId,
}

///
/// PerTypeWorkCollector
///
/// Aggregates pending work for one entity type, keyed by indexing id.
///
/// The slot arena keeps insertion order for deterministic flattening; the
/// id → slot map doubles as the cascade visited-set (a key with a slot is
/// already queued and is never revisited by the walk).
///

pub(crate) struct PerTypeWorkCollector {
    entity_type: EntityTypeId,
    builder: Arc<dyn DocumentBuilder>,
    slots: Vec<WorkSlot>,
    by_id: HashMap<IndexingId, usize>,
    purge_all_requested: bool,
}

impl PerTypeWorkCollector {
    pub(crate) fn new(entity_type: EntityTypeId, builder: Arc<dyn DocumentBuilder>) -> Self {
        Self {
            entity_type,
            builder,
            slots: Vec::new(),
            by_id: HashMap::new(),
            purge_all_requested: false,
        }
    }

    pub(crate) fn builder(&self) -> Arc<dyn DocumentBuilder> {
        Arc::clone(&self.builder)
    }

    /// Fold one mutation event into the per-id work table.
    pub(crate) fn add_work(&mut self, event: MutationEvent) -> Result<(), InternalError> {
        if event.kind.is_purge_all() {
            // Purge-all dominates: all prior per-id work for the type is
            // discarded and a single purge-all operation is emitted.
            self.slots.clear();
            self.by_id.clear();
            self.purge_all_requested = true;

            sink::record(MetricsEvent::PurgeAllRequested {
                entity_path: self.entity_type.as_str(),
            });

            return Ok(());
        }

        let id = self.resolve_indexing_id(&event)?;

        match self.by_id.get(&id).copied() {
            Some(slot) => self.slots[slot].state.merge(&event.kind, event.entity)?,
            None => {
                let state = EntityWorkState::seed(&event.kind, event.entity)?;
                self.insert_slot(id, state);
            }
        }

        sink::record(MetricsEvent::WorkMerged {
            entity_path: self.entity_type.as_str(),
        });

        Ok(())
    }

    /// Resolve the indexing id for an event.
    ///
    /// The event's provided id is used when the type cannot derive ids, when
    /// there is no entity snapshot (id-only purge), or when an identifier
    /// rollback made an entity-state id untrustworthy. Otherwise the id is
    /// derived from the snapshot by the builder.
    fn resolve_indexing_id(&self, event: &MutationEvent) -> Result<IndexingId, InternalError> {
        let use_provided = self.builder.requires_provided_id()
            || event.entity.is_none()
            || (event.identifier_rolled_back
                && matches!(self.builder.id_source(), IdSource::EntityState));

        if use_provided {
            return event
                .provided_id
                .clone()
                .ok_or_else(|| InternalError::missing_indexing_id(self.entity_type.as_str()));
        }

        let entity = event
            .entity
            .as_ref()
            .ok_or_else(|| InternalError::missing_indexing_id(self.entity_type.as_str()))?;

        self.builder.extract_id(entity.as_ref())
    }

    /// Take the frozen cascade frontier: every entry with pending work not
    /// yet visited by the walk, marked visited as it is taken.
    ///
    /// Entries appended during the subsequent recursion are created already
    /// marked, so repeated frontier passes terminate.
    pub(crate) fn take_cascade_frontier(&mut self) -> Vec<EntityRef> {
        let len = self.slots.len();
        let mut frontier = Vec::new();

        for slot in &mut self.slots[..len] {
            if slot.state.is_noop() || !slot.state.mark_cascade_processed() {
                continue;
            }
            if let Some(entity) = slot.state.entity() {
                frontier.push(Arc::clone(entity));
            }
        }

        frontier
    }

    /// Queue work for a containing instance discovered by the cascade walk.
    ///
    /// Returns whether the walk should continue into the instance's own
    /// containers. A key that already has a slot is already queued and its
    /// recursion is (or will be) handled by its own frontier entry.
    pub(crate) fn recurse_contained_in(
        &mut self,
        entity: &EntityRef,
    ) -> Result<CascadeOutcome, InternalError> {
        if self.builder.requires_provided_id() {
            // Cascading cannot determine the correct id for provided-id
            // types. Accepted best-effort degradation: skip, never fail.
            sink::record(MetricsEvent::CascadeSkippedProvidedId {
                entity_path: self.entity_type.as_str(),
            });

            return Ok(CascadeOutcome::SkippedProvidedId);
        }

        let id = self.builder.extract_id(entity.as_ref())?;
        if self.by_id.contains_key(&id) {
            return Ok(CascadeOutcome::Stop);
        }

        let decision = self.builder.on_update(entity.as_ref());
        sink::record(MetricsEvent::InterceptConsulted { decision });

        let state = match decision {
            InterceptDecision::ApplyDefault | InterceptDecision::Update => {
                EntityWorkState::implicit_update(Arc::clone(entity))
            }
            InterceptDecision::Remove => EntityWorkState::implicit_delete(Arc::clone(entity)),
            InterceptDecision::Skip => return Ok(CascadeOutcome::Stop),
        };

        self.insert_slot(id, state);
        sink::record(MetricsEvent::CascadeWorkAdded {
            entity_path: self.entity_type.as_str(),
        });

        Ok(CascadeOutcome::Recurse)
    }

    /// Flatten this collector's pending work into physical operations.
    pub(crate) fn flatten(&self, out: &mut Vec<IndexOperation>) -> Result<(), InternalError> {
        if self.purge_all_requested {
            out.push(IndexOperation::PurgeAll {
                entity_type: self.entity_type,
            });
        }

        for slot in &self.slots {
            let op = match (slot.state.adds(), slot.state.deletes()) {
                (false, false) => continue,
                (false, true) => IndexOperation::Delete {
                    entity_type: self.entity_type,
                    id: slot.id.clone(),
                },
                (true, delete) => {
                    let entity = slot.state.entity().ok_or_else(|| {
                        InternalError::work_internal(format!(
                            "pending add without entity snapshot: {} #{}",
                            self.entity_type, slot.id
                        ))
                    })?;
                    let document = self.builder.build_document(&slot.id, entity.as_ref())?;

                    if delete {
                        IndexOperation::Update {
                            entity_type: self.entity_type,
                            id: slot.id.clone(),
                            document,
                        }
                    } else {
                        IndexOperation::Add {
                            entity_type: self.entity_type,
                            id: slot.id.clone(),
                            document,
                        }
                    }
                }
            };

            out.push(op);
        }

        Ok(())
    }

    fn insert_slot(&mut self, id: IndexingId, state: EntityWorkState) {
        let slot = self.slots.len();
        self.by_id.insert(id.clone(), slot);
        self.slots.push(WorkSlot { id, state });
    }
}
