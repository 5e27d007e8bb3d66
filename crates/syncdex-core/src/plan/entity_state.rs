use crate::{error::InternalError, event::EventKind, traits::EntityRef};

///
/// EntityWorkState
///
/// Per-(type, id) pending-write state machine. Exactly one instance exists
/// per indexing id within a plan; every event for the key folds into it, so
/// the final state space is closed: no-op, add, delete, or delete+add
/// (replace). The merge table is the crux of the coalescing logic.
///

#[derive(Debug)]
pub(crate) struct EntityWorkState {
    entity: Option<EntityRef>,
    add: bool,
    delete: bool,
    cascade_processed: bool,
}

impl EntityWorkState {
    /// Seed a state from the first event observed for a key.
    pub(crate) fn seed(kind: &EventKind, entity: Option<EntityRef>) -> Result<Self, InternalError> {
        let (add, delete) = match kind {
            EventKind::Add => (true, false),
            EventKind::Delete | EventKind::Purge => (false, true),
            EventKind::Update | EventKind::PartialUpdate(_) | EventKind::Reindex => (true, true),
            EventKind::PurgeAll => {
                return Err(InternalError::work_invariant(
                    "purge-all must be resolved before the per-key state machine",
                ));
            }
        };

        Ok(Self {
            entity,
            add,
            delete,
            cascade_processed: false,
        })
    }

    /// Synthesized state for cascade-discovered work (implicit update).
    pub(crate) fn implicit_update(entity: EntityRef) -> Self {
        Self {
            entity: Some(entity),
            add: true,
            delete: true,
            // The cascade walk continues from the discovery site; the plan
            // must not revisit this entry from a later frontier.
            cascade_processed: true,
        }
    }

    /// Synthesized state for cascade-discovered removal.
    pub(crate) fn implicit_delete(entity: EntityRef) -> Self {
        Self {
            entity: Some(entity),
            add: false,
            delete: true,
            cascade_processed: true,
        }
    }

    /// Fold a subsequent event for the same key into this state.
    pub(crate) fn merge(
        &mut self,
        kind: &EventKind,
        entity: Option<EntityRef>,
    ) -> Result<(), InternalError> {
        match kind {
            EventKind::Update | EventKind::PartialUpdate(_) | EventKind::Reindex => {
                // A key freshly added within this plan will be fully indexed
                // anyway; marking delete would be redundant.
                if !(self.add && !self.delete) {
                    self.add = true;
                    self.delete = true;
                }
            }
            // Add is the only kind that does not imply delete-before-add.
            EventKind::Add => self.add = true,
            EventKind::Delete | EventKind::Purge => {
                if self.add && !self.delete {
                    // Created and removed within the same plan: cancels out.
                    self.add = false;
                } else {
                    self.add = false;
                    self.delete = true;
                }
            }
            EventKind::PurgeAll => {
                return Err(InternalError::work_invariant(
                    "purge-all must be resolved before the per-key state machine",
                ));
            }
        }

        if entity.is_some() {
            self.entity = entity;
        }

        Ok(())
    }

    /// Latest non-null entity snapshot observed for this key.
    pub(crate) fn entity(&self) -> Option<&EntityRef> {
        self.entity.as_ref()
    }

    pub(crate) const fn adds(&self) -> bool {
        self.add
    }

    pub(crate) const fn deletes(&self) -> bool {
        self.delete
    }

    pub(crate) const fn is_noop(&self) -> bool {
        !self.add && !self.delete
    }

    /// Mark this entry as visited by the cascade walk.
    ///
    /// Returns true exactly once; later frontiers skip the entry.
    pub(crate) const fn mark_cascade_processed(&mut self) -> bool {
        if self.cascade_processed {
            false
        } else {
            self.cascade_processed = true;
            true
        }
    }
}
