use crate::{
    identity::{EntityTypeId, IndexingId},
    traits::EntityRef,
};

///
/// EventKind
///
/// Raw mutation event kinds accepted by a plan.
///
/// `PurgeAll` is resolved one level above the per-key state machine; it must
/// never reach a merge. `Reindex` is the mass-indexer "index this now" kind
/// and coalesces exactly like a full update.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    Add,
    Update,
    Delete,
    Purge,
    PurgeAll,
    PartialUpdate(Vec<String>),
    Reindex,
}

impl EventKind {
    /// True if this kind short-circuits a whole type's index.
    #[must_use]
    pub const fn is_purge_all(&self) -> bool {
        matches!(self, Self::PurgeAll)
    }

    /// Stable label for diagnostics and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Purge => "purge",
            Self::PurgeAll => "purge_all",
            Self::PartialUpdate(_) => "partial_update",
            Self::Reindex => "reindex",
        }
    }
}

///
/// MutationEvent
///
/// One entity-level mutation observed within a unit of work.
///
/// `entity` is `None` for id-only purges. `provided_id` carries the caller's
/// indexing id where the type cannot derive one (or where a rollback made the
/// entity's own id untrustworthy, see `identifier_rolled_back`).
///

#[derive(Clone, Debug)]
pub struct MutationEvent {
    pub entity_type: EntityTypeId,
    pub kind: EventKind,
    pub entity: Option<EntityRef>,
    pub provided_id: Option<IndexingId>,
    pub identifier_rolled_back: bool,
}

impl MutationEvent {
    #[must_use]
    pub const fn new(entity_type: EntityTypeId, kind: EventKind) -> Self {
        Self {
            entity_type,
            kind,
            entity: None,
            provided_id: None,
            identifier_rolled_back: false,
        }
    }

    /// An add event carrying a fresh entity snapshot.
    #[must_use]
    pub fn add(entity_type: EntityTypeId, entity: EntityRef) -> Self {
        Self::new(entity_type, EventKind::Add).with_entity(entity)
    }

    /// A full-update event carrying the updated snapshot.
    #[must_use]
    pub fn update(entity_type: EntityTypeId, entity: EntityRef) -> Self {
        Self::new(entity_type, EventKind::Update).with_entity(entity)
    }

    /// A delete event carrying the last observed snapshot.
    #[must_use]
    pub fn delete(entity_type: EntityTypeId, entity: EntityRef) -> Self {
        Self::new(entity_type, EventKind::Delete).with_entity(entity)
    }

    /// An id-only purge: no entity snapshot is available.
    #[must_use]
    pub fn purge(entity_type: EntityTypeId, id: impl Into<IndexingId>) -> Self {
        Self::new(entity_type, EventKind::Purge).with_provided_id(id)
    }

    /// Discard the whole type's index content.
    #[must_use]
    pub const fn purge_all(entity_type: EntityTypeId) -> Self {
        Self::new(entity_type, EventKind::PurgeAll)
    }

    /// Attach an entity snapshot.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attach an externally supplied indexing id.
    #[must_use]
    pub fn with_provided_id(mut self, id: impl Into<IndexingId>) -> Self {
        self.provided_id = Some(id.into());
        self
    }

    /// Mark the event as observed after an identifier rollback.
    ///
    /// For types whose id comes from entity state, this makes the plan trust
    /// the event's provided id over re-derivation.
    #[must_use]
    pub const fn identifier_rolled_back(mut self) -> Self {
        self.identifier_rolled_back = true;
        self
    }
}
