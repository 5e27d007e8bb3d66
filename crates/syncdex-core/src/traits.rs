//! Capability seams between the coalescing core and its collaborators.
//!
//! The engine is deliberately ignorant of entity metadata: everything it
//! needs from the model layer (id extraction, document projection, the
//! contained-in walk, interception policy) arrives through [`DocumentBuilder`]
//! handles resolved once per plan from a [`BuilderRegistry`].

use crate::{
    document::IndexDocument,
    error::InternalError,
    identity::{EntityTypeId, IndexingId},
    op::IndexOperation,
    plan::{DepthGuard, IndexingPlan},
};
use std::{any::Any, fmt::Debug, sync::Arc};

///
/// Entity
///
/// Opaque snapshot of a domain entity as observed by a mutation event.
/// The engine never looks inside; document builders downcast as needed.
///

pub trait Entity: Any + Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<T> Entity for T
where
    T: Any + Send + Sync + Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared handle to an entity snapshot carried through a plan.
pub type EntityRef = Arc<dyn Entity>;

///
/// IdSource
/// Where a type's indexing id comes from.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdSource {
    /// The id is derived from the entity's own state.
    EntityState,

    /// The id must be supplied with every event; it is not derivable.
    Provided,
}

///
/// InterceptDecision
///
/// Four-way interception contract consulted when cascade recursion discovers
/// a containing instance with no pending work. `ApplyDefault` and `Update`
/// behave identically in the core; they stay distinct so embedders can tell
/// an explicit policy answer apart from the default.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InterceptDecision {
    #[default]
    ApplyDefault,
    Update,
    Skip,
    Remove,
}

///
/// DocumentBuilder
///
/// Per-type capability bundle registered with a [`BuilderRegistry`]
/// (see `registry`). One immutable handle per entity type, shared by every
/// plan that touches the type.
///

pub trait DocumentBuilder: Send + Sync {
    /// The entity type this builder serves.
    fn entity_type(&self) -> EntityTypeId;

    /// Where this type's indexing id comes from.
    fn id_source(&self) -> IdSource {
        IdSource::EntityState
    }

    /// True if ids must be supplied with every event for this type.
    fn requires_provided_id(&self) -> bool {
        matches!(self.id_source(), IdSource::Provided)
    }

    /// Derive the indexing id from an entity snapshot.
    ///
    /// Never called for [`IdSource::Provided`] types.
    fn extract_id(&self, entity: &dyn Entity) -> Result<IndexingId, InternalError>;

    /// Project an entity snapshot into an index document representation.
    ///
    /// Called during flattening only; may perform blocking work (the plan
    /// itself does no I/O before this point).
    fn build_document(
        &self,
        id: &IndexingId,
        entity: &dyn Entity,
    ) -> Result<IndexDocument, InternalError>;

    /// Walk this entity's contained-in relationships, reporting each
    /// containing instance back through
    /// [`IndexingPlan::recurse_contained_in`].
    ///
    /// The default is a leaf type with no containers.
    fn append_cascade_work(
        &self,
        entity: &dyn Entity,
        plan: &mut IndexingPlan,
        guard: DepthGuard,
    ) -> Result<(), InternalError> {
        let _ = (entity, plan, guard);
        Ok(())
    }

    /// Interception hook consulted before implicit cascade work is queued.
    fn on_update(&self, entity: &dyn Entity) -> InterceptDecision {
        let _ = entity;
        InterceptDecision::ApplyDefault
    }
}

///
/// IndexOperationSink
///
/// Backend boundary: accepts the flattened, ordered operation list.
///
/// Ordering per document key must be preserved by the sink; operations for
/// independent keys may be batched, pipelined, or parallelized. Retry and
/// commit policy is entirely the sink's concern — the core neither swallows
/// nor retries sink failures.
///

pub trait IndexOperationSink {
    fn apply(&mut self, operations: Vec<IndexOperation>) -> Result<(), InternalError>;
}

///
/// CollectingSink
/// Buffering sink for tests and simple embedders.
///

#[derive(Debug, Default)]
pub struct CollectingSink {
    operations: Vec<IndexOperation>,
}

impl CollectingSink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn operations(&self) -> &[IndexOperation] {
        &self.operations
    }

    #[must_use]
    pub fn into_operations(self) -> Vec<IndexOperation> {
        self.operations
    }
}

impl IndexOperationSink for CollectingSink {
    fn apply(&mut self, operations: Vec<IndexOperation>) -> Result<(), InternalError> {
        self.operations.extend(operations);
        Ok(())
    }
}
