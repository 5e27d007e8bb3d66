//! Core runtime for syncdex: the work-coalescing engine that turns a stream
//! of entity mutation events into a minimal, ordered set of index operations
//! per unit of work.
//!
//! Given adds, updates, deletes, and purges — possibly interleaved with
//! contained-in cascading, where a change to an embedded object re-indexes
//! its containers — an [`plan::IndexingPlan`] coalesces everything down to at
//! most one pending decision per document key, then flattens into operations
//! for a pluggable backend sink. Entity metadata, physical backends, and
//! query execution are external collaborators behind the capability traits
//! in [`traits`].

pub mod document;
pub mod error;
pub mod event;
pub mod identity;
pub mod obs;
pub mod op;
pub mod plan;
pub mod registry;
pub mod traits;


///
/// CONSTANTS
///

/// Default cascade recursion budget per contained-in walk.
///
/// Deep or cyclic object graphs are expected; exhausting the budget stops
/// the walk along that path without error.
pub const MAX_CASCADE_DEPTH: u32 = 16;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or observability surfaces are re-exported here.
///

pub mod prelude {
    pub use crate::{
        document::{FieldValue, IndexDocument},
        event::{EventKind, MutationEvent},
        identity::{EntityTypeId, IndexingId},
        op::IndexOperation,
        plan::{DepthGuard, IndexingPlan},
        registry::BuilderRegistry,
        traits::{DocumentBuilder, Entity, EntityRef, IdSource, InterceptDecision},
    };
}
