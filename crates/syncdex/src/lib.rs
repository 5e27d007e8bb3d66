//! syncdex — a work-coalescing engine that maps entity mutations onto
//! search-index operations.
//!
//! ## Crate layout
//! - `core`: the coalescing engine — events, per-key work states, per-type
//!   collectors, the indexing plan, cascade recursion, capability traits,
//!   and observability.
//!
//! The `prelude` module mirrors the surface used by embedders wiring their
//! model layer into the engine.

pub use syncdex_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use syncdex_core::MAX_CASCADE_DEPTH;
pub use syncdex_core::error::InternalError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        document::{FieldValue, IndexDocument},
        event::{EventKind, MutationEvent},
        identity::{EntityTypeId, IndexingId},
        op::IndexOperation,
        plan::{DepthGuard, IndexingPlan},
        registry::BuilderRegistry,
        traits::{
            CollectingSink, DocumentBuilder, Entity, EntityRef, IdSource, IndexOperationSink,
            InterceptDecision,
        },
    };
}
