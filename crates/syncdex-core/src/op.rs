use crate::{
    document::IndexDocument,
    identity::{EntityTypeId, IndexingId},
};
use serde::Serialize;

///
/// IndexOperation
///
/// Mechanical index mutation derived from a flattened plan.
///
/// `Update` is the composite replace form: from the index's perspective any
/// stale content under the key is fully superseded, whether the backend
/// executes it as delete-then-add or as a single native update.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum IndexOperation {
    Add {
        entity_type: EntityTypeId,
        id: IndexingId,
        document: IndexDocument,
    },
    Update {
        entity_type: EntityTypeId,
        id: IndexingId,
        document: IndexDocument,
    },
    Delete {
        entity_type: EntityTypeId,
        id: IndexingId,
    },
    PurgeAll {
        entity_type: EntityTypeId,
    },
}

impl IndexOperation {
    /// The entity type this operation targets.
    #[must_use]
    pub const fn entity_type(&self) -> EntityTypeId {
        match self {
            Self::Add { entity_type, .. }
            | Self::Update { entity_type, .. }
            | Self::Delete { entity_type, .. }
            | Self::PurgeAll { entity_type } => *entity_type,
        }
    }

    /// The document key, if this is a per-document operation.
    #[must_use]
    pub const fn id(&self) -> Option<&IndexingId> {
        match self {
            Self::Add { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => Some(id),
            Self::PurgeAll { .. } => None,
        }
    }

    /// Stable label for diagnostics and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::PurgeAll { .. } => "purge_all",
        }
    }
}
