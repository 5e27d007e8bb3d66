use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

///
/// EntityTypeId
///
/// Stable schema-path identifier for an indexed entity type.
///
/// Types are identified by a `&'static str` path supplied at registration
/// time; the engine never inspects runtime type information beyond this id.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct EntityTypeId(&'static str);

impl EntityTypeId {
    #[must_use]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// IndexingId
///
/// The key identifying a document within one entity type's index.
///
/// May be derived from the entity by its document builder or externally
/// supplied ("provided id"). Ordering and hashing follow the tagged value,
/// so ids of different shapes never collide.
///

#[derive(
    Clone, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub enum IndexingId {
    #[display("{_0}")]
    Uint(u64),

    #[display("{_0}")]
    Int(i64),

    #[display("{_0}")]
    Text(String),

    #[display("{_0}")]
    Ulid(Ulid),
}

impl From<&str> for IndexingId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
