use crate::{error::InternalError, identity::EntityTypeId, traits::DocumentBuilder};
use std::{collections::BTreeMap, sync::Arc};

///
/// BuilderRegistry
///
/// Typed registry mapping an [`EntityTypeId`] to its [`DocumentBuilder`]
/// capability. Built once at bootstrap and shared (immutably) by every plan;
/// there is no global registry.
///

#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: BTreeMap<EntityTypeId, Arc<dyn DocumentBuilder>>,
}

impl BuilderRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Register a builder under its own entity type.
    ///
    /// Duplicate registration for a type is a bootstrap bug and is rejected.
    pub fn register(&mut self, builder: Arc<dyn DocumentBuilder>) -> Result<(), InternalError> {
        let entity_type = builder.entity_type();

        if self.builders.contains_key(&entity_type) {
            return Err(InternalError::registry_conflict(entity_type.as_str()));
        }
        self.builders.insert(entity_type, builder);

        Ok(())
    }

    /// Resolve the builder for an entity type.
    pub fn try_get(&self, entity_type: EntityTypeId) -> Result<Arc<dyn DocumentBuilder>, InternalError> {
        self.builders
            .get(&entity_type)
            .cloned()
            .ok_or_else(|| InternalError::unsupported_entity_type(entity_type.as_str()))
    }

    #[must_use]
    pub fn contains(&self, entity_type: EntityTypeId) -> bool {
        self.builders.contains_key(&entity_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}
