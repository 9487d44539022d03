//! Caller supplied values standing in for entities that could not be read.

use serde::Deserialize;

use crate::kind::EntityKind;
use crate::state::{EntitiesState, EntityState, ListedEntityState, MetadataState, RelationState};

/// Identifier given to fallback values that do not set one.
pub const FALLBACK_ID: &str = "123456789";

/// Entity shaped fallback of a single entity read.
///
/// Only used if the remote read fails. Its content is not checked against
/// the entity being read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fallback<S> {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: Option<MetadataState>,
    #[serde(default)]
    pub relations: Vec<RelationState>,
    #[serde(default)]
    pub spec: Option<S>,
}

impl<S> Fallback<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            namespace: None,
            api_version: None,
            kind: None,
            metadata: None,
            relations: Vec::new(),
            spec: None,
        }
    }

    /// Turn the fallback into the state of a read of kind `K`.
    ///
    /// Unset identifier, API version and kind are defaulted, every other
    /// field is taken as is.
    pub fn resolve<K>(self) -> EntityState<S>
    where
        K: EntityKind<Spec = S>,
    {
        EntityState {
            id: self.id.unwrap_or_else(|| FALLBACK_ID.to_string()),
            name: self.name,
            namespace: self.namespace,
            api_version: self
                .api_version
                .unwrap_or_else(|| K::API_VERSION.to_string()),
            kind: self.kind.unwrap_or_else(|| K::KIND.to_string()),
            metadata: self.metadata,
            relations: self.relations,
            spec: self.spec,
        }
    }
}

/// Fallback of an entity listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntitiesFallback {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub entities: Vec<ListedEntityState>,
}

impl EntitiesFallback {
    pub fn resolve(self) -> EntitiesState {
        EntitiesState {
            id: self.id.unwrap_or_else(|| FALLBACK_ID.to_string()),
            filters: self.filters,
            entities: self.entities,
        }
    }
}
