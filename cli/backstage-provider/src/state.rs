//! Output state of reads and the projection of catalog entities into it.

use std::collections::BTreeMap;

use backstage_catalog::types::{
    Entity,
    EntityLink,
    EntityMetadata,
    EntityRelation,
    RelationTarget,
    SpecDocument,
};
use serde::{Deserialize, Serialize};

/// State of a single entity read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState<S> {
    /// Catalog assigned uid, or the fallback identifier.
    pub id: String,
    pub name: String,
    pub namespace: Option<String>,
    pub api_version: String,
    pub kind: String,
    pub metadata: Option<MetadataState>,
    pub relations: Vec<RelationState>,
    pub spec: Option<S>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataState {
    pub uid: Option<String>,
    pub etag: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub links: Vec<LinkState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(rename = "type", default)]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationState {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub target_ref: String,
    #[serde(default)]
    pub target: Option<RelationTargetState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationTargetState {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

/// State of an entity listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitiesState {
    pub id: String,
    pub filters: Vec<String>,
    pub entities: Vec<ListedEntityState>,
}

/// An entity of a listing, its spec kept as an opaque document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListedEntityState {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Option<MetadataState>,
    #[serde(default)]
    pub relations: Vec<RelationState>,
    #[serde(default)]
    pub spec: SpecDocument,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Project an entity read as `name` in `namespace`.
pub fn project<S>(entity: Entity<S>, name: &str, namespace: &str) -> EntityState<S> {
    EntityState {
        id: entity.metadata.uid.clone().unwrap_or_default(),
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        api_version: entity.api_version,
        kind: entity.kind,
        metadata: Some(entity.metadata.into()),
        relations: entity.relations.into_iter().map(Into::into).collect(),
        spec: Some(entity.spec),
    }
}

/// Project an entity of a listing.
pub fn project_listed(entity: Entity<SpecDocument>) -> ListedEntityState {
    ListedEntityState {
        api_version: entity.api_version,
        kind: entity.kind,
        metadata: Some(entity.metadata.into()),
        relations: entity.relations.into_iter().map(Into::into).collect(),
        spec: entity.spec,
    }
}

/// Identifier of a listing, rendered as `[filter filter ...]`.
pub fn listing_id(filters: &[String]) -> String {
    format!("[{}]", filters.join(" "))
}

impl From<EntityMetadata> for MetadataState {
    fn from(metadata: EntityMetadata) -> Self {
        MetadataState {
            uid: metadata.uid,
            etag: metadata.etag,
            name: Some(metadata.name),
            namespace: metadata.namespace,
            title: metadata.title,
            description: metadata.description,
            labels: metadata.labels,
            annotations: metadata.annotations,
            tags: metadata.tags,
            links: metadata.links.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<EntityLink> for LinkState {
    fn from(link: EntityLink) -> Self {
        LinkState {
            url: link.url,
            title: link.title,
            icon: link.icon,
            link_type: link.link_type,
        }
    }
}

impl From<EntityRelation> for RelationState {
    fn from(relation: EntityRelation) -> Self {
        RelationState {
            relation_type: relation.relation_type,
            target_ref: relation.target_ref,
            target: relation.target.map(Into::into),
        }
    }
}

impl From<RelationTarget> for RelationTargetState {
    fn from(target: RelationTarget) -> Self {
        RelationTargetState {
            kind: target.kind,
            name: target.name,
            namespace: target.namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use backstage_catalog::types::ComponentSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn component() -> Entity<ComponentSpec> {
        serde_json::from_value(json!({
            "apiVersion": "backstage.io/v1alpha1",
            "kind": "Component",
            "metadata": {
                "uid": "c0ffee",
                "etag": "e1",
                "name": "shuffle-api",
                "namespace": "default",
                "labels": { "tier": "backend" },
                "annotations": { "github.com/project-slug": "acme/shuffle" },
                "tags": ["java", "grpc"],
                "links": [{ "url": "https://shuffle.example.com", "title": "Dashboard" }]
            },
            "spec": {
                "type": "service",
                "lifecycle": "production",
                "owner": "team-a",
                "system": "audio-playback",
                "dependsOn": ["resource:shuffle-db", "component:auth"]
            },
            "relations": [
                {
                    "type": "ownedBy",
                    "targetRef": "group:default/team-a",
                    "target": { "kind": "group", "namespace": "default", "name": "team-a" }
                },
                { "type": "partOf", "targetRef": "system:default/audio-playback" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn projects_scalars_lists_and_relations() {
        let state = project(component(), "shuffle-api", "default");

        assert_eq!(state.id, "c0ffee");
        assert_eq!(state.name, "shuffle-api");
        assert_eq!(state.namespace.as_deref(), Some("default"));
        assert_eq!(state.kind, "Component");

        let spec = state.spec.unwrap();
        assert_eq!(spec.system.as_deref(), Some("audio-playback"));
        assert_eq!(spec.depends_on, vec!["resource:shuffle-db", "component:auth"]);

        let metadata = state.metadata.unwrap();
        assert_eq!(metadata.tags, vec!["java", "grpc"]);
        assert_eq!(metadata.links[0].title.as_deref(), Some("Dashboard"));
        assert_eq!(metadata.labels["tier"], "backend");

        assert_eq!(state.relations.len(), 2);
        assert_eq!(
            state.relations[0].target,
            Some(RelationTargetState {
                kind: "group".to_string(),
                name: "team-a".to_string(),
                namespace: "default".to_string(),
            })
        );
        assert_eq!(state.relations[1].target, None);
    }

    #[test]
    fn projected_maps_are_independent_of_source() {
        let entity = component();
        let mut state = project(entity.clone(), "shuffle-api", "default");

        state
            .metadata
            .as_mut()
            .unwrap()
            .labels
            .insert("tier".to_string(), "frontend".to_string());

        assert_eq!(entity.metadata.labels["tier"], "backend");
    }

    #[test]
    fn state_uses_snake_case_keys() {
        let state = project(component(), "shuffle-api", "default");
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["api_version"], json!("backstage.io/v1alpha1"));
        assert_eq!(value["relations"][0]["target_ref"], json!("group:default/team-a"));
    }

    #[test]
    fn listing_id_matches_filter_rendering() {
        assert_eq!(listing_id(&[]), "[]");
        assert_eq!(
            listing_id(&["kind=component".to_string(), "spec.type=service".to_string()]),
            "[kind=component spec.type=service]"
        );
    }
}
