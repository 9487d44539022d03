//! Catalog wire types.
//!
//! These mirror the JSON documents served by the Backstage catalog API.
//! Field names follow the catalog's camelCase convention.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Namespace used when neither the request nor the configuration names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// API version of every entity kind in the `backstage.io` group.
pub const DEFAULT_API_VERSION: &str = "backstage.io/v1alpha1";

/// Spec of an entity whose kind is not known up front.
///
/// Kept as an opaque JSON object, key order is not significant.
pub type SpecDocument = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity<S = SpecDocument> {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    #[serde(default)]
    pub spec: S,
    #[serde(default)]
    pub relations: Vec<EntityRelation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<EntityLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

/// A directed edge from an entity to another catalog entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub target_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<RelationTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationTarget {
    pub name: String,
    pub kind: String,
    pub namespace: String,
}

// ---------------------------------------------------------------------------
// Kind specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcomponent_of: Option<String>,
    #[serde(default)]
    pub provides_apis: Vec<String>,
    #[serde(default)]
    pub consumes_apis: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Display information shared by groups and users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub member_of: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// A registered location, as returned by the locations endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(rename = "type")]
    pub location_type: String,
    pub target: String,
}

/// Body of a location registration request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInput {
    #[serde(rename = "type")]
    pub location_type: String,
    pub target: String,
}

/// Response to a location registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedLocation {
    pub location: Location,
    #[serde(default)]
    pub entities: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn entity_decodes_with_missing_optional_sections() {
        let entity: Entity<ComponentSpec> = serde_json::from_value(json!({
            "apiVersion": "backstage.io/v1alpha1",
            "kind": "Component",
            "metadata": { "name": "artist-web" }
        }))
        .unwrap();

        assert_eq!(entity.metadata.name, "artist-web");
        assert_eq!(entity.spec, ComponentSpec::default());
        assert!(entity.relations.is_empty());
        assert!(entity.metadata.labels.is_empty());
    }

    #[test]
    fn component_spec_uses_catalog_field_names() {
        let spec: ComponentSpec = serde_json::from_value(json!({
            "type": "service",
            "subcomponentOf": "playback",
            "providesApis": ["spotify-api", "playback-api"],
            "dependsOn": ["resource:artists-db"]
        }))
        .unwrap();

        assert_eq!(spec.component_type.as_deref(), Some("service"));
        assert_eq!(spec.subcomponent_of.as_deref(), Some("playback"));
        assert_eq!(spec.provides_apis, vec!["spotify-api", "playback-api"]);
        assert_eq!(spec.depends_on, vec!["resource:artists-db"]);
    }

    #[test]
    fn generic_spec_is_kept_opaque() {
        let entity: Entity = serde_json::from_value(json!({
            "apiVersion": "backstage.io/v1alpha1",
            "kind": "Template",
            "metadata": { "name": "react-ssr-template" },
            "spec": { "owner": "web@example.com", "steps": [{ "id": "fetch" }] }
        }))
        .unwrap();

        assert_eq!(entity.spec["owner"], json!("web@example.com"));
        assert_eq!(entity.spec["steps"][0]["id"], json!("fetch"));
    }

    #[test]
    fn location_input_serializes_type_field() {
        let input = LocationInput {
            location_type: "url".to_string(),
            target: "https://example.com/catalog-info.yaml".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "type": "url", "target": "https://example.com/catalog-info.yaml" })
        );
    }
}
