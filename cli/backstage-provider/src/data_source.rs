//! Declared reads of single entities and of entity listings.

use backstage_catalog::ClientTrait;
use serde::Deserialize;
use tracing::debug;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity_ref::{EntityRef, validate_name};
use crate::fallback::{EntitiesFallback, Fallback};
use crate::kind::EntityKind;
use crate::provider::Provider;
use crate::read::{self, Response};
use crate::state::{EntitiesState, EntityState};

/// Read of a single entity as declared by the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadRequest<S> {
    pub name: String,
    /// Defaults to the provider's default namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub fallback: Option<Fallback<S>>,
}

impl<S> ReadRequest<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fallback: None,
        }
    }

    /// Check the names in the request, including those of the fallback.
    fn validate(&self) -> Diagnostics {
        let fallback = self.fallback.as_ref();
        [
            ("name", Some(self.name.as_str())),
            ("namespace", self.namespace.as_deref()),
            ("fallback.name", fallback.map(|fallback| fallback.name.as_str())),
            (
                "fallback.namespace",
                fallback.and_then(|fallback| fallback.namespace.as_deref()),
            ),
        ]
        .into_iter()
        .filter_map(|(attribute, value)| {
            let value = value?;
            let err = validate_name(value).err()?;
            Some(
                Diagnostic::error(
                    "Invalid entity reference",
                    format!("Invalid value '{value}' for {attribute}: {err}"),
                )
                .with_attribute(attribute),
            )
        })
        .collect()
    }
}

/// Listing of entities as declared by the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitiesRequest {
    /// Catalog filter expressions, e.g. `kind=component`.
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub fallback: Option<EntitiesFallback>,
}

impl<C: ClientTrait> Provider<C> {
    /// Read a single entity of kind `K`.
    ///
    /// Invalid names are reported as errors, whether or not a fallback is
    /// supplied.
    pub async fn read<K: EntityKind>(
        &self,
        request: ReadRequest<K::Spec>,
    ) -> Response<EntityState<K::Spec>> {
        let diagnostics = request.validate();
        if diagnostics.has_error() {
            return Response::new(None, diagnostics);
        }

        let namespace = request
            .namespace
            .unwrap_or_else(|| self.default_namespace().to_string());
        let entity_ref = EntityRef::new(K::KIND, namespace, request.name);
        debug!(entity = %entity_ref, fallback = request.fallback.is_some(), "reading entity");

        read::read_entity::<K, C>(self.client(), &entity_ref, request.fallback).await
    }

    /// List the entities matching the request's filters.
    pub async fn read_entities(&self, request: EntitiesRequest) -> Response<EntitiesState> {
        read::read_entities(self.client(), &request.filters, request.fallback).await
    }
}

#[cfg(test)]
mod tests {
    use backstage_catalog::types::{ApiSpec, UserSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::kind::{ApiKind, UserKind};
    use crate::read::tests::MockCatalog;

    #[tokio::test]
    async fn namespace_defaults_to_provider_namespace() {
        let catalog = MockCatalog::default().respond(
            "entity/User/platform/alice",
            200,
            json!({
                "apiVersion": "backstage.io/v1alpha1",
                "kind": "User",
                "metadata": { "name": "alice", "namespace": "platform", "uid": "u-1" },
                "spec": { "profile": { "email": "alice@example.com" }, "memberOf": ["team-a"] }
            }),
        );
        let provider = Provider::with_client(catalog, "platform");

        let response = provider
            .read::<UserKind>(ReadRequest::<UserSpec>::new("alice"))
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.state.unwrap();
        assert_eq!(state.namespace.as_deref(), Some("platform"));
        assert_eq!(state.spec.unwrap().member_of, vec!["team-a"]);
        assert_eq!(
            *provider.client().requests.lock().unwrap(),
            vec!["entity/User/platform/alice"]
        );
    }

    #[tokio::test]
    async fn invalid_names_are_not_downgraded_by_fallback() {
        let provider = Provider::with_client(MockCatalog::default(), "default");
        let request = ReadRequest::<ApiSpec> {
            namespace: Some("bad namespace".to_string()),
            fallback: Some(Fallback::new("")),
            ..ReadRequest::new("spotify-api")
        };

        let response = provider.read::<ApiKind>(request).await;

        assert_eq!(response.state, None);
        let attributes = response
            .diagnostics
            .errors()
            .map(|diagnostic| diagnostic.attribute.clone().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(attributes, vec!["namespace", "fallback.name"]);
        assert!(provider.client().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dot_names_are_rejected_before_reading() {
        let provider = Provider::with_client(MockCatalog::default(), "default");

        let response = provider
            .read::<UserKind>(ReadRequest::<UserSpec>::new(".."))
            .await;
        let error = response.diagnostics.errors().next().unwrap();
        assert_eq!(error.attribute.as_deref(), Some("name"));
        assert_eq!(
            error.detail,
            "Invalid value '..' for name: must not be '.' or '..'"
        );

        let response = provider
            .read::<UserKind>(ReadRequest::<UserSpec> {
                namespace: Some(".".to_string()),
                ..ReadRequest::new("alice")
            })
            .await;
        let error = response.diagnostics.errors().next().unwrap();
        assert_eq!(error.attribute.as_deref(), Some("namespace"));

        assert!(provider.client().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn request_deserializes_with_fallback() {
        let request: ReadRequest<ApiSpec> = serde_json::from_value(json!({
            "name": "spotify-api",
            "fallback": {
                "name": "spotify-api",
                "spec": { "type": "openapi", "owner": "team-a" }
            }
        }))
        .unwrap();

        assert_eq!(request.namespace, None);
        let spec = request.fallback.unwrap().spec.unwrap();
        assert_eq!(spec.api_type.as_deref(), Some("openapi"));
    }

    #[tokio::test]
    async fn listing_request_passes_filters() {
        let catalog = MockCatalog::default().respond("entities/kind=user", 200, json!([]));
        let provider = Provider::with_client(catalog, "default");

        let response = provider
            .read_entities(EntitiesRequest {
                filters: vec!["kind=user".to_string()],
                fallback: None,
            })
            .await;

        assert_eq!(response.state.unwrap().id, "[kind=user]");
    }
}
