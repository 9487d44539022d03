//! Reads against the catalog that fall back to caller supplied values.
//!
//! A read either succeeds, or fails remotely because of a transport error or
//! an unexpected HTTP status. A remote failure is reported as an error, unless
//! a fallback was supplied. In that case it is downgraded to a warning and the
//! fallback is resolved into the output instead.
//!
//! ```text
//! request ─┬─ ok ──────────────────────────────► entity
//!          └─ failed ─┬─ no fallback ──────────► error
//!                     └─ fallback ─► warning ──► fallback
//! ```

use backstage_catalog::{CatalogClientError, CatalogResponse, ClientTrait, display_chain};
use backstage_catalog::types::{Entity, SpecDocument};
use http::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity_ref::EntityRef;
use crate::fallback::{EntitiesFallback, Fallback};
use crate::kind::EntityKind;
use crate::state::{self, EntitiesState, EntityState, listing_id};

/// Why a remote read did not produce a value.
#[derive(Debug, Error)]
pub enum RemoteFailure {
    /// The request failed or the response could not be decoded.
    #[error("{}", display_chain(.0))]
    Transport(CatalogClientError),
    /// The catalog answered with a status other than the expected one.
    #[error("{0}")]
    Status(StatusCode),
}

/// Map a client result onto a value or the failure to report.
///
/// A response only carries a value if it had the expected status.
pub fn classify<T>(
    result: Result<CatalogResponse<T>, CatalogClientError>,
) -> Result<T, RemoteFailure> {
    match result {
        Err(err) => Err(RemoteFailure::Transport(err)),
        Ok(CatalogResponse {
            value: Some(value), ..
        }) => Ok(value),
        Ok(CatalogResponse { status, value: None }) => Err(RemoteFailure::Status(status)),
    }
}

/// What is being read, used to word diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSubject {
    /// E.g. `Backstage Group kind`
    pub description: String,
    /// E.g. `default/team-a`
    pub target: String,
}

impl ReadSubject {
    pub fn entity(entity_ref: &EntityRef) -> Self {
        Self {
            description: format!("Backstage {} kind", entity_ref.kind),
            target: format!("{}/{}", entity_ref.namespace, entity_ref.name),
        }
    }

    pub fn listing(filters: &[String]) -> Self {
        Self {
            description: "Backstage entities".to_string(),
            target: listing_id(filters),
        }
    }

    pub fn summary(&self) -> String {
        format!("Error reading {}", self.description)
    }

    pub fn detail(&self, failure: &RemoteFailure) -> String {
        format!(
            "Could not read {} {}: {failure}",
            self.description, self.target
        )
    }
}

/// Result of a read after the fallback decision was made.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Success(T),
    FallbackUsed(T, RemoteFailure),
    Failed(RemoteFailure),
}

impl<T> ReadOutcome<T> {
    pub fn settle(result: Result<T, RemoteFailure>, fallback: Option<T>) -> Self {
        match (result, fallback) {
            (Ok(value), _) => ReadOutcome::Success(value),
            (Err(failure), Some(fallback)) => ReadOutcome::FallbackUsed(fallback, failure),
            (Err(failure), None) => ReadOutcome::Failed(failure),
        }
    }

    /// Split the outcome into the output value and exactly the diagnostics
    /// describing it.
    pub fn report(self, subject: &ReadSubject) -> (Option<T>, Diagnostics) {
        match self {
            ReadOutcome::Success(value) => (Some(value), Diagnostics::new()),
            ReadOutcome::FallbackUsed(value, failure) => {
                let warning = Diagnostic::warning(subject.summary(), subject.detail(&failure));
                (Some(value), warning.into())
            },
            ReadOutcome::Failed(failure) => {
                let error = Diagnostic::error(subject.summary(), subject.detail(&failure));
                (None, error.into())
            },
        }
    }
}

/// Output of a read or resource operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub state: Option<T>,
    pub diagnostics: Diagnostics,
}

impl<T> Response<T> {
    pub fn new(state: Option<T>, diagnostics: Diagnostics) -> Self {
        Self { state, diagnostics }
    }

    /// A response without state carrying a single error.
    pub fn error(diagnostic: Diagnostic) -> Self {
        Self::new(None, diagnostic.into())
    }
}

/// Read the entity `entity_ref` of kind `K`, falling back to `fallback` if
/// the catalog cannot serve it.
#[instrument(skip_all, fields(entity = %entity_ref))]
pub async fn read_entity<K, C>(
    client: &C,
    entity_ref: &EntityRef,
    fallback: Option<Fallback<K::Spec>>,
) -> Response<EntityState<K::Spec>>
where
    K: EntityKind,
    C: ClientTrait,
{
    debug!("reading entity from catalog");
    let result = client
        .get_entity::<K::Spec>(&entity_ref.kind, &entity_ref.namespace, &entity_ref.name)
        .await;

    let result = classify(result).map(|entity: Entity<K::Spec>| {
        state::project(entity, &entity_ref.name, &entity_ref.namespace)
    });
    let outcome = ReadOutcome::settle(result, fallback.map(Fallback::resolve::<K>));
    if let ReadOutcome::FallbackUsed(_, failure) = &outcome {
        debug!(%failure, "using fallback");
    }

    let (state, diagnostics) = outcome.report(&ReadSubject::entity(entity_ref));
    Response::new(state, diagnostics)
}

/// List the entities matching `filters`, falling back to `fallback` if the
/// catalog cannot serve them.
///
/// An entity that cannot be projected is reported as an error, the remaining
/// entities are still part of the output.
#[instrument(skip_all, fields(filters = %listing_id(filters)))]
pub async fn read_entities<C>(
    client: &C,
    filters: &[String],
    fallback: Option<EntitiesFallback>,
) -> Response<EntitiesState>
where
    C: ClientTrait,
{
    debug!("listing entities from catalog");
    let mut projection_diagnostics = Diagnostics::new();
    let result = classify(client.list_entities(filters).await).map(|documents| {
        project_listing(filters, documents, &mut projection_diagnostics)
    });
    let outcome = ReadOutcome::settle(result, fallback.map(EntitiesFallback::resolve));

    let (state, mut diagnostics) = outcome.report(&ReadSubject::listing(filters));
    diagnostics.append(projection_diagnostics);
    Response::new(state, diagnostics)
}

fn project_listing(
    filters: &[String],
    documents: Vec<serde_json::Value>,
    diagnostics: &mut Diagnostics,
) -> EntitiesState {
    let mut entities = Vec::with_capacity(documents.len());
    for document in documents {
        let name = document
            .pointer("/metadata/name")
            .and_then(|name| name.as_str())
            .unwrap_or("<unnamed>")
            .to_string();
        match serde_json::from_value::<Entity<SpecDocument>>(document) {
            Ok(entity) => entities.push(state::project_listed(entity)),
            Err(err) => diagnostics.push(Diagnostic::error(
                "Error parsing Backstage entity specs",
                format!("Could not parse Specs for Backstage entity {name}: {err}"),
            )),
        }
    }
    EntitiesState {
        id: listing_id(filters),
        filters: filters.to_vec(),
        entities,
    }
}
