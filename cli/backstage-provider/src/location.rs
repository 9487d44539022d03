//! Lifecycle of registered catalog locations.
//!
//! Locations are created, read and deleted, never updated in place. A changed
//! target means replacing the location. Unlike entity reads there is no
//! fallback, every failure is an error.

use backstage_catalog::{ClientTrait, display_chain};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, instrument};

use crate::diagnostics::Diagnostic;
use crate::provider::Provider;
use crate::read::{RemoteFailure, Response, classify};

/// Location type registered by [Provider::create_location].
pub const LOCATION_TYPE: &str = "url";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    pub id: String,
    #[serde(rename = "type")]
    pub location_type: String,
    pub target: String,
    /// Time of creation, RFC 3339. Unknown for locations that were not
    /// created by this provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

fn now_rfc3339() -> String {
    // Formatting a valid timestamp as RFC 3339 only fails for years
    // outside 0..=9999.
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn failure_detail(failure: &RemoteFailure) -> String {
    match failure {
        RemoteFailure::Transport(err) => format!("unexpected error: {}", display_chain(err)),
        RemoteFailure::Status(status) => {
            format!("unexpected status code: {}", status.as_u16())
        },
    }
}

impl LocationState {
    /// State of a location known only by its id, to be filled in by
    /// [Provider::read_location].
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location_type: LOCATION_TYPE.to_string(),
            target: String::new(),
            last_updated: None,
        }
    }
}

impl<C: ClientTrait> Provider<C> {
    /// Register `target` as a `url` location.
    #[instrument(skip(self))]
    pub async fn create_location(&self, target: &str) -> Response<LocationState> {
        let created = classify(self.client().create_location(target, false).await);
        match created {
            Ok(created) => {
                debug!(id = %created.location.id, "created location");
                Response::new(
                    Some(LocationState {
                        id: created.location.id,
                        location_type: created.location.location_type,
                        target: created.location.target,
                        last_updated: Some(now_rfc3339()),
                    }),
                    Default::default(),
                )
            },
            Err(failure) => Response::error(Diagnostic::error(
                "Error creating location",
                format!("Could not create location, {}", failure_detail(&failure)),
            )),
        }
    }

    /// Refresh `state` from the catalog.
    #[instrument(skip(self, state), fields(id = %state.id))]
    pub async fn read_location(&self, state: LocationState) -> Response<LocationState> {
        match classify(self.client().get_location(&state.id).await) {
            Ok(location) => Response::new(
                Some(LocationState {
                    location_type: location.location_type,
                    target: location.target,
                    ..state
                }),
                Default::default(),
            ),
            Err(failure) => {
                let detail = match &failure {
                    RemoteFailure::Transport(err) => format!(
                        "Could not read Backstage location ID {}: {}",
                        state.id,
                        display_chain(err)
                    ),
                    RemoteFailure::Status(status) => format!(
                        "Could not read Backstage location ID {}, unexpected status code: {}",
                        state.id,
                        status.as_u16()
                    ),
                };
                Response::error(Diagnostic::error("Error reading Backstage location", detail))
            },
        }
    }

    /// Remove the location with `id` from the catalog.
    #[instrument(skip(self))]
    pub async fn delete_location(&self, id: &str) -> Response<()> {
        match classify(self.client().delete_location(id).await) {
            Ok(()) => Response::new(Some(()), Default::default()),
            Err(failure) => Response::error(Diagnostic::error(
                "Error deleting Backstage location",
                format!("Could not delete location, {}", failure_detail(&failure)),
            )),
        }
    }
}
