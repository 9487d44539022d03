//! Catalog client on top of the transport stack.

use std::fmt::Debug;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::{CatalogClientError, TransportError};
use crate::transport::{BaseTransport, CatalogTransport, HeadersTransport, Transport};
use crate::types::{CreatedLocation, Entity, Location, LocationInput};

/// Status and, if the status was the expected one, decoded body of a catalog
/// response.
///
/// Unexpected statuses are not errors at this level, deciding what to do with
/// them is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogResponse<T> {
    pub status: StatusCode,
    pub value: Option<T>,
}

/// Build the transport stack described by `config`.
///
/// Mirrors what [CatalogClient::new] uses, exposed for callers that want to
/// wrap or inspect it.
pub fn build_transport(config: &CatalogClientConfig) -> Result<CatalogTransport, CatalogClientError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.extra_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| CatalogClientError::InvalidHeaderName(name.clone(), err))?;
        let mut header_value = HeaderValue::from_str(value)
            .map_err(|err| CatalogClientError::InvalidHeaderValue(name.clone(), err))?;
        if header_name == AUTHORIZATION {
            header_value.set_sensitive(true);
        }
        headers.append(header_name, header_value);
    }

    let base = BaseTransport::new(
        config.retries,
        config.timeout,
        config.user_agent.as_deref(),
    )?;
    Ok(HeadersTransport::new(headers, base))
}

fn parse_base_url(base_url: &str) -> Result<Url, CatalogClientError> {
    let url = Url::parse(base_url)
        .map_err(|err| CatalogClientError::InvalidUrl(base_url.to_string(), err))?;
    if url.cannot_be_a_base() {
        return Err(CatalogClientError::CannotBeABase(base_url.to_string()));
    }
    Ok(url)
}

/// A client for the Backstage catalog API.
pub struct CatalogClient<T = CatalogTransport> {
    transport: T,
    base_url: Url,
}

impl<T> Debug for CatalogClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url = parse_base_url(&config.base_url)?;
        let transport = build_transport(&config)?;
        Ok(Self {
            transport,
            base_url,
        })
    }
}

impl<T: Transport> CatalogClient<T> {
    /// Create a client sending its requests through `transport`.
    pub fn with_transport(base_url: &str, transport: T) -> Result<Self, CatalogClientError> {
        Ok(Self {
            transport,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Resolve `segments` below `<base_url>/api/catalog`.
    ///
    /// `.` and `..` are rejected, URL path handling would drop them and
    /// address a different resource.
    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, CatalogClientError> {
        let segments = segments.into_iter().collect::<Vec<_>>();
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(CatalogClientError::DotSegment(segment.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogClientError::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "catalog"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Request {
        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        request
    }

    fn json_request(
        &self,
        method: Method,
        url: Url,
        body: &impl Serialize,
    ) -> Result<Request, CatalogClientError> {
        let body = serde_json::to_vec(body).map_err(CatalogClientError::Encode)?;
        let mut request = self.request(method, url);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(body.into());
        Ok(request)
    }

    /// Send `request` and decode the body if the response has status
    /// `expected`.
    async fn send<R: DeserializeOwned>(
        &self,
        request: Request,
        expected: StatusCode,
    ) -> Result<CatalogResponse<R>, CatalogClientError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let response = self.transport.round_trip(request).await?;
        let status = response.status();
        debug!(%method, %url, %status, "catalog response");

        if status != expected {
            return Ok(CatalogResponse {
                status,
                value: None,
            });
        }

        let body = response.bytes().await.map_err(TransportError::Body)?;
        let value = serde_json::from_slice(&body)
            .map_err(|source| CatalogClientError::Decode { status, source })?;
        Ok(CatalogResponse {
            status,
            value: Some(value),
        })
    }

    /// Send `request` without reading the body.
    async fn send_empty(
        &self,
        request: Request,
        expected: StatusCode,
    ) -> Result<CatalogResponse<()>, CatalogClientError> {
        let response = self.transport.round_trip(request).await?;
        let status = response.status();
        debug!(%status, "catalog response");
        Ok(CatalogResponse {
            status,
            value: (status == expected).then_some(()),
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// The catalog API operations used by the provider.
///
/// Implemented over HTTP by [CatalogClient], tests substitute canned
/// responses.
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Get an entity by kind, namespace and name. Expects `200 OK`.
    async fn get_entity<S: DeserializeOwned + Default>(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<CatalogResponse<Entity<S>>, CatalogClientError>;

    /// List the raw entity documents matching `filters`, ordered by name.
    /// Expects `200 OK`.
    async fn list_entities(
        &self,
        filters: &[String],
    ) -> Result<CatalogResponse<Vec<serde_json::Value>>, CatalogClientError>;

    /// Register a `url` location. Expects `201 Created`.
    async fn create_location(
        &self,
        target: &str,
        dry_run: bool,
    ) -> Result<CatalogResponse<CreatedLocation>, CatalogClientError>;

    /// Get a registered location. Expects `200 OK`.
    async fn get_location(&self, id: &str) -> Result<CatalogResponse<Location>, CatalogClientError>;

    /// Remove a registered location. Expects `204 No Content`.
    async fn delete_location(&self, id: &str) -> Result<CatalogResponse<()>, CatalogClientError>;
}

impl<T: Transport> ClientTrait for CatalogClient<T> {
    #[instrument(skip(self))]
    async fn get_entity<S: DeserializeOwned + Default>(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<CatalogResponse<Entity<S>>, CatalogClientError> {
        let url = self.endpoint(["entities", "by-name", kind, namespace, name])?;
        self.send(self.request(Method::GET, url), StatusCode::OK)
            .await
    }

    #[instrument(skip(self))]
    async fn list_entities(
        &self,
        filters: &[String],
    ) -> Result<CatalogResponse<Vec<serde_json::Value>>, CatalogClientError> {
        let mut url = self.endpoint(["entities"])?;
        {
            let mut query = url.query_pairs_mut();
            for filter in filters {
                query.append_pair("filter", filter);
            }
            query.append_pair("order", "asc:metadata.name");
        }
        self.send(self.request(Method::GET, url), StatusCode::OK)
            .await
    }

    #[instrument(skip(self))]
    async fn create_location(
        &self,
        target: &str,
        dry_run: bool,
    ) -> Result<CatalogResponse<CreatedLocation>, CatalogClientError> {
        let mut url = self.endpoint(["locations"])?;
        url.query_pairs_mut()
            .append_pair("dryRun", if dry_run { "true" } else { "false" });
        let body = LocationInput {
            location_type: "url".to_string(),
            target: target.to_string(),
        };
        let request = self.json_request(Method::POST, url, &body)?;
        self.send(request, StatusCode::CREATED).await
    }

    #[instrument(skip(self))]
    async fn get_location(&self, id: &str) -> Result<CatalogResponse<Location>, CatalogClientError> {
        let url = self.endpoint(["locations", id])?;
        self.send(self.request(Method::GET, url), StatusCode::OK)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_location(&self, id: &str) -> Result<CatalogResponse<()>, CatalogClientError> {
        let url = self.endpoint(["locations", id])?;
        self.send_empty(self.request(Method::DELETE, url), StatusCode::NO_CONTENT)
            .await
    }
}
