//! Error handling for catalog API operations.

use std::error::Error as StdError;

use reqwest::StatusCode;
use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};
use thiserror::Error;

/// Failure below the HTTP layer, raised by a [crate::transport::Transport].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("connection failed")]
    Connect(#[source] reqwest::Error),
    #[error("request failed")]
    Request(#[source] reqwest::Error),
    #[error("failed to read response body")]
    Body(#[source] reqwest::Error),
}

impl TransportError {
    /// Classify an error returned while sending a request.
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else if err.is_connect() {
            TransportError::Connect(err)
        } else {
            TransportError::Request(err)
        }
    }

    /// Whether a retry layer may re-attempt the request.
    ///
    /// Network level failures are transient, malformed requests and redirect
    /// loops are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Build(_) => false,
            TransportError::Timeout(_) | TransportError::Connect(_) | TransportError::Body(_) => {
                true
            },
            TransportError::Request(err) => !(err.is_builder() || err.is_redirect()),
        }
    }
}

/// Common error type for catalog API operations.
///
/// HTTP statuses other than the expected one are _not_ errors at this level,
/// they are handed back in [crate::CatalogResponse] for the caller to inspect.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("invalid catalog URL '{0}'")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("catalog URL '{0}' cannot be used as a base URL")]
    CannotBeABase(String),
    #[error("'{0}' cannot be used as a catalog path segment")]
    DotSegment(String),
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String, #[source] InvalidHeaderName),
    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String, #[source] InvalidHeaderValue),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode request body")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode response ({status})")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

/// Render an error and all of its sources as `error: cause: cause`.
pub fn display_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered = format!("{rendered}: {cause}");
        source = cause.source();
    }
    rendered
}
