//! Provider configuration and construction of the catalog client.
//!
//! Every setting can be given as an attribute or through an environment
//! variable. Attributes take precedence, unset values fall back to defaults.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use backstage_catalog::types::DEFAULT_NAMESPACE;
use backstage_catalog::{CatalogClient, CatalogClientConfig, CatalogClientError, DEFAULT_TIMEOUT};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity_ref::{NameError, validate_name};

pub const ENV_BASE_URL: &str = "BACKSTAGE_BASE_URL";
pub const ENV_DEFAULT_NAMESPACE: &str = "BACKSTAGE_DEFAULT_NAMESPACE";
pub const ENV_HEADERS: &str = "BACKSTAGE_HEADERS";
pub const ENV_RETRIES: &str = "BACKSTAGE_RETRIES";
pub const ENV_TIMEOUT_SECONDS: &str = "BACKSTAGE_TIMEOUT_SECONDS";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://.+").expect("static valid regex"));

/// `key=value` pairs separated by commas, values cannot contain `=`.
static HEADERS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*?)=([^=]*)(?:,|$)").expect("static valid regex"));

const USER_AGENT: &str = concat!("backstage-provider/", env!("CARGO_PKG_VERSION"));

/// Provider settings as declared by the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderAttributes {
    /// Base URL of the Backstage instance, e.g. `https://demo.backstage.io`.
    pub base_url: Option<String>,
    /// Namespace of entities read without one (`default` if unset).
    pub default_namespace: Option<String>,
    /// Headers sent with every request, e.g. for authentication.
    pub headers: Option<BTreeMap<String, String>>,
    /// Retries on recoverable API errors (default: 0).
    pub retries: Option<i64>,
    /// Timeout of each request attempt in seconds (default: 15).
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ProviderConfigError {
    #[error(
        "the Backstage base URL is not set, set 'base_url' or the BACKSTAGE_BASE_URL environment variable"
    )]
    MissingBaseUrl,
    #[error("'{0}' is not a valid Backstage base URL, expected an http(s) URL")]
    InvalidBaseUrl(String),
    #[error("invalid default namespace '{0}'")]
    InvalidNamespace(String, #[source] NameError),
    #[error("invalid number of retries '{0}', expected a non-negative integer")]
    InvalidRetries(String),
    #[error("invalid request timeout '{0}', expected a positive number of seconds")]
    InvalidTimeout(String),
    #[error("unable to create Backstage API client")]
    Client(#[source] CatalogClientError),
}

impl ProviderConfigError {
    /// The attribute the error refers to.
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            ProviderConfigError::MissingBaseUrl | ProviderConfigError::InvalidBaseUrl(_) => {
                Some("base_url")
            },
            ProviderConfigError::InvalidNamespace(..) => Some("default_namespace"),
            ProviderConfigError::InvalidRetries(_) => Some("retries"),
            ProviderConfigError::InvalidTimeout(_) => Some("timeout_seconds"),
            ProviderConfigError::Client(_) => None,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ProviderConfigError::MissingBaseUrl | ProviderConfigError::InvalidBaseUrl(_) => {
                "Missing or invalid Base URL of Backstage instance"
            },
            ProviderConfigError::InvalidNamespace(..) => {
                "Invalid default namespace of Backstage instance"
            },
            ProviderConfigError::InvalidRetries(_) => "Invalid number of retries",
            ProviderConfigError::InvalidTimeout(_) => {
                "Invalid timeout for requests to the Backstage API"
            },
            ProviderConfigError::Client(_) => "Unable to create Backstage API client",
        }
    }
}

impl From<ProviderConfigError> for Diagnostic {
    fn from(err: ProviderConfigError) -> Self {
        let diagnostic = Diagnostic::error(
            err.summary(),
            backstage_catalog::display_chain(&err),
        );
        match err.attribute() {
            Some(attribute) => diagnostic.with_attribute(attribute),
            None => diagnostic,
        }
    }
}

/// Fully resolved provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub default_namespace: String,
    pub headers: BTreeMap<String, String>,
    pub retries: u32,
    pub timeout: Duration,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Parse `key=value,key2=value2` as found in [ENV_HEADERS].
pub fn parse_headers(value: &str) -> BTreeMap<String, String> {
    HEADERS_REGEX
        .captures_iter(value)
        .map(|captures| (captures[1].to_string(), captures[2].to_string()))
        .collect()
}

/// Resolve an integer setting from its attribute or environment variable.
fn resolve_integer<T: TryFrom<i64>>(
    attribute: Option<i64>,
    env: &str,
    default: T,
    accept: impl Fn(&T) -> bool,
    invalid: impl Fn(String) -> ProviderConfigError,
) -> Result<T, ProviderConfigError> {
    let (raw, parsed) = match attribute {
        Some(value) => (value.to_string(), Some(value)),
        None => match env_var(env) {
            Some(value) => {
                let parsed = value.trim().parse::<i64>().ok();
                (value, parsed)
            },
            None => return Ok(default),
        },
    };

    parsed
        .and_then(|value| T::try_from(value).ok())
        .filter(|value| accept(value))
        .ok_or_else(|| invalid(raw))
}

impl ProviderSettings {
    /// Resolve settings from `attributes` and the environment.
    ///
    /// All invalid settings are reported, not only the first.
    pub fn resolve(attributes: &ProviderAttributes) -> Result<Self, Diagnostics> {
        let mut diagnostics = Diagnostics::new();

        let base_url = attributes
            .base_url
            .clone()
            .filter(|value| !value.is_empty())
            .or_else(|| env_var(ENV_BASE_URL));
        let base_url = match base_url {
            None => {
                diagnostics.push(ProviderConfigError::MissingBaseUrl.into());
                String::new()
            },
            Some(url) if !URL_REGEX.is_match(&url) => {
                diagnostics.push(ProviderConfigError::InvalidBaseUrl(url.clone()).into());
                url
            },
            Some(url) => url,
        };

        let default_namespace = attributes
            .default_namespace
            .clone()
            .or_else(|| env_var(ENV_DEFAULT_NAMESPACE))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if let Err(err) = validate_name(&default_namespace) {
            diagnostics
                .push(ProviderConfigError::InvalidNamespace(default_namespace.clone(), err).into());
        }

        let headers = match &attributes.headers {
            Some(headers) => headers.clone(),
            None => env_var(ENV_HEADERS)
                .map(|value| parse_headers(&value))
                .unwrap_or_default(),
        };

        let retries = resolve_integer(
            attributes.retries,
            ENV_RETRIES,
            0_u32,
            |_| true,
            ProviderConfigError::InvalidRetries,
        )
        .unwrap_or_else(|err| {
            diagnostics.push(err.into());
            0
        });

        let timeout_seconds = resolve_integer(
            attributes.timeout_seconds,
            ENV_TIMEOUT_SECONDS,
            DEFAULT_TIMEOUT.as_secs(),
            |seconds| *seconds > 0,
            ProviderConfigError::InvalidTimeout,
        )
        .unwrap_or_else(|err| {
            diagnostics.push(err.into());
            DEFAULT_TIMEOUT.as_secs()
        });

        if diagnostics.has_error() {
            return Err(diagnostics);
        }

        Ok(ProviderSettings {
            base_url,
            default_namespace,
            headers,
            retries,
            timeout: Duration::from_secs(timeout_seconds),
        })
    }

    pub fn client_config(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            base_url: self.base_url.clone(),
            extra_headers: self.headers.clone(),
            retries: self.retries,
            timeout: self.timeout,
            user_agent: Some(USER_AGENT.to_string()),
        }
    }
}

/// A configured provider, shared by all reads and resource operations.
#[derive(Debug)]
pub struct Provider<C = CatalogClient> {
    client: C,
    default_namespace: String,
}

impl Provider {
    /// Resolve the configuration and create the catalog client.
    pub fn configure(attributes: &ProviderAttributes) -> Result<Self, Diagnostics> {
        let settings = ProviderSettings::resolve(attributes)?;

        debug!(
            base_url = %settings.base_url,
            default_namespace = %settings.default_namespace,
            headers = ?settings.headers.keys().collect::<Vec<_>>(),
            retries = settings.retries,
            timeout_seconds = settings.timeout.as_secs(),
            "creating Backstage API client"
        );

        let client = CatalogClient::new(settings.client_config())
            .map_err(|err| Diagnostics::from(Diagnostic::from(ProviderConfigError::Client(err))))?;

        Ok(Provider::with_client(client, settings.default_namespace))
    }
}

impl<C> Provider<C> {
    pub fn with_client(client: C, default_namespace: impl Into<String>) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}
