//! Configuration types for catalog client construction.

use std::collections::BTreeMap;
use std::time::Duration;

/// Timeout applied to every request attempt unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the Backstage instance, e.g. `https://demo.backstage.io`.
    pub base_url: String,
    /// Additional headers to include in every request.
    pub extra_headers: BTreeMap<String, String>,
    /// Number of additional attempts for requests failing with a retryable
    /// condition. `0` disables the retry layer entirely.
    pub retries: u32,
    /// Upper bound for each individual request attempt.
    pub timeout: Duration,
    /// Optional user agent sent with every request.
    pub user_agent: Option<String>,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            extra_headers: BTreeMap::new(),
            retries: 0,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}
