//! HTTP transport layers used by the catalog client.
//!
//! A [Transport] performs a single request/response round trip.
//! Layers wrap an inner transport and stay transparent to the caller:
//!
//! - [HeadersTransport] adds a static set of headers to every request
//! - [RetryTransport] re-attempts requests failing with a retryable condition
//! - [ReqwestTransport] sends requests over the network, bounding each attempt
//!   with a timeout
//!
//! The client stacks them as `HeadersTransport<BaseTransport>` where
//! [BaseTransport] only contains the retry layer if retries are configured.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Request, Response, StatusCode};
use tracing::debug;

use crate::error::TransportError;

/// A single HTTP round trip.
///
/// Implementations must be safe to share between concurrent reads and must
/// not keep per-request state.
pub trait Transport: Send + Sync {
    fn round_trip(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

// ---------------------------------------------------------------------------
// Network transport
// ---------------------------------------------------------------------------

/// Sends requests with a [reqwest::Client].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests are bounded by `timeout` per attempt.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, TransportError> {
        let builder = reqwest::Client::builder().timeout(timeout);
        let builder = match user_agent {
            Some(user_agent) => builder.user_agent(user_agent),
            None => builder,
        };
        let client = builder.build().map_err(TransportError::Build)?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        self.client
            .execute(request)
            .await
            .map_err(TransportError::from_send)
    }
}

// ---------------------------------------------------------------------------
// Header injection
// ---------------------------------------------------------------------------

/// Adds a fixed set of headers to every outgoing request.
///
/// Headers are appended, values the request already carries for the same
/// name are kept.
/// The request is owned by the round trip, so callers that need the original
/// again (e.g. for a retry) hold their own copy from [Request::try_clone].
#[derive(Debug, Clone)]
pub struct HeadersTransport<T> {
    headers: HeaderMap,
    base: T,
}

impl<T> HeadersTransport<T> {
    pub fn new(headers: HeaderMap, base: T) -> Self {
        Self { headers, base }
    }
}

impl<T: Transport> Transport for HeadersTransport<T> {
    async fn round_trip(&self, mut request: Request) -> Result<Response, TransportError> {
        let outgoing = request.headers_mut();
        for (name, value) in &self.headers {
            outgoing.append(name.clone(), value.clone());
        }
        self.base.round_trip(request).await
    }
}

// ---------------------------------------------------------------------------
// Retries
// ---------------------------------------------------------------------------

/// Exponential backoff between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based): `min * 2^attempt`,
    /// capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.min.saturating_mul(factor).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts on top of the first one.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Whether `429 Too Many Requests` counts as retryable.
    pub retry_too_many_requests: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
            retry_too_many_requests: true,
        }
    }

    /// `501 Not Implemented` is permanent and never retried.
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
            || (self.retry_too_many_requests && status == StatusCode::TOO_MANY_REQUESTS)
    }

    /// Delay before retry number `attempt`, honouring a `Retry-After` header
    /// in seconds if the server sent one.
    fn delay_for(&self, attempt: u32, response: Option<&Response>) -> Duration {
        let retry_after = response
            .and_then(|response| response.headers().get(RETRY_AFTER))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        match retry_after {
            Some(retry_after) => retry_after.min(self.backoff.max),
            None => self.backoff.delay(attempt),
        }
    }
}

/// Re-attempts requests that fail with a network error, a `5xx` status other
/// than `501` or, if enabled, `429`.
///
/// Once retries are exhausted the outcome of the last attempt is returned
/// unchanged, a final retryable status is therefore still visible to the
/// caller.
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    base: T,
    policy: RetryPolicy,
}

impl<T> RetryTransport<T> {
    pub fn new(base: T, policy: RetryPolicy) -> Self {
        Self { base, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        let mut attempt = 0;
        loop {
            let Some(attempt_request) = request.try_clone() else {
                debug!(url = %request.url(), "request body is not cloneable, sending without retries");
                return self.base.round_trip(request).await;
            };

            let result = self.base.round_trip(attempt_request).await;

            let retryable = match &result {
                Ok(response) => self.policy.should_retry_status(response.status()),
                Err(err) => err.is_retryable(),
            };
            if !retryable || attempt >= self.policy.max_retries {
                return result;
            }

            let delay = self.policy.delay_for(attempt, result.as_ref().ok());
            match &result {
                Ok(response) => debug!(
                    url = %request.url(),
                    status = %response.status(),
                    attempt = attempt + 1,
                    max_retries = self.policy.max_retries,
                    ?delay,
                    "retrying catalog request"
                ),
                Err(err) => debug!(
                    url = %request.url(),
                    error = %err,
                    attempt = attempt + 1,
                    max_retries = self.policy.max_retries,
                    ?delay,
                    "retrying catalog request"
                ),
            }
            drop(result);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Network transport, with a retry layer only if retries are configured.
#[derive(Debug, Clone)]
pub enum BaseTransport {
    Direct(ReqwestTransport),
    Retrying(RetryTransport<ReqwestTransport>),
}

impl BaseTransport {
    /// Build the network transport for `retries` additional attempts, each
    /// bounded by `timeout`.
    pub fn new(
        retries: u32,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, TransportError> {
        let network = ReqwestTransport::new(timeout, user_agent)?;
        if retries == 0 {
            return Ok(BaseTransport::Direct(network));
        }
        Ok(BaseTransport::Retrying(RetryTransport::new(
            network,
            RetryPolicy::new(retries),
        )))
    }
}

impl Transport for BaseTransport {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        match self {
            BaseTransport::Direct(transport) => transport.round_trip(request).await,
            BaseTransport::Retrying(transport) => transport.round_trip(request).await,
        }
    }
}

/// The transport stack used by [crate::CatalogClient] by default.
pub type CatalogTransport = HeadersTransport<BaseTransport>;

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::time::Instant;

    use httpmock::MockServer;
    use reqwest::Method;
    use reqwest::header::HeaderValue;
    use url::Url;

    use super::*;

    /// Answers requests with a scripted sequence of statuses and records the
    /// headers of every request it sees.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        statuses: Mutex<VecDeque<(u16, &'static str)>>,
        seen: Mutex<Vec<HeaderMap>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
            Self {
                statuses: Mutex::new(script.into_iter().collect()),
                seen: Mutex::default(),
            }
        }

        pub(crate) fn seen(&self) -> Vec<HeaderMap> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
            self.seen.lock().unwrap().push(request.headers().clone());
            let (status, body) = self.statuses.lock().unwrap().pop_front().unwrap_or((200, ""));
            let response = http::Response::builder()
                .status(status)
                .body(body)
                .unwrap();
            Ok(response.into())
        }
    }

    impl Transport for std::sync::Arc<ScriptedTransport> {
        async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
            (**self).round_trip(request).await
        }
    }

    pub(crate) fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Backoff {
                min: Duration::from_millis(1),
                max: Duration::from_millis(5),
            },
            retry_too_many_requests: true,
        }
    }

    pub(crate) fn two_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-team", HeaderValue::from_static("platform"));
        headers.insert("authorization", HeaderValue::from_static("Bearer s3cr3t"));
        headers
    }

    fn get(url: &str) -> Request {
        Request::new(Method::GET, Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn headers_are_added_to_request() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(200, "")]));
        let transport = HeadersTransport::new(two_headers(), scripted.clone());

        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let seen = scripted.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["x-team"], "platform");
        assert_eq!(seen[0]["authorization"], "Bearer s3cr3t");
    }

    #[tokio::test]
    async fn headers_are_merged_not_replaced() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(200, "")]));
        let transport = HeadersTransport::new(two_headers(), scripted.clone());

        let mut request = get("http://catalog.test/api/catalog/entities");
        request
            .headers_mut()
            .insert("x-team", HeaderValue::from_static("search"));
        request
            .headers_mut()
            .insert("accept", HeaderValue::from_static("application/json"));

        transport.round_trip(request).await.unwrap();

        let seen = scripted.seen();
        let teams = seen[0]
            .get_all("x-team")
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(teams, vec!["search", "platform"]);
        assert_eq!(seen[0]["accept"], "application/json");
    }

    #[tokio::test]
    async fn cloned_request_is_not_affected_by_injection() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(200, "")]));
        let transport = HeadersTransport::new(two_headers(), scripted.clone());

        let original = get("http://catalog.test/api/catalog/entities");
        transport
            .round_trip(original.try_clone().unwrap())
            .await
            .unwrap();

        assert!(original.headers().is_empty());
    }

    /// Two 503s followed by a success are seen as a single successful round
    /// trip, with the injected headers on every attempt.
    #[tokio::test]
    async fn retries_keep_headers_on_every_attempt() {
        let scripted =
            std::sync::Arc::new(ScriptedTransport::new([(503, ""), (503, ""), (200, "")]));
        let transport = HeadersTransport::new(
            two_headers(),
            RetryTransport::new(scripted.clone(), fast_policy(3)),
        );

        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let seen = scripted.seen();
        assert_eq!(seen.len(), 3);
        for headers in seen {
            assert_eq!(headers["x-team"], "platform");
            assert_eq!(headers["authorization"], "Bearer s3cr3t");
            assert_eq!(headers.get_all("x-team").iter().count(), 1);
        }
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(503, ""); 6]));
        let transport = RetryTransport::new(scripted.clone(), fast_policy(2));

        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(scripted.seen().len(), 3);
    }

    #[tokio::test]
    async fn not_implemented_is_not_retried() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(501, ""), (200, "")]));
        let transport = RetryTransport::new(scripted.clone(), fast_policy(3));

        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(scripted.seen().len(), 1);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(404, ""), (200, "")]));
        let transport = RetryTransport::new(scripted.clone(), fast_policy(3));

        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(scripted.seen().len(), 1);
    }

    #[tokio::test]
    async fn too_many_requests_retry_is_configurable() {
        let scripted = std::sync::Arc::new(ScriptedTransport::new([(429, ""), (200, "")]));
        let policy = RetryPolicy {
            retry_too_many_requests: false,
            ..fast_policy(3)
        };
        let transport = RetryTransport::new(scripted.clone(), policy);

        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(scripted.seen().len(), 1);

        let scripted = std::sync::Arc::new(ScriptedTransport::new([(429, ""), (200, "")]));
        let transport = RetryTransport::new(scripted.clone(), fast_policy(3));
        let response = transport
            .round_trip(get("http://catalog.test/api/catalog/entities"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(scripted.seen().len(), 2);
    }

    #[tokio::test]
    async fn network_errors_are_retried_then_returned() {
        // Bind and release a port so that connecting to it is refused.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let network = ReqwestTransport::new(Duration::from_secs(2), None).unwrap();
        let transport = RetryTransport::new(network, fast_policy(2));

        let result = transport
            .round_trip(get(&format!("http://127.0.0.1:{port}/api/catalog/entities")))
            .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable(), "expected a retryable error, got {err:?}");
    }

    /// Every attempt is cut off by the timeout and timeouts are retried.
    #[tokio::test]
    async fn timeout_bounds_each_attempt() {
        let server = MockServer::start_async().await;
        let slow = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/api/catalog/entities");
            then.status(200).delay(Duration::from_secs(2));
        });
        let network = ReqwestTransport::new(Duration::from_millis(200), None).unwrap();
        let transport = RetryTransport::new(network, fast_policy(2));

        let started = Instant::now();
        let err = transport
            .round_trip(get(&server.url("/api/catalog/entities")))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, TransportError::Timeout(_)), "unexpected error: {err:?}");
        assert_eq!(slow.hits(), 3);
        assert!(elapsed >= Duration::from_millis(600), "finished after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1900), "finished after {elapsed:?}");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = Backoff {
            min: Duration::from_millis(100),
            max: Duration::from_secs(1),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
        assert_eq!(backoff.delay(64), Duration::from_secs(1));
    }

    #[test]
    fn default_policy_retries_server_errors_and_throttling() {
        let policy = RetryPolicy::new(3);

        assert_eq!(policy.backoff, Backoff::default());
        assert!(policy.should_retry_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(policy.should_retry_status(StatusCode::BAD_GATEWAY));
        assert!(policy.should_retry_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(policy.should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!policy.should_retry_status(StatusCode::NOT_IMPLEMENTED));
        assert!(!policy.should_retry_status(StatusCode::NOT_FOUND));
        assert!(!policy.should_retry_status(StatusCode::UNAUTHORIZED));
        assert!(!policy.should_retry_status(StatusCode::OK));
    }

    #[test]
    fn zero_retries_installs_no_retry_layer() {
        let transport = BaseTransport::new(0, Duration::from_secs(15), None).unwrap();
        assert!(matches!(transport, BaseTransport::Direct(_)));

        let transport = BaseTransport::new(3, Duration::from_secs(15), None).unwrap();
        match transport {
            BaseTransport::Retrying(retrying) => assert_eq!(retrying.policy().max_retries, 3),
            other => panic!("expected a retrying transport, found {other:?}"),
        }
    }
}
