use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default User-Agent string for requests
pub const DEFAULT_USER_AGENT: &str = concat!("rest-pipeline/", env!("CARGO_PKG_VERSION"));

/// Header carrying the per-request correlation id
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Injectable sleep used by retry and polling policies.
pub type DelayFunction = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Delay function backed by `tokio::time::sleep`.
#[must_use]
pub fn tokio_delay() -> DelayFunction {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Backoff configuration for the exponential retry policies
///
/// The first retry waits `initial_retry_delay`; later retries grow the delay
/// with a jittered exponential increment, capped at `maximum_retry_delay`.
#[derive(Clone)]
pub struct RetryOptions {
    /// Total attempts including the first one (default: 3)
    pub maximum_attempts: u32,

    /// Delay before the first retry (default: 30s)
    pub initial_retry_delay: Duration,

    /// Upper bound for any retry delay (default: 90s)
    pub maximum_retry_delay: Duration,

    /// Sleep between attempts
    pub delay: DelayFunction,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            initial_retry_delay: Duration::from_secs(30),
            maximum_retry_delay: Duration::from_secs(90),
            delay: tokio_delay(),
        }
    }
}

impl RetryOptions {
    #[must_use]
    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_initial_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    #[must_use]
    pub fn with_maximum_retry_delay(mut self, delay: Duration) -> Self {
        self.maximum_retry_delay = delay;
        self
    }

    #[must_use]
    pub fn with_delay_function(mut self, delay: DelayFunction) -> Self {
        self.delay = delay;
        self
    }

    /// Fast backoff for tests (1ms initial, 10ms max)
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            initial_retry_delay: Duration::from_millis(1),
            maximum_retry_delay: Duration::from_millis(10),
            ..Default::default()
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("maximum_attempts", &self.maximum_attempts)
            .field("initial_retry_delay", &self.initial_retry_delay)
            .field("maximum_retry_delay", &self.maximum_retry_delay)
            .finish_non_exhaustive()
    }
}

/// Configuration for automatic resource provider registration
#[derive(Clone)]
pub struct RegistrationOptions {
    /// Wait between registration status polls (default: 30s)
    pub retry_timeout: Duration,

    /// Give up after this many status polls; `None` polls until the
    /// provider is registered or the operation is cancelled.
    pub max_polls: Option<u32>,

    /// Sleep between polls
    pub delay: DelayFunction,

    /// Stops polling when cancelled; the send then fails with
    /// `PipelineError::Cancelled`.
    pub cancellation: Option<CancellationToken>,
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self {
            retry_timeout: Duration::from_secs(30),
            max_polls: None,
            delay: tokio_delay(),
            cancellation: None,
        }
    }
}

impl RegistrationOptions {
    #[must_use]
    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    #[must_use]
    pub fn with_delay_function(mut self, delay: DelayFunction) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl fmt::Debug for RegistrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationOptions")
            .field("retry_timeout", &self.retry_timeout)
            .field("max_polls", &self.max_polls)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

/// Configuration for redirect following
///
/// Regardless of configuration, HTTPS to HTTP downgrades are never followed
/// and `Authorization`, `Cookie` and `Proxy-Authorization` are stripped when
/// a redirect changes origin.
#[derive(Debug, Clone)]
pub struct RedirectOptions {
    /// Maximum number of redirects to follow (default: 20)
    ///
    /// Set to `0` to disable redirect following entirely.
    pub max_redirects: u32,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self { max_redirects: 20 }
    }
}

impl RedirectOptions {
    #[must_use]
    pub fn disabled() -> Self {
        Self { max_redirects: 0 }
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Mozilla's root certificates bundled at compile time
    #[default]
    WebPki,
    /// Root certificates from the operating system store
    Native,
}

/// Transport security mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Only `https://` URLs are accepted
    #[default]
    TlsOnly,
    /// `http://` URLs are accepted as well (testing against mock servers)
    AllowInsecureHttp,
}

/// Configuration of the built-in hyper transport
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt timeout (default: 30s)
    pub request_timeout: Duration,

    /// Maximum decompressed response body size (default: 10 MiB)
    pub max_body_size: usize,

    pub transport: TransportSecurity,

    pub tls_roots: TlsRootConfig,

    /// Idle pooled connections are closed after this long (default: 90s)
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum idle connections kept per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10 MB
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Small footprint: 10s timeout, 1 MB bodies, few pooled connections
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024, // 1 MB
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(30)),
            pool_max_idle_per_host: 8,
        }
    }

    /// Plain HTTP allowed, short timeouts; for mock servers only
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024, // 1 MB
            transport: TransportSecurity::AllowInsecureHttp,
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_retry_options_defaults() {
        let options = RetryOptions::default();
        assert_eq!(options.maximum_attempts, 3);
        assert_eq!(options.initial_retry_delay, Duration::from_secs(30));
        assert_eq!(options.maximum_retry_delay, Duration::from_secs(90));
    }

    #[test]
    fn test_retry_options_overrides_merge_with_defaults() {
        let options = RetryOptions::default()
            .with_maximum_attempts(5)
            .with_initial_retry_delay(Duration::from_millis(200));
        assert_eq!(options.maximum_attempts, 5);
        assert_eq!(options.initial_retry_delay, Duration::from_millis(200));
        assert_eq!(options.maximum_retry_delay, Duration::from_secs(90));
    }

    #[test]
    fn test_registration_options_defaults() {
        let options = RegistrationOptions::default();
        assert_eq!(options.retry_timeout, Duration::from_secs(30));
        assert_eq!(options.max_polls, None);
        assert!(options.cancellation.is_none());
        assert!(format!("{options:?}").contains("cancellable: false"));
    }

    #[test]
    fn test_http_client_config_presets() {
        let config = HttpClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.transport, TransportSecurity::TlsOnly);

        let config = HttpClientConfig::for_testing();
        assert_eq!(config.transport, TransportSecurity::AllowInsecureHttp);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_redirect_options() {
        assert_eq!(RedirectOptions::default().max_redirects, 20);
        assert_eq!(RedirectOptions::disabled().max_redirects, 0);
    }

    #[tokio::test]
    async fn test_tokio_delay_sleeps() {
        let delay = tokio_delay();
        let start = tokio::time::Instant::now();
        delay(Duration::from_millis(5)).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
