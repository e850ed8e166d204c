//! Exponential retry that gives up at once on well-known socket errors.
//!
//! Timeouts, refused or reset connections and unresolvable hosts are fatal;
//! any other failure and retryable statuses follow the shared backoff loop.

use super::retry::send_with_retry;
use crate::config::RetryOptions;
use crate::error::{ECONNREFUSED, ECONNRESET, ENOENT, ESOCKETTIMEDOUT, ETIMEDOUT, PipelineError};
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::sync::Arc;

/// Low-level codes that end the retry loop on the first failure.
pub const NON_RETRYABLE_SYSTEM_CODES: &[&str] =
    &[ETIMEDOUT, ESOCKETTIMEDOUT, ECONNREFUSED, ECONNRESET, ENOENT];

/// Whether a failure may be retried by [`SystemErrorRetryPolicy`].
#[must_use]
pub fn is_retryable_system_error(err: &PipelineError) -> bool {
    !err
        .code()
        .is_some_and(|code| NON_RETRYABLE_SYSTEM_CODES.iter().any(|c| *c == code))
}

/// Exponential retry that treats well-known socket failures as fatal.
///
/// Errors whose code is one of [`NON_RETRYABLE_SYSTEM_CODES`] are returned
/// after the first attempt. Other errors and retryable statuses follow the
/// same schedule as [`ExponentialRetryPolicy`](super::ExponentialRetryPolicy).
pub struct SystemErrorRetryPolicy {
    next: NextPolicy,
    options: RetryOptions,
    policy_options: PolicyOptions,
}

impl SystemErrorRetryPolicy {
    #[must_use]
    pub fn new(next: NextPolicy, options: RetryOptions, policy_options: PolicyOptions) -> Self {
        Self {
            next,
            options,
            policy_options,
        }
    }
}

#[async_trait]
impl Policy for SystemErrorRetryPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        send_with_retry(
            self.next.as_ref(),
            &request,
            &self.options,
            &self.policy_options,
            is_retryable_system_error,
        )
        .await
    }
}

/// Factory for [`SystemErrorRetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct SystemErrorRetryPolicyFactory {
    options: RetryOptions,
}

impl SystemErrorRetryPolicyFactory {
    #[must_use]
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }
}

impl PolicyFactory for SystemErrorRetryPolicyFactory {
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy {
        Arc::new(SystemErrorRetryPolicy::new(
            next,
            self.options.clone(),
            options,
        ))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::policies::stub::{StubPolicy, recording_delay};
    use http::StatusCode;
    use std::time::Duration;

    fn request() -> HttpRequest {
        HttpRequest::put("https://management.example.com/things/1").unwrap()
    }

    fn failing_with(code: &'static str) -> Arc<StubPolicy> {
        StubPolicy::new(move |_, _| {
            Err(PipelineError::Transport(TransportError::with_code(
                code, "socket failure",
            )))
        })
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_retried() {
        let stub = failing_with(ECONNREFUSED);
        let (delay, slept) = recording_delay();
        let options = RetryOptions::default()
            .with_maximum_attempts(10)
            .with_delay_function(delay);
        let policy = SystemErrorRetryPolicy::new(stub.clone(), options, PolicyOptions::default());

        let err = policy.send(request()).await.unwrap_err();

        assert_eq!(stub.call_count(), 1);
        assert!(slept.lock().unwrap().is_empty());
        assert_eq!(err.code(), Some(ECONNREFUSED));
        assert!(err.inner_error().is_none());
    }

    #[tokio::test]
    async fn test_every_listed_code_is_fatal() {
        for &code in NON_RETRYABLE_SYSTEM_CODES {
            let stub = failing_with(code);
            let (delay, _) = recording_delay();
            let options = RetryOptions::default().with_delay_function(delay);
            let policy =
                SystemErrorRetryPolicy::new(stub.clone(), options, PolicyOptions::default());

            assert!(policy.send(request()).await.is_err());
            assert_eq!(stub.call_count(), 1, "{code} should not be retried");
        }
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_fatal() {
        let stub = StubPolicy::new(|_, _| Err(PipelineError::Timeout(Duration::from_secs(30))));
        let (delay, _) = recording_delay();
        let options = RetryOptions::default().with_delay_function(delay);
        let policy = SystemErrorRetryPolicy::new(stub.clone(), options, PolicyOptions::default());

        let err = policy.send(request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout(_)));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_other_codes_keep_base_behavior() {
        let stub = failing_with("EPIPE");
        let (delay, slept) = recording_delay();
        let options = RetryOptions::default().with_delay_function(delay);
        let policy = SystemErrorRetryPolicy::new(stub.clone(), options, PolicyOptions::default());

        let err = policy.send(request()).await.unwrap_err();

        assert_eq!(stub.call_count(), 3);
        assert_eq!(slept.lock().unwrap().len(), 2);
        assert_eq!(err.attempt_errors().count(), 3);
    }

    #[tokio::test]
    async fn test_uncoded_errors_keep_base_behavior() {
        let stub = StubPolicy::new(|_, _| {
            Err(PipelineError::Transport(TransportError::new("no code")))
        });
        let (delay, _) = recording_delay();
        let options = RetryOptions::default().with_delay_function(delay);
        let policy = SystemErrorRetryPolicy::new(stub.clone(), options, PolicyOptions::default());

        assert!(policy.send(request()).await.is_err());
        assert_eq!(stub.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retryable_status_still_retried() {
        let stub = StubPolicy::new(|req, call| {
            let status = if call < 2 {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            Ok(HttpResponse::with_body(req.clone(), status, ""))
        });
        let (delay, _) = recording_delay();
        let factory =
            SystemErrorRetryPolicyFactory::new(RetryOptions::default().with_delay_function(delay));
        let head = factory.create(stub.clone(), PolicyOptions::default());

        let response = head.send(request()).await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(stub.call_count(), 3);
    }

    #[test]
    fn test_classification() {
        let fatal = PipelineError::Transport(TransportError::with_code(ECONNRESET, "reset"));
        assert!(!is_retryable_system_error(&fatal));
        let other = PipelineError::Transport(TransportError::with_code("EAI_AGAIN", "dns"));
        assert!(is_retryable_system_error(&other));
        assert!(is_retryable_system_error(&PipelineError::Cancelled));
    }
}
