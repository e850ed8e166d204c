//! Exponential retry with jittered backoff.
//!
//! A request is retried when the next link fails or answers `408` or a `5xx`
//! other than `501`/`505`. Every attempt sends a fresh clone of the caller's
//! request; attempts after the first carry a new `x-ms-client-request-id`.
//! The first retry waits exactly `initial_retry_delay`; from the
//! second attempt on the delay grows by `(2^attempt - 1)` times a value drawn
//! from 80%..120% of the current delay, capped at `maximum_retry_delay`.

use super::client_request_id::fresh_client_request_id;
use crate::config::{CLIENT_REQUEST_ID_HEADER, RetryOptions};
use crate::error::PipelineError;
use crate::logger::LogLevel;
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Whether a response status asks for another attempt.
///
/// `408` and every `5xx` except `501 Not Implemented` and
/// `505 HTTP Version Not Supported`.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    !((status < 500 && status != 408) || status == 501 || status == 505)
}

/// Delay before the retry that follows `attempt`.
///
/// `attempt` is the 1-based number of the attempt that just failed. For the
/// first attempt the current delay is returned unchanged.
fn next_delay(current: Duration, attempt: u32, maximum: Duration) -> Duration {
    if attempt < 2 {
        return current;
    }
    let jitter = rand::rng().random_range(0.0..0.4);
    let bounded = current.mul_f64(0.8) + current.mul_f64(jitter);

    let increment = 1u32
        .checked_shl(attempt)
        .and_then(|pow| bounded.checked_mul(pow - 1))
        .unwrap_or(Duration::MAX);

    current.saturating_add(increment).min(maximum)
}

/// Attempt loop shared by the retry policies.
///
/// `retry_on_error` decides whether a failure of the next link may be
/// retried at all; the attempt budget is applied on top of it.
pub(super) async fn send_with_retry<F>(
    next: &dyn Policy,
    request: &HttpRequest,
    options: &RetryOptions,
    policy_options: &PolicyOptions,
    retry_on_error: F,
) -> Result<HttpResponse, PipelineError>
where
    F: Fn(&PipelineError) -> bool + Send + Sync,
{
    let mut attempt: u32 = 0;
    let mut delay = options.initial_retry_delay;
    let mut previous_error: Option<PipelineError> = None;

    loop {
        attempt += 1;

        let mut attempt_request = request.clone();
        if attempt > 1 {
            attempt_request
                .headers_mut()
                .set(CLIENT_REQUEST_ID_HEADER, fresh_client_request_id());
        }

        match next.send(attempt_request).await {
            Ok(response) => {
                let status = response.status_code();
                if !is_retryable_status(status) || attempt >= options.maximum_attempts {
                    return Ok(response);
                }
                tracing::debug!(attempt, status, "retryable status, retrying");
                // held response is dropped; the next attempt starts clean
            }
            Err(err) => {
                let retryable = retry_on_error(&err);
                let err = err.chain(previous_error.take());
                if !retryable || attempt >= options.maximum_attempts {
                    if retryable {
                        policy_options.log(
                            LogLevel::Warning,
                            &format!("Giving up after {attempt} attempts: {err}"),
                        );
                    }
                    return Err(err);
                }
                tracing::debug!(attempt, error = %err, "attempt failed, retrying");
                previous_error = Some(err);
            }
        }

        delay = next_delay(delay, attempt, options.maximum_retry_delay);
        (options.delay)(delay).await;
    }
}

/// Retries transient failures of the next link with exponential backoff.
pub struct ExponentialRetryPolicy {
    next: NextPolicy,
    options: RetryOptions,
    policy_options: PolicyOptions,
}

impl ExponentialRetryPolicy {
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
impl Policy for ExponentialRetryPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        send_with_retry(
            self.next.as_ref(),
            &request,
            &self.options,
            &self.policy_options,
            |_| true,
        )
        .await
    }
}

/// Factory for [`ExponentialRetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ExponentialRetryPolicyFactory {
    options: RetryOptions,
}

impl ExponentialRetryPolicyFactory {
    #[must_use]
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }
}

impl PolicyFactory for ExponentialRetryPolicyFactory {
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy {
        Arc::new(ExponentialRetryPolicy::new(
            next,
            self.options.clone(),
            options,
        ))
    }
}
