//! Automatic resource provider registration.
//!
//! A management request against a subscription that has not registered the
//! target resource provider fails with `409` and error code
//! `MissingSubscriptionRegistration`. This policy registers the provider,
//! waits until the control plane reports it as `Registered`, and replays the
//! original request. Any other response passes through untouched.

use super::client_request_id::fresh_client_request_id;
use crate::config::{CLIENT_REQUEST_ID_HEADER, RegistrationOptions};
use crate::error::PipelineError;
use crate::logger::LogLevel;
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use http::{Method, StatusCode};
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Error code of the `409` that triggers registration
pub const MISSING_REGISTRATION_CODE: &str = "MissingSubscriptionRegistration";

const REGISTRATION_API_VERSION: &str = "2016-02-01";
const REGISTRATION_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const REGISTERED_STATE: &str = "Registered";

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static SUBSCRIPTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*/subscriptions/[a-f0-9-]+/").expect("static regex should not panic")
});

/// Provider named by a `MissingSubscriptionRegistration` error body.
///
/// The name is the last single-quoted substring of `error.message`. Bodies
/// that are not JSON, carry another code or name no provider yield `None`.
#[must_use]
pub fn missing_registration_provider(response: &HttpResponse) -> Option<String> {
    let error = response.parsed_body()?.get("error")?;
    if error.get("code")?.as_str()? != MISSING_REGISTRATION_CODE {
        return None;
    }
    let message = error.get("message")?.as_str()?;
    last_quoted(message)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

fn last_quoted(message: &str) -> Option<&str> {
    let end = message.rfind('\'')?;
    let start = message[..end].rfind('\'')?;
    Some(&message[start + 1..end])
}

/// URL up to and including the `/subscriptions/<id>/` segment.
///
/// # Errors
/// Returns `PipelineError::Registration` when the URL has no such segment.
pub fn subscription_url_prefix(url: &str) -> Result<&str, PipelineError> {
    SUBSCRIPTION_PREFIX
        .find(url)
        .map(|m| m.as_str())
        .ok_or_else(|| {
            PipelineError::Registration(format!(
                "unable to extract the subscription url prefix from '{url}'"
            ))
        })
}

/// Registers missing resource providers and replays the request.
pub struct RpRegistrationPolicy {
    next: NextPolicy,
    options: RegistrationOptions,
    policy_options: PolicyOptions,
}

impl RpRegistrationPolicy {
    #[must_use]
    pub fn new(
        next: NextPolicy,
        options: RegistrationOptions,
        policy_options: PolicyOptions,
    ) -> Self {
        Self {
            next,
            options,
            policy_options,
        }
    }

    /// Side request to the provider endpoint carrying the caller's headers.
    fn provider_request(
        original: &HttpRequest,
        method: Method,
        url: String,
    ) -> Result<HttpRequest, PipelineError> {
        let mut request = HttpRequest::new(method, url)?;
        *request.headers_mut() = original.headers().clone();
        request
            .headers_mut()
            .set(CLIENT_REQUEST_ID_HEADER, fresh_client_request_id());
        request
            .headers_mut()
            .set(http::header::CONTENT_TYPE.as_str(), REGISTRATION_CONTENT_TYPE);
        Ok(request)
    }

    /// Register the provider and wait for it to become available.
    ///
    /// Returns `Ok(false)` when registration did not succeed; only
    /// cancellation is an error.
    async fn register(
        &self,
        prefix: &str,
        provider: &str,
        original: &HttpRequest,
    ) -> Result<bool, PipelineError> {
        let register_url =
            format!("{prefix}providers/{provider}/register?api-version={REGISTRATION_API_VERSION}");
        let request = Self::provider_request(original, Method::POST, register_url)?;

        match self.next.send(request).await {
            Ok(response) if response.status() == StatusCode::OK => {}
            Ok(response) => {
                self.registration_failed(
                    provider,
                    &format!("register call returned status {}", response.status_code()),
                );
                return Ok(false);
            }
            Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(err) => {
                self.registration_failed(provider, &err.to_string());
                return Ok(false);
            }
        }

        self.wait_until_registered(prefix, provider, original).await
    }

    async fn wait_until_registered(
        &self,
        prefix: &str,
        provider: &str,
        original: &HttpRequest,
    ) -> Result<bool, PipelineError> {
        let status_url =
            format!("{prefix}providers/{provider}?api-version={REGISTRATION_API_VERSION}");
        let mut polls: u32 = 0;

        loop {
            if self.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            polls += 1;
            let request = Self::provider_request(original, Method::GET, status_url.clone())?;
            let response = match self.next.send(request).await {
                Ok(response) => response,
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(err) => {
                    self.registration_failed(provider, &err.to_string());
                    return Ok(false);
                }
            };

            // An unreadable status body counts as not registered yet.
            let state = response
                .parsed_body()
                .and_then(|body| body.get("registrationState"))
                .and_then(serde_json::Value::as_str);
            if state == Some(REGISTERED_STATE) {
                tracing::debug!(provider, polls, "resource provider registered");
                return Ok(true);
            }
            tracing::debug!(provider, polls, state, "resource provider not registered yet");

            if let Some(max_polls) = self.options.max_polls
                && polls >= max_polls
            {
                self.registration_failed(
                    provider,
                    &format!("still not registered after {polls} polls"),
                );
                return Ok(false);
            }

            self.pause().await?;
        }
    }

    async fn pause(&self) -> Result<(), PipelineError> {
        let sleep = (self.options.delay)(self.options.retry_timeout);
        let Some(token) = &self.options.cancellation else {
            sleep.await;
            return Ok(());
        };
        tokio::select! {
            biased;
            () = token.cancelled() => Err(PipelineError::Cancelled),
            () = sleep => Ok(()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancellation
            .as_ref()
            .is_some_and(tokio_util::sync::CancellationToken::is_cancelled)
    }

    fn registration_failed(&self, provider: &str, reason: &str) {
        tracing::warn!(provider, reason, "resource provider registration failed");
        self.policy_options.log(
            LogLevel::Warning,
            &format!("Registration of resource provider '{provider}' failed: {reason}"),
        );
    }
}

#[async_trait]
impl Policy for RpRegistrationPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        let response = self.next.send(request.clone()).await?;
        if response.status() != StatusCode::CONFLICT {
            return Ok(response);
        }
        let Some(provider) = missing_registration_provider(&response) else {
            return Ok(response);
        };

        let prefix = subscription_url_prefix(request.url())?;
        self.policy_options.log(
            LogLevel::Info,
            &format!("Registering resource provider '{provider}'"),
        );
        if !self.register(prefix, &provider, &request).await? {
            return Ok(response);
        }

        let mut replay = request;
        replay
            .headers_mut()
            .set(CLIENT_REQUEST_ID_HEADER, fresh_client_request_id());
        self.next.send(replay).await
    }
}

/// Factory for [`RpRegistrationPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RpRegistrationPolicyFactory {
    options: RegistrationOptions,
}

impl RpRegistrationPolicyFactory {
    #[must_use]
    pub fn new(options: RegistrationOptions) -> Self {
        Self { options }
    }
}

impl PolicyFactory for RpRegistrationPolicyFactory {
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy {
        Arc::new(RpRegistrationPolicy::new(next, self.options.clone(), options))
    }
}
