//! Policy chain construction and the `send` entry point.
//!
//! Factories are folded right to left over the transport: the first
//! factory in the list produces the outermost policy, which sees the request
//! first and the response last.

use crate::client::{HttpClient, HyperHttpClient};
use crate::config::{RedirectOptions, RegistrationOptions, RetryOptions};
use crate::error::PipelineError;
use crate::logger::Logger;
use crate::policies::{
    ClientRequestIdPolicyFactory, LogPolicyFactory, RedirectPolicyFactory,
    RpRegistrationPolicyFactory, SystemErrorRetryPolicyFactory, UserAgentPolicyFactory,
};
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Innermost link: hands the request to the transport.
struct TransportPolicy {
    client: Arc<dyn HttpClient>,
}

#[async_trait]
impl Policy for TransportPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        self.client.send_request(request).await
    }
}

/// Construction inputs of a [`Pipeline`]
#[derive(Clone, Default)]
pub struct PipelineOptions {
    /// Transport; the built-in hyper client with default configuration when `None`
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Logger handed to every policy factory
    pub logger: Option<Arc<dyn Logger>>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("http_client", &self.http_client.is_some())
            .field(
                "logger",
                &self.logger.as_ref().map(|l| l.minimum_log_level()),
            )
            .finish()
    }
}

/// Chain of policies ending in a transport
///
/// The chain is built once and shared: `Pipeline` is cheap to clone and
/// serves concurrent `send` calls.
///
/// # Example
///
/// ```ignore
/// use rest_pipeline::{HttpRequest, Pipeline, PipelineOptions, default_policy_factories};
///
/// let pipeline = Pipeline::new(
///     &default_policy_factories("my-sdk/1.0")?,
///     PipelineOptions::default(),
/// )?;
/// let response = pipeline
///     .send(HttpRequest::get("https://management.example.com/subscriptions")?)
///     .await?;
/// ```
#[derive(Clone)]
pub struct Pipeline {
    head: NextPolicy,
}

impl Pipeline {
    /// Build a pipeline from factories, outermost first
    ///
    /// # Errors
    /// Returns an error if no transport is given and the built-in one
    /// cannot be created (TLS initialization).
    pub fn new(
        factories: &[Arc<dyn PolicyFactory>],
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let client: Arc<dyn HttpClient> = if let Some(client) = options.http_client {
            client
        } else {
            Arc::new(HyperHttpClient::new()?)
        };
        Ok(Self::with_client(factories, client, options.logger))
    }

    /// Build a pipeline over an explicit transport
    #[must_use]
    pub fn with_client(
        factories: &[Arc<dyn PolicyFactory>],
        client: Arc<dyn HttpClient>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Self {
        let options = PolicyOptions::new(logger);
        let transport: NextPolicy = Arc::new(TransportPolicy { client });
        let head = factories
            .iter()
            .rev()
            .fold(transport, |next, factory| {
                factory.create(next, options.clone())
            });
        Self { head }
    }

    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Send a request through the chain.
    ///
    /// HTTP error statuses come back as responses; `Err` is reserved for
    /// failures no policy recovered from.
    ///
    /// # Errors
    /// Returns the error of the outermost policy that gave up.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        self.head.send(request).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

/// Fluent construction of a [`Pipeline`]
#[derive(Default)]
pub struct PipelineBuilder {
    factories: Vec<Arc<dyn PolicyFactory>>,
    options: PipelineOptions,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy; earlier policies wrap later ones
    #[must_use]
    pub fn policy(mut self, factory: impl PolicyFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Append several policies in order
    #[must_use]
    pub fn policies(mut self, factories: impl IntoIterator<Item = Arc<dyn PolicyFactory>>) -> Self {
        self.factories.extend(factories);
        self
    }

    #[must_use]
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.options.http_client = Some(client);
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.options.logger = Some(logger);
        self
    }

    /// # Errors
    /// See [`Pipeline::new`].
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        Pipeline::new(&self.factories, self.options)
    }
}

/// The standard policy list, outermost first
///
/// client-request-id, user-agent, redirect, resource provider registration,
/// system-error retry, log.
///
/// Only one retrying policy is installed: stacking the exponential retry on
/// top would replay attempts the system-error retry treats as fatal.
///
/// # Errors
/// Returns `PipelineError::InvalidHeaderValue` if `user_agent` is not a valid
/// header value.
pub fn default_policy_factories(
    user_agent: impl AsRef<str>,
) -> Result<Vec<Arc<dyn PolicyFactory>>, PipelineError> {
    let factories: Vec<Arc<dyn PolicyFactory>> = vec![
        Arc::new(ClientRequestIdPolicyFactory::default()),
        Arc::new(UserAgentPolicyFactory::try_new(user_agent)?),
        Arc::new(RedirectPolicyFactory::new(RedirectOptions::default())),
        Arc::new(RpRegistrationPolicyFactory::new(
            RegistrationOptions::default(),
        )),
        Arc::new(SystemErrorRetryPolicyFactory::new(RetryOptions::default())),
        Arc::new(LogPolicyFactory),
    ];
    Ok(factories)
}
