//! Request policy contract.
//!
//! A [`Policy`] handles one request and produces one response, usually by
//! delegating to the next link of the chain it was created for. A
//! [`PolicyFactory`] creates a policy bound to its chain position.

use crate::error::PipelineError;
use crate::logger::{LogLevel, Logger, should_log};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a chain link.
pub type NextPolicy = Arc<dyn Policy>;

/// One link of a request pipeline.
///
/// Implementations must not keep per-request state in fields: a policy is
/// shared by every concurrent `send` going through its pipeline.
#[async_trait]
pub trait Policy: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError>;
}

/// Creates a policy wrapping `next`.
pub trait PolicyFactory: Send + Sync {
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy;
}

impl<F> PolicyFactory for F
where
    F: Fn(NextPolicy, PolicyOptions) -> NextPolicy + Send + Sync,
{
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy {
        self(next, options)
    }
}

/// Pipeline-wide options handed to every factory
#[derive(Clone, Default)]
pub struct PolicyOptions {
    logger: Option<Arc<dyn Logger>>,
}

impl PolicyOptions {
    #[must_use]
    pub fn new(logger: Option<Arc<dyn Logger>>) -> Self {
        Self { logger }
    }

    #[must_use]
    pub fn logger(&self) -> Option<&Arc<dyn Logger>> {
        self.logger.as_ref()
    }

    /// Whether a message at `level` would reach the logger.
    #[must_use]
    pub fn should_log(&self, level: LogLevel) -> bool {
        self.logger
            .as_ref()
            .is_some_and(|l| should_log(level, l.minimum_log_level()))
    }

    /// Log through the configured logger if the level passes its threshold.
    pub fn log(&self, level: LogLevel, message: &str) {
        if let Some(logger) = &self.logger
            && should_log(level, logger.minimum_log_level())
        {
            logger.log(level, message);
        }
    }
}

impl fmt::Debug for PolicyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyOptions")
            .field("logger", &self.logger.as_ref().map(|l| l.minimum_log_level()))
            .finish()
    }
}
