use crate::config::DEFAULT_USER_AGENT;
use crate::error::PipelineError;
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use http::HeaderValue;
use std::sync::Arc;

/// Adds a `User-Agent` header to requests that do not carry one
pub struct UserAgentPolicy {
    next: NextPolicy,
    user_agent: Arc<str>,
}

#[async_trait]
impl Policy for UserAgentPolicy {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        // Only add User-Agent if not already present
        if !request.headers().contains(http::header::USER_AGENT.as_str()) {
            request
                .headers_mut()
                .set(http::header::USER_AGENT.as_str(), &*self.user_agent);
        }
        self.next.send(request).await
    }
}

/// Factory for [`UserAgentPolicy`].
#[derive(Debug, Clone)]
pub struct UserAgentPolicyFactory {
    user_agent: Arc<str>,
}

impl UserAgentPolicyFactory {
    /// Create a factory with the specified user agent string
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidHeaderValue` if the user agent string is not valid
    pub fn try_new(user_agent: impl AsRef<str>) -> Result<Self, PipelineError> {
        let user_agent = user_agent.as_ref();
        HeaderValue::from_str(user_agent)?;
        Ok(Self {
            user_agent: Arc::from(user_agent),
        })
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Default for UserAgentPolicyFactory {
    fn default() -> Self {
        Self {
            user_agent: Arc::from(DEFAULT_USER_AGENT),
        }
    }
}

impl PolicyFactory for UserAgentPolicyFactory {
    fn create(&self, next: NextPolicy, _options: PolicyOptions) -> NextPolicy {
        Arc::new(UserAgentPolicy {
            next,
            user_agent: self.user_agent.clone(),
        })
    }
}
