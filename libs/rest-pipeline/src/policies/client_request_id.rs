use crate::config::CLIENT_REQUEST_ID_HEADER;
use crate::error::PipelineError;
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::sync::Arc;

/// Random UUID correlation id.
pub(super) fn fresh_client_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Tags requests with a random UUID correlation id unless one is present
pub struct ClientRequestIdPolicy {
    next: NextPolicy,
    header_name: Arc<str>,
}

#[async_trait]
impl Policy for ClientRequestIdPolicy {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        if !request.headers().contains(&self.header_name) {
            request
                .headers_mut()
                .set(&*self.header_name, fresh_client_request_id());
        }
        self.next.send(request).await
    }
}

/// Factory for [`ClientRequestIdPolicy`].
///
/// Defaults to the `x-ms-client-request-id` header.
#[derive(Debug, Clone)]
pub struct ClientRequestIdPolicyFactory {
    header_name: Arc<str>,
}

impl ClientRequestIdPolicyFactory {
    /// Use a different header for the correlation id
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidHeaderName` if `header_name` is not a valid header name
    pub fn with_header_name(header_name: impl AsRef<str>) -> Result<Self, PipelineError> {
        let header_name = header_name.as_ref();
        http::HeaderName::from_bytes(header_name.as_bytes())?;
        Ok(Self {
            header_name: Arc::from(header_name),
        })
    }
}

impl Default for ClientRequestIdPolicyFactory {
    fn default() -> Self {
        Self {
            header_name: Arc::from(CLIENT_REQUEST_ID_HEADER),
        }
    }
}

impl PolicyFactory for ClientRequestIdPolicyFactory {
    fn create(&self, next: NextPolicy, _options: PolicyOptions) -> NextPolicy {
        Arc::new(ClientRequestIdPolicy {
            next,
            header_name: self.header_name.clone(),
        })
    }
}
