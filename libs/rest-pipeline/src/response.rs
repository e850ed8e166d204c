use crate::error::{PipelineError, TransportError};
use crate::headers::HttpHeaders;
use crate::request::HttpRequest;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Type alias for the boxed response body that supports decompression.
///
/// This type can hold either a raw body or a decompressed body (gzip/br/deflate).
/// The body is type-erased to allow the decompression layer to work transparently.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Response produced by a pipeline
///
/// Carries the request that produced it: after retries or a registration
/// replay this is the attempt that succeeded, not the caller's original.
/// The body is buffered; text and JSON views are decoded on demand.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    request: HttpRequest,
    status: StatusCode,
    headers: HttpHeaders,
    body: Bytes,
    parsed: OnceLock<Option<serde_json::Value>>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(
        request: HttpRequest,
        status: StatusCode,
        headers: HttpHeaders,
        body: Bytes,
    ) -> Self {
        Self {
            request,
            status,
            headers,
            body,
            parsed: OnceLock::new(),
        }
    }

    /// Response with no headers and the given body; handy for stubs.
    #[must_use]
    pub fn with_body(request: HttpRequest, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(request, status, HttpHeaders::new(), body.into())
    }

    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    #[must_use]
    pub fn into_request(self) -> HttpRequest {
        self.request
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Numeric status code
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    #[must_use]
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text. Invalid sequences are replaced with U+FFFD.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body parsed as JSON, decoded once and cached.
    ///
    /// Returns `None` for an empty body or one that is not valid JSON.
    #[must_use]
    pub fn parsed_body(&self) -> Option<&serde_json::Value> {
        self.parsed
            .get_or_init(|| {
                if self.body.is_empty() {
                    return None;
                }
                serde_json::from_slice(&self.body).ok()
            })
            .as_ref()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    /// Returns `PipelineError::Json` if parsing fails.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Read a wire body fully, failing once more than `limit` bytes arrive.
///
/// The limit applies to decompressed bytes.
///
/// # Errors
/// Returns `PipelineError::BodyTooLarge` past the limit and
/// `PipelineError::Transport` if the body stream fails.
pub async fn read_body_limited(body: ResponseBody, limit: usize) -> Result<Bytes, PipelineError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| PipelineError::Transport(TransportError::from_source(e)))?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(PipelineError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
