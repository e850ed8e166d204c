use crate::error::PipelineError;
use crate::headers::HttpHeaders;
use bytes::Bytes;
use http::Method;
use serde::Serialize;

/// Methods a request may carry
const SUPPORTED_METHODS: &[Method] = &[
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Outgoing HTTP request flowing through a pipeline
///
/// The URL is validated as non-empty at construction and stays non-empty
/// for the lifetime of the value. Cloning deep-copies the headers; the body
/// is reference counted, so clones share it.
///
/// # Example
///
/// ```ignore
/// use rest_pipeline::HttpRequest;
///
/// let request = HttpRequest::post("https://management.example.com/things")?
///     .header("x-request-id", "123")
///     .json(&NewThing { name: "a" })?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: String,
    headers: HttpHeaders,
    body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty or the
    /// method is not one of GET, PUT, POST, DELETE, PATCH, HEAD, OPTIONS, TRACE.
    pub fn new(method: Method, url: impl Into<String>) -> Result<Self, PipelineError> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(PipelineError::InvalidRequest(format!(
                "unsupported method '{method}'"
            )));
        }
        let url = url.into();
        check_url(&url)?;
        Ok(Self {
            method,
            url,
            headers: HttpHeaders::new(),
            body: None,
        })
    }

    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty.
    pub fn get(url: impl Into<String>) -> Result<Self, PipelineError> {
        Self::new(Method::GET, url)
    }

    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty.
    pub fn post(url: impl Into<String>) -> Result<Self, PipelineError> {
        Self::new(Method::POST, url)
    }

    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty.
    pub fn put(url: impl Into<String>) -> Result<Self, PipelineError> {
        Self::new(Method::PUT, url)
    }

    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty.
    pub fn patch(url: impl Into<String>) -> Result<Self, PipelineError> {
        Self::new(Method::PATCH, url)
    }

    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty.
    pub fn delete(url: impl Into<String>) -> Result<Self, PipelineError> {
        Self::new(Method::DELETE, url)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Change the method. Used by redirects that switch to GET.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the URL.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidRequest` if `url` is empty; the
    /// request is left unchanged in that case.
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<(), PipelineError> {
        let url = url.into();
        check_url(&url)?;
        self.url = url;
        Ok(())
    }

    #[must_use]
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HttpHeaders {
        &mut self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    pub fn clear_body(&mut self) {
        self.body = None;
    }

    /// Add a header, replacing any value under the same name
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Set request body as a string
    #[must_use]
    pub fn body_string(mut self, body: String) -> Self {
        self.body = Some(Bytes::from(body));
        self
    }

    /// Set request body as JSON
    ///
    /// Sets `Content-Type: application/json` unless a Content-Type header
    /// was already provided.
    ///
    /// # Errors
    /// Returns `PipelineError::Json` if serialization fails.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, PipelineError> {
        let json_bytes = serde_json::to_vec(body)?;
        if !self.headers.contains(http::header::CONTENT_TYPE.as_str()) {
            self.headers.set("Content-Type", "application/json");
        }
        self.body = Some(Bytes::from(json_bytes));
        Ok(self)
    }
}

fn check_url(url: &str) -> Result<(), PipelineError> {
    if url.trim().is_empty() {
        return Err(PipelineError::InvalidRequest(
            "url cannot be empty".to_owned(),
        ));
    }
    Ok(())
}
