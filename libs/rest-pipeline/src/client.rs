use crate::builder::HyperHttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::{InvalidUriKind, PipelineError};
use crate::headers::HttpHeaders;
use crate::request::HttpRequest;
use crate::response::{HttpResponse, ResponseBody, read_body_limited};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;

/// Type-erased wire service the hyper transport drives.
pub type WireService =
    BoxCloneSyncService<http::Request<Full<Bytes>>, http::Response<ResponseBody>, PipelineError>;

/// Transport adapter: the innermost link of every pipeline.
///
/// Implementations perform the actual I/O and must support concurrent
/// calls. Failures should be reported as `PipelineError::Transport` with a
/// low-level code when one is known, since retry policies classify on it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send_request(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError>;
}

/// Built-in transport over hyper with rustls
///
/// Connection pooling, TLS, per-attempt timeout and transparent response
/// decompression (gzip, brotli, deflate) happen here; retries do not.
///
/// `HyperHttpClient` is `Clone + Send + Sync`; cloning shares the
/// connection pool.
#[derive(Clone)]
pub struct HyperHttpClient {
    pub(crate) service: WireService,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl HyperHttpClient {
    /// Create a transport with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, PipelineError> {
        HyperHttpClientBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> HyperHttpClientBuilder {
        HyperHttpClientBuilder::new()
    }

    /// Parse the URL and check its scheme against the transport security mode.
    fn validate_url(&self, url: &str) -> Result<http::Uri, PipelineError> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e: http::uri::InvalidUri| PipelineError::InvalidUri {
                url: url.to_owned(),
                kind: InvalidUriKind::ParseError,
                reason: e.to_string(),
            })?;

        if uri.authority().is_none() {
            return Err(PipelineError::InvalidUri {
                url: url.to_owned(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            });
        }

        match uri.scheme_str() {
            Some("https") => Ok(uri),
            Some("http") => match self.transport_security {
                TransportSecurity::AllowInsecureHttp => Ok(uri),
                TransportSecurity::TlsOnly => Err(PipelineError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
                }),
            },
            Some(scheme) => Err(PipelineError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            None => Err(PipelineError::InvalidUri {
                url: url.to_owned(),
                kind: InvalidUriKind::MissingScheme,
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    fn to_wire(&self, request: &HttpRequest) -> Result<http::Request<Full<Bytes>>, PipelineError> {
        let uri = self.validate_url(request.url())?;
        let mut wire = http::Request::builder()
            .method(request.method().clone())
            .uri(uri)
            .body(Full::new(request.body().cloned().unwrap_or_default()))?;
        *wire.headers_mut() = request.headers().to_header_map()?;
        Ok(wire)
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn send_request(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        let wire = self.to_wire(&request)?;

        let response = self.service.clone().oneshot(wire).await?;
        let (parts, body) = response.into_parts();

        tracing::debug!(
            method = %request.method(),
            status = parts.status.as_u16(),
            "received response"
        );

        let body = read_body_limited(body, self.max_body_size).await?;
        Ok(HttpResponse::new(
            request,
            parts.status,
            HttpHeaders::from_header_map(&parts.headers),
            body,
        ))
    }
}
