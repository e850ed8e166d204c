use std::time::Duration;
use thiserror::Error;

/// Boxed error used as the low-level cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Low-level error codes that [`TransportError::from_source`] recognises.
pub const ETIMEDOUT: &str = "ETIMEDOUT";
pub const ESOCKETTIMEDOUT: &str = "ESOCKETTIMEDOUT";
pub const ECONNREFUSED: &str = "ECONNREFUSED";
pub const ECONNRESET: &str = "ECONNRESET";
pub const ENOENT: &str = "ENOENT";

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// Failure reported by a transport adapter.
///
/// `code` carries the machine-readable low-level error code (`ECONNREFUSED`,
/// `ETIMEDOUT`, ...) when one is known. Retry policies classify on it.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    code: Option<String>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Transport failure without a code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Transport failure carrying a low-level error code.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, deriving the code from the first
    /// `std::io::Error` found in its source chain.
    #[must_use]
    pub fn from_source(source: BoxError) -> Self {
        let code = io_error_code(source.as_ref()).map(str::to_owned);
        Self {
            code,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Low-level error code, if known.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Walk the source chain looking for an I/O error with a well-known kind.
fn io_error_code(err: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            let code = match io.kind() {
                std::io::ErrorKind::TimedOut => Some(ETIMEDOUT),
                std::io::ErrorKind::ConnectionRefused => Some(ECONNREFUSED),
                std::io::ErrorKind::ConnectionReset => Some(ECONNRESET),
                std::io::ErrorKind::NotFound => Some(ENOENT),
                _ => None,
            };
            if code.is_some() {
                return code;
            }
        }
        current = e.source();
    }
    None
}

/// Errors produced while sending a request through a pipeline
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// The request could not be constructed (empty URL, unsupported method)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid URL (failed to parse or rejected by transport security)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field is
    /// a diagnostic message intended for logging only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme { scheme: String, reason: String },

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Building the wire request failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// TLS setup error
    #[error("TLS error: {0}")]
    Tls(#[source] BoxError),

    /// Single request attempt timed out
    #[error("Request attempt timed out after {0:?}")]
    Timeout(Duration),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// JSON parsing error
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource provider registration could not proceed
    #[error("Resource provider registration failed: {0}")]
    Registration(String),

    /// Caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Newest failure of a retried request, linked to the failures of the
    /// attempts before it.
    #[error("{error}")]
    Retried {
        error: Box<PipelineError>,
        #[source]
        inner_error: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Link `self` (the newest failure) to the failures recorded before it.
    #[must_use]
    pub fn chain(self, previous: Option<PipelineError>) -> Self {
        match previous {
            Some(inner) => PipelineError::Retried {
                error: Box::new(self),
                inner_error: Box::new(inner),
            },
            None => self,
        }
    }

    /// Failure of the previous attempt, if this error came out of a retry loop.
    #[must_use]
    pub fn inner_error(&self) -> Option<&PipelineError> {
        match self {
            PipelineError::Retried { inner_error, .. } => Some(inner_error),
            _ => None,
        }
    }

    /// The newest failure, looking through retry wrappers.
    #[must_use]
    pub fn latest(&self) -> &PipelineError {
        match self {
            PipelineError::Retried { error, .. } => error.latest(),
            other => other,
        }
    }

    /// Low-level error code of the newest failure, if any.
    ///
    /// A per-attempt timeout reports `ETIMEDOUT`.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self.latest() {
            PipelineError::Transport(e) => e.code(),
            PipelineError::Timeout(_) => Some(ETIMEDOUT),
            _ => None,
        }
    }

    /// Iterate attempt failures from newest to oldest.
    #[must_use]
    pub fn attempt_errors(&self) -> AttemptErrors<'_> {
        AttemptErrors {
            current: Some(self),
        }
    }
}

/// Iterator returned by [`PipelineError::attempt_errors`].
pub struct AttemptErrors<'a> {
    current: Option<&'a PipelineError>,
}

impl<'a> Iterator for AttemptErrors<'a> {
    type Item = &'a PipelineError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        match current {
            PipelineError::Retried { error, inner_error } => {
                self.current = Some(inner_error);
                Some(error.latest())
            }
            other => {
                self.current = None;
                Some(other)
            }
        }
    }
}
