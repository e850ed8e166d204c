#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Request policy pipeline for generated REST clients
//!
//! A [`Pipeline`] sends every request through an ordered chain of
//! [`Policy`] links that ends in an [`HttpClient`] transport:
//! - Correlation ids (`x-ms-client-request-id`) and User-Agent tagging
//! - Redirect following without HTTPS downgrades
//! - Automatic resource provider registration on
//!   `409 MissingSubscriptionRegistration`
//! - Retries with jittered exponential backoff, optionally fatal on
//!   well-known socket errors
//! - Request/response logging through a pluggable [`Logger`]
//!
//! The built-in transport, [`HyperHttpClient`], runs over hyper with rustls,
//! connection pooling, a per-attempt timeout and transparent response
//! decompression (gzip, brotli, deflate).
//!
//! # Example
//!
//! ```ignore
//! use rest_pipeline::{
//!     HttpRequest, Pipeline, PipelineOptions, TracingLogger, default_policy_factories,
//! };
//! use std::sync::Arc;
//!
//! let pipeline = Pipeline::new(
//!     &default_policy_factories("my-sdk/1.0")?,
//!     PipelineOptions {
//!         logger: Some(Arc::new(TracingLogger::default())),
//!         ..Default::default()
//!     },
//! )?;
//!
//! let response = pipeline
//!     .send(HttpRequest::get("https://management.example.com/subscriptions/abc/resourceGroups")?)
//!     .await?;
//! let groups: ResourceGroups = response.json()?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod headers;
mod logger;
mod pipeline;
pub mod policies;
mod policy;
mod request;
mod response;
mod tls;

pub use builder::HyperHttpClientBuilder;
pub use client::{HttpClient, HyperHttpClient};
pub use config::{
    CLIENT_REQUEST_ID_HEADER, DEFAULT_USER_AGENT, DelayFunction, HttpClientConfig, RedirectOptions,
    RegistrationOptions, RetryOptions, TlsRootConfig, TransportSecurity, tokio_delay,
};
pub use error::{
    AttemptErrors, BoxError, ECONNREFUSED, ECONNRESET, ENOENT, ESOCKETTIMEDOUT, ETIMEDOUT,
    InvalidUriKind, PipelineError, TransportError,
};
pub use headers::{HttpHeader, HttpHeaders};
pub use logger::{LogLevel, Logger, TracingLogger, should_log};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineOptions, default_policy_factories};
pub use policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
pub use request::HttpRequest;
pub use response::{HttpResponse, ResponseBody};

// Re-exported for implementors of `Policy` and `HttpClient`.
pub use async_trait::async_trait;
