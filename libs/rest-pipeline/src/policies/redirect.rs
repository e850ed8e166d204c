//! Redirect following
//!
//! `300`, `301`, `302`, `303`, `307` and `308` responses carrying a
//! `Location` header are followed up to a configurable limit:
//! - `Location` is resolved against the URL of the request that got redirected
//! - `303 See Other` switches the method to GET and drops the body
//! - HTTPS to HTTP downgrades are never followed; the 3xx response is returned
//! - `Authorization`, `Cookie` and `Proxy-Authorization` are stripped once a
//!   redirect leaves the original origin

use crate::config::RedirectOptions;
use crate::error::PipelineError;
use crate::logger::LogLevel;
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use http::{Method, StatusCode, header};
use std::sync::Arc;
use url::Url;

/// Headers that are stripped on cross-origin redirects to prevent credential leakage
const SENSITIVE_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

fn is_redirect_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 300 | 301 | 302 | 303 | 307 | 308)
}

/// Check if the redirect is an HTTPS to HTTP downgrade
fn is_https_downgrade(original: &Url, target: &Url) -> bool {
    original.scheme() == "https" && target.scheme() == "http"
}

/// Follows HTTP redirects returned by the next link.
pub struct RedirectPolicy {
    next: NextPolicy,
    max_redirects: u32,
    policy_options: PolicyOptions,
}

impl RedirectPolicy {
    #[must_use]
    pub fn new(next: NextPolicy, options: &RedirectOptions, policy_options: PolicyOptions) -> Self {
        Self {
            next,
            max_redirects: options.max_redirects,
            policy_options,
        }
    }

    /// Request for the next hop, or `None` when `response` must be returned as is.
    fn follow(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<Option<HttpRequest>, PipelineError> {
        let Some(location) = response.headers().get(header::LOCATION.as_str()) else {
            return Ok(None);
        };
        let Ok(current) = Url::parse(request.url()) else {
            return Ok(None);
        };
        let target = match current.join(location) {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!(location, error = %e, "unresolvable redirect location");
                return Ok(None);
            }
        };

        if is_https_downgrade(&current, &target) {
            tracing::warn!(
                original = %current,
                target = %target,
                "Blocking HTTPS -> HTTP redirect downgrade"
            );
            self.policy_options.log(
                LogLevel::Warning,
                &format!("Not following redirect from {current} to {target}: HTTPS downgrade"),
            );
            return Ok(None);
        }

        let mut next = request.clone();
        if current.origin() != target.origin() {
            tracing::debug!(
                original = %current,
                target = %target,
                "Cross-origin redirect detected"
            );
            for name in SENSITIVE_HEADERS {
                if next.headers_mut().remove(name.as_str()).is_some() {
                    tracing::debug!(
                        header = %name,
                        "Stripped sensitive header on cross-origin redirect"
                    );
                }
            }
        }
        if response.status() == StatusCode::SEE_OTHER {
            next.set_method(Method::GET);
            next.clear_body();
        }
        next.set_url(target.as_str())?;
        Ok(Some(next))
    }
}

#[async_trait]
impl Policy for RedirectPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        let mut request = request;
        let mut redirects: u32 = 0;

        loop {
            let response = self.next.send(request.clone()).await?;
            if redirects >= self.max_redirects || !is_redirect_status(response.status()) {
                return Ok(response);
            }
            let Some(next) = self.follow(&request, &response)? else {
                return Ok(response);
            };

            redirects += 1;
            tracing::debug!(
                status = response.status_code(),
                from = request.url(),
                to = next.url(),
                redirects,
                "following redirect"
            );
            request = next;
        }
    }
}

/// Factory for [`RedirectPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RedirectPolicyFactory {
    options: RedirectOptions,
}

impl RedirectPolicyFactory {
    #[must_use]
    pub fn new(options: RedirectOptions) -> Self {
        Self { options }
    }
}

impl PolicyFactory for RedirectPolicyFactory {
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy {
        Arc::new(RedirectPolicy::new(next, &self.options, options))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::headers::HttpHeaders;
    use crate::policies::stub::StubPolicy;
    use bytes::Bytes;

    fn redirect_to(req: &HttpRequest, status: StatusCode, location: &str) -> HttpResponse {
        let headers: HttpHeaders = [("Location", location)].into_iter().collect();
        HttpResponse::new(req.clone(), status, headers, Bytes::new())
    }

    fn ok(req: &HttpRequest) -> HttpResponse {
        HttpResponse::with_body(req.clone(), StatusCode::OK, "done")
    }

    fn policy(next: NextPolicy, options: &RedirectOptions) -> RedirectPolicy {
        RedirectPolicy::new(next, options, PolicyOptions::default())
    }

    #[tokio::test]
    async fn test_follows_relative_location() {
        let stub = StubPolicy::new(|req, call| {
            if call == 0 {
                Ok(redirect_to(req, StatusCode::FOUND, "/v2/things?x=1"))
            } else {
                Ok(ok(req))
            }
        });

        let request = HttpRequest::get("https://example.com/v1/things").unwrap();
        let response = policy(stub.clone(), &RedirectOptions::default())
            .send(request)
            .await
            .unwrap();

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.request().url(), "https://example.com/v2/things?x=1");
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn test_see_other_switches_to_get() {
        let stub = StubPolicy::new(|req, call| {
            if call == 0 {
                Ok(redirect_to(req, StatusCode::SEE_OTHER, "/status/1"))
            } else {
                Ok(ok(req))
            }
        });

        let request = HttpRequest::post("https://example.com/jobs")
            .unwrap()
            .body_string("payload".to_owned());
        policy(stub.clone(), &RedirectOptions::default())
            .send(request)
            .await
            .unwrap();

        let calls = stub.calls();
        assert_eq!(calls[1].method(), Method::GET);
        assert!(calls[1].body().is_none());
    }

    #[tokio::test]
    async fn test_temporary_redirect_keeps_method_and_body() {
        let stub = StubPolicy::new(|req, call| {
            if call == 0 {
                Ok(redirect_to(req, StatusCode::TEMPORARY_REDIRECT, "/jobs2"))
            } else {
                Ok(ok(req))
            }
        });

        let request = HttpRequest::post("https://example.com/jobs")
            .unwrap()
            .body_string("payload".to_owned());
        policy(stub.clone(), &RedirectOptions::default())
            .send(request)
            .await
            .unwrap();

        let calls = stub.calls();
        assert_eq!(calls[1].method(), Method::POST);
        assert_eq!(calls[1].body().unwrap().as_ref(), b"payload");
    }

    #[tokio::test]
    async fn test_https_downgrade_not_followed() {
        let stub = StubPolicy::new(|req, _| {
            Ok(redirect_to(req, StatusCode::MOVED_PERMANENTLY, "http://example.com/"))
        });

        let request = HttpRequest::get("https://example.com/").unwrap();
        let response = policy(stub.clone(), &RedirectOptions::default())
            .send(request)
            .await
            .unwrap();

        assert_eq!(response.status_code(), 301);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cross_origin_strips_credentials() {
        let stub = StubPolicy::new(|req, call| match call {
            0 => Ok(redirect_to(req, StatusCode::FOUND, "/same-origin")),
            1 => Ok(redirect_to(req, StatusCode::FOUND, "https://other.example.net/")),
            _ => Ok(ok(req)),
        });

        let request = HttpRequest::get("https://example.com/")
            .unwrap()
            .header("Authorization", "Bearer secret")
            .header("Cookie", "session=1")
            .header("x-ms-client-request-id", "abc");
        policy(stub.clone(), &RedirectOptions::default())
            .send(request)
            .await
            .unwrap();

        let calls = stub.calls();
        assert_eq!(calls[1].headers().get("authorization"), Some("Bearer secret"));
        assert!(!calls[2].headers().contains("authorization"));
        assert!(!calls[2].headers().contains("cookie"));
        assert_eq!(calls[2].headers().get("x-ms-client-request-id"), Some("abc"));
    }

    #[tokio::test]
    async fn test_redirect_limit() {
        let stub = StubPolicy::new(|req, _| Ok(redirect_to(req, StatusCode::FOUND, "/loop")));

        let options = RedirectOptions { max_redirects: 3 };
        let response = policy(stub.clone(), &options)
            .send(HttpRequest::get("https://example.com/").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status_code(), 302);
        assert_eq!(stub.call_count(), 4);
    }

    #[tokio::test]
    async fn test_disabled_returns_redirect() {
        let stub = StubPolicy::new(|req, _| Ok(redirect_to(req, StatusCode::FOUND, "/elsewhere")));

        let response = policy(stub.clone(), &RedirectOptions::disabled())
            .send(HttpRequest::get("https://example.com/").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status_code(), 302);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_location_returned() {
        let stub = StubPolicy::new(|req, _| {
            Ok(HttpResponse::with_body(req.clone(), StatusCode::MULTIPLE_CHOICES, ""))
        });

        let response = policy(stub.clone(), &RedirectOptions::default())
            .send(HttpRequest::get("https://example.com/").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status_code(), 300);
        assert_eq!(stub.call_count(), 1);
    }

    #[test]
    fn test_is_https_downgrade() {
        let https = Url::parse("https://example.com/").unwrap();
        let http = Url::parse("http://example.com/").unwrap();
        assert!(is_https_downgrade(&https, &http));
        assert!(!is_https_downgrade(&http, &https));
        assert!(!is_https_downgrade(&https, &https));
    }

    #[test]
    fn test_redirect_statuses() {
        for status in [300, 301, 302, 303, 307, 308] {
            assert!(is_redirect_status(StatusCode::from_u16(status).unwrap()));
        }
        for status in [200, 304, 305, 400] {
            assert!(!is_redirect_status(StatusCode::from_u16(status).unwrap()));
        }
    }
}
