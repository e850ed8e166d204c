use crate::error::PipelineError;
use crate::logger::LogLevel;
use crate::policy::{NextPolicy, Policy, PolicyFactory, PolicyOptions};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::sync::Arc;

/// Logs each request line and response status through the pipeline logger
///
/// Requests and responses pass through unchanged.
pub struct LogPolicy {
    next: NextPolicy,
    options: PolicyOptions,
}

#[async_trait]
impl Policy for LogPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        if self.options.should_log(LogLevel::Info) {
            self.options.log(
                LogLevel::Info,
                &format!(">> Request: {} {}", request.method(), request.url()),
            );
        }

        match self.next.send(request).await {
            Ok(response) => {
                if self.options.should_log(LogLevel::Info) {
                    self.options.log(
                        LogLevel::Info,
                        &format!("<< Response status: {}", response.status_code()),
                    );
                }
                Ok(response)
            }
            Err(err) => {
                if self.options.should_log(LogLevel::Error) {
                    self.options
                        .log(LogLevel::Error, &format!("<< Request failed: {err}"));
                }
                Err(err)
            }
        }
    }
}

/// Factory for [`LogPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPolicyFactory;

impl PolicyFactory for LogPolicyFactory {
    fn create(&self, next: NextPolicy, options: PolicyOptions) -> NextPolicy {
        Arc::new(LogPolicy { next, options })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::logger::{Logger, TracingLogger};
    use crate::policies::stub::StubPolicy;
    use http::StatusCode;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingLogger {
        minimum: LogLevel,
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for RecordingLogger {
        fn minimum_log_level(&self) -> LogLevel {
            self.minimum
        }

        fn log(&self, level: LogLevel, message: &str) {
            self.lines.lock().unwrap().push((level, message.to_owned()));
        }
    }

    fn recording(minimum: LogLevel) -> Arc<RecordingLogger> {
        Arc::new(RecordingLogger {
            minimum,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_logs_request_and_response() {
        let logger = recording(LogLevel::Info);
        let stub = StubPolicy::new(|req, _| {
            Ok(HttpResponse::with_body(req.clone(), StatusCode::ACCEPTED, ""))
        });
        let head = LogPolicyFactory.create(stub, PolicyOptions::new(Some(logger.clone())));

        let response = head
            .send(HttpRequest::delete("https://example.com/things/1").unwrap())
            .await
            .unwrap();
        assert_eq!(response.status_code(), 202);

        let lines = logger.lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                (
                    LogLevel::Info,
                    ">> Request: DELETE https://example.com/things/1".to_owned()
                ),
                (LogLevel::Info, "<< Response status: 202".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn test_errors_logged_and_propagated() {
        let logger = recording(LogLevel::Error);
        let stub =
            StubPolicy::new(|_, _| Err(PipelineError::Transport(TransportError::new("down"))));
        let head = LogPolicyFactory.create(stub, PolicyOptions::new(Some(logger.clone())));

        let err = head
            .send(HttpRequest::get("https://example.com").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));

        let lines = logger.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, LogLevel::Error);
        assert!(lines[0].1.contains("down"));
    }

    #[tokio::test]
    async fn test_off_logger_receives_nothing() {
        let logger = recording(LogLevel::Off);
        let stub = StubPolicy::new(|req, _| {
            Ok(HttpResponse::with_body(req.clone(), StatusCode::OK, ""))
        });
        let head = LogPolicyFactory.create(stub, PolicyOptions::new(Some(logger.clone())));

        head.send(HttpRequest::get("https://example.com").unwrap())
            .await
            .unwrap();
        assert!(logger.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_tracing_logger_emits_events() {
        let stub = StubPolicy::new(|req, _| {
            Ok(HttpResponse::with_body(req.clone(), StatusCode::OK, ""))
        });
        let head = LogPolicyFactory.create(
            stub,
            PolicyOptions::new(Some(Arc::new(TracingLogger::default()))),
        );

        head.send(HttpRequest::get("https://example.com/traced").unwrap())
            .await
            .unwrap();

        assert!(logs_contain(">> Request: GET https://example.com/traced"));
        assert!(logs_contain("<< Response status: 200"));
    }
}
