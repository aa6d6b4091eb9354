//! Request logging middleware.
//!
//! Wraps any service and emits two log lines per request: `IN` when the
//! request arrives and `OUT` once the response body has been fully sent or
//! dropped, both tagged with the same request ID.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{Request, Response, StatusCode};
use axum::BoxError;
use futures_util::future::BoxFuture;
use hyper::body::{Frame, SizeHint};
use tower::{Layer, Service};

use crate::http::request::RequestInfo;
use crate::observability::metrics;

/// Layer applying [`RequestLog`] to a service.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog { inner }
    }
}

/// Service logging entry and exit of every request it handles.
#[derive(Debug, Clone)]
pub struct RequestLog<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let info = RequestInfo::capture(&req);

        tracing::info!(
            request_id = %info.id,
            remote_addr = %info.remote(),
            method = %info.method,
            uri = %info.uri,
            user_agent = %info.agent(),
            "IN"
        );

        req.extensions_mut().insert(info.id);
        let mut exit = ExitLog {
            info,
            started: Instant::now(),
            status: None,
        };

        let future = self.inner.call(req);
        Box::pin(async move {
            // On error `exit` drops here and still logs.
            let response = future.await?;
            exit.status = Some(response.status());

            Ok(response.map(|body| {
                Body::new(LoggedBody {
                    inner: Body::new(body),
                    _exit: exit,
                })
            }))
        })
    }
}

/// Emits the `OUT` line when dropped.
struct ExitLog {
    info: RequestInfo,
    started: Instant,
    status: Option<StatusCode>,
}

impl Drop for ExitLog {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let status = self.status.map(|s| s.as_u16()).unwrap_or_default();

        tracing::info!(
            request_id = %self.info.id,
            remote_addr = %self.info.remote(),
            method = %self.info.method,
            uri = %self.info.uri,
            status,
            elapsed = ?elapsed,
            "OUT"
        );

        metrics::record_request(self.info.method.as_str(), self.status, elapsed);
    }
}

/// Response body that carries the exit log until the body is finished.
struct LoggedBody {
    inner: Body,
    _exit: ExitLog,
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestId;
    use axum::{http::header, routing::get, Extension, Router};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            let raw = self.0.lock().unwrap().clone();
            String::from_utf8(raw)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    fn capture_logs() -> (Capture, tracing::subscriber::DefaultGuard) {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    fn request_id_of(line: &str) -> &str {
        let start = line.find("request_id=").unwrap() + "request_id=".len();
        &line[start..start + 36]
    }

    fn app() -> Router {
        Router::new()
            .route("/hello", get(|| async { "hi" }))
            .route(
                "/whoami",
                get(|Extension(id): Extension<RequestId>| async move { id.to_string() }),
            )
            .fallback(|| async { (StatusCode::NOT_FOUND, "not found") })
            .layer(RequestLogLayer)
    }

    #[tokio::test]
    async fn logs_entry_and_exit_with_shared_id() {
        let (capture, _guard) = capture_logs();

        let req = Request::builder()
            .uri("/hello?x=1")
            .header(header::USER_AGENT, "test-agent")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hi");

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(": IN "));
        assert!(lines[0].contains("/hello?x=1"));
        assert!(lines[0].contains("test-agent"));
        assert!(lines[1].contains(": OUT "));
        assert!(lines[1].contains("status=200"));
        assert!(lines[1].contains("elapsed="));
        assert_eq!(request_id_of(&lines[0]), request_id_of(&lines[1]));
    }

    #[tokio::test]
    async fn exit_waits_for_body() {
        let (capture, _guard) = capture_logs();

        let req = Request::builder().uri("/hello").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(capture.lines().len(), 1);

        drop(res);
        assert_eq!(capture.lines().len(), 2);
    }

    #[tokio::test]
    async fn handler_sees_logged_id() {
        let (capture, _guard) = capture_logs();

        let req = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();

        let lines = capture.lines();
        assert_eq!(std::str::from_utf8(&body).unwrap(), request_id_of(&lines[0]));
    }

    #[tokio::test]
    async fn unmatched_paths_are_logged() {
        let (capture, _guard) = capture_logs();

        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        drop(res);

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("status=404"));
    }
}
