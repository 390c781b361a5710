//! Per-request pipeline and failure normalization.
//!
//! ```text
//! Request ─▶ admit ─▶ read body ─▶ decode ─▶ route ─▶ (guard ─▶) handler ─▶ Response
//!              │          │            │         │          │          │
//!              └──────────┴────────────┴─────────┴──────────┴──────────┴──▶ Error ─▶ Response
//! ```
//!
//! [`Dispatcher::handle`] takes a request whose body is already in memory;
//! [`Dispatcher::handle_body`] takes one still attached to its stream and
//! reads it only after admission, up to [`Limits::max_body_bytes`]. Both
//! always return exactly one response: stage failures become [`Error`]s,
//! panics inside handlers are caught, and both are rendered by the same
//! `IntoResponse` impl.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::FutureExt;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::decoder;
use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{Match, Router};

/// Admission, size and time limits applied to every request.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Requests executing at once, body reads included. Further requests are
    /// answered with 503 immediately instead of queueing.
    pub max_in_flight: usize,
    /// Largest request body read from the wire. Larger bodies get 413.
    pub max_body_bytes: usize,
    /// Budget for the handler (including its guard). `None` disables it.
    pub request_timeout: Option<Duration>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_in_flight: 1024,
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Runs requests through the pipeline. Build once, share behind an `Arc`.
pub struct Dispatcher {
    router: Router,
    limits: Limits,
    permits: Semaphore,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self::with_limits(router, Limits::default())
    }

    pub fn with_limits(router: Router, limits: Limits) -> Self {
        let permits = Semaphore::new(limits.max_in_flight.min(Semaphore::MAX_PERMITS));
        Self { router, limits, permits }
    }

    /// Produces the response for `req`. Never fails, never panics outward.
    pub async fn handle(&self, req: Request) -> Response {
        let span = info_span!("request", method = %req.method(), path = req.path());
        let is_head = *req.method() == http::Method::HEAD;

        respond(is_head, async move {
            let _permit = self.admit()?;
            self.run(req).await
        })
        .instrument(span)
        .await
    }

    /// Like [`handle`](Dispatcher::handle), for a request whose body has not
    /// been read yet. The body is collected only once the request holds an
    /// admission slot, and never beyond `max_body_bytes`.
    pub async fn handle_body<B>(&self, req: http::Request<B>) -> Response
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let span = info_span!("request", method = %parts.method, path = parts.uri.path());
        let is_head = parts.method == http::Method::HEAD;

        respond(is_head, async move {
            let _permit = self.admit()?;
            let body = read_body(body, self.limits.max_body_bytes).await?;
            self.run(Request::from_parts(parts, body)).await
        })
        .instrument(span)
        .await
    }

    fn admit(&self) -> Result<SemaphorePermit<'_>, Error> {
        self.permits.try_acquire().map_err(|_| Error::Overloaded)
    }

    async fn run(&self, mut req: Request) -> Result<Response, Error> {
        decoder::decode(&mut req)?;

        let (handler, params) = match self.router.lookup(req.method(), req.path()) {
            Match::Found { handler, params } => (handler, params),
            Match::NotFound => {
                return Err(Error::RouteNotFound {
                    method: req.method().to_string(),
                    path: req.path().to_owned(),
                });
            }
            Match::MethodNotAllowed { allowed } => {
                return Err(Error::MethodNotAllowed {
                    method: req.method().to_string(),
                    path: req.path().to_owned(),
                    allowed,
                });
            }
        };
        req.set_params(params);

        match self.limits.request_timeout {
            Some(limit) => tokio::time::timeout(limit, handler.call(req))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => handler.call(req).await,
        }
    }
}

/// Runs `work`, turning its failure or panic into the one response.
async fn respond(is_head: bool, work: impl Future<Output = Result<Response, Error>>) -> Response {
    let started = Instant::now();
    let response = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => normalize(err),
        Err(panic) => {
            error!(panic = panic_message(panic.as_ref()), "handler panicked");
            Error::Internal(anyhow::anyhow!("handler panicked")).into_response()
        }
    };
    debug!(
        status = response.status_code().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    if is_head { response.without_body() } else { response }
}

/// Collects `body`, failing with 413 as soon as it is known to exceed `limit`.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Error>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(Error::PayloadTooLarge { limit }),
        Err(e) => Err(Error::Decode(format!("request body could not be read: {e}"))),
    }
}

/// Logs a failure at the level it deserves and renders it.
fn normalize(err: Error) -> Response {
    let status = err.status().as_u16();
    if err.is_fault() {
        let detail = format!("{err:#}");
        error!(status, error = %detail, "request failed");
    } else if matches!(err, Error::Overloaded | Error::Timeout(_) | Error::PayloadTooLarge { .. }) {
        warn!(status, error = %err, "request shed");
    } else {
        debug!(status, error = %err, "request rejected");
    }
    err.into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    use http::StatusCode;
    use http_body_util::Full;
    use hyper::body::Frame;

    async fn ok(_: Request) -> Result<Response, Error> {
        Ok(Response::text("ok"))
    }

    async fn boom(_: Request) -> Result<Response, Error> {
        panic!("index out of bounds");
    }

    async fn slow(_: Request) -> Result<Response, Error> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Response::text("late"))
    }

    #[tokio::test]
    async fn panics_become_500() {
        let dispatcher = Dispatcher::new(Router::new().get("/boom", boom).get("/ok", ok));

        let resp = dispatcher.handle(Request::new(http::Method::GET, "/boom")).await;
        assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!String::from_utf8_lossy(resp.body()).contains("index out of bounds"));

        // The dispatcher keeps serving.
        let resp = dispatcher.handle(Request::new(http::Method::GET, "/ok")).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handlers_time_out() {
        let limits = Limits { max_in_flight: 8, request_timeout: Some(Duration::from_millis(100)), ..Limits::default() };
        let dispatcher = Dispatcher::with_limits(Router::new().get("/slow", slow), limits);

        let resp = dispatcher.handle(Request::new(http::Method::GET, "/slow")).await;
        assert_eq!(resp.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn admission_is_bounded() {
        let limits = Limits { max_in_flight: 1, request_timeout: None, ..Limits::default() };
        let dispatcher = Dispatcher::with_limits(Router::new().get("/slow", slow).get("/ok", ok), limits);

        let (first, second) = tokio::join!(
            dispatcher.handle(Request::new(http::Method::GET, "/slow")),
            async {
                tokio::task::yield_now().await;
                dispatcher.handle(Request::new(http::Method::GET, "/ok")).await
            },
        );
        assert_eq!(first.status_code(), StatusCode::OK);
        assert_eq!(second.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        // The permit is released once the slow request completes.
        let resp = dispatcher.handle(Request::new(http::Method::GET, "/ok")).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn head_responses_have_no_body() {
        let dispatcher = Dispatcher::new(Router::new().get("/ok", ok));
        let resp = dispatcher.handle(Request::new(http::Method::HEAD, "/ok")).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert!(resp.body().is_empty());
        assert_eq!(resp.header("content-type"), Some("text/plain; charset=utf-8"));
    }

    async fn echo(req: Request) -> Result<Response, Error> {
        Ok(Response::json(req.body().to_vec()))
    }

    fn post(body: impl Into<Bytes>) -> http::Request<Full<Bytes>> {
        http::Request::post("/echo")
            .header("content-type", "application/json")
            .body(Full::new(body.into()))
            .unwrap()
    }

    /// A body that records whether anyone tried to read it.
    struct Tripwire(Arc<AtomicBool>);

    impl Body for Tripwire {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            self.0.store(true, Ordering::SeqCst);
            Poll::Ready(None)
        }
    }

    #[tokio::test]
    async fn bodies_over_the_limit_are_413() {
        let limits = Limits { max_body_bytes: 16, ..Limits::default() };
        let dispatcher = Dispatcher::with_limits(Router::new().post("/echo", echo), limits);

        let resp = dispatcher.handle_body(post(format!(r#"{{"name":"{}"}}"#, "x".repeat(64)))).await;
        assert_eq!(resp.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = dispatcher.handle_body(post(r#"{"n":1}"#)).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.body(), br#"{"n":1}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn bodies_are_not_read_without_admission() {
        let limits = Limits { max_in_flight: 1, request_timeout: None, ..Limits::default() };
        let dispatcher = Dispatcher::with_limits(Router::new().get("/slow", slow).post("/echo", echo), limits);
        let polled = Arc::new(AtomicBool::new(false));

        let (first, second) = tokio::join!(
            dispatcher.handle(Request::new(http::Method::GET, "/slow")),
            async {
                tokio::task::yield_now().await;
                let req = http::Request::post("/echo").body(Tripwire(Arc::clone(&polled))).unwrap();
                dispatcher.handle_body(req).await
            },
        );
        assert_eq!(first.status_code(), StatusCode::OK);
        assert_eq!(second.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!polled.load(Ordering::SeqCst));
    }
}
