//! Per-route request handler: records the request and replays the route's response rule.

use super::route::{Route, RouteEntry};
use super::types::{DispatchError, ResponseBody};
use crate::recorder::capture::capture;
use crate::recorder::{Recording, RequestRecorder};
use crate::rule::ResponseRule;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Frame};
use hyper::header::{CONNECTION, CONTENT_LENGTH};
use hyper::{Request, Response};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub(crate) struct DispatchHandler {
    route: Route,
    rule: Arc<ResponseRule>,
    recorder: Arc<RequestRecorder>,
}

impl From<RouteEntry> for DispatchHandler {
    fn from(entry: RouteEntry) -> Self {
        Self {
            route: entry.route,
            rule: entry.rule,
            recorder: entry.recorder,
        }
    }
}

impl DispatchHandler {
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub async fn handle<B>(
        &self,
        req: Request<B>,
        params: Vec<(String, String)>,
        shutdown: &CancellationToken,
    ) -> Result<Response<ResponseBody>, DispatchError>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        self.recorder.mark_received();

        if self.rule.corrupt_body() {
            debug!("{}: answering with a truncated body", self.route);
            return Ok(corrupted_response(&self.rule)?);
        }

        if let Some(delay) = self.rule.timeout() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => return Err(DispatchError::Cancelled),
            }
        }

        let (parts, body) = req.into_parts();
        let mut recording = Recording::default();
        let captured = capture(&parts, &params, body, &mut recording).await;
        self.recorder.store(recording);
        match captured {
            Ok(()) => {}
            Err(e) if e.is_decode() => warn!("{}: {}", self.route, e),
            Err(e) => return Err(e.into()),
        }

        Ok(response(&self.rule)?)
    }
}

fn response(rule: &ResponseRule) -> Result<Response<ResponseBody>, hyper::http::Error> {
    let mut builder = Response::builder().status(rule.status());
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in rule.header() {
            headers.append(name, value.clone());
        }
    }
    builder.body(Full::new(rule.body().cloned().unwrap_or_default()).boxed())
}

/// Announces a one byte body and sends none, then closes the connection. Clients fail reading.
fn corrupted_response(rule: &ResponseRule) -> Result<Response<ResponseBody>, hyper::http::Error> {
    Response::builder()
        .status(rule.status())
        .header(CONTENT_LENGTH, "1")
        .header(CONNECTION, "close")
        .body(TruncatedBody::default().boxed())
}

/// A body that ends without data and without an exact size hint, so hyper keeps the
/// `Content-Length` set on the response instead of replacing it with 0.
///
/// The first poll yields once so the response head is flushed before the body ends short.
#[derive(Debug, Default)]
struct TruncatedBody {
    yielded: bool,
}

impl Body for TruncatedBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if self.yielded {
            return Poll::Ready(None);
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
