//! Request recording for routes.
//!
//! Every route owns one [`RequestRecorder`]. The dispatch handler flips `received` as soon as a
//! matching request arrives, captures the request into a fresh [`Recording`] and swaps it in, so a
//! recorder always reflects the latest request for its route. Readers get cloned snapshots.
//!
//! ## Module Structure
//!
//! - `capture`: decoding an inbound request into a `Recording`
//! - `assert`: assertions against the captured request
//! - `reporter`: how assertion failures are reported

mod assert;
pub(crate) mod capture;
mod reporter;


pub use capture::CaptureError;
pub use reporter::{AssertionFailure, Reporter, Tester};

use crate::codec::Values;
use bytes::Bytes;
use hyper::HeaderMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Structured request body: a JSON object, or an XML document converted to the same shape.
pub type Body = serde_json::Map<String, serde_json::Value>;

/// Everything captured from one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    /// Decoded body. Empty when the body was absent or could not be decoded.
    pub body: Body,
    /// Raw body bytes, kept when structured decoding did not apply.
    pub data: Option<Bytes>,
    /// Snapshot of the request headers, independent of the transport's header map.
    pub header: HeaderMap,
    /// Named path parameters.
    pub params: HashMap<String, String>,
    pub query_params: Values,
    /// Form fields of `application/x-www-form-urlencoded` bodies.
    pub form_params: Values,
}

/// Capture sink for the requests of a single route.
#[derive(Debug, Default)]
pub struct RequestRecorder {
    received: AtomicBool,
    request_count: AtomicU64,
    recording: RwLock<Recording>,
}

impl RequestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a matching request reached the route, whether or not its body decoded.
    pub fn received(&self) -> bool {
        self.received.load(Ordering::SeqCst)
    }

    /// Number of matching requests seen so far.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the latest recording.
    pub fn recording(&self) -> Recording {
        self.recording.read().clone()
    }

    pub fn body(&self) -> Body {
        self.recording.read().body.clone()
    }

    pub fn data(&self) -> Option<Bytes> {
        self.recording.read().data.clone()
    }

    pub fn header(&self) -> HeaderMap {
        self.recording.read().header.clone()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.recording.read().params.get(name).cloned()
    }

    pub fn query_param(&self, name: &str) -> Option<Vec<String>> {
        self.recording.read().query_params.get(name).cloned()
    }

    pub fn form_param(&self, name: &str) -> Option<Vec<String>> {
        self.recording.read().form_params.get(name).cloned()
    }

    /// Mark the start of a request. Called before anything else is captured.
    pub(crate) fn mark_received(&self) {
        self.received.store(true, Ordering::SeqCst);
        self.request_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Replace the recording with the one captured for the latest request.
    pub(crate) fn store(&self, recording: Recording) {
        *self.recording.write() = recording;
    }
}
