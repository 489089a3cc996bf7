//! Request capture: turns an inbound request into a [`Recording`].
//!
//! Parameters and headers are captured first so they survive a body that cannot be read or
//! decoded. The body is then decoded according to its `Content-Type`:
//!
//! - `application/xml`: parsed into a mapping; malformed XML is an error and the raw bytes are kept
//! - anything else: decoded as a JSON object, falling back to the raw bytes
//!
//! Form-encoded bodies additionally fill `form_params`.

use super::{Body, Recording};
use crate::codec::{parse_urlencoded, xml, BodyKind};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::header::CONTENT_TYPE;
use hyper::http::request::Parts;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to read request body: {0}")]
    Body(String),
    #[error("Failed to decode XML request body: {0}")]
    Xml(#[from] xml::XmlError),
}

impl CaptureError {
    /// Decode errors leave a usable partial recording; read errors do not.
    pub fn is_decode(&self) -> bool {
        matches!(self, CaptureError::Xml(_))
    }
}

/// Capture `parts`, the matched path `params` and `body` into `recording`.
///
/// On error, `recording` keeps everything captured up to the failure.
pub async fn capture<B>(
    parts: &Parts,
    params: &[(String, String)],
    body: B,
    recording: &mut Recording,
) -> Result<(), CaptureError>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    recording.header = parts.headers.clone();
    recording.params = params
        .iter()
        .map(|(name, value)| (name.clone(), decode_param(value)))
        .collect();
    recording.query_params = parts
        .uri
        .query()
        .map(|query| parse_urlencoded(query.as_bytes()))
        .unwrap_or_default();

    let bytes = body
        .collect()
        .await
        .map_err(|e| CaptureError::Body(e.to_string()))?
        .to_bytes();

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    decode_body(content_type, bytes, recording)
}

/// Decode `bytes` into `recording` according to `content_type`.
pub fn decode_body(
    content_type: Option<&str>,
    bytes: Bytes,
    recording: &mut Recording,
) -> Result<(), CaptureError> {
    let kind = BodyKind::from_content_type(content_type);
    if kind == BodyKind::Form {
        recording.form_params = parse_urlencoded(&bytes);
    }
    if bytes.is_empty() {
        return Ok(());
    }

    match kind {
        BodyKind::Xml => match xml::decode(&bytes) {
            Ok(body) => recording.body = body,
            Err(e) => {
                recording.data = Some(bytes);
                return Err(e.into());
            }
        },
        BodyKind::Json | BodyKind::Form => match serde_json::from_slice::<Body>(&bytes) {
            Ok(body) => recording.body = body,
            Err(e) => {
                debug!("Body is not a JSON object ({}), keeping raw bytes", e);
                recording.data = Some(bytes);
            }
        },
    }
    Ok(())
}

/// Percent-decode a path parameter, keeping the raw segment if it is not valid UTF-8.
fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
