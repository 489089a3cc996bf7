//! Body and parameter codecs shared by request capture and response rules.

pub mod xml;

use std::collections::HashMap;

/// Multi-valued parameter map (query string or form body), in arrival order per key.
pub type Values = HashMap<String, Vec<String>>;

/// How a request body is decoded, driven only by its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Xml,
    Form,
    /// Everything else: JSON is attempted, raw bytes are kept on failure.
    Json,
}

impl BodyKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(mime) = content_type.and_then(|ct| ct.parse::<mime::Mime>().ok()) else {
            return BodyKind::Json;
        };

        if mime.type_() == mime::APPLICATION && mime.subtype() == mime::XML {
            BodyKind::Xml
        } else if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
            BodyKind::Form
        } else {
            BodyKind::Json
        }
    }
}

/// Parse an `application/x-www-form-urlencoded` string (query strings use the same encoding).
pub fn parse_urlencoded(input: &[u8]) -> Values {
    let mut values = Values::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        values
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    values
}
