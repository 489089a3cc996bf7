//! Response rules: what a route answers.
//!
//! A [`ResponseRule`] is compiled once from an ordered list of [`ResponseRuleOption`]s and is
//! immutable afterwards. Options are folded left to right into a [`ResponseRuleBuilder`]; each one
//! touches exactly one field, so later options overwrite earlier ones of the same kind.
//!
//! ```
//! use aduket::{json_body, status_code, ResponseRule};
//!
//! let rule = ResponseRule::from_options([
//!     status_code(201),
//!     json_body(&serde_json::json!({"id": 7})),
//! ])
//! .unwrap();
//! assert_eq!(rule.status().as_u16(), 201);
//! assert_eq!(rule.body().unwrap().as_ref(), br#"{"id":7}"#);
//! ```

use crate::codec::xml;
use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Errors raised while compiling a response rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid status code {0}")]
    InvalidStatus(u16),
    #[error("Failed to encode {format} body: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },
}

/// A single configuration edit applied while building a [`ResponseRule`].
#[derive(Debug, Clone)]
pub enum ResponseRuleOption {
    StatusCode(u16),
    Body(Bytes),
    Header(HeaderMap),
    Timeout(Duration),
    CorruptBody,
    /// A body option whose value could not be encoded. Reported when the rule is built.
    Unencodable(RuleError),
}

/// Compiled, immutable description of a route's response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRule {
    status: StatusCode,
    header: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    corrupt_body: bool,
}

impl Default for ResponseRule {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            header: HeaderMap::new(),
            body: None,
            timeout: None,
            corrupt_body: false,
        }
    }
}

impl ResponseRule {
    /// Start a builder holding the default rule (200, no headers, no body).
    pub fn builder() -> ResponseRuleBuilder {
        ResponseRuleBuilder::default()
    }

    /// Fold `options` in order over the default rule.
    pub fn from_options(
        options: impl IntoIterator<Item = ResponseRuleOption>,
    ) -> Result<Self, RuleError> {
        options
            .into_iter()
            .fold(Self::builder(), ResponseRuleBuilder::apply)
            .build()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    /// Body bytes, or `None` when the route answers without a content body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn corrupt_body(&self) -> bool {
        self.corrupt_body
    }
}

/// In-progress rule. The status is kept raw until [`build`](Self::build) validates it.
#[derive(Debug, Clone)]
pub struct ResponseRuleBuilder {
    status: u16,
    header: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    corrupt_body: bool,
    error: Option<RuleError>,
}

impl Default for ResponseRuleBuilder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            header: HeaderMap::new(),
            body: None,
            timeout: None,
            corrupt_body: false,
            error: None,
        }
    }
}

impl ResponseRuleBuilder {
    /// Apply one option. The first encoding failure is kept and returned by `build`.
    pub fn apply(mut self, option: ResponseRuleOption) -> Self {
        match option {
            ResponseRuleOption::StatusCode(code) => self.status = code,
            ResponseRuleOption::Body(body) => self.body = Some(body),
            ResponseRuleOption::Header(header) => self.header = header,
            ResponseRuleOption::Timeout(duration) => self.timeout = Some(duration),
            ResponseRuleOption::CorruptBody => self.corrupt_body = true,
            ResponseRuleOption::Unencodable(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn status_code(self, code: u16) -> Self {
        self.apply(status_code(code))
    }

    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.apply(json_body(value))
    }

    pub fn xml_body<T: Serialize>(self, value: &T) -> Self {
        self.apply(xml_body(value))
    }

    pub fn string_body(self, body: impl Into<String>) -> Self {
        self.apply(string_body(body))
    }

    pub fn byte_body(self, body: impl Into<Bytes>) -> Self {
        self.apply(byte_body(body))
    }

    pub fn header(self, header: HeaderMap) -> Self {
        self.apply(self::header(header))
    }

    pub fn timeout(self, duration: Duration) -> Self {
        self.apply(timeout(duration))
    }

    pub fn build(self) -> Result<ResponseRule, RuleError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let status =
            StatusCode::from_u16(self.status).map_err(|_| RuleError::InvalidStatus(self.status))?;
        Ok(ResponseRule {
            status,
            header: self.header,
            body: self.body,
            timeout: self.timeout,
            corrupt_body: self.corrupt_body,
        })
    }
}

pub fn status_code(code: u16) -> ResponseRuleOption {
    ResponseRuleOption::StatusCode(code)
}

/// Respond with `value` encoded as JSON.
pub fn json_body<T: Serialize + ?Sized>(value: &T) -> ResponseRuleOption {
    match serde_json::to_vec(value) {
        Ok(encoded) => ResponseRuleOption::Body(Bytes::from(encoded)),
        Err(e) => ResponseRuleOption::Unencodable(RuleError::Encode {
            format: "JSON",
            reason: e.to_string(),
        }),
    }
}

/// Respond with `value` encoded as XML. The root element is named after the value's type.
pub fn xml_body<T: Serialize>(value: &T) -> ResponseRuleOption {
    xml_body_with_root(xml::type_root_name::<T>(), value)
}

/// Respond with `value` encoded as XML under an explicit root element.
pub fn xml_body_with_root<T: Serialize + ?Sized>(root: &str, value: &T) -> ResponseRuleOption {
    let encoded = serde_json::to_value(value)
        .map_err(|e| e.to_string())
        .and_then(|value| xml::encode(root, &value).map_err(|e| e.to_string()));

    match encoded {
        Ok(body) => ResponseRuleOption::Body(body),
        Err(reason) => ResponseRuleOption::Unencodable(RuleError::Encode {
            format: "XML",
            reason,
        }),
    }
}

pub fn string_body(body: impl Into<String>) -> ResponseRuleOption {
    ResponseRuleOption::Body(Bytes::from(body.into()))
}

pub fn byte_body(body: impl Into<Bytes>) -> ResponseRuleOption {
    ResponseRuleOption::Body(body.into())
}

/// Replace the response headers. Only the last `header` option of a rule takes effect.
pub fn header(header: HeaderMap) -> ResponseRuleOption {
    ResponseRuleOption::Header(header)
}

/// Delay the response by `duration` before the request is captured and answered.
pub fn timeout(duration: Duration) -> ResponseRuleOption {
    ResponseRuleOption::Timeout(duration)
}

/// Promise a one byte body and send none, so clients fail while reading the response.
#[doc(hidden)]
pub fn corrupt_body() -> ResponseRuleOption {
    ResponseRuleOption::CorruptBody
}
