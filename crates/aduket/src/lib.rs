//! Aduket - a programmable HTTP test double.
//!
//! Start a [`Server`] with a route and a [`ResponseRule`], point the client under test at
//! [`Server::url`], then assert on what the client sent through the route's
//! [`RequestRecorder`].
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use aduket::{json_body, status_code, Method, Server, Tester};
//! use serde_json::json;
//!
//! let (server, recorder) = Server::new(
//!     Method::POST,
//!     "/user/:id",
//!     [status_code(200), json_body(&json!({"ok": true}))],
//! )
//! .await?;
//!
//! reqwest::Client::new()
//!     .post(server.url_for("/user/7?verbose=1"))
//!     .json(&json!({"name": "joe"}))
//!     .send()
//!     .await?;
//!
//! let t = Tester::new();
//! recorder.assert_param_eq(&t, "id", "7");
//! recorder.assert_query_param_eq(&t, "verbose", &["1"]);
//! recorder.assert_json_body_eq(&t, &json!({"name": "joe"}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `rule`: response rules and the options that build them
//! - `server`: listener, routing and per-route dispatch
//! - `recorder`: request capture and assertions
//! - `codec`: XML and form codecs shared by rules and capture
//!
//! The crate logs through `tracing` and installs no subscriber.

pub mod codec;
pub mod recorder;
pub mod rule;
pub mod server;

pub use hyper::{HeaderMap, Method, StatusCode};
pub use recorder::{
    AssertionFailure, Body, CaptureError, Recording, Reporter, RequestRecorder, Tester,
};
pub use rule::{
    byte_body, corrupt_body, header, json_body, status_code, string_body, timeout, xml_body,
    xml_body_with_root, ResponseRule, ResponseRuleBuilder, ResponseRuleOption, RuleError,
};
pub use server::{DispatchError, Route, RouteTable, Server, ServerConfig, ServerError};
