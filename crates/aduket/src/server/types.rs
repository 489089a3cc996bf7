use super::route::Route;
use crate::recorder::CaptureError;
use crate::rule::RuleError;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Body type of every response the server writes.
pub(crate) type ResponseBody = BoxBody<Bytes, Infallible>;

/// Listener configuration. Defaults to an ephemeral port on the loopback interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Route {0} is registered more than once")]
    DuplicateRoute(Route),
    #[error("Invalid route {route}: {reason}")]
    InvalidRoute { route: Route, reason: String },
    #[error("Invalid response rule for route {route}: {source}")]
    Rule {
        route: Route,
        #[source]
        source: RuleError,
    },
    #[error("Failed to bind {0}: {1}")]
    BindError(SocketAddr, String),
}

/// Failure while answering a single request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("Failed to build response: {0}")]
    Response(#[from] hyper::http::Error),
    #[error("Server shut down before the delayed response was sent")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:0");

        let config: ServerConfig = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 8080);

        let config: ServerConfig = serde_json::from_str(r#"{"host": "0.0.0.0"}"#).unwrap();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:0");
    }
}
