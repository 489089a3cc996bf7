//! The HTTP test double.
//!
//! A [`Server`] listens on an ephemeral loopback port, answers every configured route with its
//! [`ResponseRule`](crate::ResponseRule) and records each request in the route's
//! [`RequestRecorder`]. Unknown paths get a 404, known paths under another method a 405.
//!
//! The server stops when [`Server::close`] is awaited or the handle is dropped. Recorders stay
//! readable afterwards.

mod dispatch;
mod handler;
mod route;
mod types;

pub use route::{Route, RouteTable};
pub use types::{DispatchError, ServerConfig, ServerError};

use crate::recorder::RequestRecorder;
use crate::rule::ResponseRuleOption;
use dispatch::Dispatcher;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Method;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, Instrument};

/// A running test server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Server {
    /// Serve a single route.
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), aduket::ServerError> {
    /// use aduket::{json_body, status_code, Method, Server};
    /// use serde_json::json;
    ///
    /// let (server, recorder) = Server::new(
    ///     Method::POST,
    ///     "/user/:id",
    ///     [status_code(201), json_body(&json!({"created": true}))],
    /// )
    /// .await?;
    ///
    /// // point the client under test at server.url()
    /// server.close().await;
    /// assert!(!recorder.received());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        method: Method,
        path: &str,
        options: impl IntoIterator<Item = ResponseRuleOption>,
    ) -> Result<(Self, Arc<RequestRecorder>), ServerError> {
        let mut table = RouteTable::new();
        let recorder = table.insert(Route::new(method, path), options)?;
        let server = Self::with_config(ServerConfig::default(), table).await?;
        Ok((server, recorder))
    }

    /// Serve several routes, each with its own rule and recorder.
    pub async fn new_multi_route(
        routes: HashMap<Route, Vec<ResponseRuleOption>>,
    ) -> Result<(Self, HashMap<Route, Arc<RequestRecorder>>), ServerError> {
        let mut table = RouteTable::new();
        for (route, options) in routes {
            table.insert(route, options)?;
        }
        let recorders = table.recorders();
        let server = Self::with_config(ServerConfig::default(), table).await?;
        Ok((server, recorders))
    }

    /// Bind `config` and start serving `table`.
    pub async fn with_config(config: ServerConfig, table: RouteTable) -> Result<Self, ServerError> {
        let bind_addr = config.bind_addr();
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| ServerError::BindError(bind_addr, e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(bind_addr, e.to_string()))?;

        info!("Test server bound to {} with {} route(s)", addr, table.len());

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let dispatcher = Arc::new(Dispatcher::new(table, shutdown.clone()));
        tracker.spawn(
            accept_loop(
                listener,
                addr,
                dispatcher,
                shutdown.clone(),
                tracker.clone(),
            )
            .in_current_span(),
        );

        Ok(Self {
            addr,
            shutdown,
            tracker,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:49152`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url(), path)
    }

    /// Stop accepting, abort in-flight requests and wait for every connection task to finish.
    pub async fn close(self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Test server on {} closed", self.addr);
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        tracker.spawn(
                            serve_connection(
                                stream,
                                peer,
                                Arc::clone(&dispatcher),
                                shutdown.clone(),
                            )
                            .in_current_span(),
                        );
                    }
                    Err(e) => {
                        error!("Accept error on {}: {}", addr, e);
                    }
                }
            }
            _ = shutdown.cancelled() => {
                info!("Test server on {} shutting down", addr);
                break;
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.dispatch(req).await }
    });
    let connection = http1::Builder::new().serve_connection(io, service);

    tokio::select! {
        result = connection => {
            if let Err(e) = result {
                debug!("Connection error from {}: {}", peer, e);
            }
        }
        _ = shutdown.cancelled() => {
            debug!("Dropping connection from {}", peer);
        }
    }
}

#[cfg(test)]
mod tests;
