//! Request dispatch: resolves method and path to a route handler.

use super::handler::DispatchHandler;
use super::route::RouteTable;
use super::types::{DispatchError, ResponseBody};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::ALLOW;
use hyper::{Method, Request, Response, StatusCode};
use matchit::Router;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub(crate) struct Dispatcher {
    handlers: Vec<DispatchHandler>,
    routers: HashMap<Method, Router<usize>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(table: RouteTable, shutdown: CancellationToken) -> Self {
        let (entries, routers) = table.into_parts();
        Self {
            handlers: entries.into_iter().map(DispatchHandler::from).collect(),
            routers,
            shutdown,
        }
    }

    pub async fn dispatch<B>(&self, req: Request<B>) -> Result<Response<ResponseBody>, DispatchError>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let matched = self.routers.get(&method).and_then(|router| {
            router.at(&path).ok().map(|m| {
                let params: Vec<(String, String)> = m
                    .params
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                (*m.value, params)
            })
        });
        let Some((handler, params)) =
            matched.and_then(|(index, params)| self.handlers.get(index).map(|h| (h, params)))
        else {
            return Ok(self.unrouted(&method, &path));
        };

        debug!("{} {} -> {}", method, path, handler.route());
        match handler.handle(req, params, &self.shutdown).await {
            Ok(response) => Ok(response),
            Err(DispatchError::Cancelled) => Err(DispatchError::Cancelled),
            Err(e) => {
                error!("{}: {}", handler.route(), e);
                Ok(build_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                ))
            }
        }
    }

    /// 405 when the path exists under another method, 404 otherwise.
    fn unrouted(&self, method: &Method, path: &str) -> Response<ResponseBody> {
        let mut allowed: Vec<&str> = self
            .routers
            .iter()
            .filter(|(m, router)| *m != method && router.at(path).is_ok())
            .map(|(m, _)| m.as_str())
            .collect();

        if allowed.is_empty() {
            debug!("{} {} -> no route", method, path);
            return build_response(StatusCode::NOT_FOUND, "Not Found");
        }

        allowed.sort_unstable();
        debug!("{} {} -> method not allowed", method, path);
        let mut response = build_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        if let Ok(value) = allowed.join(", ").parse() {
            response.headers_mut().insert(ALLOW, value);
        }
        response
    }
}

/// Build a plain-text response for requests that never reach a route handler.
pub(crate) fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(body.into()).boxed());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::string_body;

    fn dispatcher() -> Dispatcher {
        let table = RouteTable::new()
            .route((Method::GET, "/user/:id"), [string_body("get user")])
            .unwrap()
            .route((Method::DELETE, "/user/:id"), [string_body("deleted")])
            .unwrap()
            .route((Method::GET, "/files/*path"), [string_body("file")])
            .unwrap();
        Dispatcher::new(table, CancellationToken::new())
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_of(response: Response<ResponseBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_dispatches_by_method_and_path() {
        let dispatcher = dispatcher();

        let response = dispatcher
            .dispatch(request(Method::GET, "/user/7"))
            .await
            .unwrap();
        assert_eq!(body_of(response).await, Bytes::from_static(b"get user"));

        let response = dispatcher
            .dispatch(request(Method::DELETE, "/user/7"))
            .await
            .unwrap();
        assert_eq!(body_of(response).await, Bytes::from_static(b"deleted"));
    }

    #[tokio::test]
    async fn test_wildcard_binds_remaining_path() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .dispatch(request(Method::GET, "/files/a/b.txt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, Bytes::from_static(b"file"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = dispatcher()
            .dispatch(request(Method::GET, "/book/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_allowed() {
        let response = dispatcher()
            .dispatch(request(Method::POST, "/user/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "DELETE, GET");
    }
}
