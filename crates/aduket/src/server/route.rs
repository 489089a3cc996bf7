//! Routes and the route table.
//!
//! Paths use named segments: `/user/:id` (or `/user/{id}`) binds `id`, and a trailing `*name`
//! captures the rest of the path. Patterns are translated to `matchit` syntax and inserted into a
//! per-method router as soon as the route is added, so conflicts surface at construction time.

use super::types::ServerError;
use crate::recorder::RequestRecorder;
use crate::rule::{ResponseRule, ResponseRuleOption};
use hyper::Method;
use matchit::Router;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const DEFAULT_WILDCARD: &str = "wildcard";

/// An endpoint: HTTP method plus path pattern. Compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    method: Method,
    path: String,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path pattern in `matchit` syntax.
    pub(crate) fn router_path(&self) -> Result<String, ServerError> {
        if !self.path.starts_with('/') {
            return Err(ServerError::InvalidRoute {
                route: self.clone(),
                reason: "path must start with '/'".to_string(),
            });
        }

        let segments: Vec<String> = self
            .path
            .split('/')
            .map(|segment| {
                if let Some(name) = segment.strip_prefix(':') {
                    format!("{{{name}}}")
                } else if let Some(name) = segment.strip_prefix('*') {
                    let name = if name.is_empty() { DEFAULT_WILDCARD } else { name };
                    format!("{{*{name}}}")
                } else {
                    segment.to_string()
                }
            })
            .collect();
        Ok(segments.join("/"))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl From<(Method, &str)> for Route {
    fn from((method, path): (Method, &str)) -> Self {
        Self::new(method, path)
    }
}

/// A route with its compiled rule and the recorder its handler writes to.
#[derive(Debug, Clone)]
pub(crate) struct RouteEntry {
    pub route: Route,
    pub rule: Arc<ResponseRule>,
    pub recorder: Arc<RequestRecorder>,
}

/// Routes to serve, each with its own rule and recorder.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    /// Per-method routers resolving a path to an index into `entries`.
    routers: HashMap<Method, Router<usize>>,
    patterns: HashMap<(Method, String), Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, builder style.
    pub fn route(
        mut self,
        route: impl Into<Route>,
        options: impl IntoIterator<Item = ResponseRuleOption>,
    ) -> Result<Self, ServerError> {
        self.insert(route, options)?;
        Ok(self)
    }

    /// Add a route and return the recorder bound to it.
    ///
    /// Fails if the rule does not compile, the path is malformed, or the route clashes with one
    /// already in the table.
    pub fn insert(
        &mut self,
        route: impl Into<Route>,
        options: impl IntoIterator<Item = ResponseRuleOption>,
    ) -> Result<Arc<RequestRecorder>, ServerError> {
        let route = route.into();
        let rule = ResponseRule::from_options(options).map_err(|source| ServerError::Rule {
            route: route.clone(),
            source,
        })?;

        let pattern = route.router_path()?;
        let key = (route.method().clone(), pattern.clone());
        if self.patterns.contains_key(&key) {
            return Err(ServerError::DuplicateRoute(route));
        }

        let index = self.entries.len();
        self.routers
            .entry(route.method().clone())
            .or_default()
            .insert(pattern, index)
            .map_err(|e| ServerError::InvalidRoute {
                route: route.clone(),
                reason: e.to_string(),
            })?;
        self.patterns.insert(key, route.clone());

        let recorder = Arc::new(RequestRecorder::new());
        self.entries.push(RouteEntry {
            route,
            rule: Arc::new(rule),
            recorder: Arc::clone(&recorder),
        });
        Ok(recorder)
    }

    pub fn recorder(&self, route: &Route) -> Option<Arc<RequestRecorder>> {
        self.entries
            .iter()
            .find(|entry| &entry.route == route)
            .map(|entry| Arc::clone(&entry.recorder))
    }

    pub fn recorders(&self) -> HashMap<Route, Arc<RequestRecorder>> {
        self.entries
            .iter()
            .map(|entry| (entry.route.clone(), Arc::clone(&entry.recorder)))
            .collect()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.entries.iter().map(|entry| &entry.route)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<RouteEntry>, HashMap<Method, Router<usize>>) {
        (self.entries, self.routers)
    }
}
