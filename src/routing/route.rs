//! Immutable route bindings.

use {
    super::handler::HandlerRef,
    http::Method,
    std::{fmt, sync::Arc},
};

/// Method-qualified path under which a route is stored, rendered as
/// `"<METHOD> <path>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    method: String,
    path: String,
}

impl RouteKey {
    pub fn new(method: &Method, path: impl Into<String>) -> Self {
        Self {
            method: method.as_str().to_string(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A method and normalized path bound to the handler chain computed when the
/// route was registered.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    chain: Arc<[HandlerRef]>,
}

impl Route {
    pub(crate) fn new(method: Method, path: String, chain: Vec<HandlerRef>) -> Self {
        Self {
            method,
            path,
            chain: chain.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> RouteKey {
        RouteKey::new(&self.method, self.path.clone())
    }

    /// Number of handlers in the chain, middleware included.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub(crate) fn chain(&self) -> Arc<[HandlerRef]> {
        Arc::clone(&self.chain)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}
