//! Route registration, middleware composition and request dispatch.
//!
//! The functionality is split across submodules:
//!
//! - [`path`] - Path normalization and segment-aware prefix matching
//! - [`handler`] - The `Handler` trait shared by middleware and endpoints
//! - [`registry`] - Global and prefix-scoped middleware
//! - [`route`] - Method and path bound to a frozen handler chain
//! - [`app`] - The `Router` trait, `App` and `Group`
//! - [`ctx`] - Per-request context and the `next` continuation
//! - [`dispatcher`] - Matching a request to a route and running its chain
//! - [`server`] - axum integration, ambient layers and graceful shutdown
//!
//! A route's chain is fixed when the route is registered: global middleware,
//! then middleware of every group whose prefix covers the route's path, then
//! the route's own handlers.

mod app;
mod ctx;
mod dispatcher;
mod handler;
mod path;
mod registry;
mod route;
mod server;

pub use app::{App, Group, Router};
pub use ctx::Ctx;
pub use dispatcher::Dispatcher;
pub use handler::{BoxFuture, Handler, HandlerFn, HandlerRef, handler, handler_fn};
pub use path::{normalize_path, prefix_matches};
pub use route::{Route, RouteKey};

#[cfg(test)]
mod tests;
