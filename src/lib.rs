//! # chainroute
//!
//! Request routing and middleware composition on top of axum.
//!
//! Routes are registered on an [`App`] or on prefix [`Group`]s. Each route is
//! bound, at registration time, to a single ordered handler chain:
//!
//! 1. global middleware (`app.use_middleware(..)`),
//! 2. middleware of every group whose prefix covers the route's path, in the
//!    order those groups first registered middleware,
//! 3. the route's own handlers.
//!
//! At request time the chain runs through a per-request [`Ctx`]. A handler
//! continues with `ctx.next().await`, stops the chain by writing a response
//! and returning, or fails it by returning an error.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chainroute::{App, Config, Result, Router, handler_fn};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::default();  // Loads from config/{RUST_ENV}.toml
//!     config.setup_tracing();
//!
//!     let app = App::new(config);
//!     app.use_middleware([handler_fn(|ctx| Box::pin(async move {
//!         let started = std::time::Instant::now();
//!         let result = ctx.next().await;
//!         tracing::info!(path = ctx.path(), elapsed = ?started.elapsed(), "Handled");
//!         result
//!     }))]);
//!
//!     let api = app.group("/api");
//!     api.get("/users/{id}", [handler_fn(|ctx| Box::pin(async move {
//!         let id = ctx.param("id").to_string();
//!         ctx.json(&serde_json::json!({ "id": id }))
//!     }))]);
//!
//!     app.listen(None).await
//! }
//! ```
//!
//! With `config/dev.toml`:
//! ```toml
//! [http]
//! bind_port = 3000
//! max_payload_size_bytes = "1MiB"
//! ```
//!
//! Run with `RUST_ENV=dev cargo run`.
//!
//! # Paths
//!
//! One trailing slash is stripped from registered and requested paths alike,
//! so `/api/a/` reaches the route registered as `/api/a`. Path parameters use
//! `{name}` and catch-all segments use `{*rest}`.
//!
//! Group prefixes match on segment boundaries: middleware on `/ab` applies to
//! `/ab` and `/ab/c` but not to `/abc`.
//!
//! # Error Handling
//!
//! The library uses a custom [`Result`] type. Unknown paths, method mismatches
//! and failed chains produce structured JSON bodies:
//!
//! ```json
//! {
//!   "error_code": "INTERNAL_ERROR",
//!   "message": "upstream unavailable"
//! }
//! ```
//!
//! # Ambient Layers
//!
//! Request ids, request logging and panic catching wrap the dispatcher and
//! can be switched off:
//!
//! ```toml
//! [http]
//! Exclude = ["catch-panic"]
//! ```
mod config;
mod error;
mod routing;
mod utils;

pub use config::*;
pub use error::*;
pub use routing::*;
pub use utils::*;

pub type Result<T> = std::result::Result<T, Error>;
