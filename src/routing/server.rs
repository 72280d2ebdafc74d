//! Wiring the dispatcher into axum and serving it.
//!
//! [`App::into_router`] freezes the route table and returns an
//! `axum::Router` whose fallback is the dispatcher, wrapped in the ambient
//! layers enabled in `[http]`:
//!
//! | Layer         | Name in `Include`/`Exclude` | Effect                                  |
//! |---------------|-----------------------------|-----------------------------------------|
//! | Request id    | `request-id`                | Sets and echoes `x-request-id` (UUIDv7) |
//! | Trace logging | `logging`                   | One `http_request` span per request     |
//! | Panic catcher | `catch-panic`               | Turns panics into a JSON 500            |

use {
    super::{App, Dispatcher},
    crate::{ErrorResponse, HttpConfig, HttpMiddleware, Result, utils::RequestIdGenerator},
    axum::{
        Json,
        body::Body,
        response::{IntoResponse, Response},
    },
    http::{HeaderName, Request, StatusCode},
    std::{any::Any, net::SocketAddr, sync::Arc},
    tokio::{net::TcpListener, signal},
    tokio_util::sync::CancellationToken,
    tower_http::{
        catch_panic::CatchPanicLayer,
        request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
        trace::TraceLayer,
    },
};

impl App {
    /// Freezes the route table and returns it as an `axum::Router`.
    ///
    /// ```rust
    /// use chainroute::{App, Config, Router, handler_fn};
    ///
    /// # fn main() -> chainroute::Result<()> {
    /// let app = App::new(Config::default());
    /// app.get("/", [handler_fn(|ctx| Box::pin(async move { ctx.text("hi") }))]);
    /// let router: axum::Router = app.into_router()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_router(self) -> Result<axum::Router> {
        let http = self.config.http.clone();
        let dispatcher = Arc::new(self.into_dispatcher()?);
        Ok(with_ambient_layers(fallback_router(dispatcher), &http))
    }

    /// Binds `addr`, or `[http] bind_addr:bind_port` when `None`, and serves
    /// until a shutdown signal arrives.
    pub async fn listen(self, addr: Option<&str>) -> Result<()> {
        self.config.validate()?;
        let bind_addr = addr
            .map(str::to_string)
            .unwrap_or_else(|| self.config.http.full_bind_addr());
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Bound to {}", &bind_addr);
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// Shutdown starts on Ctrl+C, SIGTERM or cancellation of
    /// [`App::cancellation_token`]. In-flight requests then get
    /// `shutdown_timeout` to finish before the server stops waiting.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.config.validate()?;
        let shutdown_timeout = self.config.http.shutdown_timeout;
        let token = self.cancellation_token.clone();
        let router = self.into_router()?;

        tracing::info!("Waiting for connections");
        let serve_future = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(token.clone()));

        // The timeout only starts once shutdown has begun.
        tokio::select! {
            result = serve_future => {
                result?;
                tracing::info!("Graceful shutdown completed");
            }
            _ = async {
                token.cancelled().await;
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                tracing::warn!("Graceful shutdown timeout expired, forcing shutdown");
            }
        }

        Ok(())
    }
}

fn fallback_router(dispatcher: Arc<Dispatcher>) -> axum::Router {
    axum::Router::new().fallback(move |request: Request<Body>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.dispatch(request).await }
    })
}

/// Layers are added inside out: the last one added sees the request first.
fn with_ambient_layers(mut router: axum::Router, http: &HttpConfig) -> axum::Router {
    if http.is_middleware_enabled(HttpMiddleware::Logging) {
        router = router.layer(TraceLayer::new_for_http().make_span_with(
            |request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ));
    }

    if http.is_middleware_enabled(HttpMiddleware::RequestId) {
        let x_request_id = HeaderName::from_static("x-request-id");
        router = router
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, RequestIdGenerator));
    }

    if http.is_middleware_enabled(HttpMiddleware::CatchPanic) {
        router = router.layer(CatchPanicLayer::custom(panic_response));
    }

    router
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unable to downcast the panic info".to_string()
    };
    tracing::error!("Service panicked: {}", detail);

    let body = ErrorResponse::new("INTERNAL_ERROR", "Internal Server Error");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Resolves on Ctrl+C, SIGTERM or cancellation of `token`, cancelling the
/// token in every case.
///
/// A signal handler that cannot be installed is logged and treated as never
/// firing.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::debug!("Ctrl+C signal received"),
            Err(err) => {
                tracing::warn!("Failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal_handler) => {
                signal_handler.recv().await;
                tracing::debug!("SIGTERM signal received");
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    token.cancel();
}
