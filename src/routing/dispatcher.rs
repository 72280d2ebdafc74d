//! Request dispatch over a frozen route table.

use {
    super::{ctx::Ctx, path::normalize_path, route::Route},
    crate::{Error, ErrorResponse, Result},
    axum::{
        Json,
        body::Body,
        response::{IntoResponse, Response},
    },
    http::{HeaderValue, Request, StatusCode, header::ALLOW},
    percent_encoding::percent_decode_str,
    std::borrow::Cow,
};

/// Immutable route table plus the logic that runs a request through it.
///
/// Built by [`App::into_dispatcher`](super::App::into_dispatcher); shared
/// read-only between requests.
pub struct Dispatcher {
    matcher: matchit::Router<Vec<Route>>,
    routes: Vec<Route>,
    body_limit: usize,
}

impl Dispatcher {
    pub(crate) fn new(routes: Vec<Route>, body_limit: usize) -> Result<Self> {
        // Routes sharing a path are stored together, in registration order.
        let mut by_path: Vec<(String, Vec<Route>)> = Vec::new();
        for route in &routes {
            if !route.path().starts_with('/') {
                return Err(Error::config(format!(
                    "Route path must start with '/': {}",
                    route.key()
                )));
            }
            match by_path.iter_mut().find(|(path, _)| path == route.path()) {
                Some((_, same_path)) => same_path.push(route.clone()),
                None => by_path.push((route.path().to_string(), vec![route.clone()])),
            }
        }

        let mut matcher = matchit::Router::new();
        for (path, same_path) in by_path {
            matcher.insert(path, same_path)?;
        }

        tracing::debug!(routes = routes.len(), "Route table frozen");
        Ok(Self {
            matcher,
            routes,
            body_limit,
        })
    }

    /// All routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Runs `request` through the chain of the route it resolves to.
    ///
    /// Unknown paths produce a 404 and a known path with no route for the
    /// request method produces a 405 carrying an `Allow` header. A failing
    /// chain produces a 500 whose body names the failure, unless a response
    /// was already written.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let path = normalize_path(request.uri().path());

        let Ok(matched) = self.matcher.at(&path) else {
            tracing::debug!(method = %request.method(), path = %path, "No route matched");
            return error_response(&Error::not_found(&path));
        };
        let same_path = matched.value;
        let Some(route) = same_path
            .iter()
            .find(|r| r.method() == request.method())
            .or_else(|| same_path.first())
        else {
            return error_response(&Error::not_found(&path));
        };

        if route.method() != request.method() {
            tracing::debug!(method = %request.method(), path = %path, "Method not allowed");
            let mut response =
                error_response(&Error::method_not_allowed(request.method(), &path));
            let allow = same_path
                .iter()
                .map(|r| r.method().as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(allow) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, allow);
            }
            return response;
        }

        let params = matched
            .params
            .iter()
            .map(|(key, value)| (key.to_string(), decode_param(value)))
            .collect();
        let mut ctx = Ctx::new(request, route.chain(), params, self.body_limit);

        if let Err(err) = ctx.next().await {
            tracing::error!(route = %route.key(), error = %err, "Handler chain failed");
            if ctx.is_written() {
                tracing::error!(
                    route = %route.key(),
                    "Response already written, cannot send error response"
                );
            } else {
                // Built fresh so headers staged by the failed chain are dropped.
                let body = ErrorResponse::new(err.error_code(), err.to_string());
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        }

        ctx.into_response()
    }
}

/// Percent-decodes a path parameter. A value that does not decode to UTF-8 is
/// passed on raw.
fn decode_param(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => Cow::into_owned(decoded),
        Err(err) => {
            tracing::debug!(param = %raw, error = %err, "Path parameter is not UTF-8, keeping it encoded");
            raw.to_string()
        }
    }
}

fn error_response(err: &Error) -> Response {
    (err.status_code(), Json(err.to_error_response())).into_response()
}
