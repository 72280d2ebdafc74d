//! Per-request context and the continuation protocol.
//!
//! A [`Ctx`] is built by the dispatcher for every request and dropped when the
//! chain finishes. It carries the route's handler chain and a cursor into it.
//! [`Ctx::next`] advances the cursor before invoking the handler it points at,
//! so a handler calling `next` again inside its own invocation reaches the
//! following handler and never itself.
//!
//! Responses are staged: [`Ctx::status`] and [`Ctx::header`] only record values
//! and one of the write methods ([`Ctx::json`], [`Ctx::text`],
//! [`Ctx::send_status`]) produces the response. Only the first write counts.

use {
    super::handler::{BoxFuture, HandlerRef},
    crate::{Error, Result},
    axum::{
        body::Body,
        extract::Query,
        response::Response,
    },
    http::{
        Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri,
        header::CONTENT_TYPE,
        request::Parts,
    },
    serde::{Serialize, de::DeserializeOwned},
    std::{any::Any, collections::HashMap, sync::Arc},
};

/// Request-scoped state threaded through a handler chain.
pub struct Ctx {
    parts: Parts,
    body: Option<Body>,
    params: Vec<(String, String)>,
    body_limit: usize,
    chain: Arc<[HandlerRef]>,
    cursor: usize,
    status: Option<StatusCode>,
    headers: HeaderMap,
    response: Option<Response>,
    locals: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Ctx {
    pub(crate) fn new(
        request: Request<Body>,
        chain: Arc<[HandlerRef]>,
        params: Vec<(String, String)>,
        body_limit: usize,
    ) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
            params,
            body_limit,
            chain,
            cursor: 0,
            status: None,
            headers: HeaderMap::new(),
            response: None,
            locals: HashMap::new(),
        }
    }

    // ========================================================================
    // Continuation
    // ========================================================================

    /// Runs the next handler in the chain.
    ///
    /// Resolves to `Ok(())` once the chain is exhausted. Errors from the
    /// invoked handler, or from anything it continued into, are returned
    /// unchanged.
    pub fn next(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(handler) = self.chain.get(self.cursor).cloned() else {
                return Ok(());
            };
            self.cursor += 1;
            handler.call(self).await
        })
    }

    // ========================================================================
    // Request accessors
    // ========================================================================

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// The raw request path, before normalization.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Request extensions, as populated by the tower layers in front of the
    /// dispatcher.
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// The `x-request-id` header, set by the request id layer when enabled.
    pub fn request_id(&self) -> Option<&str> {
        self.parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
    }

    /// Value of the named path parameter, or `""` when the route has none.
    pub fn param(&self, name: &str) -> &str {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// First value of the query parameter `key`.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Query parameter `key`, or `default` when it is missing or empty.
    pub fn query_or(&self, key: &str, default: &str) -> String {
        self.query(key)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// Query parameter `key` as an integer, or `default` when it is missing,
    /// empty or not a number.
    pub fn query_int(&self, key: &str, default: i64) -> i64 {
        self.query(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Query parameter `key` as a boolean, or `default` when it is missing,
    /// empty or unrecognized. Accepts `1 t T true TRUE True` and
    /// `0 f F false FALSE False`.
    pub fn query_bool(&self, key: &str, default: bool) -> bool {
        match self.query(key).as_deref() {
            Some("1" | "t" | "T" | "true" | "TRUE" | "True") => true,
            Some("0" | "f" | "F" | "false" | "FALSE" | "False") => false,
            _ => default,
        }
    }

    /// Deserializes the whole query string into `T`.
    ///
    /// ```rust
    /// # use chainroute::{handler_fn, HandlerRef};
    /// #[derive(serde::Deserialize)]
    /// struct Page {
    ///     offset: u32,
    ///     limit: Option<u32>,
    /// }
    ///
    /// let list: HandlerRef = handler_fn(|ctx| Box::pin(async move {
    ///     let page: Page = ctx.query_parser()?;
    ///     ctx.json(&(page.offset, page.limit.unwrap_or(20)))
    /// }));
    /// ```
    pub fn query_parser<T: DeserializeOwned>(&self) -> Result<T> {
        Query::<T>::try_from_uri(&self.parts.uri)
            .map(|Query(value)| value)
            .map_err(|rejection| Error::invalid_input(rejection.body_text()))
    }

    /// Reads the request body, up to the configured payload limit, and decodes
    /// it as JSON. The body can be read only once.
    pub async fn body_parser<T: DeserializeOwned>(&mut self) -> Result<T> {
        let body = self
            .body
            .take()
            .ok_or_else(|| Error::invalid_input("Request body was already consumed"))?;
        let bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(|err| Error::invalid_input(format!("Failed to read request body: {err}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ========================================================================
    // Locals
    // ========================================================================

    /// Stores a request-scoped value, replacing any previous value for `key`.
    pub fn set_local<V>(&mut self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.locals.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key` if it has type `V`.
    pub fn local<V: Any>(&self, key: &str) -> Option<&V> {
        self.locals.get(key).and_then(|value| value.downcast_ref())
    }

    /// Removes and returns the value stored under `key` if it has type `V`.
    /// A value of another type is left in place.
    pub fn remove_local<V: Any>(&mut self, key: &str) -> Option<V> {
        if !self.locals.get(key).is_some_and(|value| value.is::<V>()) {
            return None;
        }
        let value = self.locals.remove(key)?;
        value.downcast::<V>().ok().map(|boxed| *boxed)
    }

    // ========================================================================
    // Response staging
    // ========================================================================

    /// Stages the status used by the next write.
    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        self.status = Some(code);
        self
    }

    pub fn staged_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Stages a response header.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Stages a response header from strings.
    pub fn try_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        Ok(self.header(name, value))
    }

    /// Whether a response has already been written.
    pub fn is_written(&self) -> bool {
        self.response.is_some()
    }

    /// Writes a response with `code` and an empty body. The staged status is
    /// ignored.
    pub fn send_status(&mut self, code: StatusCode) -> Result<()> {
        self.write(code, None, Body::empty());
        Ok(())
    }

    /// Writes `data` as JSON with the staged status, 200 by default.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<()> {
        let body = serde_json::to_vec(data)
            .map_err(|err| Error::internal(format!("Failed to encode response: {err}")))?;
        let code = self.status.unwrap_or(StatusCode::OK);
        self.write(
            code,
            Some(HeaderValue::from_static("application/json")),
            Body::from(body),
        );
        Ok(())
    }

    /// Writes a plain text body with the staged status, 200 by default.
    pub fn text(&mut self, body: impl Into<String>) -> Result<()> {
        let code = self.status.unwrap_or(StatusCode::OK);
        self.write(
            code,
            Some(HeaderValue::from_static("text/plain; charset=utf-8")),
            Body::from(body.into()),
        );
        Ok(())
    }

    fn write(&mut self, code: StatusCode, content_type: Option<HeaderValue>, body: Body) {
        if let Some(existing) = &self.response {
            tracing::error!(
                method = %self.parts.method,
                path = %self.parts.uri.path(),
                written = %existing.status(),
                ignored = %code,
                "Response already written, ignoring second write"
            );
            return;
        }

        let mut response = Response::new(body);
        *response.status_mut() = code;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        if let Some(content_type) = content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        self.response = Some(response);
    }

    /// Consumes the context, returning the written response or an empty one
    /// carrying the staged status (200 when none was staged).
    pub(crate) fn into_response(self) -> Response {
        match self.response {
            Some(response) => response,
            None => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
                *response.headers_mut() = self.headers;
                response
            }
        }
    }
}
