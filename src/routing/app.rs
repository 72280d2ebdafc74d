//! Route registration: the [`Router`] trait, the root [`App`] and prefix
//! scoped [`Group`] views.

use {
    super::{
        dispatcher::Dispatcher,
        handler::HandlerRef,
        path::normalize_path,
        registry::MiddlewareRegistry,
        route::Route,
    },
    crate::{Config, Result},
    http::Method,
    std::cell::RefCell,
    tokio_util::sync::CancellationToken,
};

/// Registration surface shared by [`App`] and [`Group`].
///
/// Middleware is collected when a route is registered, so `use_middleware`
/// only affects routes registered after it.
///
/// ```rust
/// use chainroute::{App, Config, Router, handler_fn};
///
/// let app = App::new(Config::default());
/// let api = app.group("/api");
/// api.use_middleware([handler_fn(|ctx| Box::pin(async move {
///     ctx.set_local("api", true);
///     ctx.next().await
/// }))]);
/// api.get("/users/{id}", [handler_fn(|ctx| Box::pin(async move {
///     let id = ctx.param("id").to_string();
///     ctx.text(id)
/// }))]);
///
/// assert_eq!(app.routes()[0].key().to_string(), "GET /api/users/{id}");
/// ```
pub trait Router {
    /// Registers `handlers` for `method` at `path`, relative to this scope.
    fn handle(&self, method: Method, path: &str, handlers: Vec<HandlerRef>);

    /// Opens a sub-scope whose prefix is this scope's prefix followed by
    /// `prefix`.
    fn group(&self, prefix: &str) -> Group<'_>;

    /// Appends middleware to this scope.
    fn use_middleware<I>(&self, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>;

    fn get<I>(&self, path: &str, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
        Self: Sized,
    {
        self.handle(Method::GET, path, handlers.into_iter().collect());
        self
    }

    fn post<I>(&self, path: &str, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
        Self: Sized,
    {
        self.handle(Method::POST, path, handlers.into_iter().collect());
        self
    }

    fn put<I>(&self, path: &str, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
        Self: Sized,
    {
        self.handle(Method::PUT, path, handlers.into_iter().collect());
        self
    }

    fn patch<I>(&self, path: &str, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
        Self: Sized,
    {
        self.handle(Method::PATCH, path, handlers.into_iter().collect());
        self
    }

    fn delete<I>(&self, path: &str, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
        Self: Sized,
    {
        self.handle(Method::DELETE, path, handlers.into_iter().collect());
        self
    }
}

/// The root routing scope.
///
/// Owns the middleware registry and the route table while routes are being
/// registered. Consuming the app through [`App::into_dispatcher`],
/// [`App::into_router`], [`App::listen`] or [`App::serve`] freezes the table.
pub struct App {
    pub(crate) config: Config,
    registry: RefCell<MiddlewareRegistry>,
    routes: RefCell<Vec<Route>>,
    pub(crate) cancellation_token: CancellationToken,
}

impl Default for App {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: RefCell::default(),
            routes: RefCell::default(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token cancelled when the server begins shutting down.
    ///
    /// ```rust,no_run
    /// # use chainroute::App;
    /// let app = App::default();
    /// let token = app.cancellation_token();
    /// tokio::spawn(async move {
    ///     token.cancelled().await;
    ///     tracing::info!("Background worker stopping");
    /// });
    /// ```
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.borrow().clone()
    }

    /// Number of middleware handlers registered so far, global and scoped.
    pub fn middleware_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Freezes the route table into a [`Dispatcher`].
    pub fn into_dispatcher(self) -> Result<Dispatcher> {
        let body_limit = self.config.http.body_limit();
        Dispatcher::new(self.routes.into_inner(), body_limit)
    }

    fn register(&self, method: Method, absolute: String, handlers: Vec<HandlerRef>) {
        let path = normalize_path(&absolute);
        let mut chain = self.registry.borrow().collect(&absolute);
        chain.extend(handlers);

        let route = Route::new(method, path, chain);
        tracing::debug!(
            route = %route.key(),
            handlers = route.chain_len(),
            "Registered route"
        );

        let mut routes = self.routes.borrow_mut();
        match routes
            .iter_mut()
            .find(|r| r.method() == route.method() && r.path() == route.path())
        {
            Some(existing) => {
                tracing::warn!(
                    route = %route.key(),
                    "Route registered twice, replacing the earlier registration"
                );
                *existing = route;
            }
            None => routes.push(route),
        }
    }
}

impl Router for App {
    fn handle(&self, method: Method, path: &str, handlers: Vec<HandlerRef>) {
        self.register(method, path.to_string(), handlers);
    }

    fn group(&self, prefix: &str) -> Group<'_> {
        Group {
            prefix: prefix.to_string(),
            app: self,
        }
    }

    fn use_middleware<I>(&self, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
    {
        self.registry.borrow_mut().use_global(handlers);
        self
    }
}

/// A prefix scoped view of an [`App`].
///
/// Groups hold no routes or middleware themselves; everything is recorded in
/// the app under the group's accumulated prefix.
#[derive(Clone)]
pub struct Group<'a> {
    prefix: String,
    app: &'a App,
}

impl<'a> Group<'a> {
    /// The accumulated prefix of this group.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Opens a sub-group on the same app. The sub-group borrows the app, not
    /// this view, so it may outlive it.
    pub fn group(&self, prefix: &str) -> Group<'a> {
        Group {
            prefix: format!("{}{}", self.prefix, prefix),
            app: self.app,
        }
    }
}

impl<'a> Router for Group<'a> {
    fn handle(&self, method: Method, path: &str, handlers: Vec<HandlerRef>) {
        self.app
            .register(method, format!("{}{}", self.prefix, path), handlers);
    }

    fn group(&self, prefix: &str) -> Group<'_> {
        Group::group(self, prefix)
    }

    fn use_middleware<I>(&self, handlers: I) -> &Self
    where
        I: IntoIterator<Item = HandlerRef>,
    {
        self.app
            .registry
            .borrow_mut()
            .use_scoped(&self.prefix, handlers);
        self
    }
}
