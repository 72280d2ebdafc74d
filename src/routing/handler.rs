//! The handler abstraction shared by middleware and route endpoints.
//!
//! Middleware and endpoints are the same thing here: an async function of
//! `&mut Ctx` returning [`Result<()>`](crate::Result). A handler continues the
//! chain by awaiting [`Ctx::next`], stops it by writing a response and
//! returning, or fails it by returning an error.

use {
    super::ctx::Ctx,
    crate::Result,
    std::{future::Future, pin::Pin, sync::Arc},
};

/// Boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shared, type-erased handler as stored in route chains.
pub type HandlerRef = Arc<dyn Handler>;

/// A unit of request processing.
///
/// Implement this for stateful middleware; for closures use [`handler_fn`].
///
/// ```rust
/// use chainroute::{BoxFuture, Ctx, Handler, Result};
///
/// struct Tag(&'static str);
///
/// impl Handler for Tag {
///     fn call<'a>(&'a self, ctx: &'a mut Ctx) -> BoxFuture<'a, Result<()>> {
///         Box::pin(async move {
///             ctx.set_local("tag", self.0);
///             ctx.next().await
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Ctx) -> BoxFuture<'a, Result<()>>;
}

/// Adapter turning a closure into a [`Handler`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Ctx) -> BoxFuture<'a, Result<()>> {
        (self.0)(ctx)
    }
}

/// Wraps a closure as a shareable handler.
///
/// The closure receives the context and returns a boxed future, which lets the
/// future borrow the context:
///
/// ```rust
/// use chainroute::{handler_fn, HandlerRef};
///
/// let hello: HandlerRef = handler_fn(|ctx| Box::pin(async move {
///     ctx.text("hello")
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerRef
where
    F: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    Arc::new(HandlerFn(f))
}

/// Wraps a [`Handler`] implementation as a shareable handler.
pub fn handler<H: Handler>(h: H) -> HandlerRef {
    Arc::new(h)
}
