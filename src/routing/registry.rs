//! Middleware registry keyed by scope prefix.

use super::{handler::HandlerRef, path::prefix_matches};

/// Ordered store of middleware sequences.
///
/// Global middleware lives in its own sequence and is always collected first.
/// Scoped sequences are kept in the order their prefix was first used, which
/// makes collection deterministic when several prefixes match one path.
#[derive(Default)]
pub(crate) struct MiddlewareRegistry {
    global: Vec<HandlerRef>,
    scoped: Vec<(String, Vec<HandlerRef>)>,
}

impl MiddlewareRegistry {
    pub(crate) fn use_global(&mut self, handlers: impl IntoIterator<Item = HandlerRef>) {
        self.global.extend(handlers);
    }

    pub(crate) fn use_scoped(
        &mut self,
        prefix: &str,
        handlers: impl IntoIterator<Item = HandlerRef>,
    ) {
        match self.scoped.iter_mut().find(|(key, _)| key == prefix) {
            Some((_, existing)) => existing.extend(handlers),
            None => self
                .scoped
                .push((prefix.to_string(), handlers.into_iter().collect())),
        }
    }

    /// Global handlers followed by every scoped sequence whose prefix matches
    /// `path`, each key visited once.
    pub(crate) fn collect(&self, path: &str) -> Vec<HandlerRef> {
        let mut chain = self.global.clone();
        for (prefix, handlers) in &self.scoped {
            if prefix_matches(prefix, path) {
                chain.extend(handlers.iter().cloned());
            }
        }
        chain
    }

    pub(crate) fn len(&self) -> usize {
        self.global.len() + self.scoped.iter().map(|(_, h)| h.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::handler_fn;
    use std::sync::Arc;

    fn noop() -> HandlerRef {
        handler_fn(|ctx| Box::pin(async move { ctx.next().await }))
    }

    fn same(a: &[HandlerRef], b: &[HandlerRef]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
    }

    #[test]
    fn test_root_only_path_gets_global_handlers_in_order() {
        let (g1, g2, admin) = (noop(), noop(), noop());
        let mut registry = MiddlewareRegistry::default();
        registry.use_global([g1.clone()]);
        registry.use_scoped("/admin", [admin]);
        registry.use_global([g2.clone()]);

        assert!(same(&registry.collect("/users"), &[g1, g2]));
    }

    #[test]
    fn test_global_first_then_scoped() {
        let (g, api) = (noop(), noop());
        let mut registry = MiddlewareRegistry::default();
        registry.use_scoped("/api", [api.clone()]);
        registry.use_global([g.clone()]);

        assert!(same(&registry.collect("/api/users"), &[g, api]));
    }

    #[test]
    fn test_overlapping_prefixes_follow_first_use_order() {
        let (v1, api_a, api_b) = (noop(), noop(), noop());
        let mut registry = MiddlewareRegistry::default();
        registry.use_scoped("/api/v1", [v1.clone()]);
        registry.use_scoped("/api", [api_a.clone()]);
        registry.use_scoped("/api", [api_b.clone()]);

        assert!(same(
            &registry.collect("/api/v1/items"),
            &[v1, api_a, api_b]
        ));
    }

    #[test]
    fn test_repeated_use_on_same_key_is_collected_once() {
        let (a, b) = (noop(), noop());
        let mut registry = MiddlewareRegistry::default();
        registry.use_scoped("/admin", [a.clone()]);
        registry.use_scoped("/admin", [b.clone()]);

        let chain = registry.collect("/admin");
        assert!(same(&chain, &[a, b]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_prefix_must_end_on_segment() {
        let ab = noop();
        let mut registry = MiddlewareRegistry::default();
        registry.use_scoped("/ab", [ab]);

        assert!(registry.collect("/abc").is_empty());
        assert_eq!(registry.collect("/ab/c").len(), 1);
    }
}
