//! Per-context free lists of idle method bodies
//!
//! Recursive calls check out distinct instances: a body that is running is
//! owned by the invocation driving it, never by the pool, so a method that
//! calls itself simply finds the pool empty and gets a fresh tree.

use super::body::Body;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    pub releases: u64,
}

#[derive(Default)]
pub struct MethodBodyPool {
    idle: HashMap<Arc<str>, Vec<Body>>,
    stats: PoolStats,
}

impl MethodBodyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop an idle instance for `method`, if any
    pub fn checkout(&mut self, method: &str) -> Option<Body> {
        match self.idle.get_mut(method).and_then(Vec::pop) {
            Some(body) => {
                self.stats.hits += 1;
                debug!(method, "pool hit");
                Some(body)
            }
            None => {
                self.stats.misses += 1;
                debug!(method, "pool miss");
                None
            }
        }
    }

    /// Push an already reset instance back under its pool key. Bodies
    /// without a key are dropped.
    pub fn release(&mut self, body: Body) {
        let Some(key) = body.pool_key().cloned() else {
            return;
        };
        self.stats.releases += 1;
        debug!(method = %key, "pool release");
        self.idle.entry(key).or_default().push(body);
    }

    /// Number of idle instances held for `method`
    pub fn idle(&self, method: &str) -> usize {
        self.idle.get(method).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::node::Node;

    #[test]
    fn test_checkout_and_release() {
        let mut pool = MethodBodyPool::new();
        assert!(pool.checkout("f").is_none());

        let mut body = Body::new("f", Node::null());
        body.set_pool_key("f".into());
        pool.release(body);
        assert_eq!(pool.idle("f"), 1);

        let body = pool.checkout("f").unwrap();
        assert_eq!(body.name(), "f");
        assert_eq!(pool.idle("f"), 0);
        assert_eq!(
            pool.stats(),
            PoolStats {
                hits: 1,
                misses: 1,
                releases: 1
            }
        );
    }

    #[test]
    fn test_unkeyed_bodies_are_dropped() {
        let mut pool = MethodBodyPool::new();
        pool.release(Body::new("g", Node::null()));
        assert_eq!(pool.idle("g"), 0);
        assert_eq!(pool.stats().releases, 0);
    }
}
