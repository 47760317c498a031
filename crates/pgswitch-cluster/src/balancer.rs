//! Follower load balancing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pgswitch_core::DynPool;

/// Picks the follower that serves a read. Returns `None` when the
/// follower list is empty.
pub type LoadBalancer = Arc<dyn Fn(&[DynPool]) -> Option<DynPool> + Send + Sync>;

/// The default round-robin balancer.
///
/// A shared atomic counter is post-incremented on every pick; the
/// selected index is the new count modulo the follower count, so the
/// first pick after construction lands on `followers[1 % len]`. The
/// counter wraps on the unsigned domain, keeping the index in range
/// across overflow.
///
/// Fairness is strict for a single caller and approximate across
/// concurrent callers.
#[must_use]
pub fn round_robin() -> LoadBalancer {
    let counter = Arc::new(AtomicU64::new(0));
    Arc::new(move |followers| {
        if followers.is_empty() {
            return None;
        }
        let turn = counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let ix = (turn % followers.len() as u64) as usize;
        Some(followers[ix].clone())
    })
}
