//! Per-call routing context.
//!
//! A [`Context`] is a cheaply clonable, value-immutable bag of routing
//! hints that accompanies every pool operation: write intent, an active
//! transaction, shard selection, a query timeout, transaction options,
//! metric labels, and the transactional error-pass matcher.
//!
//! Setters are consuming builders; applying the same setter twice keeps
//! the later value. Absence is always distinguishable from a zero value:
//! readers return `Option` (write intent, a plain flag, reads as `false`
//! when unset).
//!
//! ```rust,ignore
//! let ctx = Context::new()
//!     .with_can_write()
//!     .with_metrics_labels(["billing", "charge"])
//!     .with_query_timeout(Duration::from_secs(2));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::pool::DynTx;
use crate::types::TxOptions;

/// Predicate deciding whether an error returned by a transactional
/// closure is expected, in which case the enclosing transaction commits
/// the work done so far and the error is still surfaced to the caller.
pub type TxPassMatcher = Arc<dyn Fn(&Context, &Error) -> bool + Send + Sync>;

/// Routing hints attached to a single pool call.
#[derive(Clone, Default)]
pub struct Context {
    can_write: bool,
    transaction: Option<DynTx>,
    tx_options: Option<TxOptions>,
    tx_pass_matcher: Option<TxPassMatcher>,
    metrics_labels: Option<Vec<String>>,
    shard_id: Option<u64>,
    sharding_key: Option<String>,
    query_timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
}

impl Context {
    /// An empty context: no hints set.
    #[must_use]
    pub fn new() -> Self {
        Context::default()
    }

    /// Mark the call as requiring a writable endpoint.
    #[must_use]
    pub fn with_can_write(mut self) -> Self {
        self.can_write = true;
        self
    }

    /// Whether the call requires a writable endpoint.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.can_write
    }

    /// Attach an already-open transaction; subsequent operations route to
    /// it instead of a pool.
    #[must_use]
    pub fn with_transaction(mut self, tx: DynTx) -> Self {
        self.transaction = Some(tx);
        self
    }

    /// The active transaction, if one is attached.
    #[must_use]
    pub fn transaction(&self) -> Option<&DynTx> {
        self.transaction.as_ref()
    }

    /// Set the options used when `transactional` opens an outer
    /// transaction.
    #[must_use]
    pub fn with_tx_options(mut self, opts: TxOptions) -> Self {
        self.tx_options = Some(opts);
        self
    }

    /// The requested transaction options, if any.
    #[must_use]
    pub fn tx_options(&self) -> Option<TxOptions> {
        self.tx_options
    }

    /// Install the transactional error-pass matcher.
    #[must_use]
    pub fn with_tx_pass_matcher(mut self, matcher: TxPassMatcher) -> Self {
        self.tx_pass_matcher = Some(matcher);
        self
    }

    /// The installed error-pass matcher, if any.
    #[must_use]
    pub fn tx_pass_matcher(&self) -> Option<&TxPassMatcher> {
        self.tx_pass_matcher.as_ref()
    }

    /// Enable metrics emission for this call and provide the label tuple.
    ///
    /// Setting labels replaces any previously set sequence.
    #[must_use]
    pub fn with_metrics_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// The metric labels for this call; `None` means metrics are opted
    /// out.
    #[must_use]
    pub fn metrics_labels(&self) -> Option<&[String]> {
        self.metrics_labels.as_deref()
    }

    /// Route the call to an explicit shard.
    #[must_use]
    pub fn with_shard_id(mut self, id: u64) -> Self {
        self.shard_id = Some(id);
        self
    }

    /// The explicit shard id, if set.
    #[must_use]
    pub fn shard_id(&self) -> Option<u64> {
        self.shard_id
    }

    /// Provide a sharding key for the hive's picker.
    #[must_use]
    pub fn with_sharding_key(mut self, key: impl Into<String>) -> Self {
        self.sharding_key = Some(key.into());
        self
    }

    /// The sharding key, if set.
    #[must_use]
    pub fn sharding_key(&self) -> Option<&str> {
        self.sharding_key.as_deref()
    }

    /// Request a per-call query timeout, enforced by the metrics
    /// decorator.
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// The per-call query timeout, if set.
    #[must_use]
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Attach a cancellation token for drivers to observe.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The cancellation token attached to this call, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("can_write", &self.can_write)
            .field("transaction", &self.transaction.is_some())
            .field("tx_options", &self.tx_options)
            .field("tx_pass_matcher", &self.tx_pass_matcher.is_some())
            .field("metrics_labels", &self.metrics_labels)
            .field("shard_id", &self.shard_id)
            .field("sharding_key", &self.sharding_key)
            .field("query_timeout", &self.query_timeout)
            .field("cancellation", &self.cancellation.is_some())
            .finish()
    }
}
