//! Query metrics collection.

use std::sync::Arc;
use std::time::Instant;

use pgswitch_core::{Context, Error, Result};

/// Result label appended when a query failed.
pub const RESULT_FAILURE: &str = "failure";

/// Result label appended when a query succeeded.
pub const RESULT_SUCCESS: &str = "success";

/// A monotonically increasing counter instance.
pub trait Counter: Send + Sync {
    /// Add one.
    fn inc(&self);
}

/// A latency histogram instance.
pub trait Histogram: Send + Sync {
    /// Record one observation, in milliseconds.
    fn observe(&self, value: f64);
}

/// Resolves a counter instance for a label tuple.
///
/// The shape matches metric registries that hand out per-label-set
/// instances and may fail on unknown label arity.
pub type CounterFactory = Arc<dyn Fn(&[String]) -> Result<Box<dyn Counter>> + Send + Sync>;

/// Resolves a histogram instance for a label tuple.
pub type HistogramFactory = Arc<dyn Fn(&[String]) -> Result<Box<dyn Histogram>> + Send + Sync>;

/// Derives the result label from the call outcome.
pub type ResultLabeler = Arc<dyn Fn(&Context, Option<&Error>) -> String + Send + Sync>;

/// Receives collector-internal failures; they are never surfaced to the
/// querying caller.
pub type ErrorLogger = Arc<dyn Fn(&Error) + Send + Sync>;

/// Sink for per-query measurements.
pub trait Collector: Send + Sync {
    /// Record one completed query: its start time and outcome.
    fn track_query_metrics(&self, ctx: &Context, begin: Instant, err: Option<&Error>);
}

/// The standard collector: one counter increment and one latency
/// observation per reported query, labelled with the context's metric
/// labels plus a result label.
pub struct QueryCollector {
    pub(crate) qps: CounterFactory,
    pub(crate) latency: HistogramFactory,
    pub(crate) labeler: ResultLabeler,
    pub(crate) log: ErrorLogger,
}

impl Collector for QueryCollector {
    fn track_query_metrics(&self, ctx: &Context, begin: Instant, err: Option<&Error>) {
        // No labels means the caller opted out of metrics for this call.
        let Some(labels) = ctx.metrics_labels() else {
            return;
        };

        let result = (self.labeler)(ctx, err);
        let elapsed_ms = begin.elapsed().as_millis() as f64;

        let mut labels = labels.to_vec();
        labels.push(result);

        match (self.qps)(&labels) {
            Ok(counter) => counter.inc(),
            Err(err) => {
                let err = err.context("failed to resolve query-per-second counter");
                tracing::warn!(error = %err, labels = ?labels, "query counter unavailable");
                (self.log)(&err);
            }
        }

        match (self.latency)(&labels) {
            Ok(histogram) => histogram.observe(elapsed_ms),
            Err(err) => {
                let err = err.context("failed to resolve query latency histogram");
                tracing::warn!(error = %err, labels = ?labels, "latency histogram unavailable");
                (self.log)(&err);
            }
        }
    }
}

pub(crate) fn default_labeler() -> ResultLabeler {
    Arc::new(|_ctx, err| {
        if err.is_some() {
            RESULT_FAILURE.to_string()
        } else {
            RESULT_SUCCESS.to_string()
        }
    })
}
