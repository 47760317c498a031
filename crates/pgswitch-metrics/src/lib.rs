//! # pgswitch-metrics
//!
//! Query metrics for any pgswitch pool: a [`QueryCollector`] counts
//! queries and observes latency under caller-supplied labels, and a
//! [`MetricsPool`] decorator times every operation on the pool it wraps.
//!
//! Reporting for lazy results is deferred: a decorated result set reports
//! once when it is closed (or dropped), a decorated single row reports
//! when it is scanned. Calls without metric labels in their context are
//! not reported at all; labels are the opt-in.
//!
//! The decorator also enforces the per-call query timeout from the
//! context by deriving a child cancellation token whose timer is released
//! when the result is consumed.
//!
//! A collector failure is never a query failure: factory errors are
//! diverted to the configured error logger and the call proceeds.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgswitch_metrics::{CollectorBuilder, decorate};
//!
//! let collector = CollectorBuilder::new()
//!     .query_per_second(prometheus_counter)
//!     .latency(prometheus_histogram)
//!     .build()?;
//! let pool = decorate(pool, Arc::new(collector));
//!
//! let ctx = Context::new().with_metrics_labels(["billing", "charge"]);
//! let rows = pool.query(&ctx, "SELECT ...", &[]).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod builder;
mod collector;
mod pool;
mod row;
mod rows;

#[cfg(test)]
mod testsupport;

pub use builder::{BuildError, CollectorBuilder};
pub use collector::{
    Collector, Counter, CounterFactory, ErrorLogger, Histogram, HistogramFactory, QueryCollector,
    RESULT_FAILURE, RESULT_SUCCESS, ResultLabeler,
};
pub use pool::{MetricsPool, decorate};
