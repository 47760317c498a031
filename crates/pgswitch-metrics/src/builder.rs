//! Staged collector construction.

use std::sync::Arc;

use pgswitch_core::{Context, Error, Result};
use thiserror::Error as ThisError;

use crate::collector::{
    Counter, CounterFactory, ErrorLogger, Histogram, HistogramFactory, QueryCollector,
    ResultLabeler, default_labeler,
};

/// Configuration failures reported by [`CollectorBuilder::build`].
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum BuildError {
    /// No counter factory for queries per second was provided.
    #[error("a counter factory for queries per second is required")]
    QpsCollectorRequired,

    /// No histogram factory for query latency was provided.
    #[error("a histogram factory for query latency is required")]
    LatencyCollectorRequired,
}

/// Builder for [`QueryCollector`].
///
/// The counter and histogram factories are required; the result labeler
/// defaults to `"success"`/`"failure"` and the error logger to a no-op.
#[derive(Default)]
pub struct CollectorBuilder {
    qps: Option<CounterFactory>,
    latency: Option<HistogramFactory>,
    labeler: Option<ResultLabeler>,
    log: Option<ErrorLogger>,
}

impl CollectorBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        CollectorBuilder::default()
    }

    /// Set the counter factory used for the queries-per-second metric.
    #[must_use]
    pub fn query_per_second<F>(mut self, factory: F) -> Self
    where
        F: Fn(&[String]) -> Result<Box<dyn Counter>> + Send + Sync + 'static,
    {
        self.qps = Some(Arc::new(factory));
        self
    }

    /// Set the histogram factory used for the latency metric.
    #[must_use]
    pub fn latency<F>(mut self, factory: F) -> Self
    where
        F: Fn(&[String]) -> Result<Box<dyn Histogram>> + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(factory));
        self
    }

    /// Replace the default `"success"`/`"failure"` result labeler.
    #[must_use]
    pub fn results_labeler<F>(mut self, labeler: F) -> Self
    where
        F: Fn(&Context, Option<&Error>) -> String + Send + Sync + 'static,
    {
        self.labeler = Some(Arc::new(labeler));
        self
    }

    /// Receive collector-internal failures. Defaults to a no-op.
    #[must_use]
    pub fn errors_log<F>(mut self, logger: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(logger));
        self
    }

    /// Validate the configuration and build the collector.
    pub fn build(self) -> Result<QueryCollector, BuildError> {
        let qps = self.qps.ok_or(BuildError::QpsCollectorRequired)?;
        let latency = self.latency.ok_or(BuildError::LatencyCollectorRequired)?;
        Ok(QueryCollector {
            qps,
            latency,
            labeler: self.labeler.unwrap_or_else(default_labeler),
            log: self.log.unwrap_or_else(|| Arc::new(|_err| {})),
        })
    }
}
