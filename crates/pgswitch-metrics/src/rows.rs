//! Decorated result set.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use pgswitch_core::{BoxRows, Context, Error, Result, Rows, Value};

use crate::collector::Collector;
use crate::pool::CancelGuard;

/// A result set that reports its query's metrics once, when closed.
///
/// `close` is idempotent: the first call reports with the iteration
/// error observed so far, closes the upstream rows, and releases the
/// timeout guard; later calls do nothing. Dropping unclosed rows funnels
/// through `close`, so the exactly-once guarantee holds either way.
pub struct MetricRows {
    ctx: Context,
    inner: BoxRows,
    cancel: Option<CancelGuard>,
    begin: Instant,
    collector: Arc<dyn Collector>,
    closed: bool,
}

impl MetricRows {
    pub(crate) fn new(
        ctx: Context,
        inner: BoxRows,
        cancel: Option<CancelGuard>,
        begin: Instant,
        collector: Arc<dyn Collector>,
    ) -> Self {
        MetricRows {
            ctx,
            inner,
            cancel,
            begin,
            collector,
            closed: false,
        }
    }
}

#[async_trait]
impl Rows for MetricRows {
    async fn next(&mut self) -> Option<Result<Vec<Value>>> {
        self.inner.next().await
    }

    fn err(&self) -> Option<Error> {
        self.inner.err()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let err = self.inner.err();
        self.collector
            .track_query_metrics(&self.ctx, self.begin, err.as_ref());
        self.inner.close();
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl Drop for MetricRows {
    fn drop(&mut self) {
        self.close();
    }
}
