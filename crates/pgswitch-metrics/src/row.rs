//! Decorated single-row result.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use pgswitch_core::{BoxRow, Context, Result, Row, Value};

use crate::collector::Collector;
use crate::pool::CancelGuard;

/// A single-row result that reports its query's metrics when scanned.
///
/// Scan consumes the row, so the report and the timeout-guard release
/// happen exactly once by construction. The scan error is returned
/// verbatim.
pub struct MetricRow {
    ctx: Context,
    row: BoxRow,
    cancel: Option<CancelGuard>,
    begin: Instant,
    collector: Arc<dyn Collector>,
}

impl MetricRow {
    pub(crate) fn new(
        ctx: Context,
        row: BoxRow,
        cancel: Option<CancelGuard>,
        begin: Instant,
        collector: Arc<dyn Collector>,
    ) -> Self {
        MetricRow {
            ctx,
            row,
            cancel,
            begin,
            collector,
        }
    }
}

#[async_trait]
impl Row for MetricRow {
    async fn scan(self: Box<Self>) -> Result<Vec<Value>> {
        let MetricRow {
            ctx,
            row,
            cancel,
            begin,
            collector,
        } = *self;

        let result = row.scan().await;
        collector.track_query_metrics(&ctx, begin, result.as_ref().err());
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        result
    }
}
