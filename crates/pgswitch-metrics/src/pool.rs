//! The metrics-decorated pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pgswitch_core::{
    BoxRow, BoxRows, CommandTag, Context, DynPool, DynTx, Pool, Querier, Result, TxFn,
    TxOptions, Value,
};

use crate::collector::Collector;
use crate::row::MetricRow;
use crate::rows::MetricRows;

/// Ties a query-timeout timer to the lazy result's consumption.
///
/// The token is a child of the call's cancellation token (when one is
/// attached), so drivers observing the derived context see both the
/// caller's cancellation and the timeout.
pub(crate) struct CancelGuard {
    token: CancellationToken,
    timer: tokio::task::JoinHandle<()>,
}

impl CancelGuard {
    /// Stop the timer and cancel the derived token. Safe to call after
    /// the timer already fired.
    pub(crate) fn cancel(&self) {
        self.timer.abort();
        self.token.cancel();
    }
}

/// Derive a context whose cancellation token trips after `timeout`.
pub(crate) fn deadline(ctx: &Context, timeout: Duration) -> (Context, CancelGuard) {
    let token = match ctx.cancellation() {
        Some(parent) => parent.child_token(),
        None => CancellationToken::new(),
    };
    let timer = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        }
    });
    let derived = ctx.clone().with_cancellation(token.clone());
    (derived, CancelGuard { token, timer })
}

/// Wrap `pool` so every operation is reported to `collector`.
#[must_use]
pub fn decorate(pool: DynPool, collector: Arc<dyn Collector>) -> MetricsPool {
    MetricsPool::new(pool, collector)
}

/// A pool decorator that times queries and defers reporting for lazy
/// results until they are consumed.
///
/// Transaction lifecycle calls pass through untimed; the queries running
/// inside a transaction are the measured operations.
pub struct MetricsPool {
    inner: DynPool,
    collector: Arc<dyn Collector>,
}

impl MetricsPool {
    /// Wrap `pool`, reporting to `collector`.
    #[must_use]
    pub fn new(inner: DynPool, collector: Arc<dyn Collector>) -> Self {
        MetricsPool { inner, collector }
    }

    fn derive(&self, ctx: &Context) -> (Context, Option<CancelGuard>) {
        match ctx.query_timeout() {
            Some(timeout) => {
                let (derived, guard) = deadline(ctx, timeout);
                (derived, Some(guard))
            }
            None => (ctx.clone(), None),
        }
    }
}

#[async_trait]
impl Querier for MetricsPool {
    async fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows> {
        let begin = Instant::now();
        let rows = match self.inner.query(ctx, sql, args).await {
            Ok(rows) => rows,
            Err(err) => {
                self.collector.track_query_metrics(ctx, begin, Some(&err));
                return Err(err);
            }
        };
        let (ctx, cancel) = self.derive(ctx);
        Ok(Box::new(MetricRows::new(
            ctx,
            rows,
            cancel,
            begin,
            self.collector.clone(),
        )))
    }

    async fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> BoxRow {
        let begin = Instant::now();
        let row = self.inner.query_row(ctx, sql, args).await;
        let (ctx, cancel) = self.derive(ctx);
        Box::new(MetricRow::new(
            ctx,
            row,
            cancel,
            begin,
            self.collector.clone(),
        ))
    }

    async fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag> {
        let begin = Instant::now();
        let result = self.inner.exec(ctx, sql, args).await;
        self.collector
            .track_query_metrics(ctx, begin, result.as_ref().err());
        result
    }
}

#[async_trait]
impl Pool for MetricsPool {
    async fn begin(&self, ctx: &Context) -> Result<DynTx> {
        self.inner.begin(ctx).await
    }

    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<DynTx> {
        self.inner.begin_tx(ctx, opts).await
    }

    async fn transactional(&self, ctx: &Context, f: TxFn) -> Result<()> {
        self.inner.transactional(ctx, f).await
    }
}
