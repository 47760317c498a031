//! The pool trait family.
//!
//! [`Querier`] carries the read/write operations shared by pools and
//! transaction handles. [`Backend`] is the contract expected from the
//! primitive driver pool an application plugs in. [`Pool`] is the full
//! façade contract every topology implements, which is what applications
//! program against.
//!
//! All traits are object-safe; compositions hold `Arc<dyn Pool>` leaves,
//! so a hive of clusters of metrics-decorated single pools is just nested
//! construction.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::types::{CommandTag, TxOptions, Value};

/// A shared pool of any topology.
pub type DynPool = Arc<dyn Pool>;

/// A shared transaction handle.
pub type DynTx = Arc<dyn Tx>;

/// A shared primitive driver pool.
pub type DynBackend = Arc<dyn Backend>;

/// A streaming result set.
pub type BoxRows = Box<dyn Rows>;

/// A single lazily-consumed row.
pub type BoxRow = Box<dyn Row>;

/// The future returned by a transactional closure.
pub type TxFuture = BoxFuture<'static, Result<()>>;

/// A boxed closure run inside a transaction; it receives a context with
/// the open transaction attached.
pub type TxFn = Box<dyn FnOnce(Context) -> TxFuture + Send>;

/// Box an async closure into a [`TxFn`].
///
/// ```rust,ignore
/// pool.transactional(&ctx, tx_fn(|ctx| async move {
///     pool.exec(&ctx, "UPDATE accounts SET debit = debit + 1", &[]).await?;
///     Ok(())
/// }))
/// .await?;
/// ```
pub fn tx_fn<F, Fut>(f: F) -> TxFn
where
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move |ctx| Box::pin(f(ctx)))
}

/// Read/write operations shared by pools and open transactions.
#[async_trait]
pub trait Querier: Send + Sync {
    /// Run a query and return its result set.
    async fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows>;

    /// Run a query expected to produce a single row.
    ///
    /// There is no separate error channel: failures surface through the
    /// returned row's [`Row::scan`].
    async fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> BoxRow;

    /// Run a command and return its completion tag.
    async fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag>;
}

/// An open transaction handle.
///
/// Handles are single-threaded by contract: once obtained, a handle must
/// not be used concurrently. Using a handle after commit or rollback
/// reports [`Error::TxClosed`].
#[async_trait]
pub trait Tx: Querier {
    /// Open a nested transaction on this handle.
    async fn begin(&self, ctx: &Context) -> Result<DynTx>;

    /// Commit the transaction.
    async fn commit(&self, ctx: &Context) -> Result<()>;

    /// Roll the transaction back.
    async fn rollback(&self, ctx: &Context) -> Result<()>;
}

/// The primitive pool contract expected from a driver adapter.
#[async_trait]
pub trait Backend: Querier {
    /// Open a transaction with session-default options.
    async fn begin(&self, ctx: &Context) -> Result<DynTx>;

    /// Open a transaction with explicit options.
    async fn begin_with(&self, ctx: &Context, opts: TxOptions) -> Result<DynTx>;
}

/// The full façade contract implemented by every topology.
#[async_trait]
pub trait Pool: Querier {
    /// Open a transaction with session-default options.
    async fn begin(&self, ctx: &Context) -> Result<DynTx>;

    /// Open a transaction with explicit options.
    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<DynTx>;

    /// Run `f` inside a transaction.
    ///
    /// When the context already carries a transaction, a nested
    /// transaction is opened on it. `f` receives a derived context with
    /// the new handle attached. On error the transaction rolls back,
    /// unless the context's error-pass matcher accepts the error, in
    /// which case the work commits and the error is still returned.
    async fn transactional(&self, ctx: &Context, f: TxFn) -> Result<()>;
}

/// A streaming result set returned by [`Querier::query`].
#[async_trait]
pub trait Rows: Send {
    /// Advance to the next row and return its values.
    async fn next(&mut self) -> Option<Result<Vec<Value>>>;

    /// The terminal error observed during iteration, if any.
    fn err(&self) -> Option<Error>;

    /// Release the result set. Idempotent.
    fn close(&mut self);
}

/// A single-row result returned by [`Querier::query_row`].
#[async_trait]
pub trait Row: Send {
    /// Consume the row and return its values.
    async fn scan(self: Box<Self>) -> Result<Vec<Value>>;
}

/// A row that reports a routing failure on scan.
///
/// Used where the single-row contract leaves no error channel, e.g. when
/// shard resolution fails before any pool is reached.
pub struct FailedRow {
    err: Error,
}

impl FailedRow {
    /// Build a row that fails with `err`.
    #[must_use]
    pub fn new(err: Error) -> Self {
        FailedRow { err }
    }
}

#[async_trait]
impl Row for FailedRow {
    async fn scan(self: Box<Self>) -> Result<Vec<Value>> {
        Err(self.err)
    }
}
