//! Recording fakes for exercising topologies without a database.
//!
//! Every fake appends its calls to a shared [`Journal`], so a test can
//! hand the same journal to a whole composition and assert afterwards on
//! which leaf saw which operation. Results and failures are scripted
//! per-instance.
//!
//! Enabled for downstream crates with the `testing` feature.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::pool::{Backend, BoxRow, BoxRows, DynTx, Pool, Querier, Row, Rows, Tx, TxFn};
use crate::types::{CommandTag, TxOptions, Value};

/// A shared, ordered log of fake calls.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// A fresh, empty journal.
    #[must_use]
    pub fn new() -> Self {
        Journal::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    /// All entries recorded so far, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// How many entries start with `prefix`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// In-memory [`Rows`] over scripted values.
pub struct VecRows {
    rows: VecDeque<Vec<Value>>,
    err: Option<Error>,
    journal: Option<(Journal, String)>,
}

impl VecRows {
    /// Rows yielding `rows` in order.
    #[must_use]
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        VecRows {
            rows: rows.into(),
            err: None,
            journal: None,
        }
    }

    /// Script the terminal iteration error.
    #[must_use]
    pub fn with_err(mut self, err: Error) -> Self {
        self.err = Some(err);
        self
    }

    /// Record `close` calls under `name` in `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: Journal, name: impl Into<String>) -> Self {
        self.journal = Some((journal, name.into()));
        self
    }
}

#[async_trait]
impl Rows for VecRows {
    async fn next(&mut self) -> Option<Result<Vec<Value>>> {
        self.rows.pop_front().map(Ok)
    }

    fn err(&self) -> Option<Error> {
        self.err.clone()
    }

    fn close(&mut self) {
        if let Some((journal, name)) = &self.journal {
            journal.record(format!("{name}.close"));
        }
    }
}

/// In-memory [`Row`] with a scripted scan result.
pub struct ValueRow {
    result: Result<Vec<Value>>,
    journal: Option<(Journal, String)>,
}

impl ValueRow {
    /// A row scanning to `values`.
    #[must_use]
    pub fn ok(values: Vec<Value>) -> Self {
        ValueRow {
            result: Ok(values),
            journal: None,
        }
    }

    /// A row failing with `err`.
    #[must_use]
    pub fn fail(err: Error) -> Self {
        ValueRow {
            result: Err(err),
            journal: None,
        }
    }

    /// Record `scan` calls under `name` in `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: Journal, name: impl Into<String>) -> Self {
        self.journal = Some((journal, name.into()));
        self
    }
}

#[async_trait]
impl Row for ValueRow {
    async fn scan(self: Box<Self>) -> Result<Vec<Value>> {
        if let Some((journal, name)) = &self.journal {
            journal.record(format!("{name}.scan"));
        }
        self.result
    }
}

/// A recording transaction handle.
///
/// Commit and rollback close the handle; later lifecycle calls report
/// [`Error::TxClosed`], matching driver behavior.
pub struct FakeTx {
    journal: Journal,
    name: String,
    closed: AtomicBool,
    begin_error: Mutex<Option<Error>>,
    commit_error: Mutex<Option<Error>>,
    rollback_error: Mutex<Option<Error>>,
}

impl FakeTx {
    /// A fresh open handle recording under `name`.
    #[must_use]
    pub fn new(journal: Journal, name: impl Into<String>) -> Self {
        FakeTx {
            journal,
            name: name.into(),
            closed: AtomicBool::new(false),
            begin_error: Mutex::new(None),
            commit_error: Mutex::new(None),
            rollback_error: Mutex::new(None),
        }
    }

    /// Script the next nested `begin` to fail.
    pub fn fail_begin(&self, err: Error) {
        *self.begin_error.lock() = Some(err);
    }

    /// Script the next `commit` to fail.
    pub fn fail_commit(&self, err: Error) {
        *self.commit_error.lock() = Some(err);
    }

    /// Script the next `rollback` to fail.
    pub fn fail_rollback(&self, err: Error) {
        *self.rollback_error.lock() = Some(err);
    }

    /// Whether the handle was committed or rolled back.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Querier for FakeTx {
    async fn query(&self, _ctx: &Context, sql: &str, _args: &[Value]) -> Result<BoxRows> {
        self.journal.record(format!("{}.query {sql}", self.name));
        Ok(Box::new(VecRows::new(Vec::new())))
    }

    async fn query_row(&self, _ctx: &Context, sql: &str, _args: &[Value]) -> BoxRow {
        self.journal.record(format!("{}.query_row {sql}", self.name));
        Box::new(ValueRow::ok(Vec::new()))
    }

    async fn exec(&self, _ctx: &Context, sql: &str, _args: &[Value]) -> Result<CommandTag> {
        self.journal.record(format!("{}.exec {sql}", self.name));
        Ok(CommandTag::default())
    }
}

#[async_trait]
impl Tx for FakeTx {
    async fn begin(&self, _ctx: &Context) -> Result<DynTx> {
        self.journal.record(format!("{}.begin", self.name));
        if let Some(err) = self.begin_error.lock().take() {
            return Err(err);
        }
        Ok(Arc::new(FakeTx::new(
            self.journal.clone(),
            format!("{}.nested", self.name),
        )))
    }

    async fn commit(&self, _ctx: &Context) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            self.journal.record(format!("{}.commit-after-close", self.name));
            return Err(Error::TxClosed);
        }
        self.journal.record(format!("{}.commit", self.name));
        match self.commit_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(&self, _ctx: &Context) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            self.journal
                .record(format!("{}.rollback-after-close", self.name));
            return Err(Error::TxClosed);
        }
        self.journal.record(format!("{}.rollback", self.name));
        match self.rollback_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A recording primitive driver pool.
pub struct FakeBackend {
    journal: Journal,
    name: String,
    begin_error: Mutex<Option<Error>>,
    query_error: Mutex<Option<Error>>,
    exec_error: Mutex<Option<Error>>,
    query_rows: Mutex<VecDeque<Vec<Vec<Value>>>>,
    row_results: Mutex<VecDeque<Result<Vec<Value>>>>,
    exec_tags: Mutex<VecDeque<CommandTag>>,
    args_log: Mutex<Vec<Vec<Value>>>,
}

impl FakeBackend {
    /// A fresh backend recording under `name`.
    #[must_use]
    pub fn new(journal: Journal, name: impl Into<String>) -> Self {
        FakeBackend {
            journal,
            name: name.into(),
            begin_error: Mutex::new(None),
            query_error: Mutex::new(None),
            exec_error: Mutex::new(None),
            query_rows: Mutex::new(VecDeque::new()),
            row_results: Mutex::new(VecDeque::new()),
            exec_tags: Mutex::new(VecDeque::new()),
            args_log: Mutex::new(Vec::new()),
        }
    }

    /// Script the result set of the next `query`.
    pub fn push_rows(&self, rows: Vec<Vec<Value>>) {
        self.query_rows.lock().push_back(rows);
    }

    /// Script the scan result of the next `query_row`.
    pub fn push_row(&self, result: Result<Vec<Value>>) {
        self.row_results.lock().push_back(result);
    }

    /// Script the completion tag of the next `exec`.
    pub fn push_tag(&self, tag: CommandTag) {
        self.exec_tags.lock().push_back(tag);
    }

    /// Script the next `query` to fail.
    pub fn fail_next_query(&self, err: Error) {
        *self.query_error.lock() = Some(err);
    }

    /// Script the next `exec` to fail.
    pub fn fail_next_exec(&self, err: Error) {
        *self.exec_error.lock() = Some(err);
    }

    /// Script the next `begin`/`begin_with` to fail.
    pub fn fail_next_begin(&self, err: Error) {
        *self.begin_error.lock() = Some(err);
    }

    /// Arguments captured from every operation, in call order.
    #[must_use]
    pub fn recorded_args(&self) -> Vec<Vec<Value>> {
        self.args_log.lock().clone()
    }
}

#[async_trait]
impl Querier for FakeBackend {
    async fn query(&self, _ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows> {
        self.journal.record(format!("{}.query {sql}", self.name));
        self.args_log.lock().push(args.to_vec());
        if let Some(err) = self.query_error.lock().take() {
            return Err(err);
        }
        let rows = self.query_rows.lock().pop_front().unwrap_or_default();
        Ok(Box::new(
            VecRows::new(rows).with_journal(self.journal.clone(), format!("{}.rows", self.name)),
        ))
    }

    async fn query_row(&self, _ctx: &Context, sql: &str, args: &[Value]) -> BoxRow {
        self.journal.record(format!("{}.query_row {sql}", self.name));
        self.args_log.lock().push(args.to_vec());
        let result = self
            .row_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        let row = match result {
            Ok(values) => ValueRow::ok(values),
            Err(err) => ValueRow::fail(err),
        };
        Box::new(row.with_journal(self.journal.clone(), format!("{}.row", self.name)))
    }

    async fn exec(&self, _ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag> {
        self.journal.record(format!("{}.exec {sql}", self.name));
        self.args_log.lock().push(args.to_vec());
        if let Some(err) = self.exec_error.lock().take() {
            return Err(err);
        }
        Ok(self.exec_tags.lock().pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn begin(&self, _ctx: &Context) -> Result<DynTx> {
        self.journal.record(format!("{}.begin", self.name));
        if let Some(err) = self.begin_error.lock().take() {
            return Err(err);
        }
        Ok(Arc::new(FakeTx::new(
            self.journal.clone(),
            format!("{}.tx", self.name),
        )))
    }

    async fn begin_with(&self, _ctx: &Context, opts: TxOptions) -> Result<DynTx> {
        self.journal
            .record(format!("{}.begin_with {}", self.name, opts.begin_sql()));
        if let Some(err) = self.begin_error.lock().take() {
            return Err(err);
        }
        Ok(Arc::new(FakeTx::new(
            self.journal.clone(),
            format!("{}.tx", self.name),
        )))
    }
}

/// A recording leaf pool implementing the full [`Pool`] contract.
pub struct FakePool {
    journal: Journal,
    name: String,
    args_log: Mutex<Vec<Vec<Value>>>,
    row_results: Mutex<VecDeque<Result<Vec<Value>>>>,
}

impl FakePool {
    /// A fresh leaf pool recording under `name`.
    #[must_use]
    pub fn new(journal: Journal, name: impl Into<String>) -> Self {
        FakePool {
            journal,
            name: name.into(),
            args_log: Mutex::new(Vec::new()),
            row_results: Mutex::new(VecDeque::new()),
        }
    }

    /// Script the scan result of the next `query_row`.
    pub fn push_row(&self, result: Result<Vec<Value>>) {
        self.row_results.lock().push_back(result);
    }

    /// Arguments captured from every operation, in call order.
    #[must_use]
    pub fn recorded_args(&self) -> Vec<Vec<Value>> {
        self.args_log.lock().clone()
    }
}

#[async_trait]
impl Querier for FakePool {
    async fn query(&self, _ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows> {
        self.journal.record(format!("{}.query {sql}", self.name));
        self.args_log.lock().push(args.to_vec());
        Ok(Box::new(
            VecRows::new(Vec::new())
                .with_journal(self.journal.clone(), format!("{}.rows", self.name)),
        ))
    }

    async fn query_row(&self, _ctx: &Context, sql: &str, args: &[Value]) -> BoxRow {
        self.journal.record(format!("{}.query_row {sql}", self.name));
        self.args_log.lock().push(args.to_vec());
        let result = self
            .row_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        let row = match result {
            Ok(values) => ValueRow::ok(values),
            Err(err) => ValueRow::fail(err),
        };
        Box::new(row.with_journal(self.journal.clone(), format!("{}.row", self.name)))
    }

    async fn exec(&self, _ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag> {
        self.journal.record(format!("{}.exec {sql}", self.name));
        self.args_log.lock().push(args.to_vec());
        Ok(CommandTag::default())
    }
}

#[async_trait]
impl Pool for FakePool {
    async fn begin(&self, _ctx: &Context) -> Result<DynTx> {
        self.journal.record(format!("{}.begin", self.name));
        Ok(Arc::new(FakeTx::new(
            self.journal.clone(),
            format!("{}.tx", self.name),
        )))
    }

    async fn begin_tx(&self, _ctx: &Context, opts: TxOptions) -> Result<DynTx> {
        self.journal
            .record(format!("{}.begin_tx {}", self.name, opts.begin_sql()));
        Ok(Arc::new(FakeTx::new(
            self.journal.clone(),
            format!("{}.tx", self.name),
        )))
    }

    async fn transactional(&self, ctx: &Context, f: TxFn) -> Result<()> {
        self.journal.record(format!("{}.transactional", self.name));
        let tx: DynTx = Arc::new(FakeTx::new(
            self.journal.clone(),
            format!("{}.tx", self.name),
        ));
        let tx_ctx = ctx.clone().with_transaction(tx.clone());
        match f(tx_ctx).await {
            Ok(()) => tx.commit(ctx).await,
            Err(err) => {
                let _ = tx.rollback(ctx).await;
                Err(err)
            }
        }
    }
}
