//! Single-pool instance.

use async_trait::async_trait;

use pgswitch_core::{
    Backend, BoxRow, BoxRows, CommandTag, Context, DynBackend, DynTx, Error, Pool, Querier,
    Result, TxFn, TxOptions, Value,
};

/// A pool backed by a single primitive driver pool.
///
/// Operations route to the active transaction when the context carries
/// one, otherwise to the backend. `begin`/`begin_tx` always open on the
/// backend; nesting happens only through [`Pool::transactional`].
pub struct Instance {
    backend: DynBackend,
}

impl Instance {
    /// Wrap a driver backend.
    #[must_use]
    pub fn new(backend: DynBackend) -> Self {
        tracing::debug!("single-pool instance created");
        Instance { backend }
    }

    fn selector<'a>(&'a self, ctx: &'a Context) -> &'a dyn Querier {
        match ctx.transaction() {
            Some(tx) => tx.as_ref(),
            None => self.backend.as_ref(),
        }
    }

    fn err_pass(&self, ctx: &Context, err: &Error) -> bool {
        match ctx.tx_pass_matcher() {
            Some(matcher) => matcher(ctx, err),
            None => false,
        }
    }

    async fn nested_tx(&self, ctx: &Context, tx: DynTx, f: TxFn) -> Result<()> {
        let nested = tx
            .begin(ctx)
            .await
            .map_err(|err| err.context("failed to begin nested transaction"))?;

        let nested_ctx = ctx.clone().with_transaction(nested.clone());
        let mut passed = None;
        if let Err(err) = f(nested_ctx).await {
            // The matcher sees the outer context, not the nested one.
            if !self.err_pass(ctx, &err) {
                if let Err(rollback_err) = nested.rollback(ctx).await {
                    if !matches!(rollback_err, Error::TxClosed) {
                        return Err(rollback_err);
                    }
                }
                return Err(err);
            }
            passed = Some(err);
        }

        nested
            .commit(ctx)
            .await
            .map_err(|err| err.context("failed to commit nested transaction"))?;

        match passed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn outer_tx(&self, ctx: &Context, f: TxFn) -> Result<()> {
        let opts = ctx.tx_options().unwrap_or_default();
        let tx = self
            .backend
            .begin_with(ctx, opts)
            .await
            .map_err(|err| err.context("transaction failed on single instance"))?;

        let tx_ctx = ctx.clone().with_transaction(tx.clone());
        let mut passed = None;
        if let Err(err) = f(tx_ctx).await {
            if self.err_pass(ctx, &err) {
                passed = Some(err);
            } else {
                if let Err(rollback_err) = tx.rollback(ctx).await {
                    if !matches!(rollback_err, Error::TxClosed) {
                        return Err(
                            rollback_err.context("transaction failed on single instance")
                        );
                    }
                }
                return Err(err.context("transaction failed on single instance"));
            }
        }

        tx.commit(ctx)
            .await
            .map_err(|err| err.context("transaction failed on single instance"))?;

        match passed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Querier for Instance {
    async fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows> {
        self.selector(ctx)
            .query(ctx, sql, args)
            .await
            .map_err(|err| err.context("query failed on single instance"))
    }

    async fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> BoxRow {
        self.selector(ctx).query_row(ctx, sql, args).await
    }

    async fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag> {
        self.selector(ctx)
            .exec(ctx, sql, args)
            .await
            .map_err(|err| err.context("exec failed on single instance"))
    }
}

#[async_trait]
impl Pool for Instance {
    async fn begin(&self, ctx: &Context) -> Result<DynTx> {
        Backend::begin(self.backend.as_ref(), ctx)
            .await
            .map_err(|err| err.context("failed to begin transaction"))
    }

    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<DynTx> {
        self.backend
            .begin_with(ctx, opts)
            .await
            .map_err(|err| err.context("failed to begin transaction"))
    }

    async fn transactional(&self, ctx: &Context, f: TxFn) -> Result<()> {
        if let Some(tx) = ctx.transaction() {
            let tx = tx.clone();
            return self.nested_tx(ctx, tx, f).await;
        }
        self.outer_tx(ctx, f).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use pgswitch_core::testing::{FakeBackend, FakeTx, Journal};
    use pgswitch_core::tx_fn;
    use thiserror::Error;

    use super::*;

    #[derive(Debug, Error)]
    #[error("expected failure")]
    struct Expected;

    fn instance(journal: &Journal) -> (Instance, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::new(journal.clone(), "db"));
        (Instance::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn exec_routes_to_backend_with_args() {
        let journal = Journal::new();
        let (ins, backend) = instance(&journal);
        backend.push_tag(CommandTag::new("INSERT 0 1"));

        let ctx = Context::new().with_can_write();
        let tag = ins
            .exec(&ctx, "INSERT INTO t VALUES($1)", &[Value::from("x")])
            .await
            .unwrap();

        assert_eq!(tag.rows_affected(), 1);
        assert_eq!(journal.count("db.exec INSERT INTO t VALUES($1)"), 1);
        assert_eq!(backend.recorded_args(), vec![vec![Value::from("x")]]);
    }

    #[tokio::test]
    async fn query_prefers_active_transaction() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);
        let tx: DynTx = Arc::new(FakeTx::new(journal.clone(), "tx"));

        let ctx = Context::new().with_transaction(tx);
        ins.query(&ctx, "SELECT 1", &[]).await.unwrap();

        assert_eq!(journal.count("tx.query"), 1);
        assert_eq!(journal.count("db.query"), 0);
    }

    #[tokio::test]
    async fn begin_ignores_active_transaction() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);
        let tx: DynTx = Arc::new(FakeTx::new(journal.clone(), "tx"));

        let ctx = Context::new().with_transaction(tx);
        ins.begin(&ctx).await.unwrap();

        assert_eq!(journal.count("db.begin"), 1);
        assert_eq!(journal.count("tx.begin"), 0);
    }

    #[tokio::test]
    async fn query_error_wraps_but_preserves_root() {
        let journal = Journal::new();
        let (ins, backend) = instance(&journal);
        backend.fail_next_query(Error::driver(Expected));

        let err = ins.query(&Context::new(), "SELECT 1", &[]).await.err().unwrap();
        assert!(err.downcast_ref::<Expected>().is_some());
        assert!(err.to_string().starts_with("query failed on single instance"));
    }

    #[tokio::test]
    async fn transactional_commits_on_success() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);

        let ran = Arc::new(AtomicBool::new(false));
        let observed = ran.clone();
        ins.transactional(
            &Context::new(),
            tx_fn(move |ctx| async move {
                assert!(ctx.transaction().is_some());
                observed.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await
        .unwrap();

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(journal.count("db.begin_with BEGIN"), 1);
        assert_eq!(journal.count("db.tx.commit"), 1);
        assert_eq!(journal.count("db.tx.rollback"), 0);
    }

    #[tokio::test]
    async fn transactional_uses_context_tx_options() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);

        let ctx = Context::new().with_tx_options(TxOptions {
            read_only: true,
            ..TxOptions::default()
        });
        ins.transactional(&ctx, tx_fn(|_| async { Ok(()) }))
            .await
            .unwrap();

        assert_eq!(journal.count("db.begin_with BEGIN READ ONLY"), 1);
    }

    #[tokio::test]
    async fn transactional_rolls_back_on_error() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);

        let err = ins
            .transactional(
                &Context::new(),
                tx_fn(|_| async { Err(Error::app(Expected)) }),
            )
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<Expected>().is_some());
        assert_eq!(journal.count("db.tx.rollback"), 1);
        assert_eq!(journal.count("db.tx.commit"), 0);
    }

    #[tokio::test]
    async fn transactional_matcher_commits_and_surfaces_error() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);

        let ctx = Context::new().with_tx_pass_matcher(Arc::new(|_, err| {
            err.downcast_ref::<Expected>().is_some()
        }));
        let err = ins
            .transactional(&ctx, tx_fn(|_| async { Err(Error::app(Expected)) }))
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<Expected>().is_some());
        assert_eq!(journal.count("db.tx.commit"), 1);
        assert_eq!(journal.count("db.tx.rollback"), 0);
    }

    #[tokio::test]
    async fn nested_transactional_begins_on_context_tx() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);
        let outer: DynTx = Arc::new(FakeTx::new(journal.clone(), "outer"));

        let ctx = Context::new().with_transaction(outer);
        ins.transactional(&ctx, tx_fn(|_| async { Ok(()) }))
            .await
            .unwrap();

        assert_eq!(journal.count("outer.begin"), 1);
        assert_eq!(journal.count("outer.nested.commit"), 1);
        assert_eq!(journal.count("db.begin"), 0);
    }

    #[tokio::test]
    async fn nested_transactional_matcher_commits_and_surfaces_error() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);
        let outer: DynTx = Arc::new(FakeTx::new(journal.clone(), "outer"));

        let ctx = Context::new()
            .with_transaction(outer)
            .with_tx_pass_matcher(Arc::new(|_, err| err.downcast_ref::<Expected>().is_some()));
        let err = ins
            .transactional(&ctx, tx_fn(|_| async { Err(Error::app(Expected)) }))
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<Expected>().is_some());
        assert_eq!(journal.count("outer.nested.commit"), 1);
        assert_eq!(journal.count("outer.nested.rollback"), 0);
    }

    #[tokio::test]
    async fn nested_transactional_rolls_back_unmatched_error() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);
        let outer: DynTx = Arc::new(FakeTx::new(journal.clone(), "outer"));

        let ctx = Context::new().with_transaction(outer);
        let err = ins
            .transactional(&ctx, tx_fn(|_| async { Err(Error::app(Expected)) }))
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<Expected>().is_some());
        assert_eq!(journal.count("outer.nested.rollback"), 1);
        assert_eq!(journal.count("outer.nested.commit"), 0);
    }

    #[tokio::test]
    async fn nested_commit_failure_wins_over_passed_error() {
        let journal = Journal::new();
        let (ins, _backend) = instance(&journal);
        let outer: DynTx = Arc::new(FakeTx::new(journal.clone(), "outer"));

        let ctx = Context::new()
            .with_transaction(outer)
            .with_tx_pass_matcher(Arc::new(|_, _| true));

        // The closure closes the nested handle behind the instance's
        // back, so the follow-up commit reports TxClosed.
        let err = ins
            .transactional(
                &ctx,
                tx_fn(|tx_ctx| async move {
                    let nested = tx_ctx.transaction().expect("nested handle").clone();
                    nested.rollback(&tx_ctx).await.unwrap();
                    Err(Error::app(Expected))
                }),
            )
            .await
            .unwrap_err();

        assert!(
            err.to_string().starts_with("failed to commit nested transaction"),
            "unexpected error: {err}"
        );
        assert!(matches!(err.root(), Error::TxClosed));
    }
}
