//! Leader/follower pool.

use std::sync::Arc;

use async_trait::async_trait;

use pgswitch_core::{
    BoxRow, BoxRows, CommandTag, Context, DynPool, DynTx, Error, FailedRow, Pool, Querier,
    Result, TxFn, TxOptions, Value,
};

use crate::balancer::{LoadBalancer, round_robin};

/// A leader/follower pool.
///
/// Writes (and anything carrying write intent) go to the leader; reads
/// are spread across followers by the balancer. Transactions always open
/// on the leader and pin subsequent calls to themselves through the
/// context.
pub struct Cluster {
    leader: DynPool,
    followers: Vec<DynPool>,
    balancer: LoadBalancer,
}

impl Cluster {
    /// Build a cluster with the default round-robin balancer.
    ///
    /// `followers` must not be empty; [`crate::ClusterBuilder`] enforces
    /// this at construction time.
    #[must_use]
    pub fn new(leader: DynPool, followers: Vec<DynPool>) -> Self {
        tracing::info!(followers = followers.len(), "cluster pool created");
        Cluster {
            leader,
            followers,
            balancer: round_robin(),
        }
    }

    /// Replace the load balancer.
    #[must_use]
    pub fn with_balancer(mut self, balancer: LoadBalancer) -> Self {
        self.balancer = balancer;
        self
    }

    fn read_target(&self) -> Result<DynPool> {
        (self.balancer)(&self.followers).ok_or(Error::NoFollower)
    }

    fn selector(&self, ctx: &Context) -> Result<Arc<dyn Querier>> {
        if let Some(tx) = ctx.transaction() {
            let target: Arc<dyn Querier> = tx.clone();
            return Ok(target);
        }
        if ctx.can_write() {
            let target: Arc<dyn Querier> = self.leader.clone();
            return Ok(target);
        }
        let follower: Arc<dyn Querier> = self.read_target()?;
        Ok(follower)
    }
}

#[async_trait]
impl Querier for Cluster {
    async fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows> {
        self.selector(ctx)?.query(ctx, sql, args).await
    }

    async fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> BoxRow {
        match self.selector(ctx) {
            Ok(target) => target.query_row(ctx, sql, args).await,
            Err(err) => Box::new(FailedRow::new(err)),
        }
    }

    async fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag> {
        self.selector(ctx)?.exec(ctx, sql, args).await
    }
}

#[async_trait]
impl Pool for Cluster {
    async fn begin(&self, ctx: &Context) -> Result<DynTx> {
        if let Some(tx) = ctx.transaction() {
            return tx.begin(ctx).await;
        }
        self.leader.begin(ctx).await
    }

    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<DynTx> {
        if let Some(tx) = ctx.transaction() {
            return tx.begin(ctx).await;
        }
        self.leader.begin_tx(ctx, opts).await
    }

    async fn transactional(&self, ctx: &Context, f: TxFn) -> Result<()> {
        if ctx.transaction().is_some() || ctx.can_write() {
            return self.leader.transactional(ctx, f).await;
        }
        self.read_target()?.transactional(ctx, f).await
    }
}

#[cfg(test)]
mod tests {
    use pgswitch_core::testing::{FakePool, FakeTx, Journal};
    use pgswitch_core::tx_fn;

    use super::*;

    fn cluster(journal: &Journal, followers: usize) -> Cluster {
        let leader = Arc::new(FakePool::new(journal.clone(), "leader")) as DynPool;
        let followers = (0..followers)
            .map(|i| Arc::new(FakePool::new(journal.clone(), format!("f{i}"))) as DynPool)
            .collect();
        Cluster::new(leader, followers)
    }

    #[tokio::test]
    async fn reads_rotate_over_followers() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 2);

        cluster.query(&Context::new(), "SELECT 1", &[]).await.unwrap();
        cluster.query(&Context::new(), "SELECT 1", &[]).await.unwrap();

        // Counter starts at zero and is post-incremented: f1 first.
        let entries = journal.entries();
        assert_eq!(entries[0], "f1.query SELECT 1");
        assert_eq!(entries[1], "f0.query SELECT 1");
        assert_eq!(journal.count("leader."), 0);
    }

    #[tokio::test]
    async fn write_intent_selects_leader() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 2);

        let ctx = Context::new().with_can_write();
        cluster.query(&ctx, "SELECT 1", &[]).await.unwrap();

        assert_eq!(journal.count("leader.query"), 1);
        assert_eq!(journal.count("f0."), 0);
        assert_eq!(journal.count("f1."), 0);
    }

    #[tokio::test]
    async fn active_transaction_pins_routing() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 2);
        let tx: DynTx = Arc::new(FakeTx::new(journal.clone(), "tx"));

        let ctx = Context::new().with_transaction(tx);
        cluster.exec(&ctx, "UPDATE t SET x = 1", &[]).await.unwrap();

        assert_eq!(journal.count("tx.exec"), 1);
        assert_eq!(journal.count("leader."), 0);
    }

    #[tokio::test]
    async fn begin_opens_on_leader() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 1);

        cluster.begin(&Context::new()).await.unwrap();
        assert_eq!(journal.count("leader.begin"), 1);
    }

    #[tokio::test]
    async fn begin_nests_on_active_transaction() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 1);
        let tx: DynTx = Arc::new(FakeTx::new(journal.clone(), "tx"));

        let ctx = Context::new().with_transaction(tx);
        cluster.begin(&ctx).await.unwrap();

        assert_eq!(journal.count("tx.begin"), 1);
        assert_eq!(journal.count("leader.begin"), 0);
    }

    #[tokio::test]
    async fn transactional_with_write_intent_runs_on_leader() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 2);

        let ctx = Context::new().with_can_write();
        cluster
            .transactional(&ctx, tx_fn(|_| async { Ok(()) }))
            .await
            .unwrap();

        assert_eq!(journal.count("leader.transactional"), 1);
    }

    #[tokio::test]
    async fn read_only_transactional_runs_on_follower() {
        let journal = Journal::new();
        let cluster = cluster(&journal, 2);

        cluster
            .transactional(&Context::new(), tx_fn(|_| async { Ok(()) }))
            .await
            .unwrap();

        assert_eq!(journal.count("leader.transactional"), 0);
        assert_eq!(journal.count("f1.transactional"), 1);
    }

    #[tokio::test]
    async fn query_row_surfaces_balancer_failure_through_scan() {
        let journal = Journal::new();
        let leader = Arc::new(FakePool::new(journal.clone(), "leader")) as DynPool;
        let cluster = Cluster::new(leader, Vec::new());

        let row = cluster.query_row(&Context::new(), "SELECT 1", &[]).await;
        let err = row.scan().await.unwrap_err();
        assert!(matches!(err, Error::NoFollower));
    }
}
