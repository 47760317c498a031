//! Sharded pool.

use std::sync::Arc;

use async_trait::async_trait;

use pgswitch_core::{
    BoxRow, BoxRows, CommandTag, Context, DynPool, DynTx, Error, FailedRow, Pool, Querier,
    Result, TxFn, TxOptions, Value,
};

/// Maps a sharding key to a shard index.
///
/// Results must fall in `[0, shard_count)`; that bound is a caller
/// contract, not a runtime check.
pub type ShardPicker = Arc<dyn Fn(&Context, &str) -> u64 + Send + Sync>;

/// A sharded pool: a dense array of shards addressed by the context.
pub struct Hive {
    shards: Vec<DynPool>,
    picker: ShardPicker,
}

impl Hive {
    /// Assemble a hive from shards indexed by position.
    ///
    /// [`crate::HiveBuilder`] validates the shard map and should be
    /// preferred.
    #[must_use]
    pub fn new(shards: Vec<DynPool>, picker: ShardPicker) -> Self {
        tracing::info!(shards = shards.len(), "sharded pool created");
        Hive { shards, picker }
    }

    fn pick_shard_id(&self, ctx: &Context) -> Result<u64> {
        if let Some(id) = ctx.shard_id() {
            return Ok(id);
        }
        if let Some(key) = ctx.sharding_key() {
            return Ok((self.picker)(ctx, key));
        }
        Err(Error::CouldNotPickShard)
    }

    fn shard(&self, ctx: &Context) -> Result<&DynPool> {
        let id = self.pick_shard_id(ctx)?;
        Ok(&self.shards[id as usize])
    }
}

#[async_trait]
impl Querier for Hive {
    async fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<BoxRows> {
        self.shard(ctx)?.query(ctx, sql, args).await
    }

    async fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> BoxRow {
        match self.shard(ctx) {
            Ok(shard) => shard.query_row(ctx, sql, args).await,
            Err(err) => Box::new(FailedRow::new(err)),
        }
    }

    async fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<CommandTag> {
        self.shard(ctx)?.exec(ctx, sql, args).await
    }
}

#[async_trait]
impl Pool for Hive {
    async fn begin(&self, ctx: &Context) -> Result<DynTx> {
        self.shard(ctx)?.begin(ctx).await
    }

    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<DynTx> {
        self.shard(ctx)?.begin_tx(ctx, opts).await
    }

    async fn transactional(&self, ctx: &Context, f: TxFn) -> Result<()> {
        self.shard(ctx)?.transactional(ctx, f).await
    }
}
