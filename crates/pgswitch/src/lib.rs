//! # pgswitch
//!
//! A routing façade for relational database pools. Applications program
//! against one [`Pool`] contract while pgswitch routes each call to the
//! right underlying pool based on intent carried in the per-call
//! [`Context`]: whether a transaction is already open, whether the call
//! needs a writable endpoint, and which shard owns the data.
//!
//! Three topologies hide behind the same interface, and they compose:
//! any shard of a hive may itself be a cluster, and any pool can be
//! wrapped in the metrics decorator.
//!
//! - [`Instance`]: a single driver pool.
//! - [`Cluster`]: leader/follower with read/write splitting and
//!   round-robin read balancing.
//! - [`Hive`]: horizontal sharding keyed by the context.
//!
//! ## Routing by context
//!
//! ```rust,ignore
//! use pgswitch::{Context, Value};
//!
//! // A read: any follower will do.
//! let rows = pool.query(&Context::new(), "SELECT * FROM users", &[]).await?;
//!
//! // A write: force the leader.
//! let ctx = Context::new().with_can_write();
//! pool.exec(&ctx, "UPDATE users SET active = $1", &[Value::from(true)]).await?;
//!
//! // A sharded call: address shard by key.
//! let ctx = Context::new().with_sharding_key("tenant-7");
//! let row = pool.query_row(&ctx, "SELECT plan FROM tenants", &[]).await;
//! ```
//!
//! ## Composing topologies
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pgswitch::{ClusterBuilder, CollectorBuilder, HiveBuilder, Instance, decorate};
//!
//! let shard = |leader, replica| {
//!     ClusterBuilder::new()
//!         .leader(move || Ok(Arc::new(Instance::new(leader)) as _))
//!         .follower(move || Ok(Arc::new(Instance::new(replica)) as _))
//!         .build()
//! };
//!
//! let hive = HiveBuilder::new(2)
//!     .shard(0, Arc::new(shard(l0, r0)?))
//!     .shard(1, Arc::new(shard(l1, r1)?))
//!     .picker(|_ctx, key| hash(key) % 2)
//!     .build()?;
//!
//! let collector = CollectorBuilder::new()
//!     .query_per_second(counter_factory)
//!     .latency(histogram_factory)
//!     .build()?;
//! let pool = Arc::new(decorate(Arc::new(hive), Arc::new(collector)));
//! ```
//!
//! ## Transactions
//!
//! [`Pool::transactional`] opens a transaction, injects it into the
//! closure's context, and commits or rolls back based on the closure's
//! result. A context that already carries a transaction nests instead.
//! The error-pass matcher lets a closure surface an expected error while
//! still committing its work:
//!
//! ```rust,ignore
//! use pgswitch::tx_fn;
//!
//! let ctx = Context::new()
//!     .with_tx_pass_matcher(Arc::new(|_ctx, err| {
//!         err.downcast_ref::<NotFound>().is_some()
//!     }));
//! pool.transactional(&ctx, tx_fn(|ctx| async move {
//!     // runs inside the transaction
//!     Ok(())
//! }))
//! .await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub use pgswitch_core::{
    Backend, BoxRow, BoxRows, CommandTag, Context, DynBackend, DynPool, DynTx, Error, FailedRow,
    IsolationLevel, Pool, Querier, Result, Row, Rows, SharedError, Tx, TxFn, TxFuture, TxOptions,
    TxPassMatcher, Value, tx_fn,
};

pub use pgswitch_cluster::{Cluster, ClusterBuilder, ConstructDb, LoadBalancer, round_robin};
pub use pgswitch_metrics::{
    Collector, CollectorBuilder, Counter, CounterFactory, ErrorLogger, Histogram,
    HistogramFactory, MetricsPool, QueryCollector, RESULT_FAILURE, RESULT_SUCCESS, ResultLabeler,
    decorate,
};
pub use pgswitch_shard::{Hive, HiveBuilder, ShardPicker};
pub use pgswitch_single::Instance;

/// Builder error types, re-exported per topology.
pub mod build {
    pub use pgswitch_cluster::BuildError as ClusterBuildError;
    pub use pgswitch_metrics::BuildError as CollectorBuildError;
    pub use pgswitch_shard::BuildError as HiveBuildError;
}

#[cfg(feature = "testing")]
pub use pgswitch_core::testing;
