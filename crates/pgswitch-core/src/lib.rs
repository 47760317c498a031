//! # pgswitch-core
//!
//! Core building blocks for the pgswitch database-access façade: the
//! [`Pool`] trait family, the per-call routing [`Context`], and the shared
//! value and error model.
//!
//! Every pgswitch topology (single pool, leader/follower cluster, sharded
//! hive, metrics decorator) implements the same [`Pool`] contract, so
//! topologies compose freely: a shard may be a cluster, a cluster member
//! may be wrapped in a metrics decorator, and application code never sees
//! which concrete topology serves a call.
//!
//! Routing intent travels through the [`Context`] value that accompanies
//! every operation: write intent, an already-open transaction, shard
//! selection hints, a query timeout, metric labels, and the transactional
//! error-pass matcher.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgswitch_core::{Context, DynPool, Value};
//!
//! async fn rename(pool: &DynPool, id: i64, name: &str) -> pgswitch_core::Result<()> {
//!     let ctx = Context::new().with_can_write();
//!     pool.exec(
//!         &ctx,
//!         "UPDATE users SET name = $1 WHERE id = $2",
//!         &[Value::from(name), Value::from(id)],
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod context;
pub mod error;
pub mod pool;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{Context, TxPassMatcher};
pub use error::{Error, Result, SharedError};
pub use pool::{
    Backend, BoxRow, BoxRows, DynBackend, DynPool, DynTx, FailedRow, Pool, Querier, Row, Rows, Tx,
    TxFn, TxFuture, tx_fn,
};
pub use types::{CommandTag, IsolationLevel, TxOptions, Value};
