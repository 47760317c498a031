//! # pgswitch-shard
//!
//! The horizontally sharded topology: a [`Hive`] holds a dense array of
//! shard pools and resolves the target shard from the call context: an
//! explicit shard id when present, otherwise a sharding key run through
//! the application's picker function.
//!
//! Shards implement the full pool contract, so a shard may itself be a
//! cluster or a metrics-decorated pool.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgswitch_shard::HiveBuilder;
//!
//! let hive = HiveBuilder::new(4)
//!     .shard(0, s0)
//!     .shard(1, s1)
//!     .shard(2, s2)
//!     .shard(3, s3)
//!     .picker(|_ctx, key| hash(key) % 4)
//!     .build()?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod builder;
mod hive;

pub use builder::{BuildError, HiveBuilder};
pub use hive::{Hive, ShardPicker};
