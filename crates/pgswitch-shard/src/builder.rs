//! Validating hive construction.

use std::collections::HashMap;
use std::sync::Arc;

use pgswitch_core::{Context, DynPool};
use thiserror::Error as ThisError;

use crate::hive::{Hive, ShardPicker};

/// Configuration failures reported by [`HiveBuilder::build`].
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum BuildError {
    /// The hive was sized at zero shards.
    #[error("sharded pool: wrong shards pool size")]
    WrongPoolSize,

    /// No picker function was provided.
    #[error("sharded pool: no shard picker provided")]
    NoPickerProvided,

    /// At least one index in `[0, size)` has no registered shard.
    #[error("sharded pool: provided fewer shards than the pool size")]
    NotEnoughShards,
}

/// Builder assembling a [`Hive`] of exactly `size` shards.
///
/// Every index in `[0, size)` must be registered before `build`; shards
/// are held as live pools, so there is no null to guard against beyond a
/// missing registration.
pub struct HiveBuilder {
    size: u64,
    shards: HashMap<u64, DynPool>,
    picker: Option<ShardPicker>,
}

impl HiveBuilder {
    /// A builder for a hive of `size` shards.
    #[must_use]
    pub fn new(size: u64) -> Self {
        HiveBuilder {
            size,
            shards: HashMap::with_capacity(size as usize),
            picker: None,
        }
    }

    /// Register the shard at `index`. Registering the same index again
    /// replaces the earlier pool.
    #[must_use]
    pub fn shard(mut self, index: u64, pool: DynPool) -> Self {
        self.shards.insert(index, pool);
        self
    }

    /// Set the sharding-key picker.
    #[must_use]
    pub fn picker<F>(mut self, picker: F) -> Self
    where
        F: Fn(&Context, &str) -> u64 + Send + Sync + 'static,
    {
        self.picker = Some(Arc::new(picker));
        self
    }

    /// Validate the configuration and assemble the hive.
    pub fn build(mut self) -> Result<Hive, BuildError> {
        if self.size == 0 {
            return Err(BuildError::WrongPoolSize);
        }
        let picker = self.picker.ok_or(BuildError::NoPickerProvided)?;

        let mut shards = Vec::with_capacity(self.size as usize);
        for index in 0..self.size {
            let shard = self
                .shards
                .remove(&index)
                .ok_or(BuildError::NotEnoughShards)?;
            shards.push(shard);
        }
        Ok(Hive::new(shards, picker))
    }
}
