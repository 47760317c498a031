//! Runtime error model shared by every topology.
//!
//! Routing and transaction-lifecycle errors are identity-comparable enum
//! variants; driver and application failures are retained behind `Arc` so
//! the original error survives descriptive wrapping and stays reachable
//! through [`Error::root`] and [`Error::downcast_ref`].
//!
//! Configuration failures are deliberately absent here: builders report
//! them through their own error types at construction time, never through
//! the operation channel.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A driver- or application-level error kept behind `Arc` so [`Error`]
/// stays cheaply clonable.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by pool operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The call context carried neither a shard id nor a sharding key.
    #[error("could not resolve a shard from the call context")]
    CouldNotPickShard,

    /// The transaction handle was already committed or rolled back.
    ///
    /// A rollback issued after a successful commit reports this and is
    /// treated as benign by the transactional helpers.
    #[error("transaction already closed")]
    TxClosed,

    /// The load balancer produced no follower for a read.
    #[error("no follower available for read routing")]
    NoFollower,

    /// A failure reported by the underlying driver.
    #[error("driver error: {0}")]
    Driver(#[source] SharedError),

    /// An application error carried through a transactional closure.
    #[error("{0}")]
    App(#[source] SharedError),

    /// An error wrapped with operation context.
    #[error("{context}: {source}")]
    Context {
        /// Human-readable description of the failing operation.
        context: String,
        /// The wrapped error.
        source: Arc<Error>,
    },
}

impl Error {
    /// Wrap a driver failure.
    pub fn driver(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Driver(Arc::new(err))
    }

    /// Wrap an application failure for transport through a transactional
    /// closure.
    pub fn app(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::App(Arc::new(err))
    }

    /// Wrap this error with a description of the failing operation.
    ///
    /// The wrapped error stays reachable through [`Error::root`], so
    /// identity checks keep working after any number of wrapping layers.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Arc::new(self),
        }
    }

    /// Strip [`Error::Context`] layers and return the innermost error.
    #[must_use]
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Error::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// Try to view the root driver or application error as a concrete type.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        match self.root() {
            Error::Driver(inner) | Error::App(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }
}
