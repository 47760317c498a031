//! # pgswitch-single
//!
//! The single-pool topology: an [`Instance`] wraps one primitive driver
//! pool and implements the full pool contract on top of it, including the
//! transactional lifecycle with nested transactions and the error-pass
//! matcher.
//!
//! This is the leaf most applications start from; clusters and hives are
//! built out of these.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pgswitch_core::{Context, tx_fn};
//! use pgswitch_single::Instance;
//!
//! let pool = Arc::new(Instance::new(backend));
//! pool.transactional(&Context::new(), tx_fn(|ctx| async move {
//!     // every operation through `ctx` runs inside the same transaction
//!     Ok(())
//! }))
//! .await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod instance;

pub use instance::Instance;
