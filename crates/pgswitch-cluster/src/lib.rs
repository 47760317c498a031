//! # pgswitch-cluster
//!
//! The leader/follower topology: writes and transactions go to the
//! leader, reads are spread across followers by a load balancer
//! (round-robin by default).
//!
//! Routing rules, in order:
//!
//! 1. An active transaction in the context pins the call to that handle.
//! 2. Write intent selects the leader.
//! 3. Everything else goes to a balanced follower.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgswitch_cluster::ClusterBuilder;
//!
//! let cluster = ClusterBuilder::new()
//!     .leader(|| Ok(primary))
//!     .follower(|| Ok(replica_a))
//!     .follower(|| Ok(replica_b))
//!     .build()?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod balancer;
mod builder;
mod cluster;

pub use balancer::{LoadBalancer, round_robin};
pub use builder::{BuildError, ClusterBuilder, ConstructDb};
pub use cluster::Cluster;
