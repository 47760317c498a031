//! Validating cluster construction.

use pgswitch_core::{DynPool, Error};
use thiserror::Error as ThisError;

use crate::balancer::LoadBalancer;
use crate::cluster::Cluster;

/// A deferred pool constructor, invoked once at build time.
pub type ConstructDb = Box<dyn FnOnce() -> Result<DynPool, Error> + Send>;

/// Configuration failures reported by [`ClusterBuilder::build`].
#[derive(Debug, ThisError)]
pub enum BuildError {
    /// No leader constructor was provided.
    #[error("invalid cluster configuration: a leader constructor is required")]
    NoLeader,

    /// No follower constructor was provided.
    #[error("invalid cluster configuration: at least one follower constructor is required")]
    NoFollowers,

    /// The leader constructor failed.
    #[error("leader constructor failed")]
    Leader(#[source] Error),

    /// A follower constructor failed.
    #[error("follower constructor [{index}] failed")]
    Follower {
        /// Position of the failing constructor in registration order.
        index: usize,
        /// The constructor's failure.
        #[source]
        source: Error,
    },
}

/// Builder assembling a [`Cluster`] from deferred pool constructors.
///
/// The leader constructor runs first, then each follower constructor in
/// registration order, stopping at the first failure.
#[derive(Default)]
pub struct ClusterBuilder {
    leader: Option<ConstructDb>,
    followers: Vec<ConstructDb>,
    balancer: Option<LoadBalancer>,
}

impl ClusterBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        ClusterBuilder::default()
    }

    /// Set the leader constructor.
    #[must_use]
    pub fn leader<F>(mut self, ctor: F) -> Self
    where
        F: FnOnce() -> Result<DynPool, Error> + Send + 'static,
    {
        self.leader = Some(Box::new(ctor));
        self
    }

    /// Append a follower constructor.
    #[must_use]
    pub fn follower<F>(mut self, ctor: F) -> Self
    where
        F: FnOnce() -> Result<DynPool, Error> + Send + 'static,
    {
        self.followers.push(Box::new(ctor));
        self
    }

    /// Replace the default round-robin balancer.
    #[must_use]
    pub fn balancer(mut self, balancer: LoadBalancer) -> Self {
        self.balancer = Some(balancer);
        self
    }

    /// Run the constructors and assemble the cluster.
    pub fn build(self) -> Result<Cluster, BuildError> {
        if self.followers.is_empty() {
            return Err(BuildError::NoFollowers);
        }
        let leader_ctor = self.leader.ok_or(BuildError::NoLeader)?;
        let leader = leader_ctor().map_err(BuildError::Leader)?;

        let mut followers = Vec::with_capacity(self.followers.len());
        for (index, ctor) in self.followers.into_iter().enumerate() {
            followers.push(ctor().map_err(|source| BuildError::Follower { index, source })?);
        }

        let mut cluster = Cluster::new(leader, followers);
        if let Some(balancer) = self.balancer {
            cluster = cluster.with_balancer(balancer);
        }
        Ok(cluster)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pgswitch_core::testing::{FakePool, Journal};
    use thiserror::Error as ThisError;

    use super::*;

    #[derive(Debug, ThisError)]
    #[error("construction failed")]
    struct CtorFailed;

    fn pool(journal: &Journal, name: &str) -> DynPool {
        Arc::new(FakePool::new(journal.clone(), name))
    }

    #[test]
    fn build_requires_a_follower() {
        let journal = Journal::new();
        let err = ClusterBuilder::new()
            .leader({
                let journal = journal.clone();
                move || Ok(pool(&journal, "leader"))
            })
            .build()
            .err().unwrap();
        assert!(matches!(err, BuildError::NoFollowers));
    }

    #[test]
    fn build_requires_a_leader() {
        let journal = Journal::new();
        let err = ClusterBuilder::new()
            .follower({
                let journal = journal.clone();
                move || Ok(pool(&journal, "f0"))
            })
            .build()
            .err().unwrap();
        assert!(matches!(err, BuildError::NoLeader));
    }

    #[test]
    fn leader_failure_is_reported_first() {
        let journal = Journal::new();
        let err = ClusterBuilder::new()
            .leader(|| Err(Error::driver(CtorFailed)))
            .follower({
                let journal = journal.clone();
                move || Ok(pool(&journal, "f0"))
            })
            .build()
            .err().unwrap();
        assert!(matches!(err, BuildError::Leader(_)));
    }

    #[test]
    fn follower_failure_carries_its_index() {
        let journal = Journal::new();
        let err = ClusterBuilder::new()
            .leader({
                let journal = journal.clone();
                move || Ok(pool(&journal, "leader"))
            })
            .follower({
                let journal = journal.clone();
                move || Ok(pool(&journal, "f0"))
            })
            .follower(|| Err(Error::driver(CtorFailed)))
            .build()
            .err().unwrap();
        match err {
            BuildError::Follower { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn built_cluster_routes() {
        let journal = Journal::new();
        let cluster = ClusterBuilder::new()
            .leader({
                let journal = journal.clone();
                move || Ok(pool(&journal, "leader"))
            })
            .follower({
                let journal = journal.clone();
                move || Ok(pool(&journal, "f0"))
            })
            .build()
            .unwrap();

        let ctx = pgswitch_core::Context::new().with_can_write();
        pgswitch_core::Pool::begin(&cluster, &ctx).await.unwrap();
        assert_eq!(journal.count("leader.begin"), 1);
    }
}
