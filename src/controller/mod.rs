//! Controller reconciliation logic
//!
//! Contains the level-triggered reconciliation loop that converges Argo CD's
//! cluster registry toward the observed lifecycle phase of each Cluster API
//! cluster.

mod cluster;

pub use cluster::{
    error_policy, reconcile, ClusterSource, Context, ContextBuilder, CredentialSource,
    KubeClusterSource, KubeCredentialSource,
};
