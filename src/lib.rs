//! Argo CD cluster registration operator for Cluster API
//!
//! Watches Cluster API `Cluster` resources and keeps Argo CD's cluster
//! registry converged with their lifecycle: an active cluster gets a
//! registration secret, membership in the configured `AppProject`
//! destination lists, and a baseline Cilium network overlay; a deleting
//! cluster is de-registered symmetrically.
//!
//! # Architecture
//!
//! The reconciliation loop is level-triggered. Every pass re-derives state
//! from the Kubernetes API and re-issues idempotent writes, so the operator
//! holds no state of its own and converges from any intermediate state left
//! by a crash or a concurrent pass for another cluster.
//!
//! # Modules
//!
//! - [`controller`] - Reconciliation loop for Cluster API clusters
//! - [`registry`] - Argo CD cluster registration secrets
//! - [`project`] - Argo CD project destination membership
//! - [`overlay`] - Cilium overlay provisioning (`ClusterResourceSet`)
//! - [`cilium`] - Overlay manifest template rendering
//! - [`kubeconfig`] - Connection credential parsing
//! - [`capi`] - Partial Cluster API resource types
//! - [`argo`] - Partial Argo CD resource types
//! - [`config`] - Process configuration
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod argo;
pub mod capi;
pub mod cilium;
pub mod config;
pub mod controller;
pub mod error;
pub mod kubeconfig;
pub mod overlay;
pub mod project;
pub mod registry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace where Argo CD and its projects live
///
/// Registration secrets are written here and `AppProject` resources are read
/// from here.
pub const ARGOCD_NAMESPACE: &str = "argocd";
