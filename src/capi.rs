//! Cluster API interface types
//!
//! Partial custom resource definitions for the Cluster API objects this
//! operator reads and writes. Only the fields the registration flow consumes
//! are modeled; everything else the API server stores is left untouched
//! because the operator never replaces these objects.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle phase as seen by the registration flow
///
/// Cluster API reports a free-form phase string, but the only transition this
/// operator cares about is into `Deleting`. Every other value, including an
/// absent status, is treated as an active cluster, which keeps the branch set
/// closed and exhaustively checkable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecyclePhase {
    /// Any phase other than the literal `Deleting`
    Active,
    /// The cluster is being torn down
    Deleting,
}

impl LifecyclePhase {
    /// Map a raw phase string to the two-variant lifecycle state
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Deleting") => Self::Deleting,
            _ => Self::Active,
        }
    }
}

/// Spec subset of a Cluster API `Cluster`
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    plural = "clusters",
    status = "ClusterStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Endpoint of the workload cluster's API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ControlPlaneEndpoint>,
}

/// Host/port pair for a cluster's API server
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneEndpoint {
    /// Hostname or IP of the API server
    #[serde(default)]
    pub host: String,

    /// Port of the API server
    #[serde(default)]
    pub port: i32,
}

/// Status subset of a Cluster API `Cluster`
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Provisioning lifecycle phase reported by Cluster API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Whether the control plane has come up
    #[serde(default)]
    pub control_plane_ready: bool,
}

impl Cluster {
    /// The two-variant lifecycle state of this cluster
    pub fn lifecycle_phase(&self) -> LifecyclePhase {
        LifecyclePhase::from_phase(self.status.as_ref().and_then(|s| s.phase.as_deref()))
    }
}

/// Spec subset of a Cluster API `ClusterResourceSet`
///
/// The addon controller applies the referenced resources to every workload
/// cluster matched by `clusterSelector`.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "addons.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "ClusterResourceSet",
    plural = "clusterresourcesets",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceSetSpec {
    /// Label selector matching the target clusters
    pub cluster_selector: ClusterSelector,

    /// Resources to apply to the matched clusters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRef>,
}

/// Label selector for `ClusterResourceSet` targeting
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelector {
    /// Exact-match labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
}

/// Reference to a resource carried by a `ClusterResourceSet`
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceRef {
    /// Name of the referenced object
    pub name: String,

    /// Kind of the referenced object (`ConfigMap` or `Secret`)
    pub kind: String,
}
