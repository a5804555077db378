//! Network overlay provisioning
//!
//! Creates the declarative bundle that installs the baseline Cilium overlay
//! into a newly-provisioned cluster: a `ClusterResourceSet` selecting the
//! cluster by its own labels, plus a `ConfigMap` carrying the rendered
//! manifest. Both are owner-referenced to the cluster, so teardown happens
//! through garbage collection rather than an explicit delete here.
//!
//! Creation is level-trigger safe: each object is looked up before it is
//! created, so re-polls of an already-provisioned cluster are no-ops instead
//! of AlreadyExists failures.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::capi::{Cluster, ClusterResourceSet, ClusterResourceSetSpec, ClusterSelector, ResourceRef};
use crate::cilium;
use crate::Error;

/// Key under which the rendered manifest is stored in the ConfigMap
pub const OVERLAY_DATA_KEY: &str = "cilium.yaml";

/// Name of the overlay objects for a cluster
pub fn overlay_name(cluster_name: &str) -> String {
    format!("{cluster_name}-cni")
}

/// Build the overlay pair for a cluster
///
/// Requires the cluster to carry a control plane endpoint and a uid (for the
/// owner reference); either missing is a validation error.
pub fn build_overlay(cluster: &Cluster) -> Result<(ConfigMap, ClusterResourceSet), Error> {
    let cluster_name = cluster.name_any();
    let namespace = cluster.namespace().ok_or_else(|| {
        Error::validation(format!("cluster '{cluster_name}' has no namespace"))
    })?;

    let endpoint = cluster
        .spec
        .control_plane_endpoint
        .as_ref()
        .ok_or_else(|| {
            Error::validation(format!(
                "cluster '{cluster_name}' has no control plane endpoint"
            ))
        })?;

    let owner = cluster.controller_owner_ref(&()).ok_or_else(|| {
        Error::validation(format!("cluster '{cluster_name}' has no uid"))
    })?;

    let manifest = cilium::render(&endpoint.host, endpoint.port)?;
    let name = overlay_name(&cluster_name);

    let config_map = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.clone()),
            owner_references: Some(vec![owner.clone()]),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(OVERLAY_DATA_KEY.to_string(), manifest)])),
        ..Default::default()
    };

    let mut resource_set = ClusterResourceSet::new(
        &name,
        ClusterResourceSetSpec {
            cluster_selector: ClusterSelector {
                match_labels: cluster.labels().clone(),
            },
            resources: vec![ResourceRef {
                name: name.clone(),
                kind: "ConfigMap".to_string(),
            }],
        },
    );
    resource_set.metadata.namespace = Some(namespace);
    resource_set.metadata.owner_references = Some(vec![owner]);

    Ok((config_map, resource_set))
}

/// Overlay installation for newly-active clusters
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OverlayInstaller: Send + Sync {
    /// Create the overlay bundle for this cluster if it does not exist yet
    async fn install(&self, cluster: &Cluster) -> Result<(), Error>;
}

/// Real installer backed by the Kubernetes API
pub struct KubeOverlayInstaller {
    client: Client,
}

impl KubeOverlayInstaller {
    /// Create a new installer using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OverlayInstaller for KubeOverlayInstaller {
    async fn install(&self, cluster: &Cluster) -> Result<(), Error> {
        let (config_map, resource_set) = build_overlay(cluster)?;
        // build_overlay validated the namespace.
        let namespace = config_map.metadata.namespace.clone().unwrap_or_default();
        let name = overlay_name(&cluster.name_any());

        // Payload first, then the binding that references it.
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), &namespace);
        if create_if_absent(&config_maps, &name, &config_map).await? {
            info!(cluster = %cluster.name_any(), configmap = %name, "created overlay configmap");
        } else {
            debug!(cluster = %cluster.name_any(), configmap = %name, "overlay configmap already present");
        }

        let resource_sets: Api<ClusterResourceSet> =
            Api::namespaced(self.client.clone(), &namespace);
        if create_if_absent(&resource_sets, &name, &resource_set).await? {
            info!(cluster = %cluster.name_any(), resourceset = %name, "created overlay resource set");
        } else {
            debug!(cluster = %cluster.name_any(), resourceset = %name, "overlay resource set already present");
        }

        Ok(())
    }
}

/// Create an object unless it already exists
///
/// Returns whether a create happened. Losing a create race to a concurrent
/// writer is the same outcome as finding the object, not an error.
async fn create_if_absent<K>(api: &Api<K>, name: &str, obj: &K) -> Result<bool, Error>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    if api.get_opt(name).await?.is_some() {
        return Ok(false);
    }

    match api.create(&PostParams::default(), obj).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
        Err(e) => Err(e.into()),
    }
}
