//! Argo CD project membership management
//!
//! Keeps each configured `AppProject`'s destination list in sync with the
//! managed cluster fleet. A cluster appears in a project's destination set at
//! most once, keyed by name or server, so repeated passes converge instead of
//! accumulating duplicates.

use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::argo::{AppProject, ApplicationDestination};
use crate::config::Settings;
use crate::kubeconfig::ClusterCredentials;
use crate::{Error, ARGOCD_NAMESPACE};

/// True if any destination already matches the cluster by name or server
pub fn has_destination(destinations: &[ApplicationDestination], name: &str, server: &str) -> bool {
    destinations
        .iter()
        .any(|d| d.name.as_deref() == Some(name) || d.server.as_deref() == Some(server))
}

/// Remove the first destination matching by name, else by server
///
/// Returns whether anything was removed. At most one entry is dropped per
/// call, mirroring the at-most-once membership invariant.
pub fn remove_destination(
    destinations: &mut Vec<ApplicationDestination>,
    name: &str,
    server: &str,
) -> bool {
    let position = destinations
        .iter()
        .position(|d| d.name.as_deref() == Some(name))
        .or_else(|| {
            destinations
                .iter()
                .position(|d| d.server.as_deref() == Some(server))
        });

    match position {
        Some(idx) => {
            destinations.remove(idx);
            true
        }
        None => false,
    }
}

/// Destination list operations over the configured project set
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectMembership: Send + Sync {
    /// Add the cluster to every configured project's destination list
    async fn add(&self, creds: &ClusterCredentials) -> Result<(), Error>;

    /// Remove the cluster from every configured project's destination list
    async fn remove(&self, creds: &ClusterCredentials) -> Result<(), Error>;
}

/// Real membership manager backed by the Kubernetes API
///
/// A failed project fetch aborts the whole operation; projects already
/// updated in this pass are left as-is and the next pass completes the rest.
pub struct KubeProjectMembership {
    client: Client,
    settings: Settings,
}

impl KubeProjectMembership {
    /// Create a new membership manager using the given client and settings
    pub fn new(client: Client, settings: Settings) -> Self {
        Self { client, settings }
    }

    fn api(&self) -> Api<AppProject> {
        Api::namespaced(self.client.clone(), ARGOCD_NAMESPACE)
    }
}

#[async_trait]
impl ProjectMembership for KubeProjectMembership {
    async fn add(&self, creds: &ClusterCredentials) -> Result<(), Error> {
        let api = self.api();
        for project_name in &self.settings.projects {
            let mut project = api.get(project_name).await?;

            if has_destination(&project.spec.destinations, &creds.cluster_name, &creds.server) {
                debug!(
                    project = %project_name,
                    cluster = %creds.cluster_name,
                    "cluster already a destination, skipping"
                );
                continue;
            }

            project.spec.destinations.push(ApplicationDestination {
                name: Some(creds.cluster_name.clone()),
                server: Some(creds.server.clone()),
                namespace: None,
            });

            api.replace(project_name, &PostParams::default(), &project)
                .await?;
            info!(
                project = %project_name,
                cluster = %creds.cluster_name,
                "added cluster to project destinations"
            );
        }
        Ok(())
    }

    async fn remove(&self, creds: &ClusterCredentials) -> Result<(), Error> {
        let api = self.api();
        for project_name in &self.settings.projects {
            let mut project = api.get(project_name).await?;

            if !remove_destination(
                &mut project.spec.destinations,
                &creds.cluster_name,
                &creds.server,
            ) {
                debug!(
                    project = %project_name,
                    cluster = %creds.cluster_name,
                    "cluster not a destination, nothing to remove"
                );
                continue;
            }

            api.replace(project_name, &PostParams::default(), &project)
                .await?;
            info!(
                project = %project_name,
                cluster = %creds.cluster_name,
                "removed cluster from project destinations"
            );
        }
        Ok(())
    }
}
