//! Cluster registration controller
//!
//! Implements the reconciliation loop for Cluster API `Cluster` resources.
//! Each pass re-derives everything from the current API state: read the
//! cluster's lifecycle phase, then drive the registration secret, project
//! membership and network overlay toward it. No state survives between
//! passes, so a crash between any two sub-steps leaves nothing to repair
//! beyond what the next pass converges on its own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{error, info, instrument};

#[cfg(test)]
use mockall::automock;

use crate::capi::{Cluster, LifecyclePhase};
use crate::config::Settings;
use crate::kubeconfig::ClusterCredentials;
use crate::overlay::{KubeOverlayInstaller, OverlayInstaller};
use crate::project::{KubeProjectMembership, ProjectMembership};
use crate::registry::{ClusterRegistry, KubeClusterRegistry};
use crate::Error;

/// Fixed re-poll interval after a successful pass
const REQUEUE_INTERVAL: Duration = Duration::from_secs(60);

/// Requeue delay after a failed pass
const ERROR_REQUEUE_INTERVAL: Duration = Duration::from_secs(5);

/// Read access to the lifecycle objects driving reconciliation
///
/// The watcher hands the controller a cached object; the pass re-fetches
/// through this trait so decisions are made against current state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Fetch the current cluster record; a missing record is an error
    async fn get(&self, name: &str, namespace: &str) -> Result<Cluster, Error>;
}

/// Real cluster source backed by the Kubernetes API
pub struct KubeClusterSource {
    client: Client,
}

impl KubeClusterSource {
    /// Create a new cluster source using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn get(&self, name: &str, namespace: &str) -> Result<Cluster, Error> {
        let api: Api<Cluster> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }
}

/// Read access to the generated connection credentials
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch and parse the cluster's kubeconfig secret
    ///
    /// Returns `None` when the secret does not exist, which is success on
    /// the teardown path and an error on the registration path; the caller
    /// decides.
    async fn fetch(
        &self,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<Option<ClusterCredentials>, Error>;
}

/// Real credential source reading `<name>-kubeconfig` secrets
pub struct KubeCredentialSource {
    client: Client,
}

impl KubeCredentialSource {
    /// Create a new credential source using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialSource for KubeCredentialSource {
    async fn fetch(
        &self,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<Option<ClusterCredentials>, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret_name = format!("{cluster_name}-kubeconfig");

        let Some(secret) = api.get_opt(&secret_name).await? else {
            return Ok(None);
        };

        let value = secret
            .data
            .as_ref()
            .and_then(|d| d.get("value"))
            .ok_or_else(|| {
                Error::malformed_kubeconfig(format!("secret '{secret_name}' has no 'value' key"))
            })?;

        ClusterCredentials::from_kubeconfig(&value.0).map(Some)
    }
}

/// Controller context containing the registration components
///
/// Shared across all reconciliation calls. Each collaborator sits behind a
/// trait object so tests can substitute mocks; production wiring comes from
/// [`ContextBuilder`].
pub struct Context {
    /// Source of lifecycle objects
    pub clusters: Arc<dyn ClusterSource>,
    /// Source of connection credentials
    pub credentials: Arc<dyn CredentialSource>,
    /// Registration secret manager
    pub registry: Arc<dyn ClusterRegistry>,
    /// Project membership manager
    pub projects: Arc<dyn ProjectMembership>,
    /// Network overlay provisioner
    pub overlay: Arc<dyn OverlayInstaller>,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client, settings: Settings) -> ContextBuilder {
        ContextBuilder::new(client, settings)
    }

    /// Create a new context with the default component implementations
    pub fn new(client: Client, settings: Settings) -> Self {
        Self::builder(client, settings).build()
    }

    /// Create a context for testing with custom mock components
    #[cfg(test)]
    pub fn for_testing(
        clusters: Arc<dyn ClusterSource>,
        credentials: Arc<dyn CredentialSource>,
        registry: Arc<dyn ClusterRegistry>,
        projects: Arc<dyn ProjectMembership>,
        overlay: Arc<dyn OverlayInstaller>,
    ) -> Self {
        Self {
            clusters,
            credentials,
            registry,
            projects,
            overlay,
        }
    }
}

/// Builder for constructing [`Context`] instances
///
/// Settings are injected here, once, and flow into the components that need
/// them; nothing reads configuration after construction.
pub struct ContextBuilder {
    client: Client,
    settings: Settings,
    clusters: Option<Arc<dyn ClusterSource>>,
    credentials: Option<Arc<dyn CredentialSource>>,
    registry: Option<Arc<dyn ClusterRegistry>>,
    projects: Option<Arc<dyn ProjectMembership>>,
    overlay: Option<Arc<dyn OverlayInstaller>>,
}

impl ContextBuilder {
    fn new(client: Client, settings: Settings) -> Self {
        Self {
            client,
            settings,
            clusters: None,
            credentials: None,
            registry: None,
            projects: None,
            overlay: None,
        }
    }

    /// Override the cluster source (primarily for testing)
    pub fn cluster_source(mut self, clusters: Arc<dyn ClusterSource>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Override the credential source (primarily for testing)
    pub fn credential_source(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the registration secret manager (primarily for testing)
    pub fn registry(mut self, registry: Arc<dyn ClusterRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the project membership manager (primarily for testing)
    pub fn projects(mut self, projects: Arc<dyn ProjectMembership>) -> Self {
        self.projects = Some(projects);
        self
    }

    /// Override the overlay installer (primarily for testing)
    pub fn overlay(mut self, overlay: Arc<dyn OverlayInstaller>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            clusters: self
                .clusters
                .unwrap_or_else(|| Arc::new(KubeClusterSource::new(self.client.clone()))),
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(KubeCredentialSource::new(self.client.clone()))),
            registry: self.registry.unwrap_or_else(|| {
                Arc::new(KubeClusterRegistry::new(
                    self.client.clone(),
                    self.settings.clone(),
                ))
            }),
            projects: self.projects.unwrap_or_else(|| {
                Arc::new(KubeProjectMembership::new(
                    self.client.clone(),
                    self.settings.clone(),
                ))
            }),
            overlay: self
                .overlay
                .unwrap_or_else(|| Arc::new(KubeOverlayInstaller::new(self.client.clone()))),
        }
    }
}

/// Reconcile one Cluster API cluster against the Argo CD registry
///
/// Level-triggered: state is re-derived from scratch every pass. On the
/// active branch the registration secret must exist before project
/// membership is granted, because membership implies deployment
/// eligibility; on the teardown branch the secret goes first so a stale
/// target stops being reachable before it leaves the project lists.
#[instrument(skip(cluster, ctx), fields(cluster = %cluster.name_any()))]
pub async fn reconcile(cluster: Arc<Cluster>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = cluster.name_any();
    let namespace = cluster
        .namespace()
        .ok_or_else(|| Error::validation(format!("cluster '{name}' has no namespace")))?;

    // Re-fetch so the branch below reflects current state, not the watcher
    // cache. A missing record surfaces as an error; the scheduling layer
    // stops retrying a key that no longer exists.
    let cluster = ctx.clusters.get(&name, &namespace).await?;
    let phase = cluster.lifecycle_phase();
    info!(?phase, "reconciling cluster");

    match phase {
        LifecyclePhase::Deleting => match ctx.credentials.fetch(&name, &namespace).await? {
            None => {
                info!("credential secret already gone, nothing to clean up");
            }
            Some(creds) => {
                ctx.registry.delete(&creds).await?;
                ctx.projects.remove(&creds).await?;
                info!("cluster de-registered");
            }
        },
        LifecyclePhase::Active => {
            let creds = ctx
                .credentials
                .fetch(&name, &namespace)
                .await?
                .ok_or_else(|| {
                    Error::credential_not_found(format!(
                        "secret '{name}-kubeconfig' does not exist yet"
                    ))
                })?;

            ctx.registry.ensure(&creds).await?;
            ctx.projects.add(&creds).await?;
            ctx.overlay.install(&cluster).await?;
            info!("cluster registered");
        }
    }

    Ok(Action::requeue(REQUEUE_INTERVAL))
}

/// Error policy for the controller
///
/// Failed passes are retried on a short delay; each sub-step is idempotent,
/// so partial effects from the failed pass converge on the retry.
pub fn error_policy(cluster: Arc<Cluster>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        cluster = %cluster.name_any(),
        "reconciliation failed"
    );
    Action::requeue(ERROR_REQUEUE_INTERVAL)
}
