//! Connection credential parsing
//!
//! Cluster API writes a generated kubeconfig for each workload cluster into a
//! `<name>-kubeconfig` secret. This module parses that blob into the single
//! cluster/auth pair selected by the kubeconfig's current context, which is
//! all the registration flow needs.
//!
//! Certificate material is kept in its base64 form: that is how the
//! kubeconfig carries it and how the Argo CD cluster config expects it.

use serde::Deserialize;

use crate::Error;

/// Parsed access material for one cluster context
///
/// Ephemeral; derived at the start of a reconciliation pass and dropped at
/// the end of it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterCredentials {
    /// Cluster name from the current context
    pub cluster_name: String,

    /// API server URL of the cluster
    pub server: String,

    /// Base64 certificate authority data, when present
    pub ca_data: Option<String>,

    /// Base64 client certificate data, when present
    pub cert_data: Option<String>,

    /// Base64 client key data, when present
    pub key_data: Option<String>,
}

impl ClusterCredentials {
    /// Parse a raw kubeconfig blob and resolve its current context
    ///
    /// The current context must name entries that exist in both the clusters
    /// and users lists; anything else is a malformed credential.
    pub fn from_kubeconfig(raw: &[u8]) -> Result<Self, Error> {
        let doc: KubeconfigDoc = serde_yaml::from_slice(raw)
            .map_err(|e| Error::malformed_kubeconfig(format!("not valid kubeconfig YAML: {e}")))?;
        doc.resolve_current_context()
    }
}

/// Minimal kubeconfig document, just the pieces the registration flow reads
#[derive(Debug, Deserialize)]
struct KubeconfigDoc {
    #[serde(rename = "current-context", default)]
    current_context: Option<String>,

    #[serde(default)]
    contexts: Vec<NamedContext>,

    #[serde(default)]
    clusters: Vec<NamedCluster>,

    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    server: String,
    #[serde(rename = "certificate-authority-data", default)]
    certificate_authority_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
struct UserEntry {
    #[serde(rename = "client-certificate-data", default)]
    client_certificate_data: Option<String>,
    #[serde(rename = "client-key-data", default)]
    client_key_data: Option<String>,
}

impl KubeconfigDoc {
    fn resolve_current_context(self) -> Result<ClusterCredentials, Error> {
        let current = self
            .current_context
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::malformed_kubeconfig("no current-context set"))?;

        let context = self
            .contexts
            .iter()
            .find(|c| c.name == current)
            .map(|c| &c.context)
            .ok_or_else(|| {
                Error::malformed_kubeconfig(format!("no context entry named '{current}'"))
            })?;

        let cluster = self
            .clusters
            .into_iter()
            .find(|c| c.name == context.cluster)
            .map(|c| c.cluster)
            .ok_or_else(|| {
                Error::malformed_kubeconfig(format!(
                    "no cluster entry named '{}'",
                    context.cluster
                ))
            })?;

        let user = self
            .users
            .into_iter()
            .find(|u| u.name == context.user)
            .map(|u| u.user)
            .ok_or_else(|| {
                Error::malformed_kubeconfig(format!("no user entry named '{}'", context.user))
            })?;

        Ok(ClusterCredentials {
            cluster_name: context.cluster.clone(),
            server: cluster.server,
            ca_data: cluster.certificate_authority_data,
            cert_data: user.client_certificate_data,
            key_data: user.client_key_data,
        })
    }
}
