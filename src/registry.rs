//! Argo CD cluster secret management
//!
//! Creates, updates and deletes the cluster registration secret that Argo CD
//! uses to reach a managed cluster. `ensure` is an upsert (create, fall back
//! to replace on conflict) and `delete` treats a missing secret as success,
//! so both are safe to re-issue on every reconciliation pass.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::Client;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::argo::{
    AwsAuthConfig, ClusterConfig, TlsClientConfig, EKS_SERVER_MARKER, PART_OF_LABEL,
    SECRET_TYPE_LABEL,
};
use crate::config::Settings;
use crate::kubeconfig::ClusterCredentials;
use crate::{Error, ARGOCD_NAMESPACE};

/// Name of the registration secret for a cluster
pub fn secret_name(cluster_name: &str) -> String {
    format!("{cluster_name}-cluster-secret")
}

/// Build the registration secret for a set of credentials
///
/// The `config` field is the serialized [`ClusterConfig`]: TLS material
/// always, plus an IAM role binding when the server URL looks like an EKS
/// control plane and a role ARN is configured.
pub fn build_secret(creds: &ClusterCredentials, role_arn: Option<&str>) -> Result<Secret, Error> {
    let aws_auth_config = match role_arn {
        Some(arn) if creds.server.contains(EKS_SERVER_MARKER) => Some(AwsAuthConfig {
            cluster_name: creds.cluster_name.clone(),
            role_arn: arn.to_string(),
        }),
        _ => None,
    };

    let config = ClusterConfig {
        tls_client_config: TlsClientConfig {
            ca_data: creds.ca_data.clone(),
            cert_data: creds.cert_data.clone(),
            key_data: creds.key_data.clone(),
        },
        aws_auth_config,
    };

    let config_json =
        serde_json::to_string(&config).map_err(|e| Error::serialization(e.to_string()))?;

    let labels = BTreeMap::from([
        (PART_OF_LABEL.0.to_string(), PART_OF_LABEL.1.to_string()),
        (SECRET_TYPE_LABEL.0.to_string(), SECRET_TYPE_LABEL.1.to_string()),
    ]);

    let string_data = BTreeMap::from([
        ("name".to_string(), creds.cluster_name.clone()),
        ("server".to_string(), creds.server.clone()),
        ("config".to_string(), config_json),
    ]);

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(secret_name(&creds.cluster_name)),
            namespace: Some(ARGOCD_NAMESPACE.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        string_data: Some(string_data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    })
}

/// Registration secret operations against the Argo CD namespace
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// Create or replace the registration secret for these credentials
    async fn ensure(&self, creds: &ClusterCredentials) -> Result<(), Error>;

    /// Delete the registration secret; missing is success
    async fn delete(&self, creds: &ClusterCredentials) -> Result<(), Error>;
}

/// Real registry backed by the Kubernetes API
pub struct KubeClusterRegistry {
    client: Client,
    settings: Settings,
}

impl KubeClusterRegistry {
    /// Create a new registry using the given client and settings
    pub fn new(client: Client, settings: Settings) -> Self {
        Self { client, settings }
    }

    fn api(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), ARGOCD_NAMESPACE)
    }
}

#[async_trait]
impl ClusterRegistry for KubeClusterRegistry {
    async fn ensure(&self, creds: &ClusterCredentials) -> Result<(), Error> {
        let secret = build_secret(creds, self.settings.role_arn.as_deref())?;
        let name = secret_name(&creds.cluster_name);
        let api = self.api();

        match api.create(&PostParams::default(), &secret).await {
            Ok(_) => {
                info!(secret = %name, "created cluster registration secret");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                // Already registered; replace in full so credential rotation
                // propagates. The live resourceVersion is required for the
                // update to be accepted.
                let existing = api.get(&name).await?;
                let mut replacement = secret;
                replacement.metadata.resource_version = existing.metadata.resource_version;
                api.replace(&name, &PostParams::default(), &replacement)
                    .await?;
                info!(secret = %name, "updated cluster registration secret");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, creds: &ClusterCredentials) -> Result<(), Error> {
        let name = secret_name(&creds.cluster_name);
        match self.api().delete(&name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(secret = %name, "deleted cluster registration secret");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(secret = %name, "registration secret already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_credentials(server: &str) -> ClusterCredentials {
        ClusterCredentials {
            cluster_name: "prod".to_string(),
            server: server.to_string(),
            ca_data: Some("Y2EtZGF0YQ==".to_string()),
            cert_data: Some("Y2VydC1kYXRh".to_string()),
            key_data: Some("a2V5LWRhdGE=".to_string()),
        }
    }

    fn config_payload(secret: &Secret) -> ClusterConfig {
        let data = secret.string_data.as_ref().expect("secret has string data");
        serde_json::from_str(&data["config"]).expect("config field is valid JSON")
    }

    #[test]
    fn secret_name_is_derived_from_cluster_name() {
        assert_eq!(secret_name("prod"), "prod-cluster-secret");
    }

    #[test]
    fn secret_carries_argo_identity_labels_and_namespace() {
        let secret =
            build_secret(&sample_credentials("https://10.0.0.1:6443"), None).expect("build");

        assert_eq!(secret.metadata.name.as_deref(), Some("prod-cluster-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("argocd"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));

        let labels = secret.metadata.labels.as_ref().expect("labels set");
        assert_eq!(labels["app.kubernetes.io/part-of"], "argocd");
        assert_eq!(labels["argocd.argoproj.io/secret-type"], "cluster");
    }

    #[test]
    fn secret_fields_match_the_current_context() {
        let secret =
            build_secret(&sample_credentials("https://10.0.0.1:6443"), None).expect("build");

        let data = secret.string_data.as_ref().expect("string data");
        assert_eq!(data["name"], "prod");
        assert_eq!(data["server"], "https://10.0.0.1:6443");
    }

    /// Story: an EKS server with a configured role ARN gets both TLS material
    /// and an IAM role binding referencing the ARN and cluster name.
    #[test]
    fn eks_server_with_role_arn_gets_aws_auth() {
        let secret = build_secret(
            &sample_credentials("https://x.eks.amazonaws.com"),
            Some("arn:aws:iam::123:role/y"),
        )
        .expect("build");

        let config = config_payload(&secret);
        assert_eq!(config.tls_client_config.ca_data.as_deref(), Some("Y2EtZGF0YQ=="));

        let aws = config.aws_auth_config.expect("awsAuthConfig present");
        assert_eq!(aws.cluster_name, "prod");
        assert_eq!(aws.role_arn, "arn:aws:iam::123:role/y");
    }

    /// Story: a bare-IP server has no "eks" marker, so the config payload is
    /// TLS-only no matter what role is configured.
    #[test]
    fn non_eks_server_gets_tls_only_config() {
        let secret = build_secret(
            &sample_credentials("https://10.0.0.1:6443"),
            Some("arn:aws:iam::123:role/y"),
        )
        .expect("build");

        let config = config_payload(&secret);
        assert!(config.aws_auth_config.is_none());
        assert_eq!(
            config.tls_client_config.cert_data.as_deref(),
            Some("Y2VydC1kYXRh")
        );
        assert_eq!(
            config.tls_client_config.key_data.as_deref(),
            Some("a2V5LWRhdGE=")
        );
    }

    #[test]
    fn eks_server_without_role_arn_gets_tls_only_config() {
        let secret =
            build_secret(&sample_credentials("https://x.eks.amazonaws.com"), None).expect("build");

        assert!(config_payload(&secret).aws_auth_config.is_none());
    }

    /// Idempotence at the data level: building twice from the same
    /// credentials yields the same secret.
    #[test]
    fn build_is_deterministic() {
        let creds = sample_credentials("https://x.eks.amazonaws.com");
        let first = build_secret(&creds, Some("arn:aws:iam::123:role/y")).expect("build");
        let second = build_secret(&creds, Some("arn:aws:iam::123:role/y")).expect("build");
        assert_eq!(first, second);
    }
}
