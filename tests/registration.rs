//! End-to-end registration flow tests at the data level
//!
//! These exercise the full path from a generated kubeconfig blob to the
//! Argo CD objects the operator writes, without needing a cluster: parse
//! credentials, derive the registration secret, track project destinations,
//! and build the overlay bundle.

use std::collections::BTreeMap;

use argocd_cluster_register::argo::{ApplicationDestination, ClusterConfig};
use argocd_cluster_register::capi::{Cluster, ClusterSpec, ControlPlaneEndpoint};
use argocd_cluster_register::kubeconfig::ClusterCredentials;
use argocd_cluster_register::overlay::{build_overlay, OVERLAY_DATA_KEY};
use argocd_cluster_register::project::{has_destination, remove_destination};
use argocd_cluster_register::registry::build_secret;

fn kubeconfig_for(server: &str) -> String {
    format!(
        r#"
apiVersion: v1
kind: Config
current-context: prod
clusters:
- name: prod
  cluster:
    server: {server}
    certificate-authority-data: Y2EtZGF0YQ==
contexts:
- name: prod
  context:
    cluster: prod
    user: prod-admin
users:
- name: prod-admin
  user:
    client-certificate-data: Y2VydC1kYXRh
    client-key-data: a2V5LWRhdGE=
"#
    )
}

/// An EKS cluster with a configured role ARN ends up with a registration
/// secret carrying both TLS material and the IAM role binding.
#[test]
fn eks_kubeconfig_to_registration_secret_with_role() {
    let creds =
        ClusterCredentials::from_kubeconfig(kubeconfig_for("https://x.eks.amazonaws.com").as_bytes())
            .expect("kubeconfig parses");

    let secret = build_secret(&creds, Some("arn:aws:iam::123:role/y")).expect("secret builds");

    let data = secret.string_data.as_ref().expect("string data");
    assert_eq!(data["name"], "prod");
    assert_eq!(data["server"], "https://x.eks.amazonaws.com");

    let config: ClusterConfig = serde_json::from_str(&data["config"]).expect("config parses");
    assert_eq!(config.tls_client_config.ca_data.as_deref(), Some("Y2EtZGF0YQ=="));
    assert_eq!(config.tls_client_config.cert_data.as_deref(), Some("Y2VydC1kYXRh"));
    assert_eq!(config.tls_client_config.key_data.as_deref(), Some("a2V5LWRhdGE="));

    let aws = config.aws_auth_config.expect("role binding present");
    assert_eq!(aws.cluster_name, "prod");
    assert_eq!(aws.role_arn, "arn:aws:iam::123:role/y");
}

/// A plain self-hosted API server gets TLS material only, even when a role
/// ARN is configured for the fleet.
#[test]
fn plain_kubeconfig_to_tls_only_registration_secret() {
    let creds =
        ClusterCredentials::from_kubeconfig(kubeconfig_for("https://10.0.0.1:6443").as_bytes())
            .expect("kubeconfig parses");

    let secret = build_secret(&creds, Some("arn:aws:iam::123:role/y")).expect("secret builds");

    let data = secret.string_data.as_ref().expect("string data");
    let config: ClusterConfig = serde_json::from_str(&data["config"]).expect("config parses");
    assert!(config.aws_auth_config.is_none());
    assert!(config.tls_client_config.ca_data.is_some());
}

/// The full project membership story: a cluster not yet a member of either
/// configured project is added to both, removed from both, and a re-add
/// leaves exactly one entry per project.
#[test]
fn membership_across_two_projects_converges() {
    let creds =
        ClusterCredentials::from_kubeconfig(kubeconfig_for("https://10.0.0.1:6443").as_bytes())
            .expect("kubeconfig parses");

    let mut team_a: Vec<ApplicationDestination> = Vec::new();
    let mut team_b = vec![ApplicationDestination {
        name: Some("in-cluster".to_string()),
        server: Some("https://kubernetes.default.svc".to_string()),
        namespace: None,
    }];

    for destinations in [&mut team_a, &mut team_b] {
        if !has_destination(destinations, &creds.cluster_name, &creds.server) {
            destinations.push(ApplicationDestination {
                name: Some(creds.cluster_name.clone()),
                server: Some(creds.server.clone()),
                namespace: None,
            });
        }
    }

    assert!(has_destination(&team_a, "prod", "https://10.0.0.1:6443"));
    assert!(has_destination(&team_b, "prod", "https://10.0.0.1:6443"));
    assert_eq!(team_a.len(), 1);
    assert_eq!(team_b.len(), 2, "pre-existing destinations are untouched");

    for destinations in [&mut team_a, &mut team_b] {
        remove_destination(destinations, &creds.cluster_name, &creds.server);
    }

    assert!(!has_destination(&team_a, "prod", "https://10.0.0.1:6443"));
    assert!(!has_destination(&team_b, "prod", "https://10.0.0.1:6443"));
    assert_eq!(team_b.len(), 1, "only the managed entry was removed");
}

/// The overlay bundle is derived from the cluster record alone: named after
/// the cluster, owned by it, and carrying the rendered manifest with the
/// control plane endpoint substituted in.
#[test]
fn cluster_record_to_overlay_bundle() {
    let mut cluster = Cluster::new(
        "workload-1",
        ClusterSpec {
            control_plane_endpoint: Some(ControlPlaneEndpoint {
                host: "172.18.0.3".to_string(),
                port: 6443,
            }),
        },
    );
    cluster.metadata.namespace = Some("fleet".to_string());
    cluster.metadata.uid = Some("abc-123".to_string());
    cluster.metadata.labels = Some(BTreeMap::from([(
        "environment".to_string(),
        "prod".to_string(),
    )]));

    let (config_map, resource_set) = build_overlay(&cluster).expect("overlay builds");

    assert_eq!(config_map.metadata.name.as_deref(), Some("workload-1-cni"));
    assert_eq!(resource_set.metadata.name.as_deref(), Some("workload-1-cni"));

    let manifest = &config_map.data.as_ref().expect("configmap data")[OVERLAY_DATA_KEY];
    assert!(manifest.contains("172.18.0.3"));
    assert!(manifest.contains("\"6443\""));

    assert_eq!(
        resource_set.spec.cluster_selector.match_labels["environment"],
        "prod"
    );
}
