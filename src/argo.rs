//! Argo CD interface types
//!
//! The registration flow writes two kinds of Argo CD state: cluster
//! registration secrets (whose `config` field carries a serialized
//! [`ClusterConfig`]) and `AppProject` destination lists. These are partial
//! models of Argo CD's own types, shaped to match its wire format exactly.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label identifying a secret as belonging to Argo CD
pub const PART_OF_LABEL: (&str, &str) = ("app.kubernetes.io/part-of", "argocd");

/// Label identifying a secret as a cluster registration secret
pub const SECRET_TYPE_LABEL: (&str, &str) = ("argocd.argoproj.io/secret-type", "cluster");

/// Substring of a server URL that marks an EKS control plane
pub const EKS_SERVER_MARKER: &str = "eks";

/// Connection configuration carried in a cluster secret's `config` field
///
/// Serialized as JSON with Argo CD's field names. The TLS section is always
/// present; the AWS section only when the cluster is reached through an
/// assumed IAM role.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// TLS material used to authenticate to the cluster
    pub tls_client_config: TlsClientConfig,

    /// IAM role binding for EKS clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_auth_config: Option<AwsAuthConfig>,
}

/// TLS client configuration, base64 fields as Argo CD expects them
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsClientConfig {
    /// Base64 certificate authority data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_data: Option<String>,

    /// Base64 client certificate data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_data: Option<String>,

    /// Base64 client key data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_data: Option<String>,
}

/// IAM role binding for an EKS cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsAuthConfig {
    /// EKS cluster name
    pub cluster_name: String,

    /// Role assumed when talking to the cluster
    #[serde(rename = "roleARN")]
    pub role_arn: String,
}

/// Spec subset of an Argo CD `AppProject`
///
/// Only the destination list is modeled; every other spec field is captured
/// by the flattened map so a read-modify-write cycle round-trips it
/// unchanged.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "AppProject",
    plural = "appprojects",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AppProjectSpec {
    /// Clusters eligible to receive deployments from this project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<ApplicationDestination>,

    /// Spec fields this operator does not manage, preserved verbatim
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_json::Value>,
}

/// One entry in a project's destination allow-list
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDestination {
    /// API server URL of the destination cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Registered name of the destination cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Target namespace pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
