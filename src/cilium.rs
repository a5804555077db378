//! Network overlay template rendering
//!
//! Renders the embedded Cilium manifest for a workload cluster. The manifest
//! is a fixed, versioned template; the only per-cluster inputs are the
//! control plane host and port, which Cilium's kube-proxy replacement needs
//! before in-cluster service routing exists.

use minijinja::{context, Environment};

use crate::Error;

/// The versioned Cilium overlay manifest template
const CILIUM_TEMPLATE: &str = include_str!("cilium.yaml");

/// Render the Cilium overlay manifest for a cluster's API server endpoint
///
/// Pure string templating; no Kubernetes access. The port is rendered in
/// decimal, the host verbatim.
pub fn render(host: &str, port: i32) -> Result<String, Error> {
    let mut env = Environment::new();
    env.add_template("cilium", CILIUM_TEMPLATE)
        .map_err(|e| Error::template(e.to_string()))?;

    let template = env
        .get_template("cilium")
        .map_err(|e| Error::template(e.to_string()))?;

    template
        .render(context! { cluster_host => host, cluster_port => port })
        .map_err(|e| Error::template(e.to_string()))
}
