//! Error types for the cluster registration operator

use thiserror::Error;

/// Main error type for registration operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The kubeconfig blob is structurally invalid (missing context, cluster
    /// or user entry for the current context)
    #[error("malformed kubeconfig: {0}")]
    MalformedKubeconfig(String),

    /// The connection credential secret does not exist yet
    #[error("credential not found: {0}")]
    CredentialNotFound(String),

    /// A cluster record is missing a field this operator requires
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Overlay template rendering error
    #[error("template error: {0}")]
    Template(String),
}

impl Error {
    /// Create a malformed-kubeconfig error with the given message
    pub fn malformed_kubeconfig(msg: impl Into<String>) -> Self {
        Self::MalformedKubeconfig(msg.into())
    }

    /// Create a credential-not-found error with the given message
    pub fn credential_not_found(msg: impl Into<String>) -> Self {
        Self::CredentialNotFound(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a template error with the given message
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }
}
