//! Unified error types for the mbdeploy workspace.
//!
//! Every failure the composition can surface maps onto one of these
//! variants. None of them is retried inside the workspace, and none of
//! them carries a secret value in its message.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackError {
    /// The input configuration is inconsistent or names something unknown.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Subnet auto-discovery could not find two usable subnets.
    #[error(
        "VPC {vpc_id} must have at least two public subnets (auto-assigning public IPs) \
         in two distinct availability zones, found {found}; configure the VPC accordingly \
         or provide explicit subnet ids in the networking options"
    )]
    InsufficientSubnets {
        /// VPC that was searched.
        vpc_id: String,
        /// Number of qualifying subnets that were found.
        found: usize,
    },

    /// A lookup returned no match.
    #[error("{kind} lookup returned no match for {key}")]
    LookupFailure {
        /// Type of the looked-up resource.
        kind: &'static str,
        /// Key the lookup was performed with.
        key: String,
    },

    /// The provisioning backend rejected a resource declaration.
    #[error("provisioning {logical_name} failed: {reason}")]
    ProvisioningFailure {
        /// Logical name of the originating resource.
        logical_name: String,
        /// Reason reported by the backend.
        reason: String,
    },

    /// The resource dependency graph is inconsistent.
    #[error("dependency graph error: {message}")]
    Graph {
        /// Description of the graph problem.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl StackError {
    /// Shorthand for an [`StackError::InvalidConfiguration`] error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Shorthand for a [`StackError::ProvisioningFailure`] error.
    pub fn provisioning(logical_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProvisioningFailure {
            logical_name: logical_name.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_subnets_message_is_actionable() {
        let err = StackError::InsufficientSubnets {
            vpc_id: "vpc-123".into(),
            found: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("vpc-123"), "got: {msg}");
        assert!(msg.contains("two distinct availability zones"), "got: {msg}");
        assert!(msg.contains("explicit subnet ids"), "got: {msg}");
    }

    #[test]
    fn provisioning_failure_names_resource() {
        let err = StackError::provisioning("demo-metabase-sg", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "provisioning demo-metabase-sg failed: quota exceeded"
        );
    }

    #[test]
    fn lookup_failure_names_kind_and_key() {
        let err = StackError::LookupFailure {
            kind: "hosted zone",
            key: "example.com".into(),
        };
        assert_eq!(
            err.to_string(),
            "hosted zone lookup returned no match for example.com"
        );
    }
}
