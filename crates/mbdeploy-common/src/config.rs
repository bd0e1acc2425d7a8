//! Input configuration model for a stack.
//!
//! Every field is optional; the composition engine resolves the sparse
//! input into a fully-defaulted configuration before declaring anything.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};
use crate::types::{Secret, SubnetId};

/// Root configuration of one stack deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    /// Existing VPC to deploy into. The default VPC is used when absent.
    #[serde(default)]
    pub vpc_id: Option<String>,
    /// Explicit subnet sets per tier.
    #[serde(default, alias = "networkOverrides")]
    pub networking: Option<NetworkOverrides>,
    /// Custom domain served over HTTPS.
    #[serde(default)]
    pub domain: Option<DomainConfig>,
    /// Database options.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Identity-provider authentication in front of the application.
    #[serde(default)]
    pub authentication: Option<AuthenticationConfig>,
    /// Outbound email settings handed to the application.
    #[serde(default)]
    pub email: Option<EmailConfig>,
    /// Application image tag.
    #[serde(default, alias = "version")]
    pub metabase_version: Option<String>,
}

/// Explicit subnet sets, one optional list per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkOverrides {
    /// Subnets for the compute tasks.
    #[serde(default, alias = "ecsSubnets")]
    pub ecs_subnet_ids: Option<Vec<SubnetId>>,
    /// Subnets for the database cluster.
    #[serde(default, alias = "dbSubnets")]
    pub db_subnet_ids: Option<Vec<SubnetId>>,
    /// Subnets for the load balancer.
    #[serde(default, alias = "lbSubnets")]
    pub lb_subnet_ids: Option<Vec<SubnetId>>,
}

/// Custom domain settings. Both fields are set or neither is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    /// Name of the existing hosted zone.
    #[serde(default)]
    pub hosted_zone_name: Option<String>,
    /// Fully-qualified domain name to serve the application on.
    #[serde(default)]
    pub domain_name: Option<String>,
}

/// Database settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Cluster engine version. Changing it replaces the cluster.
    #[serde(default)]
    pub engine_version: Option<String>,
}

/// Authentication strategy selection and its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationConfig {
    /// Strategy name, e.g. `google`.
    pub strategy: String,
    /// Strategy-specific arguments. Values are kept redacted.
    #[serde(default)]
    pub strategy_args: BTreeMap<String, Secret>,
}

/// Outbound SMTP settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    /// SMTP host. Email is enabled only when this is non-empty.
    #[serde(default)]
    pub host: Option<String>,
    /// SMTP port.
    #[serde(default)]
    pub port: Option<u16>,
    /// SMTP security mode.
    #[serde(default)]
    pub security: Option<String>,
    /// SMTP user.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<Secret>,
}

impl StackConfig {
    /// Loads a configuration file, choosing JSON or YAML by extension.
    ///
    /// Files without a `.json` extension are parsed as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parses a YAML (or JSON) document.
    ///
    /// An empty document yields the empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Process-wide defaults injected into configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Engine version used when none is configured.
    pub engine_version: String,
    /// Image tag used when none is configured.
    pub image_version: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            engine_version: crate::constants::DEFAULT_ENGINE_VERSION.to_string(),
            image_version: crate::constants::DEFAULT_IMAGE_VERSION.to_string(),
        }
    }
}
