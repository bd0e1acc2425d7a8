//! Lookups answered from a static inventory of existing infrastructure.

use std::path::Path;

use mbdeploy_common::error::{Result, StackError};
use mbdeploy_compose::provider::{HostedZone, LookupService, RoleInfo, SubnetInfo, VpcInfo};
use serde::{Deserialize, Serialize};

/// A subnet together with the VPC it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySubnet {
    /// Owning VPC.
    pub vpc_id: String,
    /// Subnet attributes.
    #[serde(flatten)]
    pub subnet: SubnetInfo,
}

/// Existing infrastructure, as read from an inventory file.
///
/// ```yaml
/// vpcs:
///   - id: vpc-0abc
/// subnets:
///   - vpcId: vpc-0abc
///     id: subnet-1
///     availabilityZone: us-east-1a
///     mapPublicIpOnLaunch: true
/// hostedZones:
///   - id: Z123
///     name: example.com
/// roles:
///   - name: ecsTaskExecutionRole
///     arn: arn:aws:iam::123456789012:role/ecsTaskExecutionRole
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inventory {
    /// Known VPCs.
    pub vpcs: Vec<VpcInfo>,
    /// Known subnets, in provider order.
    pub subnets: Vec<InventorySubnet>,
    /// Known hosted zones.
    pub hosted_zones: Vec<HostedZone>,
    /// Known IAM roles.
    pub roles: Vec<RoleInfo>,
}

impl Inventory {
    /// Reads an inventory file. Files ending in `.json` are parsed as JSON,
    /// anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let inventory: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        tracing::debug!(
            path = %path.display(),
            vpcs = inventory.vpcs.len(),
            subnets = inventory.subnets.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }
}

/// A [`LookupService`] over an in-memory [`Inventory`].
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    inventory: Inventory,
}

impl StaticLookup {
    /// Wraps an inventory.
    #[must_use]
    pub const fn new(inventory: Inventory) -> Self {
        Self { inventory }
    }

    /// Returns the wrapped inventory.
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }
}

#[async_trait::async_trait]
impl LookupService for StaticLookup {
    async fn vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>> {
        Ok(self.inventory.vpcs.iter().find(|v| v.id == vpc_id).cloned())
    }

    async fn subnets(&self, vpc_id: &str) -> Result<Vec<SubnetInfo>> {
        Ok(self
            .inventory
            .subnets
            .iter()
            .filter(|s| s.vpc_id == vpc_id)
            .map(|s| s.subnet.clone())
            .collect())
    }

    async fn hosted_zone(&self, name: &str) -> Result<Option<HostedZone>> {
        let wanted = name.trim_end_matches('.');
        Ok(self
            .inventory
            .hosted_zones
            .iter()
            .find(|z| z.name.trim_end_matches('.') == wanted)
            .cloned())
    }

    async fn role(&self, name: &str) -> Result<Option<RoleInfo>> {
        Ok(self.inventory.roles.iter().find(|r| r.name == name).cloned())
    }
}
