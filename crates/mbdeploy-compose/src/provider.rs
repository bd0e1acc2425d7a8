//! Boundary traits toward the provisioning backend and the lookup services.
//!
//! The composition engine only declares descriptors and reads back
//! resolved attributes; creating, updating, and deleting cloud objects is
//! the backend's concern, and so are retries and timeouts.

use mbdeploy_common::error::Result;
use mbdeploy_common::types::{ResourceRef, SubnetId};
use serde::{Deserialize, Serialize};

use crate::descriptor::{ResolvedResource, ResourceDescriptor};
use crate::stack::StackOutputs;

/// Creates the cloud object behind a descriptor.
#[async_trait::async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Provisions a resource and resolves once the real object exists.
    ///
    /// Every dependency of the descriptor has already resolved when this
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the declaration.
    async fn provision(&self, descriptor: &ResourceDescriptor) -> Result<ResolvedResource>;

    /// Registers the final outputs of a stack on its component.
    ///
    /// # Errors
    ///
    /// Returns an error if the outputs cannot be recorded.
    async fn register_outputs(&self, component: &ResourceRef, outputs: &StackOutputs)
    -> Result<()>;
}

/// Read-only queries against existing infrastructure.
///
/// Lookups have no side effects; calling them twice yields the same answer.
#[async_trait::async_trait]
pub trait LookupService: Send + Sync {
    /// Returns the VPC with the given ID, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails.
    async fn vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>>;

    /// Lists the subnets of a VPC in provider order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails.
    async fn subnets(&self, vpc_id: &str) -> Result<Vec<SubnetInfo>>;

    /// Returns the hosted zone with the given name, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails.
    async fn hosted_zone(&self, name: &str) -> Result<Option<HostedZone>>;

    /// Returns the IAM role with the given name, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails.
    async fn role(&self, name: &str) -> Result<Option<RoleInfo>>;
}

/// An existing VPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcInfo {
    /// VPC ID.
    pub id: String,
}

/// An existing subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetInfo {
    /// Subnet ID.
    pub id: SubnetId,
    /// Availability zone the subnet lives in.
    pub availability_zone: String,
    /// Whether instances launched here receive a public IP.
    #[serde(default, alias = "isPubliclyRoutable")]
    pub map_public_ip_on_launch: bool,
}

/// An existing DNS hosted zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedZone {
    /// Zone ID.
    pub id: String,
    /// Zone name.
    pub name: String,
}

/// An existing IAM role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    /// Role name.
    pub name: String,
    /// Role ARN.
    pub arn: String,
}
