//! Serverless database cluster and its generated credential.
//!
//! The credential only ever travels as a [`Secret`](mbdeploy_common::types::Secret):
//! out of the password resource, into the cluster's secret properties, and
//! from the cluster into the container environment.

use mbdeploy_common::constants::{
    DB_ENGINE, DB_ENGINE_MODE, DB_MASTER_USER, DB_NAME, DB_PASSWORD_LENGTH,
};
use mbdeploy_common::error::Result;
use mbdeploy_common::types::ResourceKind;
use serde_json::json;

use super::StackContext;
use crate::descriptor::{ResolvedResource, ResourceDescriptor};
use crate::subnet::SubnetSet;

/// The provisioned data tier.
#[derive(Debug, Clone)]
pub struct DataTier {
    /// Generated master password.
    pub password: ResolvedResource,
    /// Subnet group the cluster is placed in.
    pub subnet_group: ResolvedResource,
    /// The database cluster.
    pub cluster: ResolvedResource,
}

/// Descriptor of the generated master password.
#[must_use]
pub fn password_descriptor(name: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(ResourceKind::RandomPassword, name)
        .property("length", DB_PASSWORD_LENGTH)
        .property("special", false)
        .secret_output("result")
}

/// Descriptor of the subnet group over the database subnets.
#[must_use]
pub fn subnet_group_descriptor(name: &str, subnets: &SubnetSet) -> ResourceDescriptor {
    ResourceDescriptor::new(ResourceKind::DbSubnetGroup, name)
        .property("subnetIds", subnets.id_strings())
}

/// Descriptor of the serverless cluster.
///
/// # Errors
///
/// Returns a provisioning failure if the password or subnet group lacks
/// the attributes the cluster needs.
pub fn cluster_descriptor(
    ctx: &StackContext<'_>,
    engine_version: &str,
    password: &ResolvedResource,
    subnet_group: &ResolvedResource,
    service_group: &ResolvedResource,
) -> Result<ResourceDescriptor> {
    let stack = ctx.stack_name();
    Ok(ResourceDescriptor::new(ResourceKind::DbCluster, ctx.base_name())
        .property("clusterIdentifier", format!("{stack}metabasemysql"))
        .property("databaseName", DB_NAME)
        .property("masterUsername", DB_MASTER_USER)
        .property("engine", DB_ENGINE)
        .property("engineMode", DB_ENGINE_MODE)
        .property("engineVersion", engine_version)
        .property("dbSubnetGroupName", subnet_group.str_attribute("name")?)
        .property("vpcSecurityGroupIds", json!([service_group.id]))
        .property("finalSnapshotIdentifier", format!("{stack}metabasefinalsnapshot"))
        .property("enableHttpEndpoint", true)
        .secret_property("masterPassword", password.secret("result")?.clone())
        .secret_output("masterPassword")
        .reads(password)
        .reads(subnet_group)
        .reads(service_group))
}

/// Declares the credential, the subnet group, and the cluster.
///
/// Changing `engine_version` on an existing stack replaces the cluster.
///
/// # Errors
///
/// Returns an error if any of the three resources fails to provision.
pub async fn build_data_tier(
    ctx: &StackContext<'_>,
    subnets: &SubnetSet,
    engine_version: &str,
    service_group: &ResolvedResource,
) -> Result<DataTier> {
    let base = ctx.base_name();
    let (password, subnet_group) = tokio::try_join!(
        ctx.declare(password_descriptor(&base)),
        ctx.declare(subnet_group_descriptor(&base, subnets)),
    )?;

    let cluster = ctx
        .declare(cluster_descriptor(
            ctx,
            engine_version,
            &password,
            &subnet_group,
            service_group,
        )?)
        .await?;
    tracing::info!(cluster = %cluster.id, engine_version, "database cluster ready");

    Ok(DataTier {
        password,
        subnet_group,
        cluster,
    })
}
