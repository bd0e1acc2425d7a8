//! Security groups and rules connecting the edge and the service tier.
//!
//! The service group is declared without ingress; its ingress comes from
//! standalone rules so the group never has to reference itself while it
//! is being created.

use mbdeploy_common::constants::{ANYWHERE_CIDR, HTTP_PORT, HTTPS_PORT, SERVICE_PORT};
use mbdeploy_common::error::Result;
use mbdeploy_common::types::ResourceKind;
use serde_json::{Value, json};

use super::StackContext;
use crate::descriptor::{ResolvedResource, ResourceDescriptor};

/// Highest TCP port.
const MAX_PORT: u16 = 65535;

/// The two security groups of a stack and the rules joining them.
#[derive(Debug, Clone)]
pub struct SecurityGroupPair {
    /// Group of the compute tasks and the database.
    pub service: ResolvedResource,
    /// Group of the load balancer.
    pub edge: ResolvedResource,
    /// Standalone rules on the service group.
    pub rules: Vec<ResolvedResource>,
}

/// Descriptor of the service-tier security group.
#[must_use]
pub fn service_group_descriptor(name: &str, vpc_id: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(ResourceKind::SecurityGroup, name).property("vpcId", vpc_id)
}

/// Descriptor of the load balancer security group.
#[must_use]
pub fn edge_group_descriptor(name: &str, vpc_id: &str, service: &ResolvedResource) -> ResourceDescriptor {
    ResourceDescriptor::new(ResourceKind::SecurityGroup, name)
        .property("vpcId", vpc_id)
        .property(
            "ingress",
            json!([
                cidr_rule(HTTPS_PORT, HTTPS_PORT),
                cidr_rule(HTTP_PORT, HTTP_PORT),
            ]),
        )
        .property(
            "egress",
            json!([
                {
                    "protocol": "tcp",
                    "fromPort": SERVICE_PORT,
                    "toPort": SERVICE_PORT,
                    "securityGroups": [service.id],
                },
                cidr_rule(HTTPS_PORT, HTTPS_PORT),
            ]),
        )
        .reads(service)
}

fn cidr_rule(from: u16, to: u16) -> Value {
    json!({
        "protocol": "tcp",
        "fromPort": from,
        "toPort": to,
        "cidrBlocks": [ANYWHERE_CIDR],
    })
}

/// Descriptors of the three standalone rules on the service group.
#[must_use]
pub fn rule_descriptors(
    ctx: &StackContext<'_>,
    service: &ResolvedResource,
    edge: &ResolvedResource,
) -> [ResourceDescriptor; 3] {
    let rule = |suffix: &str, description: &str, direction: &str, from: u16, to: u16| {
        ResourceDescriptor::new(ResourceKind::SecurityGroupRule, ctx.resource_name(suffix))
            .property("description", description)
            .property("securityGroupId", service.id.as_str())
            .property("type", direction)
            .property("protocol", "tcp")
            .property("fromPort", from)
            .property("toPort", to)
            .reads(service)
    };

    [
        rule(
            "segment",
            "Allow access to the application from the load balancer",
            "ingress",
            SERVICE_PORT,
            SERVICE_PORT,
        )
        .property("sourceSecurityGroupId", edge.id.as_str())
        .reads(edge),
        rule(
            "self",
            "Allow access to anything from within the security group",
            "ingress",
            0,
            MAX_PORT,
        )
        .property("sourceSecurityGroupId", service.id.as_str()),
        rule("egress", "Allow egress to anywhere", "egress", 0, MAX_PORT)
            .property("cidrBlocks", json!([ANYWHERE_CIDR])),
    ]
}

/// Declares the security group pair and its rules.
///
/// The rules are declared only once both groups exist.
///
/// # Errors
///
/// Returns an error if any group or rule fails to provision.
pub async fn build_security(ctx: &StackContext<'_>, vpc_id: &str) -> Result<SecurityGroupPair> {
    let service = ctx
        .declare(service_group_descriptor(&ctx.resource_name("sg"), vpc_id))
        .await?;
    let edge = ctx
        .declare(edge_group_descriptor(
            &ctx.resource_name("lb-sg"),
            vpc_id,
            &service,
        ))
        .await?;

    let [segment, self_rule, egress] = rule_descriptors(ctx, &service, &edge);
    let (segment, self_rule, egress) = tokio::try_join!(
        ctx.declare(segment),
        ctx.declare(self_rule),
        ctx.declare(egress),
    )?;

    Ok(SecurityGroupPair {
        service,
        edge,
        rules: vec![segment, self_rule, egress],
    })
}
