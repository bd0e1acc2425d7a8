//! Container cluster, task definition, and the long-running service.

use mbdeploy_common::constants::{
    CONTAINER_NAME, EXECUTION_ROLE_NAME, SERVICE_PORT, TASK_CPU, TASK_FAMILY, TASK_MEMORY,
};
use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::ResourceKind;
use serde_json::json;

use super::StackContext;
use crate::descriptor::{ResolvedResource, ResourceDescriptor};
use crate::environment::ContainerDefinition;
use crate::subnet::SubnetSet;

const CONTAINER_DEFINITIONS: &str = "containerDefinitions";

/// The provisioned compute tier.
#[derive(Debug, Clone)]
pub struct ComputeService {
    /// The container cluster.
    pub cluster: ResolvedResource,
    /// The task definition.
    pub task_definition: ResolvedResource,
    /// The service running one task.
    pub service: ResolvedResource,
}

/// Resolves the ARN of the task execution role.
///
/// # Errors
///
/// Returns [`StackError::LookupFailure`] if the role does not exist.
pub async fn execution_role_arn(ctx: &StackContext<'_>) -> Result<String> {
    ctx.lookup()
        .role(EXECUTION_ROLE_NAME)
        .await?
        .map(|role| role.arn)
        .ok_or_else(|| StackError::LookupFailure {
            kind: "IAM role",
            key: EXECUTION_ROLE_NAME.to_string(),
        })
}

/// Descriptor of the task definition.
///
/// The container definitions are rendered twice: redacted into the
/// plain properties and with real values into the secret properties.
///
/// # Errors
///
/// Returns an error if the container definition cannot be serialized.
pub fn task_definition_descriptor(
    name: &str,
    execution_role_arn: &str,
    container: &ContainerDefinition,
) -> Result<ResourceDescriptor> {
    Ok(ResourceDescriptor::new(ResourceKind::TaskDefinition, name)
        .property("family", TASK_FAMILY)
        .property("cpu", TASK_CPU)
        .property("memory", TASK_MEMORY)
        .property("requiresCompatibilities", json!(["FARGATE"]))
        .property("networkMode", "awsvpc")
        .property("executionRoleArn", execution_role_arn)
        .property(CONTAINER_DEFINITIONS, container.to_redacted_json()?)
        .secret_property(CONTAINER_DEFINITIONS, container.to_exposed_json()?))
}

/// Inputs of the service descriptor.
#[derive(Debug, Clone, Copy)]
pub struct ServiceInputs<'r> {
    /// Cluster the service runs in.
    pub cluster: &'r ResolvedResource,
    /// Task definition to run.
    pub task_definition: &'r ResolvedResource,
    /// Target group the task registers in.
    pub target_group: &'r ResolvedResource,
    /// Listener that must exist before the service starts.
    pub listener: &'r ResolvedResource,
    /// Security group of the tasks.
    pub service_group: &'r ResolvedResource,
    /// Subnets the tasks are placed in.
    pub subnets: &'r SubnetSet,
    /// Whether tasks receive a public IP.
    pub assign_public_ip: bool,
}

/// Descriptor of the service.
///
/// # Errors
///
/// Returns a provisioning failure if an input lacks its ARN.
pub fn service_descriptor(name: &str, inputs: &ServiceInputs<'_>) -> Result<ResourceDescriptor> {
    Ok(ResourceDescriptor::new(ResourceKind::EcsService, name)
        .property("cluster", inputs.cluster.arn()?)
        .property("taskDefinition", inputs.task_definition.arn()?)
        .property("desiredCount", 1)
        .property("deploymentMaximumPercent", 100)
        .property("deploymentMinimumHealthyPercent", 0)
        .property("launchType", "FARGATE")
        .property(
            "networkConfiguration",
            json!({
                "assignPublicIp": inputs.assign_public_ip,
                "subnets": inputs.subnets.id_strings(),
                "securityGroups": [inputs.service_group.id],
            }),
        )
        .property(
            "loadBalancers",
            json!([{
                "containerName": CONTAINER_NAME,
                "containerPort": SERVICE_PORT,
                "targetGroupArn": inputs.target_group.arn()?,
            }]),
        )
        .reads(inputs.cluster)
        .reads(inputs.task_definition)
        .reads(inputs.target_group)
        .reads(inputs.service_group)
        .depends_on(inputs.listener))
}

/// Declares the cluster, the task definition, and the service.
///
/// The service is declared only after the listener exists, so the target
/// group is attached to a load balancer by the time tasks register in it.
///
/// # Errors
///
/// Returns an error if the execution role is missing or any resource fails
/// to provision.
pub async fn build_compute(
    ctx: &StackContext<'_>,
    container: &ContainerDefinition,
    subnets: &SubnetSet,
    assign_public_ip: bool,
    service_group: &ResolvedResource,
    target_group: &ResolvedResource,
    listener: &ResolvedResource,
) -> Result<ComputeService> {
    let base = ctx.base_name();
    let (cluster, role_arn) = tokio::try_join!(
        ctx.declare(ResourceDescriptor::new(ResourceKind::EcsCluster, base.as_str())),
        execution_role_arn(ctx),
    )?;

    let task_definition = ctx
        .declare(task_definition_descriptor(&base, &role_arn, container)?)
        .await?;

    let inputs = ServiceInputs {
        cluster: &cluster,
        task_definition: &task_definition,
        target_group,
        listener,
        service_group,
        subnets,
        assign_public_ip,
    };
    let service = ctx.declare(service_descriptor(&base, &inputs)?).await?;
    tracing::info!(service = %service.id, assign_public_ip, "service declared");

    Ok(ComputeService {
        cluster,
        task_definition,
        service,
    })
}
