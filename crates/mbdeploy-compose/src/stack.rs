//! Stack composition.
//!
//! [`StackComposer::compose`] runs the stages in order: configuration
//! resolution, component registration, VPC, subnet selection, security,
//! data tier, certificate and edge, compute, DNS, and output registration.
//! Each stage awaits the resolved attributes of the previous ones.

use mbdeploy_common::config::{Defaults, StackConfig};
use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{ResourceKind, ResourceRef};
use serde::Serialize;

use crate::builders::StackContext;
use crate::builders::{compute, database, dns, edge, network};
use crate::descriptor::ResourceDescriptor;
use crate::environment::{ContainerDefinition, DatabaseEndpoint, assemble_environment};
use crate::graph::DependencyGraph;
use crate::provider::{LookupService, ProvisioningBackend};
use crate::resolver::{self, ResolvedConfig};
use crate::subnet::{self, SubnetPlan};

/// Caller-supplied scoping of a stack.
///
/// Only affects nesting, never what gets declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackOptions {
    /// Resource the stack component is nested under.
    pub parent: Option<ResourceRef>,
}

/// Result registered on the stack component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackOutputs {
    /// ID of the service-tier security group.
    pub security_group_id: String,
    /// Public endpoint of the application.
    pub dns_name: String,
}

/// Everything a composition run produced.
#[derive(Debug, Clone)]
pub struct StackComposition {
    /// Reference of the stack component.
    pub component: ResourceRef,
    /// Registered outputs.
    pub outputs: StackOutputs,
    /// Declared descriptors, in declaration order.
    pub descriptors: Vec<ResourceDescriptor>,
    /// Dependency graph over the declared descriptors.
    pub graph: DependencyGraph,
    /// Topological order of the declared resources.
    pub order: Vec<ResourceRef>,
    /// Subnet sets the tiers were placed in.
    pub subnets: SubnetPlan,
    /// Configuration the stack was composed from.
    pub config: ResolvedConfig,
}

/// Composes stacks against a provisioning backend and a lookup service.
pub struct StackComposer<'a> {
    backend: &'a dyn ProvisioningBackend,
    lookup: &'a dyn LookupService,
    defaults: Defaults,
}

impl<'a> StackComposer<'a> {
    /// Creates a composer using the built-in defaults.
    #[must_use]
    pub fn new(backend: &'a dyn ProvisioningBackend, lookup: &'a dyn LookupService) -> Self {
        Self {
            backend,
            lookup,
            defaults: Defaults::default(),
        }
    }

    /// Replaces the defaults injected into configuration resolution.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Composes one stack.
    ///
    /// The configuration is fully resolved before anything is declared.
    /// The first failing resource aborts every resource that depends on it.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfiguration`] for a bad configuration,
    /// [`StackError::InsufficientSubnets`] if discovery finds too few
    /// subnets, [`StackError::LookupFailure`] for a missing VPC, hosted zone,
    /// or role, and [`StackError::ProvisioningFailure`] for a rejected resource.
    pub async fn compose(
        &self,
        name: &str,
        config: &StackConfig,
        options: &StackOptions,
    ) -> Result<StackComposition> {
        if name.trim().is_empty() {
            return Err(StackError::invalid_config("stack name must not be empty"));
        }
        let config = resolver::resolve(config, &self.defaults)?;
        tracing::info!(stack = name, "composing stack");

        let mut ctx = StackContext::new(name, self.backend, self.lookup);
        let component = ctx.register_component(options.parent.clone()).await?;

        let vpc_id = self.vpc_id(&ctx, config.vpc_id.as_deref()).await?;
        let subnets = subnet::resolve_subnets(self.lookup, &vpc_id, &config.networking).await?;

        let security = network::build_security(&ctx, &vpc_id).await?;
        let data = database::build_data_tier(
            &ctx,
            &subnets.db,
            &config.engine_version,
            &security.service,
        )
        .await?;

        let (zone_id, certificate) = match &config.domain {
            Some(domain) => {
                let zone_id = dns::lookup_zone_id(self.lookup, &domain.hosted_zone_name).await?;
                let bundle = edge::build_certificate(&ctx, domain, &zone_id).await?;
                (Some(zone_id), Some(bundle))
            }
            None => (None, None),
        };
        let edge = edge::build_edge(
            &ctx,
            &vpc_id,
            &subnets.lb,
            &security.edge,
            certificate.as_ref(),
            config.authentication.as_ref(),
        )
        .await?;

        let endpoint = DatabaseEndpoint::from_cluster(&data.cluster)?;
        let environment = assemble_environment(&endpoint, config.email.as_ref());
        let container = ContainerDefinition::new(config.image(), environment);
        let _ = compute::build_compute(
            &ctx,
            &container,
            &subnets.ecs,
            subnets.assign_public_ip(),
            &security.service,
            &edge.target_group,
            &edge.listener,
        )
        .await?;

        let record = match (&config.domain, &zone_id) {
            (Some(domain), Some(zone_id)) => Some(
                dns::build_alias_record(&ctx, domain, zone_id, &edge.load_balancer).await?,
            ),
            _ => None,
        };

        let outputs = StackOutputs {
            security_group_id: security.service.id.clone(),
            dns_name: dns::endpoint(record.as_ref(), &edge.load_balancer)?,
        };
        self.backend.register_outputs(&component, &outputs).await?;
        tracing::info!(stack = name, dns_name = %outputs.dns_name, "stack composed");

        let descriptors = ctx.into_declared();
        let graph = DependencyGraph::from_descriptors(&descriptors)?;
        let order = graph.resolve_order()?;

        Ok(StackComposition {
            component,
            outputs,
            descriptors,
            graph,
            order,
            subnets,
            config,
        })
    }

    /// Returns the VPC the stack lives in, declaring the default VPC when
    /// none is configured.
    async fn vpc_id(&self, ctx: &StackContext<'_>, configured: Option<&str>) -> Result<String> {
        if let Some(id) = configured {
            let vpc = self
                .lookup
                .vpc(id)
                .await?
                .ok_or_else(|| StackError::LookupFailure {
                    kind: "VPC",
                    key: id.to_string(),
                })?;
            return Ok(vpc.id);
        }
        let vpc = ctx
            .declare(ResourceDescriptor::new(
                ResourceKind::DefaultVpc,
                ctx.stack_name(),
            ))
            .await?;
        Ok(vpc.id)
    }
}

impl std::fmt::Debug for StackComposer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackComposer")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
