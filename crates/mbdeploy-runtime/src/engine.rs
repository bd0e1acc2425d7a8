//! Deployment engine that drives stack composition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mbdeploy_common::config::{Defaults, StackConfig};
use mbdeploy_common::error::Result;
use mbdeploy_common::types::ResourceRef;
use mbdeploy_compose::descriptor::ResourceDescriptor;
use mbdeploy_compose::graph::DependencyGraph;
use mbdeploy_compose::provider::{LookupService, ProvisioningBackend};
use mbdeploy_compose::resolver::ResolvedConfig;
use mbdeploy_compose::stack::{StackComposer, StackOptions, StackOutputs};
use mbdeploy_compose::subnet::SubnetPlan;
use serde::Serialize;

use crate::backend::DryRunBackend;
use crate::lookup::{Inventory, StaticLookup};

/// The result of deploying one stack.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Stack name.
    pub stack: String,
    /// Reference of the stack component.
    pub component: ResourceRef,
    /// Registered outputs.
    pub outputs: StackOutputs,
    /// Configuration after defaults and validation.
    pub config: ResolvedConfig,
    /// Subnet sets of the three tiers.
    pub subnets: SubnetPlan,
    /// Declared resources, in declaration order.
    pub resources: Vec<ResourceDescriptor>,
    /// Resources in dependency order.
    pub order: Vec<ResourceRef>,
    /// Dependency graph over `resources`.
    #[serde(skip)]
    pub graph: DependencyGraph,
    /// When the deployment was computed.
    pub planned_at: DateTime<Utc>,
}

/// Coordinates composition against a backend and a lookup service.
pub struct Engine {
    backend: Arc<dyn ProvisioningBackend>,
    lookup: Arc<dyn LookupService>,
    defaults: Defaults,
}

impl Engine {
    /// Creates an engine over the given collaborators.
    #[must_use]
    pub fn new(backend: Arc<dyn ProvisioningBackend>, lookup: Arc<dyn LookupService>) -> Self {
        Self {
            backend,
            lookup,
            defaults: Defaults::default(),
        }
    }

    /// Creates an engine that plans against a dry-run backend and the
    /// given inventory.
    #[must_use]
    pub fn dry_run(inventory: Inventory) -> Self {
        Self::new(
            Arc::new(DryRunBackend::new()),
            Arc::new(StaticLookup::new(inventory)),
        )
    }

    /// Replaces the defaults injected into configuration resolution.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Composes and provisions one stack.
    ///
    /// Two deployments targeting the same stack name must not run
    /// concurrently; serializing them is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by configuration resolution, a
    /// lookup, or the backend.
    pub async fn deploy(
        &self,
        name: &str,
        config: &StackConfig,
        options: &StackOptions,
    ) -> Result<Deployment> {
        tracing::info!(stack = name, "deploying stack");
        let composer = StackComposer::new(self.backend.as_ref(), self.lookup.as_ref())
            .with_defaults(self.defaults.clone());
        let composition = composer.compose(name, config, options).await?;
        tracing::info!(
            stack = name,
            resources = composition.descriptors.len(),
            "stack deployed"
        );

        Ok(Deployment {
            stack: name.to_string(),
            component: composition.component,
            outputs: composition.outputs,
            config: composition.config,
            subnets: composition.subnets,
            resources: composition.descriptors,
            order: composition.order,
            graph: composition.graph,
            planned_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
