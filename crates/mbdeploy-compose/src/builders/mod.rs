//! Resource builders for each tier of the stack.
//!
//! Every builder declares its descriptors through a [`StackContext`],
//! awaiting each resource before declaring anything that reads it.

pub mod auth;
pub mod compute;
pub mod database;
pub mod dns;
pub mod edge;
pub mod network;

use std::sync::{Mutex, PoisonError};

use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{ResourceKind, ResourceRef};

use crate::descriptor::{ResolvedResource, ResourceDescriptor};
use crate::provider::{LookupService, ProvisioningBackend};

/// Shared state of one composition run.
///
/// Holds the stack name used to derive logical names, the boundary
/// collaborators, and the log of declared descriptors.
pub struct StackContext<'a> {
    name: String,
    component: Option<ResourceRef>,
    backend: &'a dyn ProvisioningBackend,
    lookup: &'a dyn LookupService,
    declared: Mutex<Vec<ResourceDescriptor>>,
}

impl<'a> StackContext<'a> {
    /// Creates a context for the stack with the given name.
    pub fn new(
        name: impl Into<String>,
        backend: &'a dyn ProvisioningBackend,
        lookup: &'a dyn LookupService,
    ) -> Self {
        Self {
            name: name.into(),
            component: None,
            backend,
            lookup,
            declared: Mutex::new(Vec::new()),
        }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.name
    }

    /// Returns the base logical name, `<stack>-metabase`.
    #[must_use]
    pub fn base_name(&self) -> String {
        format!("{}-metabase", self.name)
    }

    /// Returns a derived logical name, `<stack>-metabase-<suffix>`.
    #[must_use]
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-metabase-{suffix}", self.name)
    }

    /// Returns the lookup service.
    #[must_use]
    pub fn lookup(&self) -> &dyn LookupService {
        self.lookup
    }

    /// Returns the provisioning backend.
    #[must_use]
    pub fn backend(&self) -> &dyn ProvisioningBackend {
        self.backend
    }

    /// Returns the registered component, if any.
    #[must_use]
    pub const fn component(&self) -> Option<&ResourceRef> {
        self.component.as_ref()
    }

    /// Registers the component every later resource is nested under.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the component.
    pub async fn register_component(&mut self, parent: Option<ResourceRef>) -> Result<ResourceRef> {
        let descriptor =
            ResourceDescriptor::new(ResourceKind::Component, self.name.clone()).parent(parent);
        let resolved = self.declare(descriptor).await?;
        self.component = Some(resolved.reference.clone());
        Ok(resolved.reference)
    }

    /// Declares a resource and waits for the backend to resolve it.
    ///
    /// Resources without a parent are nested under the stack component.
    /// Backend errors are reported against the resource's logical name.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::ProvisioningFailure`] if the backend rejects the resource.
    pub async fn declare(&self, descriptor: ResourceDescriptor) -> Result<ResolvedResource> {
        let descriptor = if descriptor.parent.is_none() {
            let parent = self.component.clone();
            descriptor.parent(parent)
        } else {
            descriptor
        };
        tracing::info!(
            kind = %descriptor.kind,
            name = %descriptor.logical_name,
            depends_on = descriptor.depends_on.len(),
            "declaring resource"
        );
        self.declared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(descriptor.clone());

        let name = descriptor.logical_name.clone();
        let resolved = self
            .backend
            .provision(&descriptor)
            .await
            .map_err(|e| {
                if matches!(&e, StackError::ProvisioningFailure { logical_name, .. } if *logical_name == name)
                {
                    e
                } else {
                    StackError::provisioning(name.clone(), e.to_string())
                }
            })?;
        tracing::debug!(kind = %descriptor.kind, name = %name, id = %resolved.id, "resource resolved");
        Ok(resolved)
    }

    /// Returns a copy of every descriptor declared so far, in order.
    #[must_use]
    pub fn declared(&self) -> Vec<ResourceDescriptor> {
        self.declared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Consumes the context, returning the declared descriptors in order.
    #[must_use]
    pub fn into_declared(self) -> Vec<ResourceDescriptor> {
        self.declared
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for StackContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackContext")
            .field("name", &self.name)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}
