//! Resource descriptors handed to the provisioning backend, and the
//! attributes it resolves them to.

use std::collections::{BTreeMap, BTreeSet};

use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{ResourceKind, ResourceRef, Secret};
use serde::Serialize;
use serde_json::{Map, Value};

/// Declarative description of one resource to provision.
///
/// Secret properties are supplied alongside the plain property bag. When
/// both carry the same key, the backend must use the secret value; the
/// plain value is then a redacted rendering meant for plans and logs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Logical name, unique per kind within a stack.
    pub logical_name: String,
    /// Component this resource is nested under.
    pub parent: Option<ResourceRef>,
    /// Plain properties, in declaration order.
    pub properties: Map<String, Value>,
    /// Sensitive properties.
    pub secret_properties: BTreeMap<String, Secret>,
    /// Resources that must be fully provisioned first, declared explicitly.
    pub depends_on: BTreeSet<ResourceRef>,
    /// Resources whose resolved attributes were read to build the properties.
    pub inputs_from: BTreeSet<ResourceRef>,
    /// Output attributes the backend must return as secrets.
    pub secret_outputs: BTreeSet<String>,
}

impl ResourceDescriptor {
    /// Starts a descriptor with no properties.
    #[must_use]
    pub fn new(kind: ResourceKind, logical_name: impl Into<String>) -> Self {
        Self {
            kind,
            logical_name: logical_name.into(),
            parent: None,
            properties: Map::new(),
            secret_properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            inputs_from: BTreeSet::new(),
            secret_outputs: BTreeSet::new(),
        }
    }

    /// Sets a plain property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets a sensitive property.
    #[must_use]
    pub fn secret_property(mut self, key: impl Into<String>, value: Secret) -> Self {
        let _ = self.secret_properties.insert(key.into(), value);
        self
    }

    /// Adds an explicit dependency on a provisioned resource.
    #[must_use]
    pub fn depends_on(mut self, resource: &ResolvedResource) -> Self {
        let _ = self.depends_on.insert(resource.reference.clone());
        self
    }

    /// Records that properties were built from a resource's attributes.
    #[must_use]
    pub fn reads(mut self, resource: &ResolvedResource) -> Self {
        let _ = self.inputs_from.insert(resource.reference.clone());
        self
    }

    /// Marks an output attribute as sensitive.
    #[must_use]
    pub fn secret_output(mut self, key: impl Into<String>) -> Self {
        let _ = self.secret_outputs.insert(key.into());
        self
    }

    /// Nests the resource under a component.
    #[must_use]
    pub fn parent(mut self, parent: Option<ResourceRef>) -> Self {
        self.parent = parent;
        self
    }

    /// Returns the reference this descriptor will be known by.
    #[must_use]
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.logical_name.clone())
    }

    /// Returns a plain property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Returns every resource this descriptor depends on, explicit or not.
    pub fn dependencies(&self) -> impl Iterator<Item = &ResourceRef> {
        self.depends_on.union(&self.inputs_from)
    }
}

/// Attributes of a resource once the backend has provisioned it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResource {
    /// Reference of the provisioned resource.
    pub reference: ResourceRef,
    /// Provider-assigned identifier.
    pub id: String,
    /// Provider-assigned ARN, for kinds that have one.
    pub arn: Option<String>,
    /// Computed plain attributes.
    pub attributes: Map<String, Value>,
    /// Computed sensitive attributes.
    pub secrets: BTreeMap<String, Secret>,
}

impl ResolvedResource {
    /// Creates a resolved resource with no attributes.
    #[must_use]
    pub fn new(reference: ResourceRef, id: impl Into<String>) -> Self {
        Self {
            reference,
            id: id.into(),
            arn: None,
            attributes: Map::new(),
            secrets: BTreeMap::new(),
        }
    }

    /// Returns the logical name of the resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.reference.name
    }

    /// Returns the ARN.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if the backend resolved no ARN.
    pub fn arn(&self) -> Result<&str> {
        self.arn
            .as_deref()
            .ok_or_else(|| StackError::provisioning(self.name(), "backend resolved no ARN"))
    }

    /// Returns a computed attribute.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if the attribute is missing.
    pub fn attribute(&self, key: &str) -> Result<&Value> {
        self.attributes.get(key).ok_or_else(|| {
            StackError::provisioning(self.name(), format!("missing attribute {key}"))
        })
    }

    /// Returns a computed string attribute.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if the attribute is missing or not a string.
    pub fn str_attribute(&self, key: &str) -> Result<&str> {
        self.attribute(key)?.as_str().ok_or_else(|| {
            StackError::provisioning(self.name(), format!("attribute {key} is not a string"))
        })
    }

    /// Returns a computed integer attribute.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if the attribute is missing or not an integer.
    pub fn u64_attribute(&self, key: &str) -> Result<u64> {
        self.attribute(key)?.as_u64().ok_or_else(|| {
            StackError::provisioning(self.name(), format!("attribute {key} is not an integer"))
        })
    }

    /// Returns a computed sensitive attribute.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if the secret is missing.
    pub fn secret(&self, key: &str) -> Result<&Secret> {
        self.secrets.get(key).ok_or_else(|| {
            StackError::provisioning(self.name(), format!("missing secret attribute {key}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(kind: ResourceKind, name: &str) -> ResolvedResource {
        ResolvedResource::new(ResourceRef::new(kind, name), format!("id-{name}"))
    }

    #[test]
    fn builder_collects_properties_in_order() {
        let d = ResourceDescriptor::new(ResourceKind::TargetGroup, "demo-metabase")
            .property("targetType", "ip")
            .property("port", 3000)
            .property("protocol", "HTTP");
        let keys: Vec<&str> = d.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["targetType", "port", "protocol"]);
        assert_eq!(d.get("port"), Some(&Value::from(3000)));
    }

    #[test]
    fn dependencies_merge_explicit_and_implicit() {
        let sg = resolved(ResourceKind::SecurityGroup, "demo-metabase-sg");
        let lb = resolved(ResourceKind::LoadBalancer, "demo-metabase");
        let d = ResourceDescriptor::new(ResourceKind::Listener, "demo-metabase")
            .reads(&lb)
            .depends_on(&sg)
            .depends_on(&lb);
        let deps: Vec<&ResourceRef> = d.dependencies().collect();
        assert_eq!(deps.len(), 2);
        assert!(d.depends_on.contains(&sg.reference));
        assert!(d.inputs_from.contains(&lb.reference));
    }

    #[test]
    fn secret_properties_never_serialize() {
        let d = ResourceDescriptor::new(ResourceKind::DbCluster, "demo-metabase")
            .secret_property("masterPassword", Secret::new("abcdefghij0123456789"));
        let json = serde_json::to_string(&d).expect("serialize");
        assert!(!json.contains("abcdefghij0123456789"));
        let debug = format!("{d:?}");
        assert!(!debug.contains("abcdefghij0123456789"));
    }

    #[test]
    fn missing_attribute_names_the_resource() {
        let r = resolved(ResourceKind::LoadBalancer, "demo-metabase");
        let err = r.str_attribute("dnsName").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("demo-metabase"), "got: {msg}");
        assert!(msg.contains("dnsName"), "got: {msg}");
    }

    #[test]
    fn missing_arn_is_an_error() {
        let r = resolved(ResourceKind::EcsCluster, "demo-metabase");
        assert!(r.arn().is_err());
    }
}
