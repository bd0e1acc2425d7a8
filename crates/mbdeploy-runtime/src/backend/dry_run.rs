//! Dry-run provisioning backend.
//!
//! Resolves descriptors without touching a cloud API. Identifiers and
//! ARNs are derived from a digest of the resource reference, so two runs
//! over the same configuration produce the same plan. The only random
//! value is the generated password.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, PoisonError};

use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{ResourceKind, ResourceRef, Secret};
use mbdeploy_compose::descriptor::{ResolvedResource, ResourceDescriptor};
use mbdeploy_compose::provider::ProvisioningBackend;
use mbdeploy_compose::stack::StackOutputs;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::{Value, json};

use super::digest;

/// Region the fabricated ARNs and hostnames live in.
pub const REGION: &str = "us-east-1";

/// Account the fabricated ARNs belong to.
pub const ACCOUNT_ID: &str = "123456789012";

/// Canonical hosted zone of load balancers in [`REGION`].
pub const LB_HOSTED_ZONE_ID: &str = "Z35SXDOTRQ7X7K";

/// Port the fabricated database cluster listens on.
pub const DB_PORT: u64 = 3306;

const DEFAULT_PASSWORD_LENGTH: usize = 20;

/// A backend that records descriptors and fabricates their attributes.
#[derive(Debug, Default)]
pub struct DryRunBackend {
    reject: HashSet<String>,
    provisioned: Mutex<BTreeSet<ResourceRef>>,
    recorded: Mutex<Vec<ResourceDescriptor>>,
    outputs: Mutex<Option<(ResourceRef, StackOutputs)>>,
}

impl DryRunBackend {
    /// Creates a backend that accepts every descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the backend reject the resource with the given logical name.
    #[must_use]
    pub fn fail_on(mut self, logical_name: impl Into<String>) -> Self {
        let _ = self.reject.insert(logical_name.into());
        self
    }

    /// Returns every descriptor received, in order.
    #[must_use]
    pub fn recorded(&self) -> Vec<ResourceDescriptor> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the outputs registered on the stack component, if any.
    #[must_use]
    pub fn registered_outputs(&self) -> Option<(ResourceRef, StackOutputs)> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_dependencies(&self, descriptor: &ResourceDescriptor) -> Result<()> {
        let provisioned = self
            .provisioned
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match descriptor.dependencies().find(|dep| !provisioned.contains(*dep)) {
            Some(missing) => Err(StackError::provisioning(
                descriptor.logical_name.clone(),
                format!("dependency {missing} has not been provisioned"),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ProvisioningBackend for DryRunBackend {
    async fn provision(&self, descriptor: &ResourceDescriptor) -> Result<ResolvedResource> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(descriptor.clone());

        if self.reject.contains(&descriptor.logical_name) {
            tracing::warn!(name = %descriptor.logical_name, "rejecting resource");
            return Err(StackError::provisioning(
                descriptor.logical_name.clone(),
                "rejected by the dry-run backend",
            ));
        }
        self.check_dependencies(descriptor)?;

        let resolved = fabricate(descriptor)?;
        let _ = self
            .provisioned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(resolved.reference.clone());
        tracing::debug!(resource = %resolved.reference, id = %resolved.id, "dry-run resolved");
        Ok(resolved)
    }

    async fn register_outputs(&self, component: &ResourceRef, outputs: &StackOutputs) -> Result<()> {
        *self.outputs.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((component.clone(), outputs.clone()));
        Ok(())
    }
}

/// Fabricates the resolved attributes of a descriptor.
///
/// Plain properties are echoed back as attributes; kind-specific
/// computed attributes are added on top.
///
/// # Errors
///
/// Returns a provisioning failure if a property the kind needs is missing.
pub fn fabricate(descriptor: &ResourceDescriptor) -> Result<ResolvedResource> {
    let reference = descriptor.reference();
    let name = descriptor.logical_name.as_str();
    let short = digest(&reference, "", 17);
    let mut resolved = ResolvedResource::new(reference.clone(), short.clone());
    resolved.attributes = descriptor.properties.clone();
    let required = |key: &str| {
        descriptor.get(key).and_then(Value::as_str).ok_or_else(|| {
            StackError::provisioning(name, format!("missing property {key}"))
        })
    };

    match descriptor.kind {
        ResourceKind::Component => resolved.id = name.to_string(),
        ResourceKind::DefaultVpc => resolved.id = format!("vpc-{short}"),
        ResourceKind::SecurityGroup => {
            resolved.id = format!("sg-{short}");
            resolved.arn = Some(arn("ec2", &format!("security-group/{}", resolved.id)));
        }
        ResourceKind::SecurityGroupRule => resolved.id = format!("sgrule-{short}"),
        ResourceKind::RandomPassword => {
            let length = descriptor
                .get("length")
                .and_then(Value::as_u64)
                .and_then(|l| usize::try_from(l).ok())
                .unwrap_or(DEFAULT_PASSWORD_LENGTH);
            let _ = resolved
                .secrets
                .insert("result".into(), random_alphanumeric(length));
        }
        ResourceKind::DbSubnetGroup => {
            resolved.id = name.to_lowercase();
            let _ = resolved
                .attributes
                .insert("name".into(), json!(resolved.id));
            resolved.arn = Some(arn("rds", &format!("subgrp:{}", resolved.id)));
        }
        ResourceKind::DbCluster => {
            let identifier = required("clusterIdentifier")?.to_string();
            let password = descriptor
                .secret_properties
                .get("masterPassword")
                .cloned()
                .ok_or_else(|| StackError::provisioning(name, "missing secret masterPassword"))?;
            let _ = resolved.attributes.insert(
                "endpoint".into(),
                json!(format!("{identifier}.cluster-{}.{REGION}.rds.amazonaws.com", &short[..12])),
            );
            let _ = resolved.attributes.insert("port".into(), json!(DB_PORT));
            let _ = resolved.secrets.insert("masterPassword".into(), password);
            resolved.arn = Some(arn("rds", &format!("cluster:{identifier}")));
            resolved.id = identifier;
        }
        ResourceKind::Certificate => {
            let domain = required("domainName")?;
            let _ = resolved.attributes.insert(
                "domainValidationOptions".into(),
                json!([{
                    "domainName": domain,
                    "resourceRecordName": format!("_{}.{domain}.", digest(&reference, "name", 32)),
                    "resourceRecordType": "CNAME",
                    "resourceRecordValue": format!(
                        "_{}.acm-validations.aws.",
                        digest(&reference, "value", 32)
                    ),
                }]),
            );
            resolved.arn = Some(arn("acm", &format!("certificate/{}", uuid_like(&reference))));
        }
        ResourceKind::DnsRecord => {
            let record_name = required("name")?.to_string();
            let zone = required("zoneId")?;
            let record_type = required("type")?;
            resolved.id = format!("{zone}_{record_name}_{record_type}");
            let _ = resolved
                .attributes
                .insert("fqdn".into(), json!(record_name.trim_end_matches('.')));
        }
        ResourceKind::CertificateValidation => {
            resolved.id = required("certificateArn")?.to_string();
        }
        ResourceKind::LoadBalancer => {
            let dns_name = format!("{name}-{}.{REGION}.elb.amazonaws.com", &short[..10]);
            let _ = resolved.attributes.insert("dnsName".into(), json!(dns_name));
            let _ = resolved
                .attributes
                .insert("zoneId".into(), json!(LB_HOSTED_ZONE_ID));
            resolved.arn = Some(arn(
                "elasticloadbalancing",
                &format!("loadbalancer/app/{name}/{short}"),
            ));
        }
        ResourceKind::TargetGroup => {
            resolved.arn = Some(arn(
                "elasticloadbalancing",
                &format!("targetgroup/{name}/{short}"),
            ));
        }
        ResourceKind::Listener => {
            resolved.arn = Some(arn(
                "elasticloadbalancing",
                &format!("listener/app/{name}/{short}"),
            ));
        }
        ResourceKind::EcsCluster => {
            resolved.arn = Some(arn("ecs", &format!("cluster/{name}")));
        }
        ResourceKind::TaskDefinition => {
            let family = required("family")?;
            resolved.arn = Some(arn("ecs", &format!("task-definition/{family}:1")));
        }
        ResourceKind::EcsService => {
            resolved.arn = Some(arn("ecs", &format!("service/{name}")));
        }
    }
    Ok(resolved)
}

fn arn(service: &str, resource: &str) -> String {
    format!("arn:aws:{service}:{REGION}:{ACCOUNT_ID}:{resource}")
}

fn uuid_like(reference: &ResourceRef) -> String {
    let hex = digest(reference, "uuid", 32);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

fn random_alphanumeric(length: usize) -> Secret {
    let mut rng = rand::rng();
    Secret::new(
        std::iter::repeat_with(|| char::from(rng.sample(Alphanumeric)))
            .take(length)
            .collect::<String>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_has_requested_length_and_no_symbols() {
        let d = ResourceDescriptor::new(ResourceKind::RandomPassword, "demo-metabase")
            .property("length", 20)
            .secret_output("result");
        let r = fabricate(&d).unwrap();
        let password = r.secret("result").unwrap().expose();
        assert_eq!(password.len(), 20);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn passwords_draw_from_full_alphanumeric_range() {
        let sampled: String = (0..200)
            .map(|_| random_alphanumeric(20).expose().to_string())
            .collect();
        assert!(sampled.chars().any(|c| c.is_ascii_uppercase()));
        assert!(sampled.chars().any(|c| c.is_ascii_lowercase()));
        assert!(sampled.chars().any(|c| c.is_ascii_digit()));
        assert!(sampled.chars().any(|c| ('g'..='z').contains(&c)));
    }

    #[test]
    fn identifiers_are_deterministic() {
        let d = ResourceDescriptor::new(ResourceKind::SecurityGroup, "demo-metabase-sg");
        assert_eq!(fabricate(&d).unwrap().id, fabricate(&d).unwrap().id);
        assert!(fabricate(&d).unwrap().id.starts_with("sg-"));
    }

    #[test]
    fn cluster_passes_its_password_through() {
        let d = ResourceDescriptor::new(ResourceKind::DbCluster, "demo-metabase")
            .property("clusterIdentifier", "demometabasemysql")
            .property("databaseName", "metabase")
            .property("masterUsername", "admin")
            .secret_property("masterPassword", Secret::new("abcdefghij0123456789"));
        let r = fabricate(&d).unwrap();
        assert_eq!(r.id, "demometabasemysql");
        assert_eq!(r.u64_attribute("port").unwrap(), 3306);
        assert_eq!(r.str_attribute("databaseName").unwrap(), "metabase");
        assert!(
            r.str_attribute("endpoint")
                .unwrap()
                .starts_with("demometabasemysql.cluster-")
        );
        assert_eq!(
            r.secret("masterPassword").unwrap().expose(),
            "abcdefghij0123456789"
        );
    }

    #[test]
    fn cluster_without_password_is_rejected() {
        let d = ResourceDescriptor::new(ResourceKind::DbCluster, "demo-metabase")
            .property("clusterIdentifier", "demometabasemysql");
        assert!(fabricate(&d).is_err());
    }

    #[test]
    fn certificate_offers_one_cname_validation() {
        let d = ResourceDescriptor::new(ResourceKind::Certificate, "demo-metabase")
            .property("domainName", "metabase.example.com");
        let r = fabricate(&d).unwrap();
        let options = r.attribute("domainValidationOptions").unwrap();
        assert_eq!(options.as_array().map(Vec::len), Some(1));
        assert_eq!(options[0]["resourceRecordType"], "CNAME");
        assert!(
            options[0]["resourceRecordName"]
                .as_str()
                .unwrap()
                .ends_with(".metabase.example.com.")
        );
        assert!(r.arn.unwrap().starts_with("arn:aws:acm:"));
    }

    #[tokio::test]
    async fn rejects_named_resource() {
        let backend = DryRunBackend::new().fail_on("demo-metabase-sg");
        let d = ResourceDescriptor::new(ResourceKind::SecurityGroup, "demo-metabase-sg");
        let err = backend.provision(&d).await.unwrap_err();
        assert!(err.to_string().contains("demo-metabase-sg"));
        assert_eq!(backend.recorded().len(), 1);
    }

    #[tokio::test]
    async fn refuses_descriptor_with_unprovisioned_dependency() {
        let backend = DryRunBackend::new();
        let sg = ResolvedResource::new(
            ResourceRef::new(ResourceKind::SecurityGroup, "demo-metabase-sg"),
            "sg-1",
        );
        let d = ResourceDescriptor::new(ResourceKind::SecurityGroupRule, "demo-metabase-self")
            .reads(&sg);
        let err = backend.provision(&d).await.unwrap_err();
        assert!(err.to_string().contains("has not been provisioned"));
    }
}
