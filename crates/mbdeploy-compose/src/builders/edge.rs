//! TLS certificate, load balancer, target group, and listeners.
//!
//! With a custom domain the public listener carries a DNS-validated
//! certificate and is declared only after validation completes. Without
//! one it serves plain HTTP on the same port.

use mbdeploy_common::constants::{
    HTTP_PORT, HTTPS_PORT, LB_IDLE_TIMEOUT_SECS, SERVICE_PORT, TLS_POLICY, VALIDATION_RECORD_TTL,
};
use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::ResourceKind;
use serde_json::json;

use super::StackContext;
use super::auth;
use crate::descriptor::{ResolvedResource, ResourceDescriptor};
use crate::resolver::{AuthStrategy, DomainSettings};
use crate::subnet::SubnetSet;

const DEFAULT_ACTIONS: &str = "defaultActions";

/// A certificate together with its DNS validation.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    /// The requested certificate.
    pub certificate: ResolvedResource,
    /// DNS record proving domain ownership.
    pub validation_record: ResolvedResource,
    /// Waiter that completes once the certificate is issued.
    pub validation: ResolvedResource,
}

/// The provisioned edge of a stack.
#[derive(Debug, Clone)]
pub struct EdgeStack {
    /// Certificate, present iff a domain is configured.
    pub certificate: Option<CertificateBundle>,
    /// The application load balancer.
    pub load_balancer: ResolvedResource,
    /// Target group the service registers in.
    pub target_group: ResolvedResource,
    /// Public listener on port 443.
    pub listener: ResolvedResource,
    /// Port 80 listener redirecting to 443.
    pub redirect_listener: ResolvedResource,
}

/// DNS record the issuer asks for to prove domain ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOption {
    /// Record name.
    pub name: String,
    /// Record type.
    pub record_type: String,
    /// Record value.
    pub value: String,
}

impl ValidationOption {
    /// Reads the first validation option off a resolved certificate.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if the certificate has none.
    pub fn from_certificate(certificate: &ResolvedResource) -> Result<Self> {
        let first = certificate
            .attribute("domainValidationOptions")?
            .as_array()
            .and_then(|options| options.first())
            .ok_or_else(|| {
                StackError::provisioning(certificate.name(), "no domain validation options returned")
            })?;
        let field = |key: &str| {
            first[key].as_str().map(str::to_string).ok_or_else(|| {
                StackError::provisioning(
                    certificate.name(),
                    format!("domain validation option lacks {key}"),
                )
            })
        };
        Ok(Self {
            name: field("resourceRecordName")?,
            record_type: field("resourceRecordType")?,
            value: field("resourceRecordValue")?,
        })
    }
}

/// Declares a DNS-validated certificate for the domain.
///
/// The validation resource is declared only after both the certificate
/// and its validation record exist.
///
/// # Errors
///
/// Returns an error if any of the three resources fails to provision.
pub async fn build_certificate(
    ctx: &StackContext<'_>,
    domain: &DomainSettings,
    zone_id: &str,
) -> Result<CertificateBundle> {
    let certificate = ctx
        .declare(
            ResourceDescriptor::new(ResourceKind::Certificate, ctx.base_name())
                .property("domainName", domain.domain_name.as_str())
                .property("validationMethod", "DNS"),
        )
        .await?;

    let option = ValidationOption::from_certificate(&certificate)?;
    let validation_record = ctx
        .declare(
            ResourceDescriptor::new(ResourceKind::DnsRecord, ctx.resource_name("certvalidation"))
                .property("zoneId", zone_id)
                .property("name", option.name)
                .property("type", option.record_type)
                .property("records", json!([option.value]))
                .property("ttl", VALIDATION_RECORD_TTL)
                .reads(&certificate),
        )
        .await?;

    let validation = ctx
        .declare(
            ResourceDescriptor::new(ResourceKind::CertificateValidation, ctx.base_name())
                .property("certificateArn", certificate.arn()?)
                .property(
                    "validationRecordFqdns",
                    json!([validation_record.str_attribute("fqdn")?]),
                )
                .reads(&certificate)
                .depends_on(&validation_record),
        )
        .await?;
    tracing::info!(domain = %domain.domain_name, "certificate validated");

    Ok(CertificateBundle {
        certificate,
        validation_record,
        validation,
    })
}

/// Descriptor of the public listener on port 443.
///
/// # Errors
///
/// Returns a provisioning failure if an input lacks its ARN.
pub fn listener_descriptor(
    name: &str,
    load_balancer: &ResolvedResource,
    target_group: &ResolvedResource,
    certificate: Option<&CertificateBundle>,
    auth: Option<&AuthStrategy>,
) -> Result<ResourceDescriptor> {
    let actions = auth::default_actions(auth, target_group.arn()?);
    let mut descriptor = ResourceDescriptor::new(ResourceKind::Listener, name)
        .property("loadBalancerArn", load_balancer.arn()?)
        .property("port", HTTPS_PORT)
        .property("protocol", if certificate.is_some() { "HTTPS" } else { "HTTP" })
        .property(DEFAULT_ACTIONS, serde_json::to_value(&actions)?)
        .reads(load_balancer)
        .reads(target_group);

    if let Some(bundle) = certificate {
        descriptor = descriptor
            .property("certificateArn", bundle.certificate.arn()?)
            .property("sslPolicy", TLS_POLICY)
            .reads(&bundle.certificate)
            .depends_on(&bundle.validation);
    }
    if auth.is_some() {
        descriptor = descriptor.secret_property(DEFAULT_ACTIONS, auth::to_exposed_json(&actions)?);
    }
    Ok(descriptor)
}

/// Descriptor of the port 80 listener redirecting to HTTPS.
///
/// # Errors
///
/// Returns a provisioning failure if the load balancer lacks its ARN.
pub fn redirect_listener_descriptor(
    name: &str,
    load_balancer: &ResolvedResource,
) -> Result<ResourceDescriptor> {
    Ok(ResourceDescriptor::new(ResourceKind::Listener, name)
        .property("loadBalancerArn", load_balancer.arn()?)
        .property("port", HTTP_PORT)
        .property("protocol", "HTTP")
        .property(DEFAULT_ACTIONS, serde_json::to_value([auth::https_redirect()])?)
        .reads(load_balancer))
}

/// Declares the load balancer, target group, and both listeners.
///
/// # Errors
///
/// Returns an error if any resource fails to provision.
pub async fn build_edge(
    ctx: &StackContext<'_>,
    vpc_id: &str,
    subnets: &SubnetSet,
    edge_group: &ResolvedResource,
    certificate: Option<&CertificateBundle>,
    auth: Option<&AuthStrategy>,
) -> Result<EdgeStack> {
    let base = ctx.base_name();
    let load_balancer = ResourceDescriptor::new(ResourceKind::LoadBalancer, base.as_str())
        .property("loadBalancerType", "application")
        .property("subnets", subnets.id_strings())
        .property("securityGroups", json!([edge_group.id]))
        .property("idleTimeout", LB_IDLE_TIMEOUT_SECS)
        .reads(edge_group);
    // At most one task runs, so connections are not drained on deregistration.
    let target_group = ResourceDescriptor::new(ResourceKind::TargetGroup, base.as_str())
        .property("targetType", "ip")
        .property("port", SERVICE_PORT)
        .property("protocol", "HTTP")
        .property("vpcId", vpc_id)
        .property("deregistrationDelay", 0);

    let (load_balancer, target_group) =
        tokio::try_join!(ctx.declare(load_balancer), ctx.declare(target_group))?;

    let listener = listener_descriptor(&base, &load_balancer, &target_group, certificate, auth)?;
    let redirect = redirect_listener_descriptor(&ctx.resource_name("redirecthttp"), &load_balancer)?;
    let (listener, redirect_listener) =
        tokio::try_join!(ctx.declare(listener), ctx.declare(redirect))?;

    Ok(EdgeStack {
        certificate: certificate.cloned(),
        load_balancer,
        target_group,
        listener,
        redirect_listener,
    })
}
