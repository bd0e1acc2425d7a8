//! Hosted zone lookup and the alias record pointing the domain at the
//! load balancer.

use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::ResourceKind;
use serde_json::json;

use super::StackContext;
use crate::descriptor::{ResolvedResource, ResourceDescriptor};
use crate::provider::LookupService;
use crate::resolver::DomainSettings;

/// Resolves the ID of a hosted zone by name.
///
/// # Errors
///
/// Returns [`StackError::LookupFailure`] if no zone with a usable ID matches.
pub async fn lookup_zone_id(lookup: &dyn LookupService, name: &str) -> Result<String> {
    let zone = lookup
        .hosted_zone(name)
        .await?
        .filter(|zone| !zone.id.is_empty())
        .ok_or_else(|| StackError::LookupFailure {
            kind: "hosted zone",
            key: name.to_string(),
        })?;
    tracing::debug!(zone = name, id = %zone.id, "hosted zone found");
    Ok(zone.id)
}

/// Descriptor of the alias record for the application domain.
///
/// # Errors
///
/// Returns a provisioning failure if the load balancer lacks its DNS
/// name or zone.
pub fn alias_record_descriptor(
    name: &str,
    domain: &DomainSettings,
    zone_id: &str,
    load_balancer: &ResolvedResource,
) -> Result<ResourceDescriptor> {
    Ok(ResourceDescriptor::new(ResourceKind::DnsRecord, name)
        .property("zoneId", zone_id)
        .property("name", domain.domain_name.as_str())
        .property("type", "A")
        .property(
            "aliases",
            json!([{
                "name": load_balancer.str_attribute("dnsName")?,
                "zoneId": load_balancer.str_attribute("zoneId")?,
                "evaluateTargetHealth": true,
            }]),
        )
        .reads(load_balancer))
}

/// Declares the alias record.
///
/// # Errors
///
/// Returns an error if the record fails to provision.
pub async fn build_alias_record(
    ctx: &StackContext<'_>,
    domain: &DomainSettings,
    zone_id: &str,
    load_balancer: &ResolvedResource,
) -> Result<ResolvedResource> {
    let descriptor =
        alias_record_descriptor(&ctx.resource_name("dns"), domain, zone_id, load_balancer)?;
    ctx.declare(descriptor).await
}

/// Returns the public endpoint of the application.
///
/// With an alias record this is `https://` plus the record's name,
/// otherwise the load balancer's own DNS name.
///
/// # Errors
///
/// Returns a provisioning failure if the chosen attribute is missing.
pub fn endpoint(record: Option<&ResolvedResource>, load_balancer: &ResolvedResource) -> Result<String> {
    match record {
        Some(record) => Ok(format!("https://{}", record.str_attribute("name")?)),
        None => Ok(load_balancer.str_attribute("dnsName")?.to_string()),
    }
}
