//! Plan rendering.
//!
//! Both renderings go through `Serialize`, so secret values appear only
//! as `[REDACTED]`.

use std::fmt::Write as _;

use mbdeploy_common::error::Result;
use mbdeploy_common::types::REDACTED;
use serde_json::Value;

use crate::engine::Deployment;

const RULE_WIDTH: usize = 64;

/// Renders a deployment as a human-readable plan.
#[must_use]
pub fn render_plan(deployment: &Deployment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Deployment plan for stack: {}", deployment.stack);
    let _ = writeln!(out, "{}", "\u{2550}".repeat(RULE_WIDTH));
    let _ = writeln!(out, "  planned at: {}", deployment.planned_at.to_rfc3339());
    let _ = writeln!(out);

    for reference in &deployment.order {
        let Some(resource) = deployment
            .resources
            .iter()
            .find(|d| d.reference() == *reference)
        else {
            continue;
        };
        let _ = writeln!(out, "  + {} {}", resource.kind, resource.logical_name);
        for (key, value) in &resource.properties {
            let _ = writeln!(out, "      {key}: {}", render_value(value));
        }
        // A secret sharing a key with a plain property is already shown in
        // its redacted rendering.
        for key in resource
            .secret_properties
            .keys()
            .filter(|key| !resource.properties.contains_key(key.as_str()))
        {
            let _ = writeln!(out, "      {key}: {REDACTED}");
        }
        for dep in &resource.depends_on {
            let _ = writeln!(out, "      depends on: {dep}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} resource(s) will be provisioned.", deployment.order.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "  Outputs:");
    let _ = writeln!(
        out,
        "    securityGroupId: {}",
        deployment.outputs.security_group_id
    );
    let _ = writeln!(out, "    dnsName: {}", deployment.outputs.dns_name);
    out
}

/// Renders a deployment as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(deployment: &Deployment) -> Result<String> {
    Ok(serde_json::to_string_pretty(deployment)?)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
