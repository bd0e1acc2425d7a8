//! Subnet selection for the three tiers.
//!
//! Each tier uses its override verbatim when one is supplied. Tiers
//! without an override share one auto-discovered pair of public subnets
//! from two distinct availability zones.

use std::collections::HashSet;

use mbdeploy_common::config::NetworkOverrides;
use mbdeploy_common::constants::DISCOVERED_SUBNET_COUNT;
use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{SubnetId, SubnetRole};
use serde::Serialize;

use crate::provider::{LookupService, SubnetInfo};

/// An ordered set of subnets used by one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSet {
    /// Tier the set is used for.
    pub role: SubnetRole,
    /// Subnet IDs in order.
    pub ids: Vec<SubnetId>,
    /// Whether the set came from auto-discovery rather than an override.
    pub discovered: bool,
}

impl SubnetSet {
    /// Returns the IDs as plain strings.
    #[must_use]
    pub fn id_strings(&self) -> Vec<String> {
        self.ids.iter().map(|id| id.as_str().to_string()).collect()
    }
}

/// The subnet sets of all three tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetPlan {
    /// Compute tasks.
    pub ecs: SubnetSet,
    /// Database cluster.
    pub db: SubnetSet,
    /// Load balancer.
    pub lb: SubnetSet,
}

impl SubnetPlan {
    /// Returns whether compute tasks need a public IP.
    ///
    /// Discovered subnets are public, so tasks placed there reach the
    /// internet through their own address. Explicit compute subnets are
    /// assumed private and reachable only through the load balancer.
    #[must_use]
    pub const fn assign_public_ip(&self) -> bool {
        self.ecs.discovered
    }
}

/// Picks two public subnets in distinct availability zones.
///
/// Candidates are taken in the given order; a subnet is accepted iff it
/// auto-assigns public IPs and no accepted subnet shares its zone.
///
/// # Errors
///
/// Returns [`StackError::InsufficientSubnets`] if fewer than two subnets qualify.
pub fn select_subnets(vpc_id: &str, candidates: &[SubnetInfo]) -> Result<Vec<SubnetId>> {
    let mut zones = HashSet::new();
    let mut selected = Vec::with_capacity(DISCOVERED_SUBNET_COUNT);

    for subnet in candidates {
        if selected.len() == DISCOVERED_SUBNET_COUNT {
            break;
        }
        if !subnet.map_public_ip_on_launch {
            tracing::debug!(subnet = %subnet.id, "skipping subnet without public IPs");
            continue;
        }
        if !zones.insert(subnet.availability_zone.as_str()) {
            tracing::debug!(
                subnet = %subnet.id,
                zone = %subnet.availability_zone,
                "skipping subnet in an already used availability zone"
            );
            continue;
        }
        selected.push(subnet.id.clone());
    }

    if selected.len() < DISCOVERED_SUBNET_COUNT {
        return Err(StackError::InsufficientSubnets {
            vpc_id: vpc_id.to_string(),
            found: selected.len(),
        });
    }
    Ok(selected)
}

/// Resolves the subnet set of every tier.
///
/// Auto-discovery runs at most once, and only if some tier has no override.
///
/// # Errors
///
/// Returns an error if discovery is needed and fails.
pub async fn resolve_subnets(
    lookup: &dyn LookupService,
    vpc_id: &str,
    overrides: &NetworkOverrides,
) -> Result<SubnetPlan> {
    let needs_discovery = overrides.ecs_subnet_ids.is_none()
        || overrides.db_subnet_ids.is_none()
        || overrides.lb_subnet_ids.is_none();

    let discovered = if needs_discovery {
        let candidates = lookup.subnets(vpc_id).await?;
        tracing::debug!(vpc_id, candidates = candidates.len(), "discovering subnets");
        let selected = select_subnets(vpc_id, &candidates)?;
        tracing::info!(vpc_id, subnets = ?selected, "auto-discovered subnets");
        selected
    } else {
        Vec::new()
    };

    let pick = |role: SubnetRole, ids: Option<&Vec<SubnetId>>| match ids {
        Some(ids) => {
            tracing::warn!(%role, subnets = ?ids, "using subnet override without availability-zone validation");
            SubnetSet {
                role,
                ids: ids.clone(),
                discovered: false,
            }
        }
        None => SubnetSet {
            role,
            ids: discovered.clone(),
            discovered: true,
        },
    };

    Ok(SubnetPlan {
        ecs: pick(SubnetRole::Ecs, overrides.ecs_subnet_ids.as_ref()),
        db: pick(SubnetRole::Db, overrides.db_subnet_ids.as_ref()),
        lb: pick(SubnetRole::Lb, overrides.lb_subnet_ids.as_ref()),
    })
}
