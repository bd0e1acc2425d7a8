//! `mbdeploy plan`: compose a stack against an inventory and print the plan.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mbdeploy_common::config::StackConfig;
use mbdeploy_compose::stack::StackOptions;
use mbdeploy_runtime::engine::Engine;
use mbdeploy_runtime::lookup::Inventory;
use mbdeploy_runtime::plan::{render_json, render_plan};

use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the stack configuration (YAML or JSON).
    #[arg(default_value = "metabase.yaml")]
    pub config: PathBuf,

    /// Inventory of existing VPCs, subnets, hosted zones, and roles.
    #[arg(long, short)]
    pub inventory: PathBuf,

    /// Stack name used to derive logical resource names.
    #[arg(long, short, default_value = "metabase")]
    pub name: String,

    /// Print the plan as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `plan` command.
///
/// Resolves the configuration, composes the stack against the dry-run
/// backend, and prints every declared resource in dependency order.
///
/// # Errors
///
/// Returns an error if a file cannot be read or composition fails.
pub async fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let config = StackConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let inventory = Inventory::from_path(&args.inventory)
        .with_context(|| format!("loading {}", args.inventory.display()))?;

    let engine = Engine::dry_run(inventory);
    let deployment = engine
        .deploy(&args.name, &config, &StackOptions::default())
        .await
        .with_context(|| format!("planning stack {}", args.name))?;

    let rendered = if args.json {
        render_json(&deployment)?
    } else {
        render_plan(&deployment)
    };
    output::emit(&rendered)?;
    Ok(())
}
