//! `mbdeploy validate`: resolve a configuration without declaring anything.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mbdeploy_common::config::{Defaults, StackConfig};

use crate::output;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the stack configuration (YAML or JSON).
    #[arg(default_value = "metabase.yaml")]
    pub config: PathBuf,
}

/// Executes the `validate` command.
///
/// Prints the resolved configuration as JSON with secrets redacted.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the configuration is invalid.
pub fn execute(args: &ValidateArgs) -> anyhow::Result<()> {
    let config = StackConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let resolved = mbdeploy_compose::resolver::resolve(&config, &Defaults::default())?;
    tracing::info!(config = %args.config.display(), "configuration is valid");

    output::emit(&serde_json::to_string_pretty(&resolved)?)?;
    Ok(())
}
