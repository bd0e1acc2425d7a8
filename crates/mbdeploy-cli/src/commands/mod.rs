//! CLI command definitions and dispatch.

pub mod plan;
pub mod validate;

use clap::{Parser, Subcommand};

/// Self-hosted Metabase stack planner.
#[derive(Parser, Debug)]
#[command(name = "mbdeploy", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "MBDEPLOY_LOG_JSON")]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a configuration file and print the result.
    Validate(validate::ValidateArgs),
    /// Compose a stack against an inventory and print the plan.
    Plan(plan::PlanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Validate(args) => validate::execute(&args),
        Command::Plan(args) => plan::execute(args).await,
    }
}
