//! `epm` operator CLI over the portfolio data service.
//!
//! Every command prints one JSON document on stdout. Logs go to stderr.
//!
//! ## Exit Codes
//! - 0: Success
//! - 1: Unexpected failure (config, I/O)
//! - 2: Rejected input (validation, unknown project or task)
//! - 3: Infrastructure error (Project Server or bridge unavailable or failing)

mod read_cmd;
mod write_cmd;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use epm_bridge::BridgeError;
use epm_portfolio::{PortfolioConfig, PortfolioDataService, WriteBackError};
use serde_json::Value;

pub use read_cmd::{InvalidateArgs, ProjectArgs};
pub use write_cmd::{AssignAllArgs, AssignArgs, ExecuteArgs, SetFinishArgs, UpdateTaskArgs};

#[derive(Debug, Parser)]
#[command(name = "epm", about = "Portfolio data and Project Server write-back")]
pub struct Cli {
    /// Config file (defaults to `EPM_CONFIG` or ~/.config/epm/portfolio.toml).
    #[arg(long = "config", short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List merged projects.
    Projects,
    /// Show one project by id or Project Server GUID.
    Project(ProjectArgs),
    /// Portfolio totals and health breakdown.
    Portfolio,
    /// Strategic objectives with their projects.
    Strategy,
    /// Current alerts.
    Alerts,
    /// Risks with summary counts.
    Risks,
    /// Project manager scores.
    PmScores,
    /// Service status with a live connection probe.
    Status,
    /// Drop cached data.
    Invalidate(InvalidateArgs),
    /// Update task progress or cost and publish.
    UpdateTask(UpdateTaskArgs),
    /// Move a project's finish date and publish.
    SetFinish(SetFinishArgs),
    /// Assign a resource to a task.
    Assign(AssignArgs),
    /// Bulk assignment through the bridge.
    AssignAll(AssignAllArgs),
    /// Report whether the automation bridge answers.
    BridgeHealth,
    /// List enterprise resources.
    Resources,
    /// Execute a confirmed action proposal.
    Execute(ExecuteArgs),
}

/// Load configuration the way the service does: file, then environment.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PortfolioConfig> {
    let config = match path {
        Some(path) => PortfolioConfig::load_from_path(path)?
            .with_env_overrides(|key| std::env::var(key).ok())?,
        None => PortfolioConfig::load()?,
    };
    Ok(config)
}

pub async fn run(cli: Cli) -> anyhow::Result<Value> {
    let config = load_config(cli.config.as_ref())?;
    let service = config
        .build_service()
        .context("failed to initialise portfolio service")?;
    dispatch(&service, cli.command).await
}

pub async fn dispatch(service: &PortfolioDataService, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Projects => read_cmd::to_json(&service.get_projects().await),
        Command::Project(args) => read_cmd::run_project(service, args).await,
        Command::Portfolio => read_cmd::to_json(&service.get_portfolio().await),
        Command::Strategy => read_cmd::to_json(&service.get_strategy().await),
        Command::Alerts => read_cmd::to_json(&service.get_alerts().await),
        Command::Risks => read_cmd::to_json(&service.get_risks_with_summary()),
        Command::PmScores => read_cmd::to_json(&service.get_pm_scores()),
        Command::Status => read_cmd::to_json(&service.connection_status().await),
        Command::Invalidate(args) => read_cmd::run_invalidate(service, args).await,
        Command::UpdateTask(args) => write_cmd::run_update_task(service, args).await,
        Command::SetFinish(args) => write_cmd::run_set_finish(service, args).await,
        Command::Assign(args) => write_cmd::run_assign(service, args).await,
        Command::AssignAll(args) => write_cmd::run_assign_all(service, args).await,
        Command::BridgeHealth => read_cmd::to_json(&service.bridge_health().await),
        Command::Resources => read_cmd::to_json(&service.list_resources().await?),
        Command::Execute(args) => write_cmd::run_execute(service, args).await,
    }
}

/// Exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<WriteBackError>() {
        return match err {
            WriteBackError::Validation(_) | WriteBackError::NotFound(_) => 2,
            _ => 3,
        };
    }
    match err.downcast_ref::<BridgeError>() {
        Some(BridgeError::Validation(_)) => 2,
        _ => 1,
    }
}
