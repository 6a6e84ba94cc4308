use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use epm_bridge::AssignAllRequest;
use epm_portfolio::{ActionProposal, PortfolioDataService, ResourceAssignment, TaskUpdate};
use serde_json::Value;

use crate::read_cmd::to_json;

#[derive(Debug, Parser)]
pub struct UpdateTaskArgs {
    /// Project Server project GUID.
    #[arg(long = "project-id")]
    pub project_id: String,

    /// Project Server task GUID.
    #[arg(long = "task-id")]
    pub task_id: String,

    #[arg(long = "percent-complete", required_unless_present = "fixed_cost")]
    pub percent_complete: Option<f64>,

    #[arg(long = "fixed-cost")]
    pub fixed_cost: Option<f64>,
}

#[derive(Debug, Parser)]
pub struct SetFinishArgs {
    #[arg(long = "project-id")]
    pub project_id: String,

    /// New finish date, e.g. 2025-09-30T17:00:00.
    #[arg(long = "finish-date")]
    pub finish_date: String,
}

#[derive(Debug, Parser)]
pub struct AssignArgs {
    #[arg(long = "project-id")]
    pub project_id: String,

    #[arg(long = "task-id")]
    pub task_id: Option<String>,

    #[arg(long = "resource-id")]
    pub resource_id: Option<String>,

    /// Names route the assignment through the bridge.
    #[arg(long = "project-name")]
    pub project_name: Option<String>,

    #[arg(long = "task-name")]
    pub task_name: Option<String>,

    #[arg(long = "resource-name")]
    pub resource_name: Option<String>,
}

#[derive(Debug, Parser)]
pub struct AssignAllArgs {
    /// JSON file with `{"projectAssignments": {...}}`; `-` reads stdin.
    pub file: PathBuf,
}

#[derive(Debug, Parser)]
pub struct ExecuteArgs {
    /// Action JSON, e.g. `{"type":"update_task_progress","params":{...}}`; `-` reads stdin.
    pub action: String,
}

pub(crate) async fn run_update_task(
    service: &PortfolioDataService,
    args: UpdateTaskArgs,
) -> anyhow::Result<Value> {
    let update = TaskUpdate {
        percent_complete: args.percent_complete,
        fixed_cost: args.fixed_cost,
    };
    to_json(&service.update_task(&args.project_id, &args.task_id, update).await?)
}

pub(crate) async fn run_set_finish(
    service: &PortfolioDataService,
    args: SetFinishArgs,
) -> anyhow::Result<Value> {
    to_json(
        &service
            .update_schedule(&args.project_id, &args.finish_date)
            .await?,
    )
}

pub(crate) async fn run_assign(
    service: &PortfolioDataService,
    args: AssignArgs,
) -> anyhow::Result<Value> {
    let assignment = ResourceAssignment {
        project_id: args.project_id,
        task_id: args.task_id,
        resource_id: args.resource_id,
        project_name: args.project_name,
        task_name: args.task_name,
        resource_name: args.resource_name,
    };
    to_json(&service.assign_resource(&assignment).await?)
}

pub(crate) async fn run_assign_all(
    service: &PortfolioDataService,
    args: AssignAllArgs,
) -> anyhow::Result<Value> {
    let body = if args.file.as_os_str() == "-" {
        read_stdin()?
    } else {
        std::fs::read(&args.file)
            .with_context(|| format!("failed to read {}", args.file.display()))?
    };
    let request = AssignAllRequest::from_json(&body)?;
    to_json(&service.assign_all(&request).await?)
}

pub(crate) async fn run_execute(
    service: &PortfolioDataService,
    args: ExecuteArgs,
) -> anyhow::Result<Value> {
    let body = if args.action == "-" {
        read_stdin()?
    } else {
        args.action.into_bytes()
    };
    let action: ActionProposal =
        serde_json::from_slice(&body).context("invalid action proposal")?;
    to_json(&service.execute_action(&action).await?)
}

fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut body = Vec::new();
    std::io::stdin()
        .read_to_end(&mut body)
        .context("failed to read stdin")?;
    Ok(body)
}
