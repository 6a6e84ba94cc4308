use anyhow::Context;
use clap::Parser;
use epm_portfolio::PortfolioDataService;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Parser)]
pub struct ProjectArgs {
    /// Dashboard id (e.g. P001) or Project Server GUID.
    pub id: String,
}

#[derive(Debug, Parser)]
pub struct InvalidateArgs {
    /// Cache key to drop; clears everything when omitted.
    #[arg(long = "key", short = 'k')]
    pub key: Option<String>,
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("failed to serialise output")
}

pub(crate) async fn run_project(
    service: &PortfolioDataService,
    args: ProjectArgs,
) -> anyhow::Result<Value> {
    match service.get_project_by_id(&args.id).await {
        Some(project) => to_json(&project),
        None => Err(epm_portfolio::WriteBackError::NotFound(format!(
            "Project \"{}\" not found",
            args.id
        ))
        .into()),
    }
}

pub(crate) async fn run_invalidate(
    service: &PortfolioDataService,
    args: InvalidateArgs,
) -> anyhow::Result<Value> {
    service.invalidate_cache(args.key.as_deref()).await;
    let message = match &args.key {
        Some(key) => format!("Cache key '{key}' invalidated"),
        None => "All cache cleared".to_string(),
    };
    Ok(json!({"success": true, "message": message}))
}
