//! Read-through data service over Project Server and the static dataset.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use epm_bridge::BridgeApi;
use epm_ps_client::{PsResult, SchedulingApi};
use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::aggregates::{
    self, Alert, PmScores, PortfolioSummary, RiskOverview, StrategySummary,
};
use crate::cache::TtlCache;
use crate::merge::{merge_project_data, static_project, timestamp};
use crate::records::{
    MergedProject, ProjectManagerRecord, RiskRecord, StrategicObjectiveRecord,
};
use crate::static_data::StaticDataSource;

/// Cache key holding the merged project list.
pub const PROJECTS_KEY: &str = "projects";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub cache_ttl: Duration,
    /// Live reads are attempted only when this is set and a client exists.
    pub enabled: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub ps_enabled: bool,
    pub last_sync: Option<String>,
    pub cached_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    #[serde(flatten)]
    pub status: ServiceStatus,
    pub connected: bool,
    pub server_url: Option<String>,
}

/// Everything a completion prompt needs to reason about the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectContext {
    pub projects: Vec<MergedProject>,
    pub risks: Vec<RiskRecord>,
    pub pms: Vec<ProjectManagerRecord>,
    pub objectives: Vec<StrategicObjectiveRecord>,
}

pub struct PortfolioDataService {
    pub(crate) ps: Option<Arc<dyn SchedulingApi>>,
    pub(crate) bridge: Option<Arc<dyn BridgeApi>>,
    static_data: Arc<dyn StaticDataSource>,
    cache: TtlCache<Vec<MergedProject>>,
    ps_enabled: bool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl PortfolioDataService {
    pub fn new(
        ps: Option<Arc<dyn SchedulingApi>>,
        bridge: Option<Arc<dyn BridgeApi>>,
        static_data: Arc<dyn StaticDataSource>,
        options: ServiceOptions,
    ) -> Self {
        let ps_enabled = options.enabled && ps.is_some();
        Self {
            ps,
            bridge,
            static_data,
            cache: TtlCache::new(options.cache_ttl),
            ps_enabled,
            last_sync: Mutex::new(None),
        }
    }

    /// Merged projects: cached, else live, else the static records.
    ///
    /// The static fallback is never cached, so the next call retries
    /// Project Server.
    pub async fn get_projects(&self) -> Vec<MergedProject> {
        if let Some(cached) = self.cache.get(PROJECTS_KEY).await {
            return cached;
        }

        if let Some(ps) = self.ps.as_deref().filter(|_| self.ps_enabled) {
            match self.fetch_live(ps).await {
                Ok(Some(projects)) => {
                    self.cache.set(PROJECTS_KEY, projects.clone()).await;
                    return projects;
                }
                Ok(None) => {
                    tracing::warn!("Project Server returned no projects, serving static data");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Project Server fetch failed, serving static data");
                }
            }
        }

        let loaded_at = Utc::now();
        self.static_data
            .projects()
            .iter()
            .map(|record| static_project(record, loaded_at))
            .collect()
    }

    async fn fetch_live(&self, ps: &dyn SchedulingApi) -> PsResult<Option<Vec<MergedProject>>> {
        let remote = ps.list_projects().await?;
        if remote.is_empty() {
            return Ok(None);
        }

        let task_lists = try_join_all(remote.iter().map(|project| ps.list_tasks(&project.id))).await?;

        let synced_at = Utc::now();
        let records = self.static_data.projects();
        let merged: Vec<MergedProject> = remote
            .iter()
            .zip(&task_lists)
            .map(|(project, tasks)| merge_project_data(project, tasks, records, synced_at))
            .collect();

        *self.last_sync.lock().await = Some(synced_at);
        tracing::info!(projects = merged.len(), "merged live Project Server data");
        Ok(Some(merged))
    }

    /// Look a project up by dashboard id or Project Server GUID.
    pub async fn get_project_by_id(&self, id: &str) -> Option<MergedProject> {
        self.get_projects()
            .await
            .into_iter()
            .find(|project| project.id == id || project.ps_id.as_deref() == Some(id))
    }

    pub fn get_risks(&self) -> Vec<RiskRecord> {
        self.static_data.risks().to_vec()
    }

    pub fn get_project_managers(&self) -> Vec<ProjectManagerRecord> {
        self.static_data.project_managers().to_vec()
    }

    pub fn get_strategic_objectives(&self) -> Vec<StrategicObjectiveRecord> {
        self.static_data.strategic_objectives().to_vec()
    }

    pub async fn get_project_context(&self) -> ProjectContext {
        ProjectContext {
            projects: self.get_projects().await,
            risks: self.get_risks(),
            pms: self.get_project_managers(),
            objectives: self.get_strategic_objectives(),
        }
    }

    pub async fn get_portfolio(&self) -> PortfolioSummary {
        aggregates::portfolio(self.get_projects().await, self.get_strategic_objectives())
    }

    pub async fn get_strategy(&self) -> StrategySummary {
        let projects = self.get_projects().await;
        aggregates::strategy(self.get_strategic_objectives(), &projects)
    }

    pub async fn get_alerts(&self) -> Vec<Alert> {
        let projects = self.get_projects().await;
        aggregates::alerts(
            &projects,
            self.static_data.risks(),
            self.static_data.project_managers(),
        )
    }

    pub fn get_pm_scores(&self) -> PmScores {
        aggregates::pm_scores(self.get_project_managers())
    }

    pub fn get_risks_with_summary(&self) -> RiskOverview {
        aggregates::risks_with_summary(self.get_risks())
    }

    pub async fn invalidate_cache(&self, key: Option<&str>) {
        self.cache.invalidate(key).await;
        tracing::debug!(key = key.unwrap_or("*"), "cache invalidated");
    }

    pub fn is_live(&self) -> bool {
        self.ps_enabled
    }

    pub async fn get_status(&self) -> ServiceStatus {
        let last_sync = *self.last_sync.lock().await;
        ServiceStatus {
            ps_enabled: self.ps_enabled,
            last_sync: last_sync.map(timestamp),
            cached_keys: self.cache.keys().await,
        }
    }

    /// Status plus a live probe of the configured client.
    pub async fn connection_status(&self) -> ConnectionStatus {
        let connected = match &self.ps {
            Some(ps) => ps.test_connection().await,
            None => false,
        };
        ConnectionStatus {
            status: self.get_status().await,
            connected,
            server_url: self.ps.as_ref().map(|ps| ps.base_url().to_string()),
        }
    }
}
