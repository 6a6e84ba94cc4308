//! Static dataset rows and the merged project view served to clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Enrichment record from `projects.json`, matched to live projects by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
    pub health: Option<String>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub roi: Option<f64>,
    pub alignment_score: Option<f64>,
    pub strategic_objective: Option<String>,
    pub risk_score: Option<f64>,
    pub risks: Vec<Value>,
    pub pm_id: Option<String>,
    pub pm_name: Option<String>,
    pub ai_insights: Option<Value>,
    pub lessons_learned: Vec<Value>,
    pub progress: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskRecord {
    pub id: String,
    pub title: String,
    pub status: String,
    pub category: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectManagerRecord {
    pub id: String,
    pub name: String,
    pub workload: f64,
    pub overall_score: f64,
    pub trend: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategicObjectiveRecord {
    pub id: String,
    pub name: String,
    /// Ids of the projects contributing to this objective.
    pub projects: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where a [`MergedProject`] came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "project-server")]
    ProjectServer,
    #[default]
    #[serde(rename = "static")]
    Static,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedTask {
    pub id: String,
    pub name: String,
    pub progress: f64,
    pub cost: f64,
    pub start_date: String,
    pub end_date: String,
}

/// Project as served to the dashboard: live schedule data joined with the
/// analytical enrichment record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedProject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_id: Option<String>,
    pub name: String,
    pub progress: f64,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub health: String,
    pub budget: f64,
    pub spent: f64,
    pub roi: f64,
    pub alignment_score: f64,
    pub strategic_objective: String,
    pub risk_score: f64,
    pub risks: Vec<Value>,
    pub pm_id: String,
    pub pm_name: String,
    pub ai_insights: Value,
    pub lessons_learned: Vec<Value>,
    #[serde(default)]
    pub tasks: Vec<MergedTask>,
    #[serde(rename = "_source")]
    pub source: DataSource,
    #[serde(rename = "_lastSync")]
    pub last_sync: String,
    /// Additional static fields carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MergedProject {
    pub fn find_task(&self, name: &str) -> Option<&MergedTask> {
        self.tasks.iter().find(|task| task.name == name)
    }
}
