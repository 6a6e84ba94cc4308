//! Reconciliation of live Project Server data with enrichment records.
//!
//! Precedence, field by field:
//! - schedule (progress, dates): live project, then record
//! - analytics (status, health, budget, roi, alignment, objective): the
//!   project description, then record, then a default
//! - spend: task costs weighted by completion, then record
//! - risk score, risks, manager, insights, lessons: record only
//!
//! Zero numbers and empty strings count as missing at every step.

use chrono::{DateTime, SecondsFormat, Utc};
use epm_ps_client::{RemoteProject, RemoteTask, description};
use serde_json::{Map, Value};

use crate::records::{DataSource, MergedProject, MergedTask, ProjectRecord};

const DEFAULT_STATUS: &str = "Unknown";
const DEFAULT_HEALTH: &str = "yellow";
const FALLBACK_ID_CHARS: usize = 8;

/// Build the merged view of one live project.
pub fn merge_project_data(
    remote: &RemoteProject,
    tasks: &[RemoteTask],
    records: &[ProjectRecord],
    synced_at: DateTime<Utc>,
) -> MergedProject {
    let desc = description::decode(remote.description.as_deref());
    let record = records.iter().find(|record| record.name == remote.name);
    let rec = |f: fn(&ProjectRecord) -> Option<&str>| record.and_then(f).filter(|s| !s.is_empty());
    let rec_num = |f: fn(&ProjectRecord) -> Option<f64>| nonzero(record.and_then(f));

    let id = record
        .map(|record| record.id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| remote.id.chars().take(FALLBACK_ID_CHARS).collect());

    MergedProject {
        id,
        ps_id: Some(remote.id.clone()),
        name: remote.name.clone(),
        progress: remote.percent_complete.unwrap_or_default(),
        start_date: date_part(remote.start_date.as_deref())
            .or_else(|| rec(|r| r.start_date.as_deref()))
            .unwrap_or_default()
            .to_string(),
        end_date: date_part(remote.finish_date.as_deref())
            .or_else(|| rec(|r| r.end_date.as_deref()))
            .unwrap_or_default()
            .to_string(),
        status: non_empty(desc.status.as_deref())
            .or_else(|| rec(|r| r.status.as_deref()))
            .unwrap_or(DEFAULT_STATUS)
            .to_string(),
        health: non_empty(desc.health.as_deref())
            .or_else(|| rec(|r| r.health.as_deref()))
            .unwrap_or(DEFAULT_HEALTH)
            .to_string(),
        budget: nonzero(desc.budget)
            .or_else(|| rec_num(|r| r.budget))
            .unwrap_or_default(),
        spent: nonzero(Some(task_spend(tasks)))
            .or_else(|| rec_num(|r| r.spent))
            .unwrap_or_default(),
        roi: nonzero(desc.roi)
            .or_else(|| rec_num(|r| r.roi))
            .unwrap_or_default(),
        alignment_score: nonzero(desc.alignment_score)
            .or_else(|| rec_num(|r| r.alignment_score))
            .unwrap_or_default(),
        strategic_objective: non_empty(desc.strategic_objective.as_deref())
            .or_else(|| rec(|r| r.strategic_objective.as_deref()))
            .unwrap_or_default()
            .to_string(),
        risk_score: rec_num(|r| r.risk_score).unwrap_or_default(),
        risks: record.map(|r| r.risks.clone()).unwrap_or_default(),
        pm_id: rec(|r| r.pm_id.as_deref()).unwrap_or_default().to_string(),
        pm_name: rec(|r| r.pm_name.as_deref()).unwrap_or_default().to_string(),
        ai_insights: record
            .and_then(|r| r.ai_insights.clone())
            .unwrap_or_else(|| Value::Object(Map::new())),
        lessons_learned: record
            .map(|r| r.lessons_learned.clone())
            .unwrap_or_default(),
        tasks: tasks.iter().map(merge_task).collect(),
        source: DataSource::ProjectServer,
        last_sync: timestamp(synced_at),
        extra: Map::new(),
    }
}

/// Present a static record in the merged shape, marked as static data.
pub fn static_project(record: &ProjectRecord, loaded_at: DateTime<Utc>) -> MergedProject {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    MergedProject {
        id: record.id.clone(),
        ps_id: None,
        name: record.name.clone(),
        progress: record.progress.unwrap_or_default(),
        start_date: text(&record.start_date),
        end_date: text(&record.end_date),
        status: non_empty(record.status.as_deref())
            .unwrap_or(DEFAULT_STATUS)
            .to_string(),
        health: non_empty(record.health.as_deref())
            .unwrap_or(DEFAULT_HEALTH)
            .to_string(),
        budget: record.budget.unwrap_or_default(),
        spent: record.spent.unwrap_or_default(),
        roi: record.roi.unwrap_or_default(),
        alignment_score: record.alignment_score.unwrap_or_default(),
        strategic_objective: text(&record.strategic_objective),
        risk_score: record.risk_score.unwrap_or_default(),
        risks: record.risks.clone(),
        pm_id: text(&record.pm_id),
        pm_name: text(&record.pm_name),
        ai_insights: record
            .ai_insights
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new())),
        lessons_learned: record.lessons_learned.clone(),
        tasks: Vec::new(),
        source: DataSource::Static,
        last_sync: timestamp(loaded_at),
        extra: record.extra.clone(),
    }
}

/// Σ fixed cost × percent complete / 100.
pub fn task_spend(tasks: &[RemoteTask]) -> f64 {
    tasks
        .iter()
        .map(|task| {
            task.fixed_cost.unwrap_or_default() * task.percent_complete.unwrap_or_default() / 100.0
        })
        .sum()
}

fn merge_task(task: &RemoteTask) -> MergedTask {
    MergedTask {
        id: task.id.clone(),
        name: task.name.clone(),
        progress: task.percent_complete.unwrap_or_default(),
        cost: task.fixed_cost.unwrap_or_default(),
        start_date: date_part(task.start.as_deref()).unwrap_or_default().to_string(),
        end_date: date_part(task.finish.as_deref()).unwrap_or_default().to_string(),
    }
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `2024-03-01T08:00:00` → `2024-03-01`.
fn date_part(value: Option<&str>) -> Option<&str> {
    value
        .and_then(|v| v.split('T').next())
        .filter(|date| !date.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}
