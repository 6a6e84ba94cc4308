//! Dashboard summaries derived from merged projects and the static dataset.
//!
//! Every function is pure; callers decide where the inputs come from.

use serde::Serialize;

use crate::records::{
    MergedProject, ProjectManagerRecord, RiskRecord, StrategicObjectiveRecord,
};

const OVERLOAD_WORKLOAD: f64 = 80.0;
const BUDGET_BURN_RATIO: f64 = 0.8;
const BUDGET_PROGRESS_FLOOR: f64 = 70.0;
const SUPPORT_SCORE_FLOOR: f64 = 75.0;

pub const PM_METRICS: [&str; 5] = [
    "delivery",
    "budget",
    "riskResolution",
    "stakeholderSatisfaction",
    "documentation",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthBreakdown {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_projects: usize,
    pub total_budget: f64,
    pub total_spent: f64,
    pub health_breakdown: HealthBreakdown,
    pub avg_progress: i64,
    pub strategic_objectives: usize,
    pub projects: Vec<MergedProject>,
    pub objectives: Vec<StrategicObjectiveRecord>,
}

pub fn portfolio(
    projects: Vec<MergedProject>,
    objectives: Vec<StrategicObjectiveRecord>,
) -> PortfolioSummary {
    let count_health = |health: &str| projects.iter().filter(|p| p.health == health).count();
    PortfolioSummary {
        total_projects: projects.len(),
        total_budget: projects.iter().map(|p| p.budget).sum(),
        total_spent: projects.iter().map(|p| p.spent).sum(),
        health_breakdown: HealthBreakdown {
            green: count_health("green"),
            yellow: count_health("yellow"),
            red: count_health("red"),
        },
        avg_progress: rounded_mean(projects.iter().map(|p| p.progress)),
        strategic_objectives: objectives.len(),
        projects,
        objectives,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveDetail {
    #[serde(flatten)]
    pub objective: StrategicObjectiveRecord,
    pub project_details: Vec<MergedProject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub objectives: Vec<ObjectiveDetail>,
    #[serde(rename = "overallROI")]
    pub overall_roi: i64,
    pub alignment_score: i64,
}

pub fn strategy(
    objectives: Vec<StrategicObjectiveRecord>,
    projects: &[MergedProject],
) -> StrategySummary {
    let objectives = objectives
        .into_iter()
        .map(|objective| {
            let project_details = projects
                .iter()
                .filter(|p| objective.projects.contains(&p.id))
                .cloned()
                .collect();
            ObjectiveDetail {
                objective,
                project_details,
            }
        })
        .collect();
    StrategySummary {
        objectives,
        overall_roi: rounded_mean(projects.iter().map(|p| p.roi)),
        alignment_score: rounded_mean(projects.iter().map(|p| p.alignment_score)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Project,
    Risk,
    Resource,
    Budget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub category: AlertCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm_id: Option<String>,
}

/// Alerts in rule order: red projects, critical risks, overloaded managers,
/// then budget burn ahead of progress.
pub fn alerts(
    projects: &[MergedProject],
    risks: &[RiskRecord],
    managers: &[ProjectManagerRecord],
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    alerts.extend(projects.iter().filter(|p| p.health == "red").map(|p| Alert {
        level: AlertLevel::Critical,
        category: AlertCategory::Project,
        message: format!("{} is at risk", p.name),
        project_id: Some(p.id.clone()),
        pm_id: None,
    }));

    alerts.extend(risks.iter().filter(|r| r.status == "Critical").map(|r| Alert {
        level: AlertLevel::Critical,
        category: AlertCategory::Risk,
        message: format!("Critical risk: {}", r.title),
        project_id: r.project_id.clone(),
        pm_id: None,
    }));

    alerts.extend(
        managers
            .iter()
            .filter(|pm| pm.workload > OVERLOAD_WORKLOAD)
            .map(|pm| Alert {
                level: AlertLevel::Warning,
                category: AlertCategory::Resource,
                message: format!("{} is overloaded ({}%)", pm.name, pm.workload),
                project_id: None,
                pm_id: Some(pm.id.clone()),
            }),
    );

    alerts.extend(
        projects
            .iter()
            .filter(|p| p.budget != 0.0)
            .filter(|p| p.spent / p.budget > BUDGET_BURN_RATIO && p.progress < BUDGET_PROGRESS_FLOOR)
            .map(|p| Alert {
                level: AlertLevel::Warning,
                category: AlertCategory::Budget,
                message: format!(
                    "{} budget concern: {}% spent, {}% complete",
                    p.name,
                    (p.spent / p.budget * 100.0).round(),
                    p.progress
                ),
                project_id: Some(p.id.clone()),
                pm_id: None,
            }),
    );

    alerts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PmScores {
    pub project_managers: Vec<ProjectManagerRecord>,
    pub metrics: Vec<&'static str>,
    pub avg_score: i64,
    pub top_performer: Option<ProjectManagerRecord>,
    pub needs_support: Vec<ProjectManagerRecord>,
}

pub fn pm_scores(mut managers: Vec<ProjectManagerRecord>) -> PmScores {
    managers.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
    let needs_support = managers
        .iter()
        .filter(|pm| pm.overall_score < SUPPORT_SCORE_FLOOR || pm.trend == "down")
        .cloned()
        .collect();
    PmScores {
        avg_score: rounded_mean(managers.iter().map(|pm| pm.overall_score)),
        top_performer: managers.first().cloned(),
        needs_support,
        metrics: PM_METRICS.to_vec(),
        project_managers: managers,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCounts {
    pub total: usize,
    pub critical: usize,
    pub open: usize,
    pub monitoring: usize,
    pub avg_score: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RiskCategoryCounts {
    pub resource: usize,
    pub scope: usize,
    pub financial: usize,
    pub technical: usize,
    pub schedule: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskOverview {
    pub risks: Vec<RiskRecord>,
    pub summary: RiskCounts,
    pub by_category: RiskCategoryCounts,
}

pub fn risks_with_summary(risks: Vec<RiskRecord>) -> RiskOverview {
    let status = |s: &str| risks.iter().filter(|r| r.status == s).count();
    let category = |c: &str| risks.iter().filter(|r| r.category == c).count();
    let summary = RiskCounts {
        total: risks.len(),
        critical: status("Critical"),
        open: status("Open"),
        monitoring: status("Monitoring"),
        avg_score: rounded_mean(risks.iter().map(|r| r.score)),
    };
    let by_category = RiskCategoryCounts {
        resource: category("Resource"),
        scope: category("Scope"),
        financial: category("Financial"),
        technical: category("Technical"),
        schedule: category("Schedule"),
    };
    RiskOverview {
        risks,
        summary,
        by_category,
    }
}

/// Mean rounded half away from zero; 0 for an empty input.
pub fn rounded_mean(values: impl Iterator<Item = f64>) -> i64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0;
    }
    (sum / f64::from(count)).round() as i64
}
