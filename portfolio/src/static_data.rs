//! The local analytical dataset: enrichment records, risks, project
//! managers and strategic objectives.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{PortfolioError, Result};
use crate::records::{ProjectManagerRecord, ProjectRecord, RiskRecord, StrategicObjectiveRecord};

pub const PROJECTS_FILE: &str = "projects.json";
pub const RISKS_FILE: &str = "risks.json";
pub const PROJECT_MANAGERS_FILE: &str = "projectManagers.json";
pub const STRATEGIC_OBJECTIVES_FILE: &str = "strategicObjectives.json";

/// Read-only access to the static dataset.
pub trait StaticDataSource: Send + Sync {
    fn projects(&self) -> &[ProjectRecord];
    fn risks(&self) -> &[RiskRecord];
    fn project_managers(&self) -> &[ProjectManagerRecord];
    fn strategic_objectives(&self) -> &[StrategicObjectiveRecord];
}

/// Dataset held in memory for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct StaticDataset {
    pub projects: Vec<ProjectRecord>,
    pub risks: Vec<RiskRecord>,
    pub project_managers: Vec<ProjectManagerRecord>,
    pub strategic_objectives: Vec<StrategicObjectiveRecord>,
}

impl StaticDataset {
    /// Load the four JSON files from `dir`. A missing file yields an empty
    /// collection; a malformed one is an error.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let dataset = Self {
            projects: load_file(&dir.join(PROJECTS_FILE))?,
            risks: load_file(&dir.join(RISKS_FILE))?,
            project_managers: load_file(&dir.join(PROJECT_MANAGERS_FILE))?,
            strategic_objectives: load_file(&dir.join(STRATEGIC_OBJECTIVES_FILE))?,
        };
        tracing::info!(
            dir = %dir.display(),
            projects = dataset.projects.len(),
            risks = dataset.risks.len(),
            managers = dataset.project_managers.len(),
            objectives = dataset.strategic_objectives.len(),
            "static dataset loaded"
        );
        Ok(dataset)
    }
}

impl StaticDataSource for StaticDataset {
    fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    fn risks(&self) -> &[RiskRecord] {
        &self.risks
    }

    fn project_managers(&self) -> &[ProjectManagerRecord] {
        &self.project_managers
    }

    fn strategic_objectives(&self) -> &[StrategicObjectiveRecord] {
        &self.strategic_objectives
    }
}

fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "static data file missing, using empty set");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(PortfolioError::StaticData {
                file: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    serde_json::from_str(&contents).map_err(|e| PortfolioError::StaticData {
        file: path.display().to_string(),
        message: e.to_string(),
    })
}
