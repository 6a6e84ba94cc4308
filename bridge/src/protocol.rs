//! JSON bodies exchanged between the data service, the bridge server and the
//! automation process.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub resource_name: String,
    pub task_name: String,
}

/// Body of `POST /api/assign`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub project_name: String,
    pub assignments: Vec<Assignment>,
}

impl AssignRequest {
    /// Parse and validate a request body.
    pub fn from_json(body: &[u8]) -> BridgeResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BridgeError::Validation(format!("invalid JSON body: {e}")))?;

        let project_name = value
            .get("projectName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BridgeError::Validation("projectName is required".to_string()))?
            .to_string();

        let assignments = value
            .get("assignments")
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
            .ok_or_else(|| {
                BridgeError::Validation("assignments array is required".to_string())
            })?;
        let assignments = assignments
            .iter()
            .map(|item| serde_json::from_value(item.clone()))
            .collect::<Result<Vec<Assignment>, _>>()
            .map_err(|e| BridgeError::Validation(format!("invalid assignment: {e}")))?;

        Ok(Self {
            project_name,
            assignments,
        })
    }
}

/// Body of `POST /api/assign-all`. Projects are processed in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAllRequest {
    pub project_assignments: IndexMap<String, Vec<Assignment>>,
}

impl AssignAllRequest {
    pub fn from_json(body: &[u8]) -> BridgeResult<Self> {
        serde_json::from_slice(body).map_err(|e| {
            BridgeError::Validation(format!("projectAssignments object is required: {e}"))
        })
    }
}

/// Result envelope written by the automation process and relayed by the bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BridgeResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Interpret an automation payload. Non-object payloads count as failures.
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::Object(_) => serde_json::from_value(payload).unwrap_or_else(|e| {
                Self::failure(format!("malformed automation result: {e}"))
            }),
            other => Self::failure(format!("unexpected automation result: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResult {
    pub project_name: String,
    #[serde(flatten)]
    pub response: BridgeResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignAllResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<ProjectResult>,
}

impl AssignAllResponse {
    pub fn from_results(results: Vec<ProjectResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.response.success).count();
        Self {
            success: succeeded == results.len(),
            message: format!(
                "Processed {} projects: {succeeded} succeeded",
                results.len()
            ),
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub pwa_url: String,
    pub timestamp: String,
}
