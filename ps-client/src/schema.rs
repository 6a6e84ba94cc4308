//! OData "verbose" envelopes returned by Project Server.
//!
//! Every endpoint wraps its payload under `d`; collections additionally nest
//! under `d.results`. Missing fields fail with [`PsError::Schema`] instead of
//! being treated as empty.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PsError, PsResult};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    d: T,
}

#[derive(Debug, Deserialize)]
struct Results<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContextInfo {
    get_context_web_information: WebInformation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WebInformation {
    form_digest_value: String,
}

/// Decode `{"d":{"results":[...]}}`.
pub(crate) fn collection<T: DeserializeOwned>(
    operation: &'static str,
    body: Value,
) -> PsResult<Vec<T>> {
    serde_json::from_value::<Envelope<Results<T>>>(body)
        .map(|envelope| envelope.d.results)
        .map_err(|e| PsError::Schema {
            operation,
            detail: e.to_string(),
        })
}

/// `d.GetContextWebInformation.FormDigestValue`, if present and non-empty.
pub(crate) fn form_digest(body: Value) -> Option<String> {
    serde_json::from_value::<Envelope<ContextInfo>>(body)
        .ok()
        .map(|envelope| envelope.d.get_context_web_information.form_digest_value)
        .filter(|digest| !digest.is_empty())
}

/// Queue job id from a publish response (`d.publish.Value`).
pub(crate) fn publish_job_id(body: &Value) -> Option<String> {
    match body.pointer("/d/publish/Value")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
