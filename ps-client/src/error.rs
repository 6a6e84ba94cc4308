use thiserror::Error;

/// Errors surfaced by [`crate::SchedulingServiceClient`].
///
/// Write-workflow variants identify the step that failed so callers can tell
/// a rejected checkout from a failed publish.
#[derive(Debug, Error)]
pub enum PsError {
    /// Context-info call failed or returned no `FormDigestValue`.
    #[error("form digest unavailable: {reason}")]
    DigestUnavailable { reason: String },

    #[error("checkout of project {project_id} failed with status {status}")]
    CheckoutFailed { project_id: String, status: u16 },

    #[error("update of {target} failed with status {status}")]
    PatchFailed { target: String, status: u16 },

    #[error("publish of project {project_id} failed with status {status}")]
    PublishFailed { project_id: String, status: u16 },

    #[error("adding assignment to project {project_id} failed with status {status}")]
    AssignmentFailed { project_id: String, status: u16 },

    /// A read returned something other than 200.
    #[error("{operation} failed with status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    /// The response envelope is missing the field the endpoint contract promises.
    #[error("unexpected response shape from {operation}: {detail}")]
    Schema {
        operation: &'static str,
        detail: String,
    },

    /// NTLM handshake could not be completed or the credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PsError {
    /// True for failures of the checkout/patch/publish sequence.
    pub fn is_write_workflow(&self) -> bool {
        matches!(
            self,
            Self::CheckoutFailed { .. }
                | Self::PatchFailed { .. }
                | Self::PublishFailed { .. }
                | Self::AssignmentFailed { .. }
        )
    }

    /// True for digest and NTLM failures.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::DigestUnavailable { .. } | Self::Authentication(_))
    }
}

pub type PsResult<T> = Result<T, PsError>;
