//! Error types for the portfolio layer.
//!
//! Reads never surface remote failures (they degrade to static data), so
//! [`PortfolioError`] only covers local setup: configuration and the static
//! dataset. Write-back paths propagate [`WriteBackError`].

use epm_bridge::BridgeError;
use epm_ps_client::PsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("static data error in {file}: {message}")]
    StaticData { file: String, message: String },
}

impl PortfolioError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Failure of a write-back use case.
#[derive(Debug, Error)]
pub enum WriteBackError {
    /// The collaborator the operation needs (Project Server or the bridge) is absent.
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The bridge answered but reported `success: false`.
    #[error("bridge rejected the request: {0}")]
    BridgeRejected(String),

    #[error(transparent)]
    ProjectServer(#[from] PsError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl WriteBackError {
    /// HTTP-style status a front end would map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotConfigured(_) => 503,
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::BridgeRejected(_) | Self::ProjectServer(_) | Self::Bridge(_) => 500,
        }
    }
}

pub type WriteBackResult<T> = std::result::Result<T, WriteBackError>;
