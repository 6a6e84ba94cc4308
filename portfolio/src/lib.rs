//! Portfolio data layer: live Project Server data merged with the static
//! analytical dataset, cached, summarised, and written back.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod aggregates;
mod cache;
mod config;
mod error;
pub mod merge;
mod records;
mod service;
pub mod static_data;
mod writeback;

pub use cache::TtlCache;
pub use config::{BridgeSettings, PortfolioConfig, ProjectServerConfig};
pub use error::{PortfolioError, Result, WriteBackError, WriteBackResult};
pub use records::{
    DataSource, MergedProject, MergedTask, ProjectManagerRecord, ProjectRecord, RiskRecord,
    StrategicObjectiveRecord,
};
pub use service::{
    ConnectionStatus, DEFAULT_CACHE_TTL, PROJECTS_KEY, PortfolioDataService, ProjectContext,
    ServiceOptions, ServiceStatus,
};
pub use static_data::{StaticDataSource, StaticDataset};
pub use writeback::{
    ActionProposal, AssignmentMethod, BridgeHealthReport, ResourceAssignment, ResourceSummary,
    TaskUpdate, WriteBackOutcome,
};
