//! Out-of-process automation bridge for Project Server.
//!
//! Some PWA operations (resource assignment by name in particular) are only
//! reachable through the CSOM object model. The bridge exposes them over
//! HTTP by running a PowerShell script per request.
//!
//! - [`runner`]: the process abstraction and its parse-or-fail rules
//! - [`server`]: axum routes in front of a runner
//! - [`BridgeClient`]: reqwest client used by the portfolio service

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
pub mod config;
mod error;
pub mod protocol;
pub mod runner;
pub mod server;

pub use client::{BridgeApi, BridgeClient};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use protocol::{
    AssignAllRequest, AssignAllResponse, AssignRequest, Assignment, BridgeResponse,
    HealthResponse, ProjectResult,
};
pub use runner::{
    ActionExtra, AutomationAction, AutomationCommand, AutomationRunner, PwaCredentials,
    ScriptRunner,
};
pub use server::{BridgeState, router, serve};

/// Longest prefix of `text` with at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
