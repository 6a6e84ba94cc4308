//! Client for Microsoft Project Server (PWA) REST.
//!
//! Reads published projects, tasks and resources, and drives the stateful
//! write cycle: acquire digest, check out, patch the draft, publish, then
//! follow the publish job through the server queue. Requests are NTLM
//! authenticated (see [`ntlm`]).

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod api;
mod client;
pub mod description;
mod error;
pub mod ntlm;
mod schema;
mod transport;
mod types;

pub use api::SchedulingApi;
pub use client::{PsConnectionConfig, QueueWaitPolicy, SchedulingServiceClient};
pub use description::DescriptionFields;
pub use error::{PsError, PsResult};
pub use transport::PsResponse;
pub use types::{
    CustomFieldInfo, FormDigest, PatchTarget, PublishOutcome, QueueStatus, RemoteProject,
    RemoteResource, RemoteTask,
};
