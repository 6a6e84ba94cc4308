//! Shell-out to the CSOM automation script.
//!
//! The script receives connection parameters and an action on its command
//! line and writes a single JSON document to stdout. That document is the
//! only trusted outcome: exit status alone never counts as success.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::Assignment;
use crate::truncate_chars;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);
const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
const STDERR_LOG_CHARS: usize = 500;
const OUTPUT_ERROR_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationAction {
    ListProjects,
    ListResources,
    ListTasks,
    Assign,
}

impl AutomationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListProjects => "list-projects",
            Self::ListResources => "list-resources",
            Self::ListTasks => "list-tasks",
            Self::Assign => "assign",
        }
    }
}

impl std::fmt::Display for AutomationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional per-action parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionExtra {
    pub project_name: Option<String>,
    pub assignments: Option<Vec<Assignment>>,
}

impl ActionExtra {
    pub fn project(name: impl Into<String>) -> Self {
        Self {
            project_name: Some(name.into()),
            assignments: None,
        }
    }
}

/// Executes automation actions and returns their JSON payload.
#[async_trait]
pub trait AutomationRunner: Send + Sync {
    async fn run(&self, action: AutomationAction, extra: ActionExtra) -> BridgeResult<Value>;
}

/// Site and account the automation script signs in with.
#[derive(Clone, Default)]
pub struct PwaCredentials {
    pub pwa_url: String,
    pub username: String,
    pub password: String,
    pub domain: String,
}

impl std::fmt::Debug for PwaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PwaCredentials")
            .field("pwa_url", &self.pwa_url)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Program and arguments used to launch the automation script.
#[derive(Debug, Clone)]
pub struct AutomationCommand {
    pub program: String,
    /// Arguments placed before the connection parameters (interpreter flags, script path).
    pub prefix_args: Vec<String>,
    pub credentials: PwaCredentials,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl AutomationCommand {
    /// `powershell.exe -NoProfile -ExecutionPolicy Bypass -File <script>`.
    pub fn powershell(script: impl Into<PathBuf>, credentials: PwaCredentials) -> Self {
        Self::with_shell("powershell.exe", script, credentials)
    }

    /// Same argument layout with a different PowerShell host, e.g. `pwsh`.
    pub fn with_shell(
        program: impl Into<String>,
        script: impl Into<PathBuf>,
        credentials: PwaCredentials,
    ) -> Self {
        let script: PathBuf = script.into();
        Self {
            program: program.into(),
            prefix_args: vec![
                "-NoProfile".to_string(),
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-File".to_string(),
                script.display().to_string(),
            ],
            credentials,
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Full argument list for one action.
    pub fn args_for(&self, action: AutomationAction, extra: &ActionExtra) -> BridgeResult<Vec<String>> {
        let mut args = self.prefix_args.clone();
        for (flag, value) in [
            ("-PwaUrl", &self.credentials.pwa_url),
            ("-Username", &self.credentials.username),
            ("-Password", &self.credentials.password),
            ("-Domain", &self.credentials.domain),
        ] {
            args.push(flag.to_string());
            args.push(value.clone());
        }
        args.push("-Action".to_string());
        args.push(action.as_str().to_string());

        if let Some(project_name) = &extra.project_name {
            args.push("-ProjectName".to_string());
            args.push(project_name.clone());
        }
        if let Some(assignments) = &extra.assignments {
            let encoded = serde_json::to_string(assignments)
                .map_err(|e| BridgeError::Protocol(format!("cannot encode assignments: {e}")))?;
            args.push("-Assignments".to_string());
            args.push(encoded);
        }
        Ok(args)
    }
}

/// Production [`AutomationRunner`]: one child process per action.
pub struct ScriptRunner {
    command: AutomationCommand,
}

impl ScriptRunner {
    pub fn new(command: AutomationCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &AutomationCommand {
        &self.command
    }

    fn spawn_error(&self, source: std::io::Error) -> BridgeError {
        BridgeError::Spawn {
            program: self.command.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl AutomationRunner for ScriptRunner {
    async fn run(&self, action: AutomationAction, extra: ActionExtra) -> BridgeResult<Value> {
        let args = self.command.args_for(action, &extra)?;
        tracing::info!(
            action = %action,
            project = extra.project_name.as_deref().unwrap_or_default(),
            "running automation action"
        );

        let mut child = Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Protocol("automation stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::Protocol("automation stderr not captured".to_string()))?;
        let limit = self.command.max_output_bytes;

        let run = async {
            let (out, err, status) = tokio::try_join!(
                read_capped(stdout, limit),
                read_capped(stderr, limit),
                async { child.wait().await.map_err(|e| self.spawn_error(e)) },
            )?;
            Ok::<_, BridgeError>((out, err, status))
        };

        // Returning on timeout drops the child, which kills it.
        let (out, err, status) = tokio::time::timeout(self.command.timeout, run)
            .await
            .map_err(|_| BridgeError::Timeout {
                elapsed: self.command.timeout,
            })??;

        let stderr = String::from_utf8_lossy(&err);
        if !stderr.trim().is_empty() {
            tracing::error!(
                action = %action,
                stderr = truncate_chars(stderr.trim(), STDERR_LOG_CHARS),
                "automation process wrote to stderr"
            );
        }

        let stdout = String::from_utf8_lossy(&out);
        let stdout = stdout.trim();
        match serde_json::from_str::<Value>(stdout) {
            Ok(payload) => {
                if !status.success() && payload.get("success") != Some(&Value::Bool(true)) {
                    tracing::error!(
                        action = %action,
                        exit = %status,
                        message = payload.get("message").and_then(serde_json::Value::as_str).unwrap_or_default(),
                        "automation action failed"
                    );
                }
                Ok(payload)
            }
            Err(_) if !status.success() => Err(BridgeError::Protocol(format!(
                "automation process failed: {status}. Output: {}",
                truncate_chars(stdout, OUTPUT_ERROR_CHARS)
            ))),
            Err(_) => Err(BridgeError::Protocol(format!(
                "invalid JSON from automation process: {}",
                truncate_chars(stdout, OUTPUT_ERROR_CHARS)
            ))),
        }
    }
}

async fn read_capped<R>(reader: R, limit: usize) -> BridgeResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let read = reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| BridgeError::Protocol(format!("failed to read automation output: {e}")))?;
    if read > limit {
        return Err(BridgeError::OutputTooLarge { limit });
    }
    Ok(buf)
}
