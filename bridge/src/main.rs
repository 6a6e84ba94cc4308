//! `epm-bridge` entry point.
//!
//! Runs next to Project Server and relays HTTP requests to the CSOM
//! automation script.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use epm_bridge::{BridgeConfig, BridgeState, ScriptRunner};

#[derive(Debug, Parser)]
#[command(name = "epm-bridge", version, about = "Project Server automation bridge")]
struct Args {
    /// Address to listen on.
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Port to listen on (overrides PS_BRIDGE_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Automation script path (overrides PS_BRIDGE_SCRIPT).
    #[arg(long)]
    script: Option<PathBuf>,

    /// PowerShell host (overrides PS_BRIDGE_SHELL).
    #[arg(long)]
    shell: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = BridgeConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(script) = args.script {
        config.script = script;
    }
    if let Some(shell) = args.shell {
        config.shell = shell;
    }

    let state = BridgeState {
        runner: Arc::new(ScriptRunner::new(config.automation_command())),
        pwa_url: config.credentials.pwa_url.clone(),
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        pwa_url = %config.credentials.pwa_url,
        script = %config.script.display(),
        "epm-bridge v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };
    epm_bridge::serve(listener, state, shutdown).await?;

    tracing::info!("epm-bridge exiting cleanly");
    Ok(())
}
