use std::io::Write;

use clap::Parser;
use epm_cli::{Cli, exit_code, run};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &output)?;
            writeln!(stdout)?;
            Ok(())
        }
        Err(err) => {
            tracing::error!("{err:#}");
            std::process::exit(exit_code(&err));
        }
    }
}
