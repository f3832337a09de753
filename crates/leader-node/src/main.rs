//! `leader-node` binary: joins the election or prints the shared record

use anyhow::Context;
use clap::Parser;
use leader_node::{build_store, run_until, runner, telemetry, Cli, Command, Node};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format)?;

    let config = cli.resolve().context("invalid configuration")?;
    let store = build_store(&config).await?;

    match cli.command {
        Command::Run(_) => {
            let node = Node::new(&config, store);
            run_until(node, shutdown_signal()).await
        }
        Command::Status => {
            let record = runner::status(&config, store.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
