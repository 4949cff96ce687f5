use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use canned::cli::Cli;
use canned::rules::load_rules;
use canned::server::{Lifecycle, Listener, ServerContext, Shutdown, signals};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.config()?;

    let level = if cfg.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    let protocol = cfg.protocol()?;
    let rules = load_rules(&cfg.rules_dir, protocol.name())
        .with_context(|| format!("cannot start without {} rules", protocol))?;
    let context = Arc::new(ServerContext::from_config(&cfg, rules)?);

    let shutdown = Shutdown::new();
    signals::listen(shutdown.clone());
    if cfg.stdin_shutdown {
        tracing::info!("Enter a line on stdin to shut down");
        signals::listen_stdin(shutdown.clone());
    }

    let listener = Listener::bind(&cfg.host, cfg.port).await?;
    let server = Lifecycle::new(listener, context, shutdown)
        .nonblocking_teardown(cfg.nonblocking_teardown)
        .start();

    server.wait().await
}
