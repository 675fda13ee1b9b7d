//! # Finch CLI
//!
//! The interactive terminal client for the finch posting services.

use anyhow::Result;
use clap::Parser;

use finch_core::Backend;
use finch_core::service::SessionGate;

mod config;
mod shell;

use config::{BackendKind, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let backend = build_backend(&cli);

    // Hold the prompt until the session restore settles; before that,
    // a signed-in user would transiently look signed out.
    let gate = SessionGate::new(&backend);
    gate.wait_until_ready().await;

    shell::Shell::new(backend).run().await
}

fn build_backend(cli: &Cli) -> Backend {
    match cli.backend {
        BackendKind::Memory => {
            tracing::info!("Using the in-memory backend; data is gone on exit");
            finch_infra::memory_backend()
        }
        BackendKind::Remote => match finch_infra::connect(cli.remote_config()) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!(
                    "Failed to set up the remote backend: {}. Using in-memory fallback.",
                    e
                );
                finch_infra::memory_backend()
            }
        },
    }
}

fn init_tracing(filter: Option<&str>) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = match filter {
        Some(filter) => EnvFilter::try_new(filter).map_err(Into::into),
        None => EnvFilter::try_from_default_env(),
    }
    .unwrap_or_else(|_| EnvFilter::new("info,finch_cli=debug,finch_infra=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}
