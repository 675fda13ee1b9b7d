//! Client configuration: command-line flags layered over the environment.

use clap::{Parser, ValueEnum};
use finch_infra::RemoteConfig;

/// finch - a tiny social feed in your terminal
#[derive(Parser, Debug)]
#[command(name = "finch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Backend to talk to
    #[arg(long, value_enum, default_value_t = BackendKind::Memory)]
    pub backend: BackendKind,

    /// Remote base URL (overrides FINCH_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Remote API key (overrides FINCH_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Log filter (overrides RUST_LOG)
    #[arg(long)]
    pub log: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local stores, gone on exit
    Memory,
    /// Hosted REST backend
    Remote,
}

impl Cli {
    /// Remote configuration: environment first, flags win.
    pub fn remote_config(&self) -> RemoteConfig {
        let mut config = RemoteConfig::from_env();
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        config
    }
}
