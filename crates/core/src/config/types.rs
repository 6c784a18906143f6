use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::job::ExecutorConfig;
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Credential storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_accounts_path")]
    pub accounts_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            accounts_path: default_accounts_path(),
        }
    }
}

fn default_accounts_path() -> PathBuf {
    PathBuf::from("accounts.json")
}

/// Sanitized config for API responses (command arguments hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub orchestrator: OrchestratorConfig,
    pub executor: SanitizedExecutorConfig,
}

/// Sanitized executor config
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedExecutorConfig {
    pub jobs_per_account: u64,
    pub command_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            orchestrator: config.orchestrator.clone(),
            executor: SanitizedExecutorConfig {
                jobs_per_account: config.executor.jobs_per_account,
                command_configured: config.executor.command.is_some(),
                program: config
                    .executor
                    .command
                    .as_ref()
                    .map(|c| c.program.display().to_string()),
            },
        }
    }
}
