//! Job execution configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How jobs are supplied and executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Jobs handed out per account per run.
    #[serde(default = "default_jobs_per_account")]
    pub jobs_per_account: u64,

    /// External command run once per job. Required by the server binary.
    #[serde(default)]
    pub command: Option<CommandConfig>,
}

/// External program executing a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Program to run.
    pub program: PathBuf,
    /// Program arguments. Account data is passed through the environment.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_jobs_per_account() -> u64 {
    1
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            jobs_per_account: default_jobs_per_account(),
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.jobs_per_account, 1);
        assert!(config.command.is_none());
    }

    #[test]
    fn test_deserialize_with_command() {
        let toml = r#"
            jobs_per_account = 2

            [command]
            program = "/usr/local/bin/claim"
            args = ["--headless"]
        "#;
        let config: ExecutorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.jobs_per_account, 2);
        let command = config.command.unwrap();
        assert_eq!(command.program, PathBuf::from("/usr/local/bin/claim"));
        assert_eq!(command.args, vec!["--headless".to_string()]);
    }
}
