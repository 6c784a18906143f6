use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Orchestrator limits are at least 1
/// - Jobs per account is at least 1
/// - Job command, when set, names a program
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Orchestrator validation
    let orchestrator = &config.orchestrator;
    for (name, value) in [
        ("concurrent", orchestrator.concurrent as u64),
        ("retry_budget", orchestrator.retry_budget as u64),
        ("rate_window", orchestrator.rate_window as u64),
        ("job_timeout_secs", orchestrator.job_timeout_secs),
        ("event_buffer", orchestrator.event_buffer as u64),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "orchestrator.{} cannot be 0",
                name
            )));
        }
    }

    // Executor validation
    if config.executor.jobs_per_account == 0 {
        return Err(ConfigError::ValidationError(
            "executor.jobs_per_account cannot be 0".to_string(),
        ));
    }
    if let Some(command) = &config.executor.command {
        if command.program.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "executor.command.program cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
