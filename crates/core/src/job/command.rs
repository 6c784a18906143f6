//! Executor that runs an external program per job.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::config::CommandConfig;
use super::traits::JobExecutor;
use super::types::{Job, JobError};
use crate::account::Account;

/// Maximum stderr characters carried into a failure message.
const STDERR_TAIL_CHARS: usize = 512;

/// Runs the configured program once per job.
///
/// The account identity, secret and job sequence number are exported as
/// `CLAIMER_ACCOUNT_EMAIL`, `CLAIMER_ACCOUNT_PASSWORD` and `CLAIMER_JOB_SEQ`.
/// Exit status 0 means success. The child is killed if the job future is
/// dropped, so a pool timeout also ends the process.
#[derive(Debug, Clone)]
pub struct CommandJobExecutor {
    config: CommandConfig,
}

impl CommandJobExecutor {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl JobExecutor for CommandJobExecutor {
    fn name(&self) -> &str {
        "command"
    }

    async fn execute(&self, account: &Account, job: &Job) -> Result<(), JobError> {
        debug!(
            "Running {} for {} (job {})",
            self.config.program.display(),
            account.email,
            job.seq
        );

        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .env("CLAIMER_ACCOUNT_EMAIL", &account.email)
            .env("CLAIMER_ACCOUNT_PASSWORD", &account.password)
            .env("CLAIMER_JOB_SEQ", job.seq.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                JobError::Launch(format!("{}: {}", self.config.program.display(), e))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let tail: String = {
            let skip = stderr.chars().count().saturating_sub(STDERR_TAIL_CHARS);
            stderr.chars().skip(skip).collect()
        };
        Err(JobError::Failed(if tail.is_empty() {
            format!("exited with {}", output.status)
        } else {
            format!("exited with {}: {}", output.status, tail)
        }))
    }
}
