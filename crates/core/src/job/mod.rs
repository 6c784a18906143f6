//! Job supply and execution capabilities.
//!
//! The orchestrator never talks to the external service directly. It pulls
//! work from a [`JobSource`] and runs it through a [`JobExecutor`], both of
//! which are pluggable.

mod command;
mod config;
mod fixed;
mod traits;
mod types;

pub use command::CommandJobExecutor;
pub use config::{CommandConfig, ExecutorConfig};
pub use fixed::FixedJobSource;
pub use traits::{JobExecutor, JobSource};
pub use types::{Job, JobError};
