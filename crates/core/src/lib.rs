pub mod account;
pub mod config;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod status;
pub mod testing;

pub use account::{
    create_store_writer, Account, AccountRegistry, AccountStatus, AccountStore, AccountSummary,
    JsonAccountStore, RegistryError, StoreError, StoreHandle, StoreWriter,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    SanitizedExecutorConfig, ServerConfig, StorageConfig,
};
pub use job::{
    CommandConfig, CommandJobExecutor, ExecutorConfig, FixedJobSource, Job, JobError,
    JobExecutor, JobSource,
};
pub use orchestrator::{AccountOrchestrator, ErrorClass, OrchestratorConfig, OrchestratorError, Phase};
pub use pool::{PoolError, WorkerEvent, WorkerHandle, WorkerOutcome, WorkerPool};
pub use status::{AppState, PixAiAccount, Settings, StatusHandle, StatusPublisher, ThroughputEstimator};
