use claimer_core::{AccountOrchestrator, Config, SanitizedConfig};
use tokio::sync::watch;

/// Shared server state
pub struct ServerState {
    config: Config,
    orchestrator: AccountOrchestrator,
    shutdown: watch::Sender<bool>,
}

impl ServerState {
    pub fn new(config: Config, orchestrator: AccountOrchestrator) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            orchestrator,
            shutdown,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &AccountOrchestrator {
        &self.orchestrator
    }

    /// Tell long-lived connections to close.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Receiver that flips to `true` once shutdown begins.
    pub fn shutdown_watch(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
