use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Read the claimer config file, then apply `CLAIMER_` environment overrides.
///
/// Sections nest with a double underscore, so `CLAIMER_ORCHESTRATOR__CONCURRENT=4`
/// overrides `[orchestrator] concurrent`. Missing sections fall back to their
/// defaults. The executor command is not checked here; see
/// [`validate_config`](super::validate_config).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("CLAIMER_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a claimer config document without touching the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
