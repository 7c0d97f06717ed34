//! Fleet configuration loading
//!
//! The controller reads, in order: an explicit `--config` path, `./deploy.toml`,
//! `<config_dir>/deploykit/deploy.toml`. The agent reads `deploy.toml` next to
//! its executable or in the home directory. When nothing is found both fall
//! back to the built-in fleet.

pub mod parser;
pub mod paths;
pub mod schema;

use std::path::{Path, PathBuf};

use tracing::debug;

pub use parser::{parse_deploy_toml, parse_deploy_toml_str};
pub use paths::{CONFIG_FILE_NAME, agent_config_candidates, controller_config_candidates};
pub use schema::{
    AgentConfig, BuildConfig, DocsConfig, EnvironmentConfig, FleetConfig, HostConfig,
    RemoteConfig,
};

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Builtin => write!(f, "built-in defaults"),
        }
    }
}

/// Load the controller configuration.
pub fn load_controller_config(explicit: Option<&Path>) -> anyhow::Result<(FleetConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = parse_deploy_toml(path)?;
        return Ok((config, ConfigSource::File(path.to_path_buf())));
    }

    let project_root = std::env::current_dir()?;
    let config_dir = dirs::config_dir();
    load_first(&controller_config_candidates(
        &project_root,
        config_dir.as_deref(),
    ))
}

/// Load the agent configuration.
pub fn load_agent_config() -> anyhow::Result<(FleetConfig, ConfigSource)> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let home_dir = dirs::home_dir();
    load_first(&agent_config_candidates(
        exe_dir.as_deref(),
        home_dir.as_deref(),
    ))
}

/// Parse the first existing candidate, or return the built-in fleet.
pub fn load_first(candidates: &[PathBuf]) -> anyhow::Result<(FleetConfig, ConfigSource)> {
    for path in candidates {
        if path.is_file() {
            debug!("loading fleet config from {}", path.display());
            let config = parse_deploy_toml(path)?;
            return Ok((config, ConfigSource::File(path.clone())));
        }
    }
    debug!("no deploy.toml found, using built-in fleet");
    Ok((FleetConfig::default(), ConfigSource::Builtin))
}
