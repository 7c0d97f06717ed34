//! TOML parser with helpful error messages

use super::schema::FleetConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse deploy.toml with detailed error messages
pub fn parse_deploy_toml(path: &Path) -> Result<FleetConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_deploy_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse deploy.toml content from string
pub fn parse_deploy_toml_str(content: &str) -> Result<FleetConfig> {
    let mut config: FleetConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    fill_implicit_groups(&mut config);
    config.validate()?;

    Ok(config)
}

/// `seed` always exists; `all` defaults to the whole registry.
fn fill_implicit_groups(config: &mut FleetConfig) {
    config.groups.entry("seed".to_string()).or_default();
    if !config.groups.contains_key("all") {
        config
            .groups
            .insert("all".to_string(), config.modules.clone());
    }
}

/// Point at the offending line of `deploy.toml`.
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let Some(span) = error.span() else {
        return anyhow::anyhow!("TOML parsing error: {}", error.message());
    };
    let offset = span.start.min(content.len());
    let line = content[..offset].matches('\n').count() + 1;
    let text = content.lines().nth(line - 1).unwrap_or_default();
    anyhow::anyhow!(
        "TOML parsing error at line {}: {}\n  {} | {}",
        line,
        error.message(),
        line,
        text
    )
}
