//! Confirmation before touching protected environments.

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use deploykit_core::fleet::{Destination, Fleet};

/// Name of the protected environment a destination falls into, if any.
pub fn protected_environment<'f>(fleet: &'f Fleet, destination: &Destination) -> Option<&'f str> {
    fleet
        .environment_for(destination)
        .ok()
        .filter(|env| env.protected)
        .map(|env| env.name.as_str())
}

/// Ask before installing into `env`. Defaults to no.
pub fn confirm_install(env: &str) -> Result<bool> {
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Install to {} environment?",
            style(env).red().bold()
        ))
        .default(false)
        .interact()?;
    Ok(confirmed)
}
