//! Package installation across hosts.

use tracing::info;

use super::{Controller, module_list};
use crate::agent::AgentCommand;
use crate::error::{DeployError, Result};
use crate::fleet::{Destination, HostSelection, ModuleSet, SeedPolicy};

/// How the package index is refreshed before installing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Do not refresh
    Skip,
    /// Refresh from the company source list only
    #[default]
    Restricted,
    /// Refresh from every configured source
    Full,
}

impl UpdateMode {
    pub fn from_flags(no_update: bool, full_update: bool) -> Self {
        match (no_update, full_update) {
            (true, _) => UpdateMode::Skip,
            (false, true) => UpdateMode::Full,
            (false, false) => UpdateMode::Restricted,
        }
    }
}

/// Options for the install operation
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Canonical modules to install
    pub modules: ModuleSet,
    /// Host or environment
    pub destination: Destination,
    /// Package index refresh before installing
    pub update: UpdateMode,
}

impl InstallOptions {
    pub fn new(modules: ModuleSet, destination: Destination) -> Self {
        Self {
            modules,
            destination,
            update: UpdateMode::default(),
        }
    }

    pub fn with_update(mut self, update: UpdateMode) -> Self {
        self.update = update;
        self
    }
}

impl Controller<'_> {
    /// Install modules on every selected host, in table order.
    ///
    /// Seed hosts of an environment always get the whole seed group.
    pub fn install(&mut self, options: &InstallOptions) -> Result<Vec<HostSelection>> {
        if options.modules.is_empty() {
            return Err(DeployError::NoModules);
        }
        info!("installing {}", module_list(&options.modules));

        let selections =
            self.fleet
                .select_hosts(&options.destination, &options.modules, SeedPolicy::Include)?;

        for selection in &selections {
            self.update_host(&selection.host, options.update)?;
            info!(
                "will install {} to {}",
                module_list(&selection.modules),
                selection.host
            );
            self.agent(
                &selection.host,
                &AgentCommand::Install {
                    modules: selection.modules.iter().cloned().collect(),
                },
            )?;
        }

        Ok(selections)
    }

    fn update_host(&mut self, host: &str, update: UpdateMode) -> Result<()> {
        match update {
            UpdateMode::Skip => Ok(()),
            UpdateMode::Restricted => self.agent(host, &AgentCommand::Update { full: false }),
            UpdateMode::Full => self.agent(host, &AgentCommand::Update { full: true }),
        }
    }
}
