//! Service restarts: per-module and whole-cluster.

use std::time::Duration;

use tracing::info;

use super::{Controller, module_list};
use crate::agent::{AgentCommand, ServiceAction};
use crate::error::{DeployError, Result};
use crate::fleet::{Destination, HostSelection, ModuleSet, SeedPolicy};

/// Options for restarting individual modules
#[derive(Debug, Clone)]
pub struct RestartOptions {
    pub modules: ModuleSet,
    pub destination: Destination,
    pub action: ServiceAction,
}

impl RestartOptions {
    pub fn new(modules: ModuleSet, destination: Destination) -> Self {
        Self {
            modules,
            destination,
            action: ServiceAction::default(),
        }
    }

    pub fn with_action(mut self, action: ServiceAction) -> Self {
        self.action = action;
        self
    }
}

impl Controller<'_> {
    /// Apply a service action to exactly the requested modules, one module
    /// per remote call.
    pub fn restart(&mut self, options: &RestartOptions) -> Result<Vec<HostSelection>> {
        if options.modules.is_empty() {
            return Err(DeployError::NoModules);
        }

        let selections =
            self.fleet
                .select_hosts(&options.destination, &options.modules, SeedPolicy::Exclude)?;

        for selection in &selections {
            self.ensure_agent(&selection.host)?;
            for module in &selection.modules {
                info!("will {} {} at {}", options.action, module, selection.host);
                self.agent(
                    &selection.host,
                    &AgentCommand::Restart {
                        action: options.action,
                        modules: vec![module.clone()],
                    },
                )?;
            }
        }

        Ok(selections)
    }

    /// Restart a whole environment with seed modules brought up first.
    ///
    /// Phases, each over all hosts in table order:
    /// 1. stop non-seed modules
    /// 2. stop seed modules
    /// 3. start the seed group on seed hosts, then wait `seed_delay_secs`
    /// 4. start the remaining modules
    pub fn restart_cluster(&mut self, destination: &Destination) -> Result<()> {
        let fleet = self.fleet;
        let env = fleet.environment_for(destination)?;
        let seed_group = fleet.seed_group();
        info!("restarting cluster {}", env.name);

        for entry in &env.hosts {
            self.ensure_agent(&entry.host)?;
        }

        for entry in &env.hosts {
            let modules: Vec<_> = entry.modules.difference(seed_group).cloned().collect();
            if !modules.is_empty() {
                info!("will stop {} at {}", module_list(&modules), entry.host);
                self.agent(
                    &entry.host,
                    &AgentCommand::Restart {
                        action: ServiceAction::Stop,
                        modules,
                    },
                )?;
            }
        }

        for entry in &env.hosts {
            let modules: Vec<_> = entry.modules.intersection(seed_group).cloned().collect();
            if !modules.is_empty() {
                info!("will stop {} at {}", module_list(&modules), entry.host);
                self.agent(
                    &entry.host,
                    &AgentCommand::Restart {
                        action: ServiceAction::Stop,
                        modules,
                    },
                )?;
            }
        }

        for entry in env.hosts.iter().filter(|entry| fleet.is_seed_host(entry)) {
            info!("starting seed on {}", entry.host);
            for seed in seed_group {
                self.agent(
                    &entry.host,
                    &AgentCommand::Restart {
                        action: ServiceAction::Start,
                        modules: vec![seed.clone()],
                    },
                )?;
            }
        }

        let delay = Duration::from_secs(fleet.config().agent.seed_delay_secs);
        info!("waiting {}s for seed start up", delay.as_secs());
        self.runner.sleep(delay);

        for entry in &env.hosts {
            let modules: Vec<_> = entry.modules.difference(seed_group).cloned().collect();
            if !modules.is_empty() {
                info!("starting {} on {}", module_list(&modules), entry.host);
                self.agent(
                    &entry.host,
                    &AgentCommand::Restart {
                        action: ServiceAction::Start,
                        modules,
                    },
                )?;
            }
        }

        Ok(())
    }
}
