use std::time::Duration;

use tracing::{info, warn};

use super::protocol::{AgentCommand, ServiceAction};
use crate::AGENT_PROTOCOL_VERSION;
use crate::error::{DeployError, Result};
use crate::fleet::{Fleet, ModuleName};
use crate::process::{CommandRunner, Invocation};

/// pkill exit status when no process matched.
const PKILL_NO_MATCH: i32 = 1;

/// Executes agent commands on the local host.
pub struct TargetAgent<'a> {
    fleet: &'a Fleet,
    runner: &'a mut dyn CommandRunner,
}

impl<'a> TargetAgent<'a> {
    pub fn new(fleet: &'a Fleet, runner: &'a mut dyn CommandRunner) -> Self {
        Self { fleet, runner }
    }

    /// Execute one command. `Version` prints nothing here; callers print
    /// [`TargetAgent::version`] themselves so stdout stays clean.
    pub fn execute(&mut self, command: &AgentCommand) -> Result<()> {
        match command {
            AgentCommand::Install { modules } => self.install(modules),
            AgentCommand::Update { full } => self.update(*full),
            AgentCommand::Restart { action, modules } => self.restart(*action, modules),
            AgentCommand::KillBackend => self.kill_backend(),
            AgentCommand::Version => Ok(()),
        }
    }

    pub fn version(&self) -> u32 {
        AGENT_PROTOCOL_VERSION
    }

    /// Install packages named after the modules.
    pub fn install(&mut self, modules: &[ModuleName]) -> Result<()> {
        if modules.is_empty() {
            return Err(DeployError::NoModules);
        }
        info!("installing {}", join(modules));
        self.runner.run(
            &Invocation::new("apt-get")
                .args(["install", "-y", "--allow-downgrades"])
                .args(modules.iter().map(ModuleName::to_string)),
        )
    }

    /// Refresh the package index, from every source or only from the
    /// company source list.
    pub fn update(&mut self, full: bool) -> Result<()> {
        let invocation = if full {
            info!("updating package index from all sources");
            Invocation::new("apt-get").arg("update")
        } else {
            let source_list = self.fleet.config().source_list();
            info!("updating package index from {}", source_list);
            Invocation::new("apt-get").args([
                "update".to_string(),
                "-o".to_string(),
                format!("Dir::Etc::sourcelist={source_list}"),
                "-o".to_string(),
                "Dir::Etc::sourceparts=-".to_string(),
                "-o".to_string(),
                "APT::Get::List-Cleanup=0".to_string(),
            ])
        };
        self.runner.run(&invocation)
    }

    /// Apply a service action to each module in turn.
    pub fn restart(&mut self, action: ServiceAction, modules: &[ModuleName]) -> Result<()> {
        if modules.is_empty() {
            return Err(DeployError::NoModules);
        }
        info!("{}ing {}", action, join(modules));
        let settle = Duration::from_secs(self.fleet.config().agent.settle_delay_secs);

        for module in modules {
            let invocation = Invocation::new("service")
                .arg(module.to_string())
                .arg(action.as_str());

            if action == ServiceAction::Status {
                let code = self.runner.exit_code(&invocation)?;
                info!("{} status exit code: {:?}", module, code);
                continue;
            }

            self.runner.run(&invocation)?;
            if action.starts_service() {
                self.runner.sleep(settle);
            }
        }
        Ok(())
    }

    /// Terminate every backend process, gracefully first.
    pub fn kill_backend(&mut self) -> Result<()> {
        let pattern = self.fleet.config().kill_pattern().to_string();
        let grace = Duration::from_secs(self.fleet.config().agent.kill_grace_secs);
        info!("killing backend");

        self.pkill(Invocation::new("pkill").args(["-f", pattern.as_str()]))?;
        self.runner.sleep(grace);
        self.pkill(Invocation::new("pkill").args(["-9", "-f", pattern.as_str()]))
    }

    fn pkill(&mut self, invocation: Invocation) -> Result<()> {
        match self.runner.exit_code(&invocation)? {
            Some(0) => Ok(()),
            Some(PKILL_NO_MATCH) => {
                info!("no process matched");
                Ok(())
            }
            other => {
                warn!("{} failed", invocation);
                Err(DeployError::CommandFailed {
                    command: invocation.to_string(),
                    status: match other {
                        Some(code) => format!("exit status: {code}"),
                        None => "terminated by signal".to_string(),
                    },
                })
            }
        }
    }
}

fn join(modules: &[ModuleName]) -> String {
    modules
        .iter()
        .map(ModuleName::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
