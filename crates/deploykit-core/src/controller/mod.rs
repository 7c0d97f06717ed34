//! Controller operations.
//!
//! The controller walks hosts strictly one after another. Every external
//! command must succeed; the first failure aborts the whole operation and
//! leaves already-visited hosts in their new state. There is no retry and no
//! rollback: re-running the command is the recovery path.

mod docs;
mod install;
mod local;
mod publish;
mod redirect;
mod restart;

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::info;

use crate::AGENT_PROTOCOL_VERSION;
use crate::agent::AgentCommand;
use crate::error::{DeployError, Result};
use crate::fleet::{Destination, Fleet};
use crate::process::{CommandRunner, RemoteShell};

pub use docs::{DocsUploader, HttpUploader, latest_alias, stage_url};
pub use install::{InstallOptions, UpdateMode};
pub use local::StartOptions;
pub use publish::{PublishOptions, PublishReport};
pub use redirect::{RemoteBuild, strip_remote_flag};
pub use restart::RestartOptions;

/// Drives the fleet through a [`CommandRunner`].
pub struct Controller<'a> {
    fleet: &'a Fleet,
    runner: &'a mut dyn CommandRunner,
    uploader: &'a dyn DocsUploader,
    remote: RemoteShell,
    verified: HashSet<String>,
}

impl<'a> Controller<'a> {
    pub fn new(
        fleet: &'a Fleet,
        runner: &'a mut dyn CommandRunner,
        uploader: &'a dyn DocsUploader,
    ) -> Result<Self> {
        let remote = RemoteShell::new(&fleet.config().agent)?;
        Ok(Self {
            fleet,
            runner,
            uploader,
            remote,
            verified: HashSet::new(),
        })
    }

    /// Compare the host's agent version with ours before touching the host.
    ///
    /// An older agent is replaced by pushing the local agent files, a newer
    /// one aborts the run since this controller may be stale. Each host is
    /// checked at most once per controller.
    pub fn ensure_agent(&mut self, host: &str) -> Result<()> {
        if self.verified.contains(host) {
            return Ok(());
        }

        let output = self.runner.capture(&self.remote.agent_version(host))?;
        let remote: u32 =
            output
                .trim()
                .parse()
                .map_err(|_| DeployError::InvalidAgentVersion {
                    host: host.to_string(),
                    output: output.trim().to_string(),
                })?;

        match remote.cmp(&AGENT_PROTOCOL_VERSION) {
            Ordering::Less => {
                info!("old version of agent at {}, updating...", host);
                self.runner.run(&self.remote.push_agent(host))?;
            }
            Ordering::Greater => {
                info!("target version is newer than local controller");
                return Err(DeployError::AgentNewer {
                    host: host.to_string(),
                    remote,
                    local: AGENT_PROTOCOL_VERSION,
                });
            }
            Ordering::Equal => {}
        }

        self.verified.insert(host.to_string());
        Ok(())
    }

    /// Verify the agent, then run `command` on `host` with elevated privilege.
    pub fn agent(&mut self, host: &str, command: &AgentCommand) -> Result<()> {
        self.ensure_agent(host)?;
        self.runner.run(&self.remote.agent_command(host, command))
    }

    /// Push the agent files to every host of the destination.
    pub fn push_agent(&mut self, destination: &Destination) -> Result<Vec<String>> {
        let hosts = self.fleet.hosts_for(destination)?;
        for host in &hosts {
            info!("deploying agent to {}", host);
            self.runner.run(&self.remote.push_agent(host))?;
        }
        Ok(hosts)
    }
}

/// Space-separated module list for log lines.
fn module_list<'m, I>(modules: I) -> String
where
    I: IntoIterator<Item = &'m crate::fleet::ModuleName>,
{
    modules
        .into_iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
