//! Builders for the remote-shell invocations that drive the target agent.

use std::path::PathBuf;

use super::Invocation;
use super::quote;
use crate::agent::AgentCommand;
use crate::config::AgentConfig;
use crate::error::{DeployError, Result};

/// `ssh <host> <command line>`.
pub fn ssh(host: &str, command_line: impl Into<String>) -> Invocation {
    Invocation::new("ssh").arg(host).arg(command_line)
}

/// Knows where the agent lives on managed hosts and which local files make
/// up an agent install.
#[derive(Debug, Clone)]
pub struct RemoteShell {
    agent_path: String,
    agent_files: Vec<PathBuf>,
}

impl RemoteShell {
    pub fn new(agent: &AgentConfig) -> Result<Self> {
        if !quote::is_shell_safe_path(&agent.remote_path) {
            return Err(DeployError::Config(format!(
                "agent.remote_path '{}' must be a plain path",
                agent.remote_path
            )));
        }
        if agent.files.is_empty() {
            return Err(DeployError::Config(
                "agent.files must list at least one file".to_string(),
            ));
        }
        Ok(Self {
            agent_path: agent.remote_path.clone(),
            agent_files: agent.files.clone(),
        })
    }

    /// `ssh <host> 'sudo <agent> <subcommand> <args>'`
    pub fn agent_command(&self, host: &str, command: &AgentCommand) -> Invocation {
        let line = format!(
            "sudo {} {}",
            self.agent_path,
            quote::join(command.to_args())
        );
        ssh(host, line)
    }

    /// `ssh <host> '<agent> version'`, run without privilege.
    pub fn agent_version(&self, host: &str) -> Invocation {
        let line = format!(
            "{} {}",
            self.agent_path,
            quote::join(AgentCommand::Version.to_args())
        );
        ssh(host, line)
    }

    /// `scp <files…> <host>:` into the remote home directory.
    pub fn push_agent(&self, host: &str) -> Invocation {
        Invocation::new("scp")
            .args(
                self.agent_files
                    .iter()
                    .map(|path| path.to_string_lossy().into_owned()),
            )
            .arg(format!("{host}:"))
    }
}
