//! Commands exchanged between the controller and the target agent.

use std::fmt;
use std::str::FromStr;

use crate::fleet::ModuleName;

/// Service-manager action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceAction {
    Stop,
    Start,
    #[default]
    Restart,
    Status,
}

impl ServiceAction {
    pub const NAMES: [&'static str; 4] = ["stop", "start", "restart", "status"];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceAction::Stop => "stop",
            ServiceAction::Start => "start",
            ServiceAction::Restart => "restart",
            ServiceAction::Status => "status",
        }
    }

    /// Whether the service needs time to settle afterwards.
    pub fn starts_service(self) -> bool {
        matches!(self, ServiceAction::Start | ServiceAction::Restart)
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(ServiceAction::Stop),
            "start" => Ok(ServiceAction::Start),
            "restart" => Ok(ServiceAction::Restart),
            "status" => Ok(ServiceAction::Status),
            other => Err(format!(
                "invalid action '{}', expected one of: {}",
                other,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// A command the controller asks the agent to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    Install { modules: Vec<ModuleName> },
    Update { full: bool },
    Restart { action: ServiceAction, modules: Vec<ModuleName> },
    KillBackend,
    Version,
}

impl AgentCommand {
    /// Agent command-line arguments, subcommand first.
    pub fn to_args(&self) -> Vec<String> {
        let modules_args = |modules: &[ModuleName]| {
            std::iter::once("-m".to_string())
                .chain(modules.iter().map(|m| m.to_string()))
                .collect::<Vec<_>>()
        };

        match self {
            AgentCommand::Install { modules } => {
                let mut args = vec!["install".to_string()];
                args.extend(modules_args(modules));
                args
            }
            AgentCommand::Update { full } => {
                let mut args = vec!["update".to_string()];
                if *full {
                    args.push("--full".to_string());
                }
                args
            }
            AgentCommand::Restart { action, modules } => {
                let mut args = vec![
                    "restart".to_string(),
                    "-a".to_string(),
                    action.as_str().to_string(),
                ];
                args.extend(modules_args(modules));
                args
            }
            AgentCommand::KillBackend => vec!["killbackend".to_string()],
            AgentCommand::Version => vec!["version".to_string()],
        }
    }
}
