//! Error taxonomy for deployment operations.

use thiserror::Error;

/// Errors raised by resolution, dispatch and the agent command set.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("wrong module name: {0}")]
    UnknownModule(String),

    #[error("wrong group name: {0}")]
    UnknownGroup(String),

    #[error("unknown target host: {0}")]
    UnknownHost(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("host {0} does not belong to any environment, no stage to publish to")]
    NoStage(String),

    #[error("please specify at least one module or group")]
    NoModules,

    #[error("exactly one module name expected, got {0}")]
    ExpectedOneModule(usize),

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to execute cmd: {command} ({status})")]
    CommandFailed { command: String, status: String },

    #[error("agent at {host} reports version {remote}, newer than local version {local}")]
    AgentNewer { host: String, remote: u32, local: u32 },

    #[error("agent at {host} printed an invalid version: {output:?}")]
    InvalidAgentVersion { host: String, output: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DeployError {
    /// Whether this error is an input-validation failure raised before any
    /// external process was started.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownModule(_)
                | Self::UnknownGroup(_)
                | Self::UnknownHost(_)
                | Self::UnknownEnvironment(_)
                | Self::NoStage(_)
                | Self::NoModules
                | Self::ExpectedOneModule(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
