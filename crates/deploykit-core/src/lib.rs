//! Deploykit Core Library
//!
//! Provides the fleet tables, module/host resolution, remote dispatch and
//! the target-agent command set shared by the `deploy` controller and the
//! `deploy-target` agent.

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod fleet;
pub mod process;
pub mod run_log;

/// Protocol version spoken between the controller and the target agent.
///
/// The controller refuses to drive an agent reporting a newer version and
/// pushes its own copy to agents reporting an older one.
pub const AGENT_PROTOCOL_VERSION: u32 = 1;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigSource, FleetConfig, load_agent_config, load_controller_config};

    // Fleet tables
    pub use crate::fleet::{
        Destination, Fleet, HostSelection, ModuleName, ModuleSet, SeedPolicy,
    };

    // Process execution
    pub use crate::process::{CommandRunner, Invocation, ProcessRunner};

    // Controller
    pub use crate::controller::{
        Controller, DocsUploader, HttpUploader, InstallOptions, PublishOptions, RestartOptions,
        UpdateMode,
    };

    // Agent
    pub use crate::agent::{AgentCommand, ServiceAction, TargetAgent};

    // Errors
    pub use crate::error::DeployError;

    pub use crate::AGENT_PROTOCOL_VERSION;
}
