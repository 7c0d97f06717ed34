//! Operations that run on the workstation itself.

use tracing::info;

use super::Controller;
use crate::error::{DeployError, Result};
use crate::fleet::ModuleSet;
use crate::process::Invocation;

/// Options for running one module locally
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub modules: ModuleSet,
    pub host_type: String,
    pub hostname: String,
    pub clean: bool,
}

impl StartOptions {
    pub fn new(modules: ModuleSet) -> Self {
        Self {
            modules,
            host_type: "local".to_string(),
            hostname: "localhost".to_string(),
            clean: false,
        }
    }

    pub fn with_host_type(mut self, host_type: impl Into<String>) -> Self {
        self.host_type = host_type.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }
}

impl Controller<'_> {
    /// Run an arbitrary command line through `sh -c`.
    pub fn shell(&mut self, command_line: &str) -> Result<()> {
        self.runner
            .run(&Invocation::new("sh").args(["-c", command_line]))
    }

    /// Run exactly one module through the build tool.
    pub fn start(&mut self, options: &StartOptions) -> Result<()> {
        let mut modules = options.modules.iter();
        let module = match (modules.next(), modules.next()) {
            (Some(module), None) => module.clone(),
            _ => return Err(DeployError::ExpectedOneModule(options.modules.len())),
        };

        let build = &self.fleet.config().build;
        let main_class = build.main_class.clone().ok_or_else(|| {
            DeployError::Config("build.main_class is required to start a module".to_string())
        })?;
        let tool = build.tool.clone();

        if options.clean {
            self.clean()?;
        }

        info!(
            "starting module {} with hostType {} on {}",
            module, options.host_type, options.hostname
        );
        self.runner.run(&Invocation::new(tool).args([
            format!("project {module}"),
            format!(
                "runMain {} -t {} -h {}",
                main_class, options.host_type, options.hostname
            ),
        ]))
    }
}
