//! Package builds and publishing to a repository stage.

use tracing::info;

use super::install::{InstallOptions, UpdateMode};
use super::{Controller, module_list};
use crate::error::{DeployError, Result};
use crate::fleet::{Destination, HostSelection, ModuleName, ModuleSet};
use crate::process::Invocation;

/// Options for publishing packages
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub modules: ModuleSet,
    /// Decides the stage: an environment name or the environment of a host
    pub destination: Destination,
    /// Run a clean build first
    pub clean: bool,
    /// Publish API docs after the packages
    pub docs: bool,
}

impl PublishOptions {
    pub fn new(modules: ModuleSet, destination: Destination) -> Self {
        Self {
            modules,
            destination,
            clean: false,
            docs: true,
        }
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_docs(mut self, docs: bool) -> Self {
        self.docs = docs;
        self
    }
}

/// Report from a publish operation
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub stage: String,
    pub modules: ModuleSet,
    /// `None` when docs were skipped
    pub docs_published: Option<bool>,
}

impl Controller<'_> {
    /// Build and upload one package per module, tagged with the stage.
    pub fn publish(&mut self, options: &PublishOptions) -> Result<PublishReport> {
        if options.modules.is_empty() {
            return Err(DeployError::NoModules);
        }
        let stage = self.fleet.stage_for(&options.destination)?;
        info!(
            "will publish {} modules to stage {}",
            module_list(&options.modules),
            stage
        );

        if options.clean {
            self.clean()?;
        }
        for module in &options.modules {
            info!("publishing module {}", module);
            let invocation = self.publish_invocation(module, &stage);
            self.runner.run(&invocation)?;
        }

        let docs_published = options.docs.then(|| self.publish_docs(&stage));

        Ok(PublishReport {
            stage,
            modules: options.modules.clone(),
            docs_published,
        })
    }

    /// Compile and publish docs only.
    pub fn publish_docs_only(&mut self, destination: &Destination, clean: bool) -> Result<bool> {
        let stage = self.fleet.stage_for(destination)?;
        info!("will publish docs to stage {}", stage);
        if clean {
            self.clean()?;
        }
        let tool = self.fleet.config().build.tool.clone();
        self.runner.run(&Invocation::new(tool).arg("compile"))?;
        Ok(self.publish_docs(&stage))
    }

    /// Publish, then install the fresh packages with the index refreshed.
    pub fn chick(
        &mut self,
        publish: &PublishOptions,
        install: &InstallOptions,
    ) -> Result<(PublishReport, Vec<HostSelection>)> {
        let report = self.publish(publish)?;
        let mut install = install.clone();
        if install.update == UpdateMode::Skip {
            install.update = UpdateMode::Restricted;
        }
        let hosts = self.install(&install)?;
        Ok((report, hosts))
    }

    /// `<tool> clean` followed by `<tool> update`.
    pub fn clean(&mut self) -> Result<()> {
        info!("cleaning...");
        let tool = self.fleet.config().build.tool.clone();
        self.runner.run(&Invocation::new(tool.as_str()).arg("clean"))?;
        self.runner.run(&Invocation::new(tool.as_str()).arg("update"))
    }

    fn publish_invocation(&self, module: &ModuleName, stage: &str) -> Invocation {
        let build = &self.fleet.config().build;
        Invocation::new(build.tool.as_str()).args([
            format!("project {module}"),
            format!("set {} := \"{}\"", build.stage_setting, stage),
            build.publish_task.clone(),
        ])
    }
}
