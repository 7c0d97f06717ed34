//! Host/environment selection.

use super::{Environment, Fleet, ModuleSet};
use crate::error::{DeployError, Result};

/// Where an operation is aimed: one explicit host or a whole environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Host(String),
    Environment(String),
}

/// Whether seed hosts get the full seed group added to their selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    Include,
    Exclude,
}

/// A host together with the modules to act on there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSelection {
    pub host: String,
    pub modules: ModuleSet,
}

impl Fleet {
    /// Validate `-t`/`-e` into a destination. `-e` defaults to the
    /// configured default environment.
    pub fn destination(&self, target: Option<&str>, env: Option<&str>) -> Result<Destination> {
        match (target, env) {
            (Some(host), _) => Ok(Destination::Host(self.host(host)?.to_string())),
            (None, Some(env)) => {
                self.environment(env)?;
                Ok(Destination::Environment(env.to_string()))
            }
            (None, None) => Ok(Destination::Environment(
                self.config().default_environment.clone(),
            )),
        }
    }

    /// Environment an operation runs against: the named one, or the one the
    /// explicit host belongs to.
    pub fn environment_for(&self, destination: &Destination) -> Result<&Environment> {
        match destination {
            Destination::Environment(name) => self.environment(name),
            Destination::Host(host) => {
                let stage = self
                    .stage_of(host)
                    .ok_or_else(|| DeployError::NoStage(host.clone()))?;
                self.environment(stage)
            }
        }
    }

    /// Package-repository stage of a destination.
    pub fn stage_for(&self, destination: &Destination) -> Result<String> {
        match destination {
            Destination::Environment(name) => Ok(self.environment(name)?.name.clone()),
            Destination::Host(host) => self
                .stage_of(host)
                .map(str::to_string)
                .ok_or_else(|| DeployError::NoStage(host.clone())),
        }
    }

    /// Every host of a destination, in table order.
    pub fn hosts_for(&self, destination: &Destination) -> Result<Vec<String>> {
        match destination {
            Destination::Host(host) => Ok(vec![host.clone()]),
            Destination::Environment(name) => Ok(self
                .environment(name)?
                .hosts
                .iter()
                .map(|entry| entry.host.clone())
                .collect()),
        }
    }

    /// Per-host module sets for `requested`.
    ///
    /// An explicit host receives the request unchanged. Environment hosts
    /// receive the part of the request they are assigned, plus the whole
    /// seed group on seed hosts under [`SeedPolicy::Include`]. Hosts left
    /// with nothing to do are omitted.
    pub fn select_hosts(
        &self,
        destination: &Destination,
        requested: &ModuleSet,
        seeds: SeedPolicy,
    ) -> Result<Vec<HostSelection>> {
        let selections = match destination {
            Destination::Host(host) => vec![HostSelection {
                host: host.clone(),
                modules: requested.clone(),
            }],
            Destination::Environment(name) => self
                .environment(name)?
                .hosts
                .iter()
                .map(|entry| {
                    let mut modules: ModuleSet =
                        requested.intersection(&entry.modules).cloned().collect();
                    if seeds == SeedPolicy::Include && self.is_seed_host(entry) {
                        modules.extend(self.seed_group().iter().cloned());
                    }
                    HostSelection {
                        host: entry.host.clone(),
                        modules,
                    }
                })
                .collect(),
        };

        Ok(selections
            .into_iter()
            .filter(|selection| !selection.modules.is_empty())
            .collect())
    }
}
