//! Fleet tables: the module registry, groups, environments and hosts.
//!
//! A [`Fleet`] is built once from a [`FleetConfig`] and never changes
//! afterwards. Every module name stored in it is canonical (prefixed).

mod resolve;
mod select;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::FleetConfig;
use crate::error::{DeployError, Result};

pub use select::{Destination, HostSelection, SeedPolicy};

/// Name of the group whose modules must be up before everything else.
pub const SEED_GROUP: &str = "seed";

/// Canonical (prefixed) module name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleName(String);

/// Ordered set of canonical module names.
pub type ModuleSet = BTreeSet<ModuleName>;

impl ModuleName {
    /// Add `prefix-` to a bare name. Already prefixed names are unchanged.
    pub fn canonicalize(prefix: &str, raw: &str) -> Self {
        let marker = format!("{prefix}-");
        if raw.starts_with(&marker) {
            Self(raw.to_string())
        } else {
            Self(format!("{marker}{raw}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the prefix.
    pub fn bare<'a>(&'a self, prefix: &str) -> &'a str {
        self.0
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One row of an environment's host table.
#[derive(Debug, Clone)]
pub struct HostEntry {
    pub host: String,
    pub modules: ModuleSet,
}

/// An environment with its ordered host table.
#[derive(Debug, Clone)]
pub struct Environment {
    pub name: String,
    pub protected: bool,
    pub hosts: Vec<HostEntry>,
}

/// Immutable fleet tables.
#[derive(Debug, Clone)]
pub struct Fleet {
    config: FleetConfig,
    modules: ModuleSet,
    groups: BTreeMap<String, ModuleSet>,
    environments: BTreeMap<String, Environment>,
    stages: BTreeMap<String, String>,
    hosts: BTreeSet<String>,
}

impl Fleet {
    /// Build the tables, canonicalizing every module reference.
    pub fn from_config(config: FleetConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DeployError::Config(e.to_string()))?;

        let prefix = config.module_prefix().to_string();
        let modules: ModuleSet = config
            .modules
            .iter()
            .map(|m| ModuleName::canonicalize(&prefix, m))
            .collect();

        let registered = |context: &str, raw: &str| -> Result<ModuleName> {
            let name = ModuleName::canonicalize(&prefix, raw);
            if modules.contains(&name) {
                Ok(name)
            } else {
                Err(DeployError::Config(format!(
                    "{context} references unregistered module '{raw}'"
                )))
            }
        };

        let mut groups = BTreeMap::new();
        for (group, members) in &config.groups {
            let set = members
                .iter()
                .map(|m| registered(&format!("group '{group}'"), m))
                .collect::<Result<ModuleSet>>()?;
            groups.insert(group.clone(), set);
        }
        groups.entry(SEED_GROUP.to_string()).or_default();
        groups
            .entry("all".to_string())
            .or_insert_with(|| modules.clone());

        let mut environments = BTreeMap::new();
        let mut stages = BTreeMap::new();
        let mut hosts: BTreeSet<String> = config.extra_hosts.iter().cloned().collect();
        for (env_name, env) in &config.environments {
            let mut entries = Vec::with_capacity(env.hosts.len());
            for row in &env.hosts {
                let set = row
                    .modules
                    .iter()
                    .map(|m| registered(&format!("host '{}'", row.host), m))
                    .collect::<Result<ModuleSet>>()?;
                stages.insert(row.host.clone(), env_name.clone());
                hosts.insert(row.host.clone());
                entries.push(HostEntry {
                    host: row.host.clone(),
                    modules: set,
                });
            }
            environments.insert(
                env_name.clone(),
                Environment {
                    name: env_name.clone(),
                    protected: env.protected,
                    hosts: entries,
                },
            );
        }

        Ok(Self {
            config,
            modules,
            groups,
            environments,
            stages,
            hosts,
        })
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn prefix(&self) -> &str {
        self.config.module_prefix()
    }

    pub fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    pub fn seed_group(&self) -> &ModuleSet {
        // present by construction
        &self.groups[SEED_GROUP]
    }

    pub fn group(&self, name: &str) -> Result<&ModuleSet> {
        self.groups
            .get(name)
            .ok_or_else(|| DeployError::UnknownGroup(name.to_string()))
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments
            .get(name)
            .ok_or_else(|| DeployError::UnknownEnvironment(name.to_string()))
    }

    /// Validate a host name against the host registry.
    pub fn host(&self, name: &str) -> Result<&str> {
        self.hosts
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DeployError::UnknownHost(name.to_string()))
    }

    /// Environment name a host belongs to.
    pub fn stage_of(&self, host: &str) -> Option<&str> {
        self.stages.get(host).map(String::as_str)
    }

    /// A host is a seed host when it is assigned any seed-group module.
    pub fn is_seed_host(&self, entry: &HostEntry) -> bool {
        !entry.modules.is_disjoint(self.seed_group())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_is_idempotent() {
        let bare = ModuleName::canonicalize("company", "bootstrap");
        assert_eq!(bare.as_str(), "company-bootstrap");
        let again = ModuleName::canonicalize("company", bare.as_str());
        assert_eq!(again, bare);
        assert_eq!(bare.bare("company"), "bootstrap");
    }

    #[test]
    fn builtin_fleet_tables() {
        let fleet = Fleet::from_config(FleetConfig::default()).unwrap();
        assert_eq!(fleet.modules().len(), 1);
        assert!(fleet.seed_group().is_empty());
        assert_eq!(
            fleet.stage_of("backend00.dev.company.int"),
            Some("dev")
        );
        assert!(fleet.host("backend00.dev.company.int").is_ok());
        assert!(matches!(
            fleet.host("backend99"),
            Err(DeployError::UnknownHost(_))
        ));
    }

    #[test]
    fn unregistered_host_module_is_a_config_error() {
        let mut config = FleetConfig::default();
        config
            .environments
            .get_mut("dev")
            .unwrap()
            .hosts[0]
            .modules
            .push("ghost".to_string());
        let err = Fleet::from_config(config).unwrap_err();
        assert!(matches!(err, DeployError::Config(ref msg) if msg.contains("ghost")));
    }

    #[test]
    fn extra_hosts_have_no_stage() {
        let mut config = FleetConfig::default();
        config.extra_hosts.push("sandbox.company.int".to_string());
        let fleet = Fleet::from_config(config).unwrap();
        assert!(fleet.host("sandbox.company.int").is_ok());
        assert_eq!(fleet.stage_of("sandbox.company.int"), None);
    }
}
