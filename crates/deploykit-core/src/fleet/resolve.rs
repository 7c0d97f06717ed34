//! Module and group name resolution.

use super::{Fleet, ModuleName, ModuleSet};
use crate::error::{DeployError, Result};

impl Fleet {
    /// Canonicalize a single module name, rejecting names outside the registry.
    pub fn module(&self, raw: &str) -> Result<ModuleName> {
        let name = ModuleName::canonicalize(self.prefix(), raw);
        if self.modules().contains(&name) {
            Ok(name)
        } else {
            Err(DeployError::UnknownModule(raw.to_string()))
        }
    }

    /// Union of the requested modules and the members of the requested
    /// groups. Any unknown name fails the whole resolution.
    pub fn resolve_modules<M, G>(&self, modules: &[M], groups: &[G]) -> Result<ModuleSet>
    where
        M: AsRef<str>,
        G: AsRef<str>,
    {
        let mut resolved = ModuleSet::new();
        for raw in modules {
            resolved.insert(self.module(raw.as_ref())?);
        }
        for group in groups {
            resolved.extend(self.group(group.as_ref())?.iter().cloned());
        }
        Ok(resolved)
    }
}
