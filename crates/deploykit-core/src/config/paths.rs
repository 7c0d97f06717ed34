//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "deploy.toml";

/// Candidate locations for the controller, most specific first.
pub fn controller_config_candidates(project_root: &Path, config_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![project_root.join(CONFIG_FILE_NAME)];
    if let Some(dir) = config_dir {
        candidates.push(dir.join("deploykit").join(CONFIG_FILE_NAME));
    }
    candidates
}

/// Candidate locations for the agent: next to the binary, then the home
/// directory the controller pushes files into.
pub fn agent_config_candidates(exe_dir: Option<&Path>, home_dir: Option<&Path>) -> Vec<PathBuf> {
    [exe_dir, home_dir]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_prefers_project_file() {
        let candidates =
            controller_config_candidates(Path::new("/work/repo"), Some(Path::new("/home/u/.config")));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/work/repo/deploy.toml"),
                PathBuf::from("/home/u/.config/deploykit/deploy.toml"),
            ]
        );
    }

    #[test]
    fn agent_skips_unknown_directories() {
        let candidates = agent_config_candidates(None, Some(Path::new("/home/deploy")));
        assert_eq!(candidates, vec![PathBuf::from("/home/deploy/deploy.toml")]);
    }
}
