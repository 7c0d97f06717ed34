//! The per-run log file.
//!
//! Non-verbose runs truncate the file once at start and then append to it
//! from two writers: the tracing file layer and redirected child processes.
//! Both use `O_APPEND` descriptors so their lines never overwrite each other.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the previous run's log and open it for appending.
    pub fn start(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
        }
        File::create(&self.path)
            .with_context(|| format!("Failed to clean up log file: {}", self.path.display()))?;
        self.append()
    }

    /// Open for appending without truncating.
    pub fn append(&self) -> anyhow::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file: {}", self.path.display()))
    }

    /// Contents of the last run's log.
    pub fn read(&self) -> anyhow::Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read log file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn start_truncates_previous_run() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path().join("company-deploy.log"));
        std::fs::write(log.path(), "old run\n").unwrap();

        let mut file = log.start().unwrap();
        writeln!(file, "new run").unwrap();

        assert_eq!(log.read().unwrap(), "new run\n");
    }

    #[test]
    fn cloned_descriptors_append() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path().join("nested").join("deploy.log"));

        let mut first = log.start().unwrap();
        let mut second = first.try_clone().unwrap();
        let mut third = log.append().unwrap();
        writeln!(first, "one").unwrap();
        writeln!(third, "two").unwrap();
        writeln!(second, "three").unwrap();

        assert_eq!(log.read().unwrap(), "one\ntwo\nthree\n");
    }

    #[test]
    fn read_missing_log_is_an_error() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path().join("absent.log"));
        assert!(log.read().is_err());
    }
}
