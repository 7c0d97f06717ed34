#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use deploykit_core::config::parse_deploy_toml_str;
use deploykit_core::controller::DocsUploader;
use deploykit_core::error::{DeployError, Result};
use deploykit_core::fleet::Fleet;
use deploykit_core::process::{CommandRunner, Invocation};
use url::Url;

/// A fleet with two seed modules and hosts spread over two environments.
pub const SEEDED_FLEET: &str = r#"
company = "acme"
modules = ["bootstrap", "registry", "api", "worker", "web"]

[groups]
seed = ["bootstrap", "registry"]
main = ["api", "worker"]

[[environments.dev.hosts]]
host = "backend00.dev.acme.int"
modules = ["bootstrap", "registry", "api"]

[[environments.dev.hosts]]
host = "backend01.dev.acme.int"
modules = ["worker", "web"]

[environments.prod]
protected = true

[[environments.prod.hosts]]
host = "backend00.prod.acme.int"
modules = ["bootstrap"]

[[environments.prod.hosts]]
host = "backend01.prod.acme.int"
modules = ["registry", "api", "worker"]

[[environments.prod.hosts]]
host = "backend02.prod.acme.int"
modules = ["web"]
"#;

pub fn seeded_fleet() -> Fleet {
    fleet_from(SEEDED_FLEET)
}

pub fn builtin_fleet() -> Fleet {
    Fleet::from_config(Default::default()).expect("built-in fleet is valid")
}

pub fn fleet_from(toml: &str) -> Fleet {
    let config = parse_deploy_toml_str(toml).expect("fixture config parses");
    Fleet::from_config(config).expect("fixture fleet is valid")
}

/// What the runner was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Run(Invocation),
    Capture(Invocation),
    ExitCode(Invocation),
    Sleep(Duration),
}

/// Records invocations instead of executing them.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    pub events: Vec<Event>,
    /// Agent version printed per host (default "1")
    versions: HashMap<String, String>,
    /// Invocations whose display contains one of these fail
    failures: Vec<String>,
    /// Exit codes handed out by `exit_code`, default 0
    exit_codes: VecDeque<Option<i32>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_version(mut self, host: &str, version: &str) -> Self {
        self.versions.insert(host.to_string(), version.to_string());
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    pub fn with_exit_codes(mut self, codes: &[Option<i32>]) -> Self {
        self.exit_codes.extend(codes.iter().copied());
        self
    }

    fn check(&self, invocation: &Invocation) -> Result<()> {
        let line = invocation.to_string();
        if self.failures.iter().any(|needle| line.contains(needle.as_str())) {
            return Err(DeployError::CommandFailed {
                command: line,
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }

    /// Display form of every `run` invocation.
    pub fn runs(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Run(inv) => Some(inv.to_string()),
                _ => None,
            })
            .collect()
    }

    /// `(host, remote command line)` for every `ssh` run.
    pub fn remote_runs(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Run(inv) if inv.program() == "ssh" => {
                    let args = inv.arguments();
                    Some((args[0].clone(), args[1].clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Index of the first event whose display contains `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.events.iter().position(|event| match event {
            Event::Run(inv) | Event::Capture(inv) | Event::ExitCode(inv) => {
                inv.to_string().contains(needle)
            }
            Event::Sleep(_) => false,
        })
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        self.events.push(Event::Run(invocation.clone()));
        self.check(invocation)
    }

    fn capture(&mut self, invocation: &Invocation) -> Result<String> {
        self.events.push(Event::Capture(invocation.clone()));
        self.check(invocation)?;
        let host = invocation.arguments().first().cloned().unwrap_or_default();
        Ok(self
            .versions
            .get(&host)
            .cloned()
            .unwrap_or_else(|| "1\n".to_string()))
    }

    fn exit_code(&mut self, invocation: &Invocation) -> Result<Option<i32>> {
        self.events.push(Event::ExitCode(invocation.clone()));
        self.check(invocation)?;
        Ok(self.exit_codes.pop_front().unwrap_or(Some(0)))
    }

    fn sleep(&mut self, duration: Duration) {
        self.events.push(Event::Sleep(duration));
    }
}

/// Records uploads; fails for URLs containing a configured needle.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub uploads: RefCell<Vec<(PathBuf, String)>>,
    fail_on: Option<String>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(needle: &str) -> Self {
        Self {
            uploads: RefCell::default(),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.uploads
            .borrow()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }
}

impl DocsUploader for RecordingUploader {
    fn upload(&self, file: &Path, url: &Url) -> anyhow::Result<()> {
        if let Some(needle) = &self.fail_on {
            if url.as_str().contains(needle.as_str()) {
                anyhow::bail!("403 Forbidden for {}", url);
            }
        }
        self.uploads
            .borrow_mut()
            .push((file.to_path_buf(), url.to_string()));
        Ok(())
    }
}
