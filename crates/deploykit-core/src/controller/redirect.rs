//! Re-running the controller on a remote build host.

use tracing::info;

use crate::error::{DeployError, Result};
use crate::fleet::Fleet;
use crate::process::remote::ssh;
use crate::process::{CommandRunner, Invocation, quote};

/// Syncs the working tree to a build host and re-runs the command there.
#[derive(Debug)]
pub struct RemoteBuild<'a> {
    fleet: &'a Fleet,
    host: String,
}

impl<'a> RemoteBuild<'a> {
    pub fn new(fleet: &'a Fleet, host: &str) -> Result<Self> {
        if !fleet.config().build_hosts.iter().any(|h| h == host) {
            return Err(DeployError::UnknownHost(host.to_string()));
        }
        Ok(Self {
            fleet,
            host: host.to_string(),
        })
    }

    /// `rsync --delete --exclude=… -avzh . <host>:<repo>`
    pub fn sync_invocation(&self) -> Invocation {
        let config = self.fleet.config();
        Invocation::new("rsync")
            .arg("--delete")
            .args(
                config
                    .remote
                    .excludes
                    .iter()
                    .map(|pattern| format!("--exclude={pattern}")),
            )
            .args(["-avzh", "."])
            .arg(format!("{}:{}", self.host, config.repo_name))
    }

    /// `ssh <host> 'cd <repo> && <command> <args…>'`
    pub fn exec_invocation(&self, args: &[String]) -> Invocation {
        let config = self.fleet.config();
        let command = std::iter::once(config.remote.command.as_str())
            .chain(args.iter().map(String::as_str));
        let line = format!(
            "cd {} && {}",
            quote::quote(&config.repo_name),
            quote::join(command)
        );
        ssh(&self.host, line)
    }

    pub fn run(&self, runner: &mut dyn CommandRunner, args: &[String]) -> Result<()> {
        info!("syncing sources to {}", self.host);
        runner.run(&self.sync_invocation())?;
        info!("executing on {}", self.host);
        runner.run(&self.exec_invocation(args))
    }
}

/// Command-line arguments with the top-level `-r/--remote` option removed,
/// so the remote run executes locally on the build host. Everything from the
/// subcommand on is kept verbatim.
pub fn strip_remote_flag(args: &[String]) -> Vec<String> {
    let mut stripped = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-r" | "--remote" => {
                iter.next();
            }
            "--config" => {
                stripped.push(arg.clone());
                stripped.extend(iter.next().cloned());
            }
            a if a.starts_with("--remote=") => {}
            a if a.starts_with('-') && !a.starts_with("--") && a[1..].contains('r') => {
                // short cluster such as `-vr build00` or `-vrbuild00`;
                // `-r` is the only top-level short that takes a value
                let (flags, value) = a[1..].split_once('r').unwrap_or_default();
                if !flags.is_empty() {
                    stripped.push(format!("-{flags}"));
                }
                if value.is_empty() {
                    iter.next();
                }
            }
            a if !a.starts_with('-') => {
                stripped.push(arg.clone());
                stripped.extend(iter.cloned());
                break;
            }
            _ => stripped.push(arg.clone()),
        }
    }
    stripped
}
