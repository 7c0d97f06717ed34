//! External process execution.
//!
//! Every side effect of the toolkit goes through a [`CommandRunner`]: local
//! build-tool calls, `ssh`/`scp`/`rsync`, package manager and service calls
//! on the agent side. Commands are structured argument lists, never shell
//! strings assembled by concatenation.

pub mod quote;
pub mod remote;

use std::fmt;
use std::fs::File;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{DeployError, Result};

pub use remote::RemoteShell;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote::join(
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str)),
        ))
    }
}

/// Executes invocations synchronously.
pub trait CommandRunner {
    /// Run to completion. A non-zero exit status is an error.
    fn run(&mut self, invocation: &Invocation) -> Result<()>;

    /// Run to completion and return stdout. A non-zero exit status is an error.
    fn capture(&mut self, invocation: &Invocation) -> Result<String>;

    /// Run to completion and return the exit code without judging it.
    /// `None` means the process was killed by a signal.
    fn exit_code(&mut self, invocation: &Invocation) -> Result<Option<i32>>;

    /// Block the sequence for a fixed settle interval.
    fn sleep(&mut self, duration: Duration);
}

/// Runs real child processes.
///
/// Without a log file children share the terminal. With one, their stdout
/// and stderr are appended to it.
#[derive(Debug, Default)]
pub struct ProcessRunner {
    log: Option<File>,
}

impl ProcessRunner {
    /// Children inherit the terminal.
    pub fn inherit() -> Self {
        Self { log: None }
    }

    /// Children write into `log`.
    pub fn with_log(log: File) -> Self {
        Self { log: Some(log) }
    }

    fn output_stdio(&self, invocation: &Invocation) -> Result<Stdio> {
        match &self.log {
            Some(file) => file
                .try_clone()
                .map(Stdio::from)
                .map_err(|source| DeployError::Spawn {
                    command: invocation.to_string(),
                    source,
                }),
            None => Ok(Stdio::inherit()),
        }
    }

    fn wait(&self, invocation: &Invocation, mut cmd: Command) -> Result<ExitStatus> {
        cmd.status().map_err(|source| DeployError::Spawn {
            command: invocation.to_string(),
            source,
        })
    }
}

fn ensure_success(invocation: &Invocation, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: invocation.to_string(),
            status: status.to_string(),
        })
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        info!("will execute {}", invocation);
        let mut cmd = invocation.to_command();
        cmd.stdout(self.output_stdio(invocation)?)
            .stderr(self.output_stdio(invocation)?);
        let status = self.wait(invocation, cmd)?;
        ensure_success(invocation, status)
    }

    fn capture(&mut self, invocation: &Invocation) -> Result<String> {
        info!("will execute {}", invocation);
        let mut cmd = invocation.to_command();
        cmd.stdout(Stdio::piped())
            .stderr(self.output_stdio(invocation)?);
        let output = cmd.output().map_err(|source| DeployError::Spawn {
            command: invocation.to_string(),
            source,
        })?;
        ensure_success(invocation, output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn exit_code(&mut self, invocation: &Invocation) -> Result<Option<i32>> {
        info!("will execute {}", invocation);
        let mut cmd = invocation.to_command();
        cmd.stdout(self.output_stdio(invocation)?)
            .stderr(self.output_stdio(invocation)?);
        let status = self.wait(invocation, cmd)?;
        debug!("{} exited with {}", invocation.program(), status);
        Ok(status.code())
    }

    fn sleep(&mut self, duration: Duration) {
        debug!("sleeping {:?}", duration);
        std::thread::sleep(duration);
    }
}
