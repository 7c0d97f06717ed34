//! Deploy target - privileged agent on managed hosts
//!
//! Invoked by the controller over ssh:
//!   sudo ~/deploy-target install -m company-bootstrap
//!   sudo ~/deploy-target restart -a stop -m company-bootstrap
//!   ~/deploy-target version

use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use deploykit_core::error::Result as DeployResult;
use deploykit_core::prelude::{
    AgentCommand, DeployError, Fleet, ModuleName, ProcessRunner, ServiceAction, TargetAgent,
    load_agent_config,
};

#[derive(Parser, Debug)]
#[command(name = "deploy-target")]
#[command(about = "Package and service actions on a managed host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install module packages
    Install {
        #[arg(short, long, num_args = 1.., required = true)]
        modules: Vec<String>,
    },

    /// Refresh the package index
    Update {
        /// Use every configured source, not only the company list
        #[arg(long)]
        full: bool,
    },

    /// Apply a service action to modules
    Restart {
        #[arg(short, long, default_value_t = ServiceAction::Restart, value_parser = parse_action)]
        action: ServiceAction,
        #[arg(short, long, num_args = 1.., required = true)]
        modules: Vec<String>,
    },

    /// Kill every backend process
    Killbackend,

    /// Print the agent protocol version
    Version,
}

fn parse_action(s: &str) -> std::result::Result<ServiceAction, String> {
    s.parse()
}

impl Commands {
    /// Module names are checked against this host's registry and
    /// canonicalized, exactly as the controller does.
    fn into_agent_command(self, fleet: &Fleet) -> DeployResult<AgentCommand> {
        let registered = |modules: Vec<String>| -> DeployResult<Vec<ModuleName>> {
            modules.iter().map(|m| fleet.module(m)).collect()
        };
        let command = match self {
            Commands::Install { modules } => AgentCommand::Install {
                modules: registered(modules)?,
            },
            Commands::Update { full } => AgentCommand::Update { full },
            Commands::Restart { action, modules } => AgentCommand::Restart {
                action,
                modules: registered(modules)?,
            },
            Commands::Killbackend => AgentCommand::KillBackend,
            Commands::Version => AgentCommand::Version,
        };
        Ok(command)
    }
}

fn main() -> ExitCode {
    // stdout carries the version answer, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Unregistered names are usage errors, exit code 2.
fn usage_error(e: DeployError) -> ! {
    Cli::command().error(ErrorKind::ValueValidation, e).exit()
}

fn run(cli: Cli) -> Result<()> {
    let (config, source) = load_agent_config()?;
    tracing::debug!("fleet config: {}", source);
    let fleet = Fleet::from_config(config)?;

    let command = cli
        .command
        .into_agent_command(&fleet)
        .unwrap_or_else(|e| usage_error(e));
    let mut runner = ProcessRunner::inherit();
    let mut agent = TargetAgent::new(&fleet, &mut runner);

    if let AgentCommand::Version = command {
        println!("{}", agent.version());
        return Ok(());
    }
    agent.execute(&command)?;
    Ok(())
}
