//! Deploy - fleet deployment controller
//!
//! Usage:
//!   deploy install -m bootstrap -e dev      # install packages
//!   deploy restart -a stop -g main          # service actions
//!   deploy chick -m api -t backend00...     # publish, then install
//!   deploy -r build00 publish -g all        # run on a build host

mod confirm;
mod logging;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use tracing::{error, info};

use deploykit_core::agent::ServiceAction;
use deploykit_core::config::load_controller_config;
use deploykit_core::controller::{
    Controller, HttpUploader, InstallOptions, PublishOptions, RemoteBuild, RestartOptions,
    StartOptions, UpdateMode, strip_remote_flag,
};
use deploykit_core::error::DeployError;
use deploykit_core::fleet::{Destination, Fleet, ModuleSet};
use deploykit_core::process::ProcessRunner;
use deploykit_core::run_log::RunLog;

#[derive(Parser, Debug)]
#[command(name = "deploy")]
#[command(about = "Install, restart and publish backend modules across the fleet", long_about = None)]
struct Cli {
    /// Show child process output on the terminal instead of the run log
    #[arg(short, long)]
    verbose: bool,

    /// Run the whole command on a build host
    #[arg(short, long, value_name = "BUILD_HOST")]
    remote: Option<String>,

    /// Fleet configuration file (default: ./deploy.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command line locally through `sh -c`
    Shell {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run one module locally through the build tool
    Start {
        /// Module to run
        #[arg(short, long, num_args = 1..)]
        modules: Vec<String>,
        /// Host type passed to the module
        #[arg(short = 't', long, default_value = "local", value_parser = ["local"])]
        host_type: String,
        /// Hostname passed to the module
        #[arg(short = 'd', long, default_value = "localhost")]
        hostname: String,
        /// Clean build first
        #[arg(short, long)]
        clean: bool,
    },

    /// Install packages on hosts
    Install {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        update: UpdateArgs,
        /// Do not ask before installing to a protected environment
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Build and publish packages to the stage of the target
    Publish {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Publish, then install the fresh packages
    Chick {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        update: UpdateArgs,
        /// Do not ask before installing to a protected environment
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Push the agent files to hosts
    Deploy {
        #[command(flatten)]
        destination: DestinationArgs,
    },

    /// Compile and publish API docs only
    Publishdocs {
        #[command(flatten)]
        destination: DestinationArgs,
        /// Clean build first
        #[arg(short, long)]
        clean: bool,
    },

    /// Apply a service action to modules
    Restart {
        #[command(flatten)]
        selection: Selection,
        /// Service action
        #[arg(short, long, default_value_t = ServiceAction::Restart, value_parser = parse_action)]
        action: ServiceAction,
    },

    /// Restart a whole environment, seed modules first
    Restartcluster {
        #[command(flatten)]
        destination: DestinationArgs,
    },

    /// Print the log of the last run
    Log,

    /// Generate a shell completion script
    Completions {
        shell: Shell,
    },
}

/// Modules, groups and where to act on them.
#[derive(Args, Debug)]
struct Selection {
    /// Module names, bare or prefixed
    #[arg(short, long, num_args = 1..)]
    modules: Vec<String>,

    /// Module group names
    #[arg(short, long, num_args = 1..)]
    groups: Vec<String>,

    #[command(flatten)]
    destination: DestinationArgs,
}

#[derive(Args, Debug)]
struct DestinationArgs {
    /// A single target host
    #[arg(short, long, conflicts_with = "env")]
    target: Option<String>,

    /// Target environment (default: dev)
    #[arg(short, long)]
    env: Option<String>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// Do not refresh the package index
    #[arg(long, conflicts_with = "full_update")]
    no_update: bool,

    /// Refresh the package index from every source
    #[arg(long)]
    full_update: bool,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Clean build first
    #[arg(short, long)]
    clean: bool,

    /// Skip publishing API docs
    #[arg(long)]
    no_docs: bool,
}

fn parse_action(s: &str) -> std::result::Result<ServiceAction, String> {
    s.parse()
}

/// A fully validated command, ready to run.
#[derive(Debug)]
enum Plan {
    Shell(String),
    Start(StartOptions),
    Install(InstallOptions),
    Publish(PublishOptions),
    Chick(PublishOptions, InstallOptions),
    Deploy(Destination),
    PublishDocs { destination: Destination, clean: bool },
    Restart(RestartOptions),
    RestartCluster(Destination),
    Log,
    Completions(Shell),
}

impl Plan {
    /// Confirmation is needed only for installs.
    fn install_destination(&self) -> Option<&Destination> {
        match self {
            Plan::Install(options) | Plan::Chick(_, options) => Some(&options.destination),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    let started = Instant::now();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        print_completions(*shell);
        return ExitCode::SUCCESS;
    }

    let fleet = match load_fleet(&cli) {
        Ok(fleet) => fleet,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let remote = cli
        .remote
        .as_deref()
        .map(|host| RemoteBuild::new(&fleet, host))
        .transpose()
        .unwrap_or_else(|e| usage_error(e));

    if let Some(remote) = remote {
        return finish(started, run_remote(&cli, &fleet, &remote));
    }

    let plan = build_plan(&fleet, &cli.command).unwrap_or_else(|e| usage_error(e));
    if let Plan::Log = plan {
        return match RunLog::new(fleet.config().log_file()).read() {
            Ok(content) => {
                print!("{content}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{} {:#}", style("error:").red().bold(), e);
                ExitCode::FAILURE
            }
        };
    }

    let result = setup(&cli, &fleet).and_then(|runner| run_plan(&cli, &fleet, runner, &plan));
    finish(started, result)
}

fn print_completions(shell: Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "deploy", &mut io::stdout());
}

fn load_fleet(cli: &Cli) -> Result<Fleet> {
    let (config, _source) = load_controller_config(cli.config.as_deref())?;
    Ok(Fleet::from_config(config)?)
}

/// Report an input error the way clap reports usage errors, exit code 2.
fn usage_error(e: DeployError) -> ! {
    Cli::command().error(ErrorKind::ValueValidation, e).exit()
}

/// Truncate and open the run log. Verbose runs keep everything on the console.
fn open_run_log(verbose: bool, fleet: &Fleet) -> Result<Option<File>> {
    if verbose {
        return Ok(None);
    }
    let file = RunLog::new(fleet.config().log_file()).start()?;
    Ok(Some(file))
}

/// Open the run log and start tracing. Returns the runner for child processes.
fn setup(cli: &Cli, fleet: &Fleet) -> Result<ProcessRunner> {
    match open_run_log(cli.verbose, fleet)? {
        Some(file) => {
            logging::init(false, Some(file.try_clone()?))?;
            Ok(ProcessRunner::with_log(file))
        }
        None => {
            logging::init(true, None)?;
            Ok(ProcessRunner::inherit())
        }
    }
}

fn finish(started: Instant, result: Result<()>) -> ExitCode {
    let elapsed = started.elapsed().as_secs();
    match result {
        Ok(()) => {
            info!("total time: {} sec", elapsed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ERROR: {:#}", e);
            info!("total time: {} sec", elapsed);
            ExitCode::FAILURE
        }
    }
}

/// Sync the tree to the build host and run the same command line there.
/// Our own messages still reach the run log; the remote side keeps its own.
fn run_remote(cli: &Cli, fleet: &Fleet, remote: &RemoteBuild<'_>) -> Result<()> {
    logging::init(cli.verbose, open_run_log(cli.verbose, fleet)?)?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut runner = ProcessRunner::inherit();
    remote.run(&mut runner, &strip_remote_flag(&args))?;
    Ok(())
}

/// Turn parsed arguments into validated options. Every name is checked
/// against the fleet tables here, before anything runs.
fn build_plan(fleet: &Fleet, command: &Commands) -> deploykit_core::error::Result<Plan> {
    let plan = match command {
        Commands::Shell { command } => Plan::Shell(command.join(" ")),
        Commands::Start {
            modules,
            host_type,
            hostname,
            clean,
        } => {
            let modules = fleet.resolve_modules(modules, &[] as &[&str])?;
            if modules.len() != 1 {
                return Err(DeployError::ExpectedOneModule(modules.len()));
            }
            Plan::Start(
                StartOptions::new(modules)
                    .with_host_type(host_type.as_str())
                    .with_hostname(hostname.as_str())
                    .with_clean(*clean),
            )
        }
        Commands::Install {
            selection, update, ..
        } => {
            let (modules, destination) = resolve_selection(fleet, selection)?;
            Plan::Install(
                InstallOptions::new(modules, destination).with_update(update.mode()),
            )
        }
        Commands::Publish { selection, build } => {
            let (modules, destination) = resolve_selection(fleet, selection)?;
            fleet.stage_for(&destination)?;
            Plan::Publish(publish_options(modules, destination, build))
        }
        Commands::Chick {
            selection,
            build,
            update,
            ..
        } => {
            let (modules, destination) = resolve_selection(fleet, selection)?;
            fleet.stage_for(&destination)?;
            Plan::Chick(
                publish_options(modules.clone(), destination.clone(), build),
                InstallOptions::new(modules, destination).with_update(update.mode()),
            )
        }
        Commands::Deploy { destination } => Plan::Deploy(destination.resolve(fleet)?),
        Commands::Publishdocs { destination, clean } => {
            let destination = destination.resolve(fleet)?;
            fleet.stage_for(&destination)?;
            Plan::PublishDocs {
                destination,
                clean: *clean,
            }
        }
        Commands::Restart { selection, action } => {
            let (modules, destination) = resolve_selection(fleet, selection)?;
            Plan::Restart(RestartOptions::new(modules, destination).with_action(*action))
        }
        Commands::Restartcluster { destination } => {
            let destination = destination.resolve(fleet)?;
            fleet.environment_for(&destination)?;
            Plan::RestartCluster(destination)
        }
        Commands::Log => Plan::Log,
        Commands::Completions { shell } => Plan::Completions(*shell),
    };
    Ok(plan)
}

fn resolve_selection(
    fleet: &Fleet,
    selection: &Selection,
) -> deploykit_core::error::Result<(ModuleSet, Destination)> {
    let modules = fleet.resolve_modules(&selection.modules, &selection.groups)?;
    if modules.is_empty() {
        return Err(DeployError::NoModules);
    }
    let destination = selection.destination.resolve(fleet)?;
    Ok((modules, destination))
}

fn publish_options(modules: ModuleSet, destination: Destination, build: &BuildArgs) -> PublishOptions {
    PublishOptions::new(modules, destination)
        .with_clean(build.clean)
        .with_docs(!build.no_docs)
}

impl DestinationArgs {
    fn resolve(&self, fleet: &Fleet) -> deploykit_core::error::Result<Destination> {
        fleet.destination(self.target.as_deref(), self.env.as_deref())
    }
}

impl UpdateArgs {
    fn mode(&self) -> UpdateMode {
        UpdateMode::from_flags(self.no_update, self.full_update)
    }
}

fn skip_confirmation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Install { yes: true, .. } | Commands::Chick { yes: true, .. }
    )
}

fn run_plan(cli: &Cli, fleet: &Fleet, mut runner: ProcessRunner, plan: &Plan) -> Result<()> {
    if let Some(destination) = plan.install_destination() {
        if let Some(env) = confirm::protected_environment(fleet, destination) {
            if !skip_confirmation(&cli.command) && !confirm::confirm_install(env)? {
                anyhow::bail!("installation to {} cancelled", env);
            }
        }
    }

    let uploader = HttpUploader::from_config(&fleet.config().docs)?;
    let mut controller = Controller::new(fleet, &mut runner, &uploader)?;

    match plan {
        Plan::Shell(command_line) => controller.shell(command_line)?,
        Plan::Start(options) => controller.start(options)?,
        Plan::Install(options) => {
            controller.install(options)?;
        }
        Plan::Publish(options) => {
            controller.publish(options)?;
        }
        Plan::Chick(publish, install) => {
            controller.chick(publish, install)?;
        }
        Plan::Deploy(destination) => {
            controller.push_agent(destination)?;
        }
        Plan::PublishDocs { destination, clean } => {
            controller.publish_docs_only(destination, *clean)?;
        }
        Plan::Restart(options) => {
            controller.restart(options)?;
        }
        Plan::RestartCluster(destination) => controller.restart_cluster(destination)?,
        Plan::Completions(shell) => print_completions(*shell),
        Plan::Log => {}
    }
    Ok(())
}
