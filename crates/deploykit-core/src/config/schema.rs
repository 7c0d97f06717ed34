//! Configuration schema for deploy.toml
//!
//! One file describes the whole fleet: the module registry, groups,
//! environments with their host tables, and the settings of the agent,
//! build tool, docs endpoint and remote build hosts.
//!
//! Values that depend on the company name (domain, docs URL, agent kill
//! pattern, apt source list, log file) are optional in the file and derived
//! through accessor methods when absent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure for deploy.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Company name, the base of every derived default
    #[serde(default = "default_company")]
    pub company: String,

    /// Prefix of canonical module names (defaults to `company`)
    #[serde(default)]
    pub module_prefix: Option<String>,

    /// Internal DNS domain (defaults to `<company>.int`)
    #[serde(default)]
    pub domain: Option<String>,

    /// Directory name of the source checkout on remote build hosts
    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Environment used when neither `-t` nor `-e` is given
    #[serde(default = "default_environment")]
    pub default_environment: String,

    /// Registered module names, bare or prefixed
    #[serde(default)]
    pub modules: Vec<String>,

    /// Named module groups; `seed` and `all` are always present after loading
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,

    /// Named environments
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// Hosts accepted by `-t` that belong to no environment
    #[serde(default)]
    pub extra_hosts: Vec<String>,

    /// Hosts accepted by `-r` for remote execution
    #[serde(default = "default_build_hosts")]
    pub build_hosts: Vec<String>,

    /// Run log location (defaults to `<tmp>/<company>-deploy.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub docs: DocsConfig,

    #[serde(default)]
    pub remote: RemoteConfig,
}

/// A named deployment environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Ask for confirmation before installing here
    #[serde(default)]
    pub protected: bool,

    /// Host table, in dispatch order
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

/// One row of an environment's host table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub host: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Settings of the target agent and its remote invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent path on managed hosts, as typed into the remote shell
    #[serde(default = "default_agent_remote_path")]
    pub remote_path: String,

    /// Local files pushed to a host whose agent is outdated
    #[serde(default = "default_agent_files")]
    pub files: Vec<PathBuf>,

    /// Pause after starting a service
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Pause between starting seed modules and starting everything else
    #[serde(default = "default_seed_delay")]
    pub seed_delay_secs: u64,

    /// Pause between the graceful and the forced kill
    #[serde(default = "default_kill_grace")]
    pub kill_grace_secs: u64,

    /// apt source list used by a restricted update
    #[serde(default)]
    pub source_list: Option<String>,

    /// Process pattern matched by `killbackend` (defaults to `company`)
    #[serde(default)]
    pub kill_pattern: Option<String>,
}

/// Build tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_tool")]
    pub tool: String,

    /// Build setting that carries the package-repository stage
    #[serde(default = "default_stage_setting")]
    pub stage_setting: String,

    #[serde(default = "default_publish_task")]
    pub publish_task: String,

    /// Entry point used by `deploy start`
    #[serde(default)]
    pub main_class: Option<String>,
}

/// API documentation endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Base URL; the stage name is appended as a path segment
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub user: String,

    /// Environment variable holding the upload password
    #[serde(default = "default_password_env")]
    pub password_env: String,

    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,

    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    #[serde(default = "default_changelog")]
    pub changelog: PathBuf,
}

/// Remote build host execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Controller command on the build host
    #[serde(default = "default_remote_command")]
    pub command: String,

    /// rsync exclude patterns
    #[serde(default = "default_remote_excludes")]
    pub excludes: Vec<String>,
}

fn default_company() -> String {
    "company".to_string()
}

fn default_repo_name() -> String {
    "repo-name".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_build_hosts() -> Vec<String> {
    vec!["build00".to_string()]
}

fn default_agent_remote_path() -> String {
    "~/deploy-target".to_string()
}

fn default_agent_files() -> Vec<PathBuf> {
    vec![PathBuf::from("deploy-target"), PathBuf::from("deploy.toml")]
}

fn default_settle_delay() -> u64 {
    3
}

fn default_seed_delay() -> u64 {
    3
}

fn default_kill_grace() -> u64 {
    1
}

fn default_build_tool() -> String {
    "sbt".to_string()
}

fn default_stage_setting() -> String {
    "debRepoStage".to_string()
}

fn default_publish_task() -> String {
    "publishDebs".to_string()
}

fn default_password_env() -> String {
    "DEPLOYKIT_DOCS_PASSWORD".to_string()
}

fn default_schemas() -> Vec<String> {
    vec!["v1.api.json".to_string()]
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("schema/schemas/generated")
}

fn default_changelog() -> PathBuf {
    PathBuf::from("api_changes.md")
}

fn default_remote_command() -> String {
    "deploy".to_string()
}

fn default_remote_excludes() -> Vec<String> {
    [".**", "target", "logs", "__pycache__"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            remote_path: default_agent_remote_path(),
            files: default_agent_files(),
            settle_delay_secs: default_settle_delay(),
            seed_delay_secs: default_seed_delay(),
            kill_grace_secs: default_kill_grace(),
            source_list: None,
            kill_pattern: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tool: default_build_tool(),
            stage_setting: default_stage_setting(),
            publish_task: default_publish_task(),
            main_class: None,
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user: String::new(),
            password_env: default_password_env(),
            schemas: default_schemas(),
            schema_dir: default_schema_dir(),
            changelog: default_changelog(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            command: default_remote_command(),
            excludes: default_remote_excludes(),
        }
    }
}

/// Built-in fleet: one `bootstrap` module on one dev backend.
impl Default for FleetConfig {
    fn default() -> Self {
        let company = default_company();
        let domain = format!("{company}.int");

        let mut groups = BTreeMap::new();
        groups.insert("all".to_string(), vec!["bootstrap".to_string()]);
        groups.insert("seed".to_string(), Vec::new());
        groups.insert("main".to_string(), vec!["bootstrap".to_string()]);

        let mut environments = BTreeMap::new();
        environments.insert(
            "dev".to_string(),
            EnvironmentConfig {
                protected: false,
                hosts: vec![HostConfig {
                    host: format!("backend00.dev.{domain}"),
                    modules: vec!["bootstrap".to_string()],
                }],
            },
        );

        Self {
            company,
            module_prefix: None,
            domain: None,
            repo_name: default_repo_name(),
            default_environment: default_environment(),
            modules: vec!["bootstrap".to_string()],
            groups,
            environments,
            extra_hosts: Vec::new(),
            build_hosts: default_build_hosts(),
            log_file: None,
            agent: AgentConfig::default(),
            build: BuildConfig::default(),
            docs: DocsConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl FleetConfig {
    pub fn module_prefix(&self) -> &str {
        self.module_prefix.as_deref().unwrap_or(&self.company)
    }

    pub fn domain(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| format!("{}.int", self.company))
    }

    pub fn docs_base_url(&self) -> String {
        self.docs
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://doc.{}/docs/", self.domain()))
    }

    pub fn kill_pattern(&self) -> &str {
        self.agent.kill_pattern.as_deref().unwrap_or(&self.company)
    }

    pub fn source_list(&self) -> String {
        self.agent
            .source_list
            .clone()
            .unwrap_or_else(|| format!("/etc/apt/sources.list.d/{}.list", self.company))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("{}-deploy.log", self.company))
        })
    }

    /// Structural checks that do not need the module registry.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.company.trim().is_empty() {
            anyhow::bail!("'company' must not be empty");
        }
        if !self.environments.contains_key(&self.default_environment) {
            anyhow::bail!(
                "default environment '{}' is not defined in [environments]",
                self.default_environment
            );
        }

        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (env_name, env) in &self.environments {
            for host in &env.hosts {
                if host.host.trim().is_empty() {
                    anyhow::bail!("environment '{}' has a host with an empty name", env_name);
                }
                if let Some(previous) = seen.insert(host.host.as_str(), env_name.as_str()) {
                    anyhow::bail!(
                        "host '{}' appears in environments '{}' and '{}'",
                        host.host,
                        previous,
                        env_name
                    );
                }
            }
        }

        let base = self.docs_base_url();
        url::Url::parse(&base)
            .map_err(|e| anyhow::anyhow!("docs.base_url '{}' is not a valid URL: {}", base, e))?;

        Ok(())
    }
}
