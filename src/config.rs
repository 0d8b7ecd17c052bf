use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for mgmt-fleet
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetConfig {
    /// Organizations operated on when none are given on the command line
    #[serde(default)]
    pub orgs: Vec<String>,
    /// GitHub naming conventions
    #[serde(default)]
    pub github: GitHubSettings,
    /// Sync flow settings
    #[serde(default = "FlowSettings::sync_defaults")]
    pub sync: FlowSettings,
    /// Upgrade flow settings
    #[serde(default = "FlowSettings::upgrade_defaults")]
    pub upgrade: FlowSettings,
    /// Check-suite polling settings
    #[serde(default)]
    pub checks: CheckSettings,
    /// Single grace period between dispatching all workflows and locating
    /// their runs
    #[serde(default = "default_startup_grace_secs")]
    pub startup_grace_secs: u64,
    /// Optional upper bound on any single poll loop. Unset means wait
    /// forever, matching how long remote jobs are allowed to run.
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubSettings {
    /// Management repository name, present in every organization
    #[serde(default = "default_mgmt_repo")]
    pub mgmt_repo: String,
    /// Ref the workflows are dispatched against
    #[serde(default = "default_dispatch_ref")]
    pub dispatch_ref: String,
    /// Head branch the upgrade workflow opens its PR from
    #[serde(default = "default_upgrade_head_branch")]
    pub upgrade_head_branch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowSettings {
    /// Workflow file to dispatch
    pub workflow_file: String,
    /// Seconds between job-completion polls
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckSettings {
    /// Seconds between check-suite polls
    #[serde(default = "default_check_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_mgmt_repo() -> String {
    "github-mgmt".to_string()
}

fn default_dispatch_ref() -> String {
    "master".to_string()
}

fn default_upgrade_head_branch() -> String {
    "master-upgrade".to_string()
}

fn default_startup_grace_secs() -> u64 {
    60
}

fn default_check_poll_interval_secs() -> u64 {
    10
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            mgmt_repo: default_mgmt_repo(),
            dispatch_ref: default_dispatch_ref(),
            upgrade_head_branch: default_upgrade_head_branch(),
        }
    }
}

impl FlowSettings {
    pub fn sync_defaults() -> Self {
        Self {
            workflow_file: "sync.yml".to_string(),
            poll_interval_secs: 60,
        }
    }

    pub fn upgrade_defaults() -> Self {
        Self {
            workflow_file: "upgrade.yml".to_string(),
            poll_interval_secs: 10,
        }
    }
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_check_poll_interval_secs(),
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            orgs: Vec::new(),
            github: GitHubSettings::default(),
            sync: FlowSettings::sync_defaults(),
            upgrade: FlowSettings::upgrade_defaults(),
            checks: CheckSettings::default(),
            startup_grace_secs: default_startup_grace_secs(),
            poll_timeout_secs: None,
        }
    }
}

impl FleetConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Configuration file (mgmt-fleet.toml)
    /// 3. Environment variables (prefixed with MGMT_FLEET_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("mgmt-fleet.toml").exists() {
            builder = builder.add_source(File::with_name("mgmt-fleet"));
        }

        builder = builder.add_source(
            Environment::with_prefix("MGMT_FLEET")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_secs(self.startup_grace_secs)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(Duration::from_secs)
    }
}
