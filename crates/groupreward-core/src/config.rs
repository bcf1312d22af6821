//! Configuration loading and typed config structures for the reward service.
//!
//! The configuration lives in `groupreward.yaml` next to the daemon. This
//! module defines strongly-typed structs that mirror the YAML structure,
//! a loader, and the startup validation that rejects an unusable config.
//!
//! Reward keys also accept the legacy `Reward_Spawn_HP`-style spellings and
//! `Group_ID`, so existing plugin configs can be pasted in unchanged.

use std::path::Path;
use std::time::Duration;

use groupreward_types::GroupId;
use serde::Deserialize;

/// Placeholder substituted with the canonical remote group id.
pub const GROUP_PLACEHOLDER: &str = "{gid}";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is missing or out of range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// The offending config key.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Short group id of the Steam group. Zero means unset and fails validation.
    #[serde(default, alias = "Group_ID")]
    pub group_id: u32,

    /// Reward amounts granted to members.
    #[serde(default)]
    pub rewards: RewardConfig,

    /// Member list synchronization settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Observer HTTP API settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `GROUPREWARD_GROUP_ID` overrides `group_id`
    /// - `GROUPREWARD_ENDPOINT` overrides `sync.endpoint_template`
    /// - `GROUPREWARD_OBSERVER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric override does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("GROUPREWARD_GROUP_ID") {
            self.group_id = val.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "GROUPREWARD_GROUP_ID",
                reason: format!("{e}"),
            })?;
        }
        if let Some(val) = lookup("GROUPREWARD_ENDPOINT") {
            self.sync.endpoint_template = val;
        }
        if let Some(val) = lookup("GROUPREWARD_OBSERVER_PORT") {
            self.observer.port = val.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "GROUPREWARD_OBSERVER_PORT",
                reason: format!("{e}"),
            })?;
        }
        Ok(())
    }

    /// Check that the service can start with this configuration.
    ///
    /// Returns the validated group id on success.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `group_id` is unset, the refresh
    /// interval or request timeout is zero, or the endpoint template has no
    /// `{gid}` placeholder. A zero initial delay is allowed.
    pub fn validate(&self) -> Result<GroupId, ConfigError> {
        let group = GroupId::new(self.group_id).ok_or_else(|| ConfigError::Invalid {
            field: "group_id",
            reason: "must be set to a non-zero group id".to_owned(),
        })?;
        self.sync.validate()?;
        Ok(group)
    }

    /// Resolve the member list URL for the configured group.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate).
    pub fn member_list_url(&self) -> Result<String, ConfigError> {
        let group = self.validate()?;
        Ok(self.sync.member_list_url(group))
    }
}

/// Reward amounts applied to confirmed members.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RewardConfig {
    /// Health (and, above 100, max health) set on spawn.
    #[serde(default = "default_spawn_hp", alias = "Reward_Spawn_HP")]
    pub spawn_hp: u32,

    /// Armor set on spawn. A value of 100 also grants a helmet.
    #[serde(default = "default_spawn_armor", alias = "Reward_Spawn_Armor")]
    pub spawn_armor: u32,

    /// Money added on spawn.
    #[serde(default = "default_spawn_money", alias = "Reward_Spawn_Money")]
    pub spawn_money: u32,

    /// Health added for each credited elimination.
    #[serde(default = "default_kill_hp", alias = "Reward_Kill_HP")]
    pub kill_hp: u32,

    /// Money added for each credited elimination.
    ///
    /// Older plugin builds paid `spawn_money` here and ignored this key.
    #[serde(default = "default_kill_money", alias = "Reward_Kill_Money")]
    pub kill_money: u32,

    /// Delay before spawn health/armor effects are applied, in milliseconds.
    ///
    /// The host finishes its own spawn initialization within this window;
    /// applying earlier gets overwritten.
    #[serde(default = "default_spawn_effect_delay_ms")]
    pub spawn_effect_delay_ms: u64,
}

impl RewardConfig {
    /// Spawn effect delay as a [`Duration`].
    pub const fn spawn_effect_delay(&self) -> Duration {
        Duration::from_millis(self.spawn_effect_delay_ms)
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            spawn_hp: default_spawn_hp(),
            spawn_armor: default_spawn_armor(),
            spawn_money: default_spawn_money(),
            kill_hp: default_kill_hp(),
            kill_money: default_kill_money(),
            spawn_effect_delay_ms: default_spawn_effect_delay_ms(),
        }
    }
}

/// Member list synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Member list URL template; `{gid}` is replaced by the remote group id.
    #[serde(default = "default_endpoint_template")]
    pub endpoint_template: String,

    /// Delay between a lifecycle trigger and the first fetch, in milliseconds.
    ///
    /// Zero fetches right away.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Interval between scheduled refreshes, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Upper bound on a single member list request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SyncConfig {
    /// Delay before the first fetch after a trigger.
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Interval between scheduled refreshes.
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Timeout for a single member list request.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Substitute the canonical remote group id into the endpoint template.
    pub fn member_list_url(&self, group: GroupId) -> String {
        self.endpoint_template
            .replace(GROUP_PLACEHOLDER, &group.remote_id())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint_template.contains(GROUP_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                field: "sync.endpoint_template",
                reason: format!("must contain the {GROUP_PLACEHOLDER} placeholder"),
            });
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.refresh_interval_secs",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.request_timeout_ms",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_template: default_endpoint_template(),
            initial_delay_ms: default_initial_delay_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Observer HTTP API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether to start the observer API at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address to bind to.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_spawn_hp() -> u32 {
    105
}

const fn default_spawn_armor() -> u32 {
    100
}

const fn default_spawn_money() -> u32 {
    200
}

const fn default_kill_hp() -> u32 {
    5
}

const fn default_kill_money() -> u32 {
    100
}

const fn default_spawn_effect_delay_ms() -> u64 {
    100
}

fn default_endpoint_template() -> String {
    "http://steamcommunity.com/gid/{gid}/memberslistxml/?xml=1".to_owned()
}

const fn default_initial_delay_ms() -> u64 {
    1000
}

const fn default_refresh_interval_secs() -> u64 {
    300
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_observer_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_observer_port() -> u16 {
    8090
}

fn default_log_level() -> String {
    "info".to_owned()
}
