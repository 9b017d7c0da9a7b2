//! Runtime settings and the container layout derived from them.
//!
//! # Storage layout
//!
//! ```text
//! <config_dir>/rostersync/config.yaml   (optional; every key has a default)
//! ```
//!
//! # API pattern
//!
//! - `Settings::load_at(path)`: explicit file; used in tests with `TempDir`
//! - `Settings::load()`: derives the path from `dirs::config_dir()`, falls
//!   back to defaults when the file does not exist

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity;
use crate::types::{ContainerPath, ResolvedIdentity};

pub const DEFAULT_ROSTER_PATH: &str = "/docker/missioncontrol/server/data/subagents.json";
pub const DEFAULT_CONTAINER: &str = "openclaw-fndc-openclaw-1";
pub const DEFAULT_OPENCLAW_BASE: &str = "/data/.openclaw";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// The document whose presence marks a workspace as provisioned.
pub const MARKER_DOCUMENT: &str = "SOUL.md";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User-facing configuration, deserialized from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Local path of the roster JSON file.
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,
    /// Name or id of the target container.
    #[serde(default = "default_container")]
    pub container: String,
    /// Docker CLI binary used for `docker exec`.
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    /// Base directory of the agent runtime inside the container.
    #[serde(default = "default_openclaw_base")]
    pub openclaw_base: String,
    /// Shared config document; defaults to `<openclaw_base>/openclaw.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_config: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Local directory of `.tera` files overriding the built-in documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

fn default_roster_path() -> PathBuf {
    PathBuf::from(DEFAULT_ROSTER_PATH)
}
fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}
fn default_docker_bin() -> String {
    "docker".to_string()
}
fn default_openclaw_base() -> String {
    DEFAULT_OPENCLAW_BASE.to_string()
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
            container: default_container(),
            docker_bin: default_docker_bin(),
            openclaw_base: default_openclaw_base(),
            shared_config: None,
            poll_interval_secs: default_poll_interval_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            template_dir: None,
        }
    }
}

impl Settings {
    /// `<config_dir>/rostersync/config.yaml`, or `None` if the platform has no
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rostersync").join("config.yaml"))
    }

    /// Load settings from an explicit YAML file.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the default location, or return defaults if no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_at(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "command_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.container.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "container",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.openclaw_base.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "openclaw_base",
                reason: format!("'{}' is not an absolute container path", self.openclaw_base),
            });
        }
        if let Some(shared) = &self.shared_config {
            if !shared.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "shared_config",
                    reason: format!("'{shared}' is not an absolute container path"),
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn layout(&self) -> RosterLayout {
        let base = ContainerPath::from(self.openclaw_base.as_str());
        let shared_config = self
            .shared_config
            .as_deref()
            .map(ContainerPath::from)
            .unwrap_or_else(|| base.join("openclaw.json"));
        RosterLayout { base, shared_config }
    }
}

// ---------------------------------------------------------------------------
// RosterLayout
// ---------------------------------------------------------------------------

/// Every container path the engine touches, derived from [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterLayout {
    pub base: ContainerPath,
    pub shared_config: ContainerPath,
}

/// A workspace-local pointer to a shared directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Entry name inside the workspace (`skills`, `vault`).
    pub name: &'static str,
    /// Shared directory the entry should point at.
    pub target: ContainerPath,
}

impl RosterLayout {
    pub fn new(base: impl Into<ContainerPath>) -> Self {
        let base = base.into();
        let shared_config = base.join("openclaw.json");
        Self { base, shared_config }
    }

    pub fn resolve(&self, name: &str) -> ResolvedIdentity {
        identity::resolve(&self.base, name)
    }

    /// `<workspace>/SOUL.md`.
    pub fn marker(&self, workspace: &ContainerPath) -> ContainerPath {
        workspace.join(MARKER_DOCUMENT)
    }

    /// The main agent's workspace, which also hosts the shared `skills/`.
    pub fn main_workspace(&self) -> ContainerPath {
        self.base.join("workspace")
    }

    /// Shared resources every non-main workspace links to.
    pub fn attachments(&self) -> Vec<Attachment> {
        vec![
            Attachment {
                name: "skills",
                target: self.main_workspace().join("skills"),
            },
            Attachment {
                name: "vault",
                target: self.base.join("vault"),
            },
        ]
    }
}
