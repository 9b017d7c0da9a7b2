//! Domain types shared by every rostersync crate.
//!
//! Local filesystem paths are `PathBuf`. Paths inside the target container are
//! [`ContainerPath`]: they are always POSIX, never touched by the local
//! filesystem, and must not be mixed up with host paths.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A stable machine identifier for an agent (e.g. `main`, `forge`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// An absolute POSIX path inside the target container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerPath(pub String);

impl ContainerPath {
    /// Append one or more `/`-separated segments.
    pub fn join(&self, segment: &str) -> ContainerPath {
        let base = self.0.trim_end_matches('/');
        let segment = segment.trim_start_matches('/');
        ContainerPath(format!("{base}/{segment}"))
    }

    /// Parent directory, or `None` for `/` and relative single segments.
    pub fn parent(&self) -> Option<ContainerPath> {
        let trimmed = self.0.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        if idx == 0 {
            return if trimmed.len() > 1 {
                Some(ContainerPath("/".to_string()))
            } else {
                None
            };
        }
        Some(ContainerPath(trimmed[..idx].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContainerPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContainerPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Roster records
// ---------------------------------------------------------------------------

/// One agent record from the roster file.
///
/// Fields the roster carries for other consumers (ids, status, avatars in
/// other shapes) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text personality. Older rosters call this `personality`.
    #[serde(default, alias = "personality", skip_serializing_if = "Option::is_none")]
    pub soul: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl RosterEntry {
    /// Convenience constructor used heavily in tests.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Trimmed display name.
    pub fn display_name(&self) -> &str {
        self.name.trim()
    }

    /// Trimmed role, `"Agent"` when blank.
    pub fn display_role(&self) -> &str {
        match self.role.trim() {
            "" => "Agent",
            role => role,
        }
    }

    /// Trimmed model identifier; blank strings count as "not declared".
    pub fn declared_model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// `null` reads as an empty string; the roster writer emits it for cleared fields.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of running a roster name through the identity resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub agent_id: AgentId,
    pub workspace: ContainerPath,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
