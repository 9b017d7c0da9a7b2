//! Identity resolver: roster name → agent id → workspace path.
//!
//! Every function here is pure: the same name always yields the same id and
//! the same workspace, across passes and across process restarts.

use crate::types::{AgentId, ContainerPath, ResolvedIdentity};

/// The id of the orchestrator agent. Its workspace is the base workspace.
pub const MAIN_AGENT_ID: &str = "main";

/// Reserved names and the ids they map to. Keys are compared after trimming
/// and lowercasing.
pub const ALIASES: &[(&str, &str)] = &[("atlas", MAIN_AGENT_ID)];

/// Derive the agent id for a roster name.
///
/// Trims and lowercases the name, applies [`ALIASES`], otherwise strips every
/// whitespace character. An empty or blank name yields the empty id.
pub fn agent_id(name: &str) -> AgentId {
    let normalized = name.trim().to_lowercase();
    if let Some((_, id)) = ALIASES.iter().find(|(alias, _)| *alias == normalized) {
        return AgentId::from(*id);
    }
    AgentId(normalized.chars().filter(|c| !c.is_whitespace()).collect())
}

/// `true` when `name` resolves to the orchestrator (`main`).
pub fn is_orchestrator(name: &str) -> bool {
    agent_id(name) == MAIN_AGENT_ID
}

/// Workspace directory for an already-resolved id.
pub fn workspace_for_id(base: &ContainerPath, id: &AgentId) -> ContainerPath {
    if id == MAIN_AGENT_ID {
        base.join("workspace")
    } else {
        base.join(&format!("workspace-{id}"))
    }
}

/// Workspace directory for a roster name.
pub fn workspace_path(base: &ContainerPath, name: &str) -> ContainerPath {
    workspace_for_id(base, &agent_id(name))
}

/// Resolve both id and workspace in one call.
pub fn resolve(base: &ContainerPath, name: &str) -> ResolvedIdentity {
    let agent_id = agent_id(name);
    let workspace = workspace_for_id(base, &agent_id);
    ResolvedIdentity { agent_id, workspace }
}
