//! Idempotent patches to the shared `openclaw.json` document.
//!
//! The free functions are pure: they mutate a parsed [`Value`] and report
//! whether anything changed. [`SharedConfig`] wraps them in a
//! read-modify-write cycle that only writes when a patch changed something.
//!
//! ```text
//! {
//!   "agents": { "list": [ { "id", "name", "workspace", "model"? } ] },
//!   "tools":  { "agentToAgent": { "allow": [ "<id>", ... ] } },
//!   ...       untouched
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use rostersync_core::{identity::MAIN_AGENT_ID, types::ContainerPath};

use crate::channel::ExecutionChannel;
use crate::error::{remote_err, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("`{container}` is not a JSON {expected}")]
    WrongType {
        container: &'static str,
        expected: &'static str,
    },
}

/// One element of `agents.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub workspace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Result of [`update_model_if_changed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelUpdate {
    Changed { from: Option<String>, to: String },
    Unchanged,
    /// No `agents.list` entry carries the id.
    NotRegistered,
}

// ---------------------------------------------------------------------------
// Container access
// ---------------------------------------------------------------------------

fn root(doc: &mut Value) -> Result<&mut Map<String, Value>, MergeError> {
    doc.as_object_mut().ok_or(MergeError::WrongType {
        container: "document",
        expected: "object",
    })
}

fn child_object<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
    label: &'static str,
) -> Result<&'a mut Map<String, Value>, MergeError> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(MergeError::WrongType {
            container: label,
            expected: "object",
        })
}

fn child_array<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
    label: &'static str,
) -> Result<&'a mut Vec<Value>, MergeError> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or(MergeError::WrongType {
            container: label,
            expected: "array",
        })
}

fn agents_list(doc: &mut Value) -> Result<&mut Vec<Value>, MergeError> {
    let agents = child_object(root(doc)?, "agents", "agents")?;
    child_array(agents, "list", "agents.list")
}

fn allow_list(doc: &mut Value) -> Result<&mut Vec<Value>, MergeError> {
    let tools = child_object(root(doc)?, "tools", "tools")?;
    let a2a = child_object(tools, "agentToAgent", "tools.agentToAgent")?;
    child_array(a2a, "allow", "tools.agentToAgent.allow")
}

/// `agents.list` without creating anything. `Ok(None)` when a level is missing.
fn existing_agents_list(doc: &mut Value) -> Result<Option<&mut Vec<Value>>, MergeError> {
    let Some(agents) = root(doc)?.get_mut("agents") else {
        return Ok(None);
    };
    let agents = agents.as_object_mut().ok_or(MergeError::WrongType {
        container: "agents",
        expected: "object",
    })?;
    match agents.get_mut("list") {
        None => Ok(None),
        Some(list) => list.as_array_mut().map(Some).ok_or(MergeError::WrongType {
            container: "agents.list",
            expected: "array",
        }),
    }
}

fn has_id(entry: &Value, id: &str) -> bool {
    entry.get("id").and_then(Value::as_str) == Some(id)
}

// ---------------------------------------------------------------------------
// Pure patches
// ---------------------------------------------------------------------------

/// Append `record` to `agents.list` unless an entry with its id exists.
pub fn add_agent_if_absent(doc: &mut Value, record: &AgentRecord) -> Result<bool, MergeError> {
    let list = agents_list(doc)?;
    if list.iter().any(|entry| has_id(entry, &record.id)) {
        return Ok(false);
    }
    let value = serde_json::to_value(record).unwrap_or(Value::Null);
    list.push(value);
    Ok(true)
}

/// Append `id` to `tools.agentToAgent.allow` unless present.
pub fn add_to_allow_list_if_absent(doc: &mut Value, id: &str) -> Result<bool, MergeError> {
    let allow = allow_list(doc)?;
    if allow.iter().any(|v| v.as_str() == Some(id)) {
        return Ok(false);
    }
    allow.push(Value::String(id.to_string()));
    Ok(true)
}

/// Set the `model` of the entry with `id`. Leaves the document untouched when
/// the entry is missing or already current.
pub fn update_model_if_changed(
    doc: &mut Value,
    id: &str,
    model: &str,
) -> Result<ModelUpdate, MergeError> {
    let Some(list) = existing_agents_list(doc)? else {
        return Ok(ModelUpdate::NotRegistered);
    };
    let Some(entry) = list.iter_mut().find(|entry| has_id(entry, id)) else {
        return Ok(ModelUpdate::NotRegistered);
    };
    let current = entry.get("model").and_then(Value::as_str).map(str::to_string);
    if current.as_deref() == Some(model) {
        return Ok(ModelUpdate::Unchanged);
    }
    let Some(fields) = entry.as_object_mut() else {
        return Err(MergeError::WrongType {
            container: "agents.list entry",
            expected: "object",
        });
    };
    fields.insert("model".to_string(), Value::String(model.to_string()));
    Ok(ModelUpdate::Changed {
        from: current,
        to: model.to_string(),
    })
}

// ---------------------------------------------------------------------------
// SharedConfig
// ---------------------------------------------------------------------------

/// What [`SharedConfig::register`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Registration {
    pub listed: bool,
    pub allowed: bool,
}

/// Read-modify-write access to the shared document through a channel.
pub struct SharedConfig<'a, C: ExecutionChannel + ?Sized> {
    channel: &'a C,
    path: &'a ContainerPath,
}

impl<'a, C: ExecutionChannel + ?Sized> SharedConfig<'a, C> {
    pub fn new(channel: &'a C, path: &'a ContainerPath) -> Self {
        Self { channel, path }
    }

    /// Apply `patch` to the current document. `patch` returns its result and
    /// whether the document changed; the document is written only then.
    pub fn patch<T>(
        &self,
        patch: impl FnOnce(&mut Value) -> Result<(T, bool), MergeError>,
    ) -> Result<T, SyncError> {
        let mut doc = self.channel.read_json(self.path).ok_or_else(|| {
            SyncError::SharedConfigUnavailable {
                path: self.path.to_string(),
            }
        })?;
        let (result, changed) = patch(&mut doc).map_err(|source| SyncError::Merge {
            path: self.path.to_string(),
            source,
        })?;
        if changed && !self.channel.write_json(self.path, &doc) {
            return Err(remote_err("write", self.path, "shared config write failed"));
        }
        Ok(result)
    }

    /// Add the agent to `agents.list` and, unless it is the orchestrator, to
    /// the cross-agent allow-list.
    pub fn register(&self, record: &AgentRecord) -> Result<Registration, SyncError> {
        self.patch(|doc| {
            let listed = add_agent_if_absent(doc, record)?;
            let allowed = if record.id == MAIN_AGENT_ID {
                false
            } else {
                add_to_allow_list_if_absent(doc, &record.id)?
            };
            Ok((Registration { listed, allowed }, listed || allowed))
        })
    }

    pub fn set_model(&self, id: &str, model: &str) -> Result<ModelUpdate, SyncError> {
        self.patch(|doc| {
            let update = update_model_if_changed(doc, id, model)?;
            let changed = matches!(update, ModelUpdate::Changed { .. });
            Ok((update, changed))
        })
    }
}
