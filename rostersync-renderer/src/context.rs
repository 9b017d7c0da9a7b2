//! Template context: serializable rendering payload built from a
//! [`RosterEntry`] and the roster it belongs to.

use serde::{Deserialize, Serialize};

use rostersync_core::{
    identity::{self, MAIN_AGENT_ID},
    types::{ContainerPath, RosterEntry},
};

use crate::error::RenderError;

/// Short "use for" hints shown in the orchestrator's roster table, keyed by
/// lowercase role. Roles without a hint show the raw role instead.
const USE_FOR_HINTS: &[(&str, &str)] = &[
    ("research", "Finding info, verifying facts, sourcing"),
    ("builder", "Code, implementations, technical builds"),
    ("planner", "Intake, task breakdown, handoffs"),
    ("designer", "UI/UX flows, wireframes, component specs"),
    ("critic / evaluator", "Review, quality control, evaluation"),
    ("longform copywriter", "Blog posts, articles, scripts"),
    ("shortform / social copywriter", "Shortform posts, platform content"),
    ("curriculum unit planning", "Unit of work design"),
    ("curriculum lesson planner", "Individual lesson plans"),
    ("curriculum resource creator", "Worksheets, task sheets, answer keys"),
    ("scheduler", "Time blocks, milestones, weekly plans"),
];

/// One-line temperament per role for `IDENTITY.md`.
const VIBE_HINTS: &[(&str, &str)] = &[
    ("ceo", "Calm, decisive, operational. Speaks in status and decisions."),
    ("research", "Calm, forensic, evidence-first. Low ego."),
    ("builder", "Direct, practical, ship-mindset. No-nonsense."),
    ("planner", "Crisp, structured, slightly impatient with vagueness."),
    ("critic / evaluator", "Blunt, precise, unemotional. Tough but fair."),
    ("designer", "Clear, calm, structured. Slightly opinionated about simplicity."),
    ("longform copywriter", "Clear, confident, human. Reader-first."),
    ("shortform / social copywriter", "Fast, punchy, audience-aware. Hook-obsessed."),
    ("curriculum unit planning", "Organised, calm, highly practical. Writes for teachers."),
    ("curriculum lesson planner", "Energetic but grounded. Practical and classroom-realistic."),
    ("curriculum resource creator", "Efficient, practical, output-focused."),
    ("scheduler", "Calm, firm, pragmatic. Speaks in plans and time blocks."),
];

const NO_DESCRIPTION: &str = "(No description configured.)";
const NO_SOUL: &str = "(No personality configured.)";

/// Rendering payload shared by every document template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub agent: AgentCtx,
    /// Every other roster entry; only the orchestrator template reads it.
    pub roster: Vec<RosterRowCtx>,
    /// Main workspace path, referenced by `USER.md`.
    pub main_workspace: String,
    pub meta: MetaCtx,
}

/// The agent being rendered. Optional text is already replaced by its
/// placeholder so templates never branch on null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCtx {
    pub name: String,
    pub agent_id: String,
    pub role: String,
    pub description: String,
    pub soul: String,
    pub vibe: String,
    pub avatar: Option<String>,
}

/// One row of the orchestrator's roster table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRowCtx {
    pub name: String,
    pub agent_id: String,
    pub role: String,
    pub use_for: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub rostersync_version: String,
}

/// Usage hint for a role, falling back to the raw role.
pub fn use_for_hint(role: &str) -> String {
    let key = role.trim().to_lowercase();
    USE_FOR_HINTS
        .iter()
        .find(|(r, _)| *r == key)
        .map(|(_, hint)| (*hint).to_string())
        .unwrap_or_else(|| role.trim().to_string())
}

/// Temperament line for a role, falling back to a generic sentence.
pub fn vibe_hint(role: &str) -> String {
    let key = role.trim().to_lowercase();
    VIBE_HINTS
        .iter()
        .find(|(r, _)| *r == key)
        .map(|(_, hint)| (*hint).to_string())
        .unwrap_or_else(|| format!("Focused on {key} work."))
}

/// Roster rows for every entry except the orchestrator itself.
pub fn roster_rows(roster: &[RosterEntry]) -> Vec<RosterRowCtx> {
    roster
        .iter()
        .filter(|entry| identity::agent_id(&entry.name) != MAIN_AGENT_ID)
        .map(|entry| RosterRowCtx {
            name: entry.display_name().to_string(),
            agent_id: identity::agent_id(&entry.name).0,
            role: entry.role.trim().to_string(),
            use_for: use_for_hint(&entry.role),
        })
        .collect()
}

fn text_or(value: Option<&str>, placeholder: &str) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => placeholder.to_string(),
    }
}

impl TemplateContext {
    /// Build the context for `entry`, with `roster` being the full pass input.
    pub fn for_entry(
        entry: &RosterEntry,
        roster: &[RosterEntry],
        main_workspace: &ContainerPath,
    ) -> Self {
        let role = entry.display_role().to_string();
        let avatar = entry
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        TemplateContext {
            agent: AgentCtx {
                name: match entry.display_name() {
                    "" => "Unknown".to_string(),
                    name => name.to_string(),
                },
                agent_id: identity::agent_id(&entry.name).0,
                vibe: vibe_hint(&role),
                role,
                description: text_or(entry.description.as_deref(), NO_DESCRIPTION),
                soul: text_or(entry.soul.as_deref(), NO_SOUL),
                avatar,
            },
            roster: roster_rows(roster),
            main_workspace: main_workspace.to_string(),
            meta: MetaCtx {
                rostersync_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
