//! Tera rendering engine: [`DocumentKind`] enum and [`Renderer`].
//!
//! # Document mapping
//!
//! | Kind      | File           | Written                           |
//! |-----------|----------------|-----------------------------------|
//! | Soul      | `SOUL.md`      | every pass (workspace marker)     |
//! | Identity  | `IDENTITY.md`  | once, at scaffold                 |
//! | Agents    | `AGENTS.md`    | once, at scaffold                 |
//! | Bootstrap | `BOOTSTRAP.md` | once, at scaffold                 |
//! | Memory    | `MEMORY.md`    | once, at scaffold                 |
//! | User      | `USER.md`      | once, at scaffold                 |
//! | Heartbeat | `HEARTBEAT.md` | once, at scaffold                 |
//! | Tools     | `TOOLS.md`     | once, at scaffold                 |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use rostersync_core::{
    identity,
    types::{ContainerPath, RosterEntry},
};

use crate::context::TemplateContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (
        "shared/_continuity.tera",
        include_str!("templates/_partials/continuity.tera"),
    ),
    ("soul.md.tera", include_str!("templates/soul.md.tera")),
    (
        "soul_orchestrator.md.tera",
        include_str!("templates/soul_orchestrator.md.tera"),
    ),
    ("identity.md.tera", include_str!("templates/identity.md.tera")),
    ("agents.md.tera", include_str!("templates/agents.md.tera")),
    ("bootstrap.md.tera", include_str!("templates/bootstrap.md.tera")),
    ("memory.md.tera", include_str!("templates/memory.md.tera")),
    ("user.md.tera", include_str!("templates/user.md.tera")),
    ("heartbeat.md.tera", include_str!("templates/heartbeat.md.tera")),
    ("tools.md.tera", include_str!("templates/tools.md.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// Every document the engine writes into a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Soul,
    Identity,
    Agents,
    Bootstrap,
    Memory,
    User,
    Heartbeat,
    Tools,
}

impl DocumentKind {
    /// Documents written once when a workspace is first provisioned, in
    /// write order. `Soul` is not part of the scaffold: it is the marker and
    /// is written last, on every pass.
    pub fn scaffold() -> &'static [DocumentKind] {
        &[
            DocumentKind::Identity,
            DocumentKind::Agents,
            DocumentKind::Bootstrap,
            DocumentKind::Memory,
            DocumentKind::User,
            DocumentKind::Heartbeat,
            DocumentKind::Tools,
        ]
    }

    /// File name inside the workspace.
    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::Soul => "SOUL.md",
            DocumentKind::Identity => "IDENTITY.md",
            DocumentKind::Agents => "AGENTS.md",
            DocumentKind::Bootstrap => "BOOTSTRAP.md",
            DocumentKind::Memory => "MEMORY.md",
            DocumentKind::User => "USER.md",
            DocumentKind::Heartbeat => "HEARTBEAT.md",
            DocumentKind::Tools => "TOOLS.md",
        }
    }

    /// Template for this kind. Only `Soul` has an orchestrator variant.
    pub fn template_name(&self, orchestrator: bool) -> &'static str {
        match self {
            DocumentKind::Soul if orchestrator => "soul_orchestrator.md.tera",
            DocumentKind::Soul => "soul.md.tera",
            DocumentKind::Identity => "identity.md.tera",
            DocumentKind::Agents => "agents.md.tera",
            DocumentKind::Bootstrap => "bootstrap.md.tera",
            DocumentKind::Memory => "memory.md.tera",
            DocumentKind::User => "user.md.tera",
            DocumentKind::Heartbeat => "heartbeat.md.tera",
            DocumentKind::Tools => "tools.md.tera",
        }
    }

    /// Output path inside `workspace`.
    pub fn output_path(&self, workspace: &ContainerPath) -> ContainerPath {
        workspace.join(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded defaults.
/// Template names are normalised to lowercase and relative paths.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render one document. Line endings are normalised to LF.
    pub fn render(
        &self,
        ctx: &TemplateContext,
        kind: DocumentKind,
        orchestrator: bool,
    ) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let content = self.tera.render(kind.template_name(orchestrator), &tera_ctx)?;
        Ok(content.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// `render(kind, entry, roster) → text`. Create once and reuse across passes.
pub struct Renderer {
    engine: TemplateEngine,
    main_workspace: ContainerPath,
}

impl Renderer {
    /// Renderer with embedded templates only.
    pub fn new(main_workspace: ContainerPath) -> Result<Self, RenderError> {
        Self::with_overrides(main_workspace, None)
    }

    /// Renderer whose embedded templates may be replaced by `.tera` files
    /// found under `user_template_dir`.
    pub fn with_overrides(
        main_workspace: ContainerPath,
        user_template_dir: Option<&Path>,
    ) -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(user_template_dir)?,
            main_workspace,
        })
    }

    /// Render `kind` for `entry`. `roster` is the whole pass input; the
    /// orchestrator's soul embeds every other entry from it.
    pub fn render(
        &self,
        kind: DocumentKind,
        entry: &RosterEntry,
        roster: &[RosterEntry],
    ) -> Result<String, RenderError> {
        let ctx = TemplateContext::for_entry(entry, roster, &self.main_workspace);
        self.render_with_context(kind, &ctx, identity::is_orchestrator(&entry.name))
    }

    pub fn render_with_context(
        &self,
        kind: DocumentKind,
        ctx: &TemplateContext,
        orchestrator: bool,
    ) -> Result<String, RenderError> {
        self.engine.render(ctx, kind, orchestrator)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
