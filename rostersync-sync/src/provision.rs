//! Per-agent provisioning state machine.
//!
//! ```text
//! marker absent  (NEW)   mkdir -p memory skills
//!                        write scaffold documents
//!                        register in openclaw.json
//! marker present (KNOWN) patch model when the roster declares one
//! both, non-main         ensure skills / vault attachments
//! both                   write SOUL.md (the marker)
//! ```
//!
//! A NEW workspace only receives `SOUL.md` once every earlier step
//! succeeded, so a half-built workspace is rebuilt on the next pass.

use serde::Serialize;

use rostersync_core::{
    identity::MAIN_AGENT_ID,
    types::{ContainerPath, ResolvedIdentity, RosterEntry},
    Attachment, RosterLayout,
};
use rostersync_renderer::{DocumentKind, Renderer};

use crate::channel::{ExecutionChannel, RemoteOp};
use crate::error::{remote_err, SyncError};
use crate::merger::{AgentRecord, ModelUpdate, Registration, SharedConfig};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    New,
    Known,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    /// Workspace scaffolded and agent registered.
    Created,
    /// Existing workspace refreshed.
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttachmentOutcome {
    AlreadyLinked,
    Linked,
    /// A link pointing elsewhere was replaced.
    Relinked,
    /// A non-empty real directory was left in place.
    KeptNonEmpty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentReport {
    pub name: String,
    pub outcome: AttachmentOutcome,
}

/// Everything that happened to one roster entry during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub agent_id: String,
    pub workspace: String,
    pub action: AgentAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelUpdate>,
    pub attachments: Vec<AttachmentReport>,
    /// Non-fatal problems, e.g. an unreadable shared config on the model patch.
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Prober
// ---------------------------------------------------------------------------

/// `true` iff `<workspace>/SOUL.md` is a regular file. A failed probe reads as absent.
pub fn workspace_exists<C: ExecutionChannel + ?Sized>(
    channel: &C,
    layout: &RosterLayout,
    workspace: &ContainerPath,
) -> bool {
    let out = channel.run(&RemoteOp::FileExists {
        path: layout.marker(workspace),
    });
    if !out.success() {
        tracing::warn!("probe of {workspace} failed (exit {}); treating as new", out.code);
        return false;
    }
    out.trimmed() == "yes"
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

pub struct Provisioner<'a, C: ExecutionChannel + ?Sized> {
    channel: &'a C,
    layout: &'a RosterLayout,
    renderer: &'a Renderer,
}

impl<'a, C: ExecutionChannel + ?Sized> Provisioner<'a, C> {
    pub fn new(channel: &'a C, layout: &'a RosterLayout, renderer: &'a Renderer) -> Self {
        Self {
            channel,
            layout,
            renderer,
        }
    }

    /// Bring one agent's workspace and registration in line with `entry`.
    pub fn provision(
        &self,
        entry: &RosterEntry,
        roster: &[RosterEntry],
    ) -> Result<AgentReport, SyncError> {
        let ResolvedIdentity { agent_id, workspace } = self.layout.resolve(&entry.name);
        if agent_id.is_empty() {
            return Err(SyncError::EmptyAgentId {
                name: entry.name.clone(),
            });
        }
        let name = entry.display_name();
        tracing::debug!("syncing {name} (agent_id={agent_id}, workspace={workspace})");

        let soul = self.renderer.render(DocumentKind::Soul, entry, roster)?;
        let state = if workspace_exists(self.channel, self.layout, &workspace) {
            WorkspaceState::Known
        } else {
            WorkspaceState::New
        };

        let mut report = AgentReport {
            name: name.to_string(),
            agent_id: agent_id.to_string(),
            workspace: workspace.to_string(),
            action: match state {
                WorkspaceState::New => AgentAction::Created,
                WorkspaceState::Known => AgentAction::Updated,
            },
            registration: None,
            model: None,
            attachments: Vec::new(),
            warnings: Vec::new(),
        };

        match state {
            WorkspaceState::New => {
                tracing::info!("new agent {name} ({agent_id}): creating workspace at {workspace}");
                self.scaffold(entry, roster, &workspace)?;
                let record = AgentRecord {
                    id: agent_id.to_string(),
                    name: name.to_string(),
                    workspace: workspace.to_string(),
                    model: entry.declared_model().map(str::to_string),
                };
                let registration = self.shared_config().register(&record)?;
                if registration.listed {
                    tracing::info!("added {name} ({agent_id}) to agents.list");
                }
                if registration.allowed {
                    tracing::info!("added {agent_id} to tools.agentToAgent.allow");
                }
                report.registration = Some(registration);
            }
            WorkspaceState::Known => {
                if let Some(model) = entry.declared_model() {
                    match self.shared_config().set_model(agent_id.as_str(), model) {
                        Ok(update) => {
                            match &update {
                                ModelUpdate::Changed { from, to } => tracing::info!(
                                    "model change for {name} ({agent_id}): {} -> {to}",
                                    from.as_deref().unwrap_or("(none)")
                                ),
                                ModelUpdate::NotRegistered => tracing::warn!(
                                    "{name} ({agent_id}) is not in agents.list; model not recorded"
                                ),
                                ModelUpdate::Unchanged => {}
                            }
                            report.model = Some(update);
                        }
                        Err(e) => {
                            tracing::error!("model update for {name} ({agent_id}) skipped: {e}");
                            report.warnings.push(format!("model update skipped: {e}"));
                        }
                    }
                }
            }
        }

        if agent_id != MAIN_AGENT_ID {
            for attachment in self.layout.attachments() {
                let outcome = self.ensure_attachment(&workspace, &attachment);
                if let AttachmentOutcome::Failed(detail) = &outcome {
                    report
                        .warnings
                        .push(format!("{} attachment: {detail}", attachment.name));
                }
                report.attachments.push(AttachmentReport {
                    name: attachment.name.to_string(),
                    outcome,
                });
            }
        }

        let marker = self.layout.marker(&workspace);
        if !self.channel.write_file(&marker, &soul) {
            tracing::error!("failed to sync SOUL.md for {name} ({agent_id})");
            return Err(remote_err("write", &marker, "SOUL.md write failed"));
        }
        match report.action {
            AgentAction::Created => tracing::info!("SOUL.md created for {name} ({agent_id})"),
            AgentAction::Updated => tracing::info!("SOUL.md updated for {name} ({agent_id})"),
        }
        Ok(report)
    }

    fn shared_config(&self) -> SharedConfig<'_, C> {
        SharedConfig::new(self.channel, &self.layout.shared_config)
    }

    fn scaffold(
        &self,
        entry: &RosterEntry,
        roster: &[RosterEntry],
        workspace: &ContainerPath,
    ) -> Result<(), SyncError> {
        let mkdir = self.channel.run(&RemoteOp::MakeDirs {
            paths: vec![workspace.join("memory"), workspace.join("skills")],
        });
        if !mkdir.success() {
            return Err(remote_err("mkdir", workspace, mkdir.stderr.trim()));
        }
        for kind in DocumentKind::scaffold() {
            let content = self.renderer.render(*kind, entry, roster)?;
            let path = kind.output_path(workspace);
            if !self.channel.write_file(&path, &content) {
                return Err(remote_err("write", &path, "scaffold write failed"));
            }
        }
        Ok(())
    }

    /// Make `<workspace>/<name>` a link to the shared target unless it already
    /// is one or holds real content.
    pub fn ensure_attachment(
        &self,
        workspace: &ContainerPath,
        attachment: &Attachment,
    ) -> AttachmentOutcome {
        let link = workspace.join(attachment.name);

        // Nothing is removed unless both probes answered.
        let resolved = self.channel.run(&RemoteOp::ResolveLink { path: link.clone() });
        if !resolved.success() {
            tracing::warn!("cannot inspect {link}; leaving as-is");
            return AttachmentOutcome::Failed(format!(
                "readlink {link}: {}",
                resolved.stderr.trim()
            ));
        }
        let current = resolved.trimmed();
        if current == attachment.target.as_str() {
            return AttachmentOutcome::AlreadyLinked;
        }
        let was_link = !current.is_empty();

        let listing = self.channel.run(&RemoteOp::ListRealDir { path: link.clone() });
        if !listing.success() {
            tracing::warn!("cannot list {link}; leaving as-is");
            return AttachmentOutcome::Failed(format!("list {link}: {}", listing.stderr.trim()));
        }
        if !listing.trimmed().is_empty() {
            tracing::warn!("{link} is not empty; leaving as-is");
            return AttachmentOutcome::KeptNonEmpty;
        }

        let rm = self.channel.run(&RemoteOp::RemoveAll { path: link.clone() });
        if !rm.success() {
            return AttachmentOutcome::Failed(format!("remove {link}: {}", rm.stderr.trim()));
        }
        let ln = self.channel.run(&RemoteOp::Symlink {
            target: attachment.target.clone(),
            link: link.clone(),
        });
        if !ln.success() {
            return AttachmentOutcome::Failed(format!("link {link}: {}", ln.stderr.trim()));
        }
        tracing::info!("linked {link} -> {}", attachment.target);
        if was_link {
            AttachmentOutcome::Relinked
        } else {
            AttachmentOutcome::Linked
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::memory::{MemoryChannel, Node};

    const BASE: &str = "/data/.openclaw";
    const DOC: &str = "/data/.openclaw/openclaw.json";

    fn layout() -> RosterLayout {
        RosterLayout::new(BASE)
    }

    fn renderer() -> Renderer {
        Renderer::new(layout().main_workspace()).unwrap()
    }

    fn channel() -> MemoryChannel {
        MemoryChannel::new()
            .with_json(DOC, &json!({"agents": {"list": []}}))
            .with_dir("/data/.openclaw/workspace/skills")
            .with_dir("/data/.openclaw/vault")
    }

    #[test]
    fn probe_failure_reads_as_absent() {
        struct Broken;
        impl ExecutionChannel for Broken {
            fn run(&self, _: &RemoteOp) -> crate::channel::CommandOutput {
                crate::channel::CommandOutput::failed(-1, "timed out")
            }
            fn write_file(&self, _: &ContainerPath, _: &str) -> bool {
                false
            }
        }
        let ws = ContainerPath::from("/data/.openclaw/workspace-forge");
        assert!(!workspace_exists(&Broken, &layout(), &ws));
    }

    #[test]
    fn new_agent_gets_full_scaffold_and_links() {
        let ch = channel();
        let (layout, renderer) = (layout(), renderer());
        let forge = RosterEntry::new("Forge", "builder");
        let report = Provisioner::new(&ch, &layout, &renderer)
            .provision(&forge, std::slice::from_ref(&forge))
            .unwrap();

        assert_eq!(report.action, AgentAction::Created);
        let ws = "/data/.openclaw/workspace-forge";
        for file in ["SOUL.md", "IDENTITY.md", "AGENTS.md", "BOOTSTRAP.md", "MEMORY.md", "USER.md", "HEARTBEAT.md", "TOOLS.md"] {
            assert!(ch.file(&format!("{ws}/{file}")).is_some(), "{file} missing");
        }
        assert_eq!(ch.node(&format!("{ws}/memory")), Some(Node::Dir));
        assert_eq!(
            ch.node(&format!("{ws}/skills")),
            Some(Node::Link("/data/.openclaw/workspace/skills".to_string()))
        );
        assert_eq!(
            ch.node(&format!("{ws}/vault")),
            Some(Node::Link("/data/.openclaw/vault".to_string()))
        );
        assert_eq!(report.registration, Some(Registration { listed: true, allowed: true }));
    }

    #[test]
    fn known_agent_receives_no_scaffold_writes() {
        let ch = channel();
        let (layout, renderer) = (layout(), renderer());
        let forge = RosterEntry::new("Forge", "builder");
        let p = Provisioner::new(&ch, &layout, &renderer);
        p.provision(&forge, std::slice::from_ref(&forge)).unwrap();
        ch.insert_file("/data/.openclaw/workspace-forge/MEMORY.md", "agent notes");
        ch.clear_mutations();

        let report = p.provision(&forge, std::slice::from_ref(&forge)).unwrap();
        assert_eq!(report.action, AgentAction::Updated);
        assert_eq!(
            ch.file("/data/.openclaw/workspace-forge/MEMORY.md").as_deref(),
            Some("agent notes")
        );
        assert_eq!(
            ch.mutations(),
            vec![crate::memory::Mutation::Write(
                "/data/.openclaw/workspace-forge/SOUL.md".to_string()
            )]
        );
    }

    #[test]
    fn failed_scaffold_write_withholds_marker() {
        let ch = channel();
        ch.fail_writes_to("/data/.openclaw/workspace-forge/MEMORY.md");
        let (layout, renderer) = (layout(), renderer());
        let forge = RosterEntry::new("Forge", "builder");
        let p = Provisioner::new(&ch, &layout, &renderer);

        let err = p.provision(&forge, &[]).unwrap_err();
        assert!(matches!(err, SyncError::Remote { operation: "write", .. }), "got: {err}");
        assert!(!ch.exists("/data/.openclaw/workspace-forge/SOUL.md"));
        assert!(ch.json(DOC).unwrap()["agents"]["list"].as_array().unwrap().is_empty());

        ch.allow_writes_to("/data/.openclaw/workspace-forge/MEMORY.md");
        let report = p.provision(&forge, &[]).unwrap();
        assert_eq!(report.action, AgentAction::Created);
        assert!(ch.exists("/data/.openclaw/workspace-forge/MEMORY.md"));
        assert!(ch.exists("/data/.openclaw/workspace-forge/SOUL.md"));
    }

    #[test]
    fn unreadable_shared_config_withholds_marker_for_new_agent() {
        let ch = MemoryChannel::new().with_dir(BASE);
        let (layout, renderer) = (layout(), renderer());
        let forge = RosterEntry::new("Forge", "builder");
        let err = Provisioner::new(&ch, &layout, &renderer)
            .provision(&forge, &[])
            .unwrap_err();
        assert!(matches!(err, SyncError::SharedConfigUnavailable { .. }));
        assert!(!ch.exists("/data/.openclaw/workspace-forge/SOUL.md"));
        assert!(!ch.exists(DOC));
    }

    #[test]
    fn unreadable_shared_config_only_warns_for_known_agent() {
        let ch = MemoryChannel::new()
            .with_file("/data/.openclaw/workspace-forge/SOUL.md", "old")
            .with_file(DOC, "not json");
        let (layout, renderer) = (layout(), renderer());
        let forge = RosterEntry::new("Forge", "builder").with_model("m2");
        let report = Provisioner::new(&ch, &layout, &renderer)
            .provision(&forge, &[])
            .unwrap();
        assert_eq!(report.model, None);
        assert!(report.warnings.iter().any(|w| w.contains("model update skipped")));
        assert_ne!(ch.file("/data/.openclaw/workspace-forge/SOUL.md").as_deref(), Some("old"));
        assert_eq!(ch.file(DOC).as_deref(), Some("not json"));
    }

    #[test]
    fn empty_name_is_refused() {
        let ch = channel();
        let (layout, renderer) = (layout(), renderer());
        let err = Provisioner::new(&ch, &layout, &renderer)
            .provision(&RosterEntry::new("   ", "builder"), &[])
            .unwrap_err();
        assert!(matches!(err, SyncError::EmptyAgentId { .. }));
        assert!(ch.mutations().is_empty());
    }

    #[test]
    fn orchestrator_gets_no_attachments() {
        let ch = channel();
        let (layout, renderer) = (layout(), renderer());
        let atlas = RosterEntry::new("Atlas", "CEO");
        let report = Provisioner::new(&ch, &layout, &renderer)
            .provision(&atlas, std::slice::from_ref(&atlas))
            .unwrap();
        assert!(report.attachments.is_empty());
        assert_eq!(ch.node("/data/.openclaw/workspace/skills"), Some(Node::Dir));
        assert!(!ch.exists("/data/.openclaw/workspace/vault"));
    }

    #[test]
    fn non_empty_directory_is_kept() {
        let ch = channel().with_file("/data/.openclaw/workspace-forge/vault/notes.md", "mine");
        let (layout, renderer) = (layout(), renderer());
        let p = Provisioner::new(&ch, &layout, &renderer);
        let vault = layout.attachments().into_iter().find(|a| a.name == "vault").unwrap();
        let ws = ContainerPath::from("/data/.openclaw/workspace-forge");

        assert_eq!(p.ensure_attachment(&ws, &vault), AttachmentOutcome::KeptNonEmpty);
        assert_eq!(
            ch.file("/data/.openclaw/workspace-forge/vault/notes.md").as_deref(),
            Some("mine")
        );
    }

    /// Delegates to a [`MemoryChannel`] but fails every op of one kind.
    struct FailingOp {
        inner: MemoryChannel,
        op: &'static str,
    }

    impl ExecutionChannel for FailingOp {
        fn run(&self, op: &RemoteOp) -> crate::channel::CommandOutput {
            if op.name() == self.op {
                return crate::channel::CommandOutput::failed(-1, "timed out after 30s");
            }
            self.inner.run(op)
        }
        fn write_file(&self, path: &ContainerPath, content: &str) -> bool {
            self.inner.write_file(path, content)
        }
    }

    #[test]
    fn failed_listing_never_removes_the_directory() {
        let ch = FailingOp {
            inner: channel().with_file("/data/.openclaw/workspace-forge/vault/notes.md", "mine"),
            op: "list",
        };
        let (layout, renderer) = (layout(), renderer());
        let p = Provisioner::new(&ch, &layout, &renderer);
        let vault = layout.attachments().into_iter().find(|a| a.name == "vault").unwrap();
        let ws = ContainerPath::from("/data/.openclaw/workspace-forge");

        let outcome = p.ensure_attachment(&ws, &vault);
        assert!(matches!(outcome, AttachmentOutcome::Failed(ref d) if d.contains("timed out")));
        assert_eq!(
            ch.inner.file("/data/.openclaw/workspace-forge/vault/notes.md").as_deref(),
            Some("mine")
        );
        assert!(!ch.inner.mutations().iter().any(|m| m.touches("/data/.openclaw/workspace-forge/vault")));
    }

    #[test]
    fn failed_readlink_never_removes_the_directory() {
        let ch = FailingOp {
            inner: channel().with_file("/data/.openclaw/workspace-forge/skills/tool.md", "mine"),
            op: "readlink",
        };
        let (layout, renderer) = (layout(), renderer());
        let p = Provisioner::new(&ch, &layout, &renderer);
        let skills = layout.attachments().into_iter().find(|a| a.name == "skills").unwrap();
        let ws = ContainerPath::from("/data/.openclaw/workspace-forge");

        assert!(matches!(p.ensure_attachment(&ws, &skills), AttachmentOutcome::Failed(_)));
        assert_eq!(ch.inner.node("/data/.openclaw/workspace-forge/skills"), Some(Node::Dir));
    }

    #[test]
    fn stale_link_is_replaced() {
        let ch = channel().with_dir("/old/skills");
        ch.insert_link("/data/.openclaw/workspace-forge/skills", "/old/skills");
        let (layout, renderer) = (layout(), renderer());
        let p = Provisioner::new(&ch, &layout, &renderer);
        let skills = layout.attachments().into_iter().find(|a| a.name == "skills").unwrap();
        let ws = ContainerPath::from("/data/.openclaw/workspace-forge");

        assert_eq!(p.ensure_attachment(&ws, &skills), AttachmentOutcome::Relinked);
        assert_eq!(p.ensure_attachment(&ws, &skills), AttachmentOutcome::AlreadyLinked);
        assert!(ch.exists("/old/skills"));
    }
}
