//! Shared sync pipeline entrypoint used by CLI and daemon.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use rostersync_core::{identity, roster, types::RosterEntry, Roster, RosterLayout, Settings};
use rostersync_renderer::Renderer;

use crate::channel::ExecutionChannel;
use crate::error::SyncError;
use crate::fingerprint::{self, Fingerprint, PollAction};
use crate::provision::{AgentAction, AgentReport, Provisioner};

// ---------------------------------------------------------------------------
// PassReport
// ---------------------------------------------------------------------------

/// A roster entry that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentFailure {
    pub name: String,
    pub agent_id: String,
    pub error: String,
}

/// Outcome of one full pass over the roster.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub agents: Vec<AgentReport>,
    pub failures: Vec<AgentFailure>,
    /// The pass stopped early because shutdown was requested.
    pub interrupted: bool,
}

impl PassReport {
    pub fn created(&self) -> usize {
        self.count(AgentAction::Created)
    }

    pub fn updated(&self) -> usize {
        self.count(AgentAction::Updated)
    }

    fn count(&self, action: AgentAction) -> usize {
        self.agents.iter().filter(|a| a.action == action).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// run_pass
// ---------------------------------------------------------------------------

/// Reconcile every entry in `roster`, one at a time. A failing entry is
/// logged and recorded; the pass continues with the next one. `stop` is
/// checked between entries.
pub fn run_pass<C: ExecutionChannel + ?Sized>(
    channel: &C,
    layout: &RosterLayout,
    renderer: &Renderer,
    roster: &[RosterEntry],
    stop: &AtomicBool,
) -> PassReport {
    let started_at = Utc::now();
    let provisioner = Provisioner::new(channel, layout, renderer);
    let mut agents = Vec::new();
    let mut failures = Vec::new();
    let mut interrupted = false;

    tracing::info!("syncing {} agents to {}", roster.len(), layout.base);
    for entry in roster {
        if stop.load(Ordering::SeqCst) {
            tracing::info!("shutdown requested; stopping pass early");
            interrupted = true;
            break;
        }
        match provisioner.provision(entry, roster) {
            Ok(report) => agents.push(report),
            Err(e) => {
                let agent_id = identity::agent_id(&entry.name).to_string();
                tracing::error!("error syncing agent {} ({agent_id}): {e}", entry.name);
                failures.push(AgentFailure {
                    name: entry.name.clone(),
                    agent_id,
                    error: e.to_string(),
                });
            }
        }
    }
    let report = PassReport {
        started_at,
        finished_at: Utc::now(),
        agents,
        failures,
        interrupted,
    };
    tracing::info!(
        "sync complete: {} created, {} updated, {} failed",
        report.created(),
        report.updated(),
        report.failures.len()
    );
    report
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Result of [`Reconciler::poll`].
#[derive(Debug)]
pub struct Poll {
    /// Fingerprint to remember for the next poll.
    pub fingerprint: Option<Fingerprint>,
    /// Present when a pass ran.
    pub report: Option<PassReport>,
}

impl Poll {
    fn idle(fingerprint: Option<Fingerprint>) -> Self {
        Self {
            fingerprint,
            report: None,
        }
    }
}

/// Channel, layout and renderer bundled for repeated passes.
pub struct Reconciler {
    channel: Arc<dyn ExecutionChannel>,
    layout: RosterLayout,
    renderer: Renderer,
}

impl Reconciler {
    pub fn new(channel: Arc<dyn ExecutionChannel>, layout: RosterLayout, renderer: Renderer) -> Self {
        Self {
            channel,
            layout,
            renderer,
        }
    }

    /// Layout from `settings`, renderer honouring `settings.template_dir`.
    pub fn from_settings(
        settings: &Settings,
        channel: Arc<dyn ExecutionChannel>,
    ) -> Result<Self, SyncError> {
        let layout = settings.layout();
        let renderer =
            Renderer::with_overrides(layout.main_workspace(), settings.template_dir.as_deref())?;
        Ok(Self::new(channel, layout, renderer))
    }

    pub fn layout(&self) -> &RosterLayout {
        &self.layout
    }

    pub fn run_pass(&self, roster: &[RosterEntry], stop: &AtomicBool) -> PassReport {
        run_pass(self.channel.as_ref(), &self.layout, &self.renderer, roster, stop)
    }

    /// Pass over the usable entries of `roster`; each rejected element is
    /// reported as a failure of its own.
    pub fn run_roster(&self, roster: &Roster, stop: &AtomicBool) -> PassReport {
        let mut report = self.run_pass(&roster.entries, stop);
        for rejected in &roster.rejected {
            let name = rejected.label();
            let agent_id = rejected
                .name
                .as_deref()
                .map(|n| identity::agent_id(n).to_string())
                .unwrap_or_default();
            tracing::error!(
                "skipping roster entry {name} (index {}): {}",
                rejected.index,
                rejected.reason
            );
            report.failures.push(AgentFailure {
                name,
                agent_id,
                error: format!("invalid roster entry: {}", rejected.reason),
            });
        }
        report
    }

    /// One iteration of the watch loop. Runs a pass when the roster content
    /// differs from `last`; the returned fingerprint only advances once the
    /// roster parsed.
    pub fn poll(&self, path: &Path, last: Option<Fingerprint>, stop: &AtomicBool) -> Poll {
        let snapshot = match fingerprint::read_snapshot(path) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("{e}");
                None
            }
        };
        let current = snapshot.as_ref().map(|s| s.fingerprint.clone());
        match fingerprint::step(last.as_ref(), current) {
            PollAction::Unreadable => {
                tracing::warn!("cannot read {}; will retry", path.display());
                Poll::idle(last)
            }
            PollAction::Unchanged => Poll::idle(last),
            PollAction::Changed(fp) => {
                let bytes = snapshot.map(|s| s.bytes).unwrap_or_default();
                match roster::parse(path, &bytes) {
                    Ok(parsed) => {
                        tracing::info!("{} changed; running sync", path.display());
                        Poll {
                            fingerprint: Some(fp),
                            report: Some(self.run_roster(&parsed, stop)),
                        }
                    }
                    Err(e) => {
                        tracing::error!("{e}");
                        Poll::idle(last)
                    }
                }
            }
        }
    }

    /// Load the roster at `path` and run a pass over it.
    pub fn sync_file(&self, path: &Path, stop: &AtomicBool) -> Result<PassReport, SyncError> {
        let roster = roster::load_at(path)?;
        Ok(self.run_roster(&roster, stop))
    }
}
