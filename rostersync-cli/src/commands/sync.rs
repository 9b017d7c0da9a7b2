//! `rostersync sync`: one reconciliation pass against the container.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use rostersync_daemon::init_tracing;
use rostersync_sync::{
    AgentAction, AgentReport, AttachmentOutcome, DockerChannel, ExecutionChannel, ModelUpdate,
    PassReport, Reconciler,
};

use super::GlobalArgs;

/// Arguments for `rostersync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Print the pass report as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = global.settings()?;
        init_tracing();

        let channel: Arc<dyn ExecutionChannel> = Arc::new(DockerChannel::from_settings(&settings));
        let reconciler =
            Reconciler::from_settings(&settings, channel).context("failed to load templates")?;
        let report = reconciler
            .sync_file(&settings.roster_path, &AtomicBool::new(false))
            .with_context(|| format!("sync failed for {}", settings.roster_path.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render report JSON")?
            );
        } else {
            print_report(&report);
        }

        if !report.is_clean() {
            bail!(
                "{} of {} agents failed",
                report.failures.len(),
                report.failures.len() + report.agents.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &PassReport) {
    for agent in &report.agents {
        print_agent(agent);
    }
    for failure in &report.failures {
        println!(
            "{} {} ({}): {}",
            "✗".red(),
            failure.name.bold(),
            failure.agent_id,
            failure.error
        );
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "{} created, {} updated, {} failed in {}ms",
        report.created().to_string().green(),
        report.updated().to_string().cyan(),
        report.failures.len().to_string().red(),
        elapsed.num_milliseconds()
    );
}

fn print_agent(agent: &AgentReport) {
    let action = match agent.action {
        AgentAction::Created => "created".green(),
        AgentAction::Updated => "updated".cyan(),
    };
    println!(
        "{} {} ({}) {action}  {}",
        "✓".green(),
        agent.name.bold(),
        agent.agent_id,
        agent.workspace.dimmed()
    );

    if let Some(ModelUpdate::Changed { from, to }) = &agent.model {
        let from = from.as_deref().unwrap_or("(none)");
        println!("    model: {from} -> {to}");
    }
    for attachment in &agent.attachments {
        let line = match &attachment.outcome {
            AttachmentOutcome::AlreadyLinked => continue,
            AttachmentOutcome::Linked => "linked".normal(),
            AttachmentOutcome::Relinked => "relinked".yellow(),
            AttachmentOutcome::KeptNonEmpty => "kept existing directory".yellow(),
            AttachmentOutcome::Failed(detail) => format!("failed: {detail}").red(),
        };
        println!("    {}: {line}", attachment.name);
    }
    for warning in &agent.warnings {
        println!("    {} {warning}", "warning:".yellow());
    }
}
