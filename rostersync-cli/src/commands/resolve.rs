//! `rostersync resolve`: show how names map to agent ids and workspaces.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use rostersync_core::{identity, roster};

use super::GlobalArgs;

/// Arguments for `rostersync resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Agent display names. Every roster entry is resolved when omitted.
    pub names: Vec<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct ResolvedRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "agent id")]
    agent_id: String,
    #[tabled(rename = "workspace")]
    workspace: String,
}

impl ResolveArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = global.settings()?;
        let names = if self.names.is_empty() {
            let roster =
                roster::load_at(&settings.roster_path).context("failed to load roster")?;
            for rejected in &roster.rejected {
                eprintln!(
                    "{} roster entry {} skipped: {}",
                    "warning:".yellow(),
                    rejected.label(),
                    rejected.reason
                );
            }
            roster.entries.into_iter().map(|entry| entry.name).collect()
        } else {
            self.names
        };

        let layout = settings.layout();
        let rows: Vec<ResolvedRow> = names
            .into_iter()
            .map(|name| {
                let resolved = layout.resolve(&name);
                ResolvedRow {
                    agent_id: resolved.agent_id.to_string(),
                    workspace: resolved.workspace.to_string(),
                    name,
                }
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to render JSON")?
            );
            return Ok(());
        }

        if rows.is_empty() {
            println!("Roster is empty.");
            return Ok(());
        }
        let orchestrators = rows
            .iter()
            .filter(|row| identity::is_orchestrator(&row.name))
            .count();
        let mut table = Table::new(&rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{} agents, {} orchestrator", rows.len(), orchestrators);
        Ok(())
    }
}
