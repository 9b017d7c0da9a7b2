//! rostersync: keep agent workspaces inside the OpenClaw container in line
//! with the roster file.
//!
//! # Usage
//!
//! ```text
//! rostersync [--config FILE] [--roster FILE] [--container NAME] [--interval SECS] <command>
//!
//! rostersync run
//! rostersync sync [--json]
//! rostersync resolve [NAME...] [--json]
//! rostersync service print [--user] [--binary PATH]
//! rostersync service install [--user] [--binary PATH]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    resolve::ResolveArgs, service::ServiceCommand, sync::SyncArgs, GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "rostersync",
    version,
    about = "Provision and keep agent workspaces in sync with the roster",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the roster and reconcile on every change until interrupted.
    Run,

    /// Run exactly one reconciliation pass and print what happened.
    Sync(SyncArgs),

    /// Show the agent id and workspace each name resolves to.
    Resolve(ResolveArgs),

    /// Print or install the systemd unit for `rostersync run`.
    Service {
        #[command(subcommand)]
        command: ServiceCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run => commands::run::run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Resolve(args) => args.run(&cli.global),
        Commands::Service { command } => commands::service::run(command, &cli.global),
    }
}
