//! `rostersync service`: systemd unit generation and installation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use rostersync_daemon::paths::{system_unit_dir, user_unit_dir, DEFAULT_BINARY};
use rostersync_daemon::{generate_unit, install, UnitScope};

use super::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// Print the unit file to stdout.
    Print(ServiceArgs),
    /// Write the unit file, reload systemd and start the service.
    Install(ServiceArgs),
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Install as a user unit instead of a system unit.
    #[arg(long)]
    pub user: bool,

    /// Path of the rostersync binary the unit should execute.
    #[arg(long, default_value = DEFAULT_BINARY)]
    pub binary: PathBuf,
}

impl ServiceArgs {
    fn scope(&self) -> UnitScope {
        if self.user {
            UnitScope::User
        } else {
            UnitScope::System
        }
    }
}

pub fn run(command: ServiceCommand, global: &GlobalArgs) -> Result<()> {
    let config = global.config.as_deref();

    match command {
        ServiceCommand::Print(args) => {
            print!("{}", generate_unit(&args.binary, config, args.scope()));
        }
        ServiceCommand::Install(args) => {
            let scope = args.scope();
            let unit_dir = match scope {
                UnitScope::System => system_unit_dir(),
                UnitScope::User => {
                    let home = dirs::home_dir().context("could not determine home directory")?;
                    user_unit_dir(&home)
                }
            };
            let path = install(&unit_dir, &args.binary, config, scope)
                .context("failed to install systemd service")?;
            println!("installed systemd service: {}", path.display());
        }
    }
    Ok(())
}
