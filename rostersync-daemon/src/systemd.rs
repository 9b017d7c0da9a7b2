use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{io_err, DaemonError};
use crate::paths::{unit_path, UNIT_FILE};

/// Which systemd manager owns the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    System,
    User,
}

impl UnitScope {
    fn wanted_by(self) -> &'static str {
        match self {
            UnitScope::System => "multi-user.target",
            UnitScope::User => "default.target",
        }
    }

    /// Ordering against docker; a user manager cannot see system units.
    fn docker_dependency(self) -> &'static str {
        match self {
            UnitScope::System => "After=docker.service\nWants=docker.service\n",
            UnitScope::User => "",
        }
    }

    fn systemctl_prefix(self) -> Vec<String> {
        match self {
            UnitScope::System => vec![],
            UnitScope::User => vec!["--user".to_string()],
        }
    }
}

fn exec_arg(path: &Path) -> String {
    let s = path.display().to_string();
    if s.contains(char::is_whitespace) {
        format!("\"{s}\"")
    } else {
        s
    }
}

/// Generate a systemd unit that runs `rostersync run` in the foreground.
pub fn generate_unit(binary: &Path, config: Option<&Path>, scope: UnitScope) -> String {
    let mut exec = exec_arg(binary);
    if let Some(config) = config {
        exec.push_str(" --config ");
        exec.push_str(&exec_arg(config));
    }
    exec.push_str(" run");

    format!(
        r#"[Unit]
Description=rostersync: keep agent workspaces in line with the roster
{docker}
[Service]
Type=simple
ExecStart={exec}
Restart=on-failure
RestartSec=5
Environment=RUST_LOG=info
KillSignal=SIGTERM

[Install]
WantedBy={wanted_by}
"#,
        docker = scope.docker_dependency(),
        exec = exec,
        wanted_by = scope.wanted_by()
    )
}

/// Write the unit into `unit_dir`, reload systemd and enable the service.
pub fn install(
    unit_dir: &Path,
    binary: &Path,
    config: Option<&Path>,
    scope: UnitScope,
) -> Result<PathBuf, DaemonError> {
    ensure_linux()?;

    if !unit_dir.exists() {
        fs::create_dir_all(unit_dir).map_err(|e| io_err(unit_dir, e))?;
    }
    let unit = unit_path(unit_dir);
    fs::write(&unit, generate_unit(binary, config, scope)).map_err(|e| io_err(&unit, e))?;

    let mut reload = scope.systemctl_prefix();
    reload.push("daemon-reload".to_string());
    run_systemctl(reload)?;

    let mut enable = scope.systemctl_prefix();
    enable.extend(["enable".to_string(), "--now".to_string(), UNIT_FILE.to_string()]);
    run_systemctl(enable)?;

    Ok(unit)
}

#[cfg(target_os = "linux")]
fn ensure_linux() -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn ensure_linux() -> Result<(), DaemonError> {
    Err(DaemonError::Systemd(
        "systemd management is only supported on Linux".to_string(),
    ))
}

fn run_systemctl(args: Vec<String>) -> Result<(), DaemonError> {
    let output = Command::new("systemctl")
        .args(args.iter().map(String::as_str))
        .output()
        .map_err(|e| io_err("systemctl", e))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(DaemonError::Systemd(format!(
        "systemctl {} failed (status {}): {}",
        args.join(" "),
        output.status,
        stderr
    )))
}
