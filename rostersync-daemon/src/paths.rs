use std::path::{Path, PathBuf};

pub const SERVICE_NAME: &str = "rostersync";
pub const UNIT_FILE: &str = "rostersync.service";
pub const DEFAULT_BINARY: &str = "/usr/local/bin/rostersync";

pub fn system_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

pub fn user_unit_dir(home: &Path) -> PathBuf {
    home.join(".config").join("systemd").join("user")
}

pub fn unit_path(unit_dir: &Path) -> PathBuf {
    unit_dir.join(UNIT_FILE)
}
