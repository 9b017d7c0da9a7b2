//! Execution channel: the only way the engine reaches the container.
//!
//! Every container interaction is a typed [`RemoteOp`]. The docker transport
//! renders each op into a quoted `bash -c` script; [`crate::MemoryChannel`]
//! interprets the same ops against an in-memory tree.
//!
//! Failures are data, not errors: a non-zero exit, a spawn failure or a
//! timeout all come back as a [`CommandOutput`] with `code != 0`, and the
//! document helpers return `false` / `None`.

use serde_json::Value;

use rostersync_core::types::ContainerPath;

// ---------------------------------------------------------------------------
// RemoteOp
// ---------------------------------------------------------------------------

/// One command against the target filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    /// Prints `yes` when `path` is a regular file, `no` otherwise.
    FileExists { path: ContainerPath },
    /// `mkdir -p` every path.
    MakeDirs { paths: Vec<ContainerPath> },
    /// Prints the file contents.
    ReadFile { path: ContainerPath },
    /// Prints the fully resolved target when `path` is a symlink, nothing otherwise.
    ResolveLink { path: ContainerPath },
    /// Lists entries when `path` is a real (non-link) directory, nothing otherwise.
    ListRealDir { path: ContainerPath },
    /// `rm -rf`.
    RemoveAll { path: ContainerPath },
    /// `ln -s target link`.
    Symlink {
        target: ContainerPath,
        link: ContainerPath,
    },
}

impl RemoteOp {
    /// Shell script for `bash -c`. Every path is single-quoted.
    pub fn to_shell(&self) -> String {
        match self {
            RemoteOp::FileExists { path } => {
                let p = shell_quote(path.as_str());
                format!("if [ -f {p} ]; then echo yes; else echo no; fi")
            }
            RemoteOp::MakeDirs { paths } => {
                let quoted: Vec<String> = paths.iter().map(|p| shell_quote(p.as_str())).collect();
                format!("mkdir -p {}", quoted.join(" "))
            }
            RemoteOp::ReadFile { path } => format!("cat {}", shell_quote(path.as_str())),
            RemoteOp::ResolveLink { path } => {
                let p = shell_quote(path.as_str());
                format!("if [ -L {p} ]; then readlink -f {p}; fi")
            }
            RemoteOp::ListRealDir { path } => {
                let p = shell_quote(path.as_str());
                format!("if [ -d {p} ] && [ ! -L {p} ]; then ls -A {p}; fi")
            }
            RemoteOp::RemoveAll { path } => format!("rm -rf {}", shell_quote(path.as_str())),
            RemoteOp::Symlink { target, link } => format!(
                "ln -s {} {}",
                shell_quote(target.as_str()),
                shell_quote(link.as_str())
            ),
        }
    }

    /// Whether the op changes the target filesystem.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RemoteOp::MakeDirs { .. } | RemoteOp::RemoveAll { .. } | RemoteOp::Symlink { .. }
        )
    }

    /// Short operation name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOp::FileExists { .. } => "probe",
            RemoteOp::MakeDirs { .. } => "mkdir",
            RemoteOp::ReadFile { .. } => "read",
            RemoteOp::ResolveLink { .. } => "readlink",
            RemoteOp::ListRealDir { .. } => "list",
            RemoteOp::RemoveAll { .. } => "remove",
            RemoteOp::Symlink { .. } => "symlink",
        }
    }
}

/// `'...'` quoting for POSIX shells; embedded quotes become `'\''`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

// ---------------------------------------------------------------------------
// CommandOutput
// ---------------------------------------------------------------------------

/// Exit code and captured output of one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Process exit code; `-1` when the command never ran to completion.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

// ---------------------------------------------------------------------------
// ExecutionChannel
// ---------------------------------------------------------------------------

/// Command execution against the target environment.
pub trait ExecutionChannel: Send + Sync {
    fn run(&self, op: &RemoteOp) -> CommandOutput;

    /// Replace `path` with `content`. The parent directory must exist.
    fn write_file(&self, path: &ContainerPath, content: &str) -> bool;

    /// Read and parse a JSON document. Missing or malformed reads as `None`.
    fn read_json(&self, path: &ContainerPath) -> Option<Value> {
        let out = self.run(&RemoteOp::ReadFile { path: path.clone() });
        if !out.success() {
            tracing::debug!("read {path} failed (exit {}): {}", out.code, out.stderr.trim());
            return None;
        }
        match serde_json::from_str(&out.stdout) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("{path} is not valid JSON: {e}");
                None
            }
        }
    }

    /// Write `doc` pretty-printed with two-space indentation and a trailing newline.
    fn write_json(&self, path: &ContainerPath, doc: &Value) -> bool {
        match serde_json::to_string_pretty(doc) {
            Ok(mut text) => {
                text.push('\n');
                self.write_file(path, &text)
            }
            Err(e) => {
                tracing::error!("could not serialize {path}: {e}");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ContainerPath {
        ContainerPath::from(s)
    }

    #[test]
    fn quote_wraps_and_escapes_single_quotes() {
        assert_eq!(shell_quote("/data/x"), "'/data/x'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn mkdir_script_quotes_every_path() {
        let op = RemoteOp::MakeDirs {
            paths: vec![p("/w/memory"), p("/w/skills")],
        };
        assert_eq!(op.to_shell(), "mkdir -p '/w/memory' '/w/skills'");
    }

    #[test]
    fn link_probe_scripts_match_transport_contract() {
        let resolve = RemoteOp::ResolveLink { path: p("/w/skills") };
        assert_eq!(
            resolve.to_shell(),
            "if [ -L '/w/skills' ]; then readlink -f '/w/skills'; fi"
        );
        let list = RemoteOp::ListRealDir { path: p("/w/vault") };
        assert_eq!(
            list.to_shell(),
            "if [ -d '/w/vault' ] && [ ! -L '/w/vault' ]; then ls -A '/w/vault'; fi"
        );
    }

    #[test]
    fn symlink_script_puts_target_first() {
        let op = RemoteOp::Symlink {
            target: p("/data/.openclaw/vault"),
            link: p("/w/vault"),
        };
        assert_eq!(op.to_shell(), "ln -s '/data/.openclaw/vault' '/w/vault'");
    }

    #[test]
    fn only_writes_are_mutations() {
        assert!(!RemoteOp::FileExists { path: p("/a") }.is_mutation());
        assert!(!RemoteOp::ResolveLink { path: p("/a") }.is_mutation());
        assert!(RemoteOp::RemoveAll { path: p("/a") }.is_mutation());
    }

    #[test]
    fn command_output_helpers() {
        assert!(CommandOutput::ok(" yes\n").success());
        assert_eq!(CommandOutput::ok(" yes\n").trimmed(), "yes");
        assert!(!CommandOutput::failed(-1, "timed out").success());
    }
}
