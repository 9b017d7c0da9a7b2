//! `docker exec` transport.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use wait_timeout::ChildExt;

use rostersync_core::{types::ContainerPath, Settings};

use crate::channel::{shell_quote, CommandOutput, ExecutionChannel, RemoteOp};

/// Runs every op as `docker exec [-i] <container> bash -c <script>`.
#[derive(Debug, Clone)]
pub struct DockerChannel {
    docker_bin: String,
    container: String,
    timeout: Duration,
}

impl DockerChannel {
    pub fn new(docker_bin: impl Into<String>, container: impl Into<String>, timeout: Duration) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            container: container.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.docker_bin.as_str(),
            settings.container.as_str(),
            settings.command_timeout(),
        )
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Argument vector after the docker binary.
    fn exec_args(&self, script: &str, interactive: bool) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if interactive {
            args.push("-i".to_string());
        }
        args.extend([
            self.container.clone(),
            "bash".to_string(),
            "-c".to_string(),
            script.to_string(),
        ]);
        args
    }

    fn exec(&self, script: &str, stdin: Option<&str>) -> CommandOutput {
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(self.exec_args(script, stdin.is_some()))
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("could not spawn {}: {e}", self.docker_bin);
                return CommandOutput::failed(-1, format!("spawn {}: {e}", self.docker_bin));
            }
        };

        // Pipes are drained on threads so a large document cannot stall the
        // child while we wait on it.
        let writer = stdin.and_then(|payload| {
            let mut pipe = child.stdin.take()?;
            let payload = payload.to_string();
            Some(std::thread::spawn(move || pipe.write_all(payload.as_bytes())))
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill(&mut child);
                tracing::error!(
                    "docker exec in {} timed out after {}s",
                    self.container,
                    self.timeout.as_secs()
                );
                return CommandOutput::failed(
                    -1,
                    format!("timed out after {}s", self.timeout.as_secs()),
                );
            }
            Err(e) => {
                kill(&mut child);
                return CommandOutput::failed(-1, format!("wait: {e}"));
            }
        };

        if let Some(Ok(Err(e))) = writer.map(JoinHandle::join) {
            tracing::warn!("stdin to docker exec in {} was cut short: {e}", self.container);
        }

        CommandOutput {
            code: status.code().unwrap_or(-1),
            stdout: collect(stdout),
            stderr: collect(stderr),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl ExecutionChannel for DockerChannel {
    fn run(&self, op: &RemoteOp) -> CommandOutput {
        let out = self.exec(&op.to_shell(), None);
        if !out.success() {
            tracing::debug!("{} exited {}: {}", op.name(), out.code, out.stderr.trim());
        }
        out
    }

    fn write_file(&self, path: &ContainerPath, content: &str) -> bool {
        let script = format!("cat > {}", shell_quote(path.as_str()));
        let out = self.exec(&script, Some(content));
        if !out.success() {
            tracing::error!("write {path} failed (exit {}): {}", out.code, out.stderr.trim());
        }
        out.success()
    }
}
