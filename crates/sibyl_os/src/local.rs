use crate::Executor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs commands with `sh -c` on this machine.
///
/// Stdout and stderr share one pipe, so the result is the combined output in
/// the order it was written. A non-zero exit status is logged but still
/// returns whatever the command printed; only spawn failures and timeouts
/// are errors.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    timeout: Duration,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LocalExecutor {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, command: &str) -> Result<String> {
        let command = normalize_path(command);
        // Redirect inside the shell so both streams land in one pipe.
        let script = format!("exec 2>&1\n{}", command);
        let exec_future = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, exec_future).await {
            Ok(res) => res.context("Failed to execute command locally")?,
            Err(_) => anyhow::bail!(
                "Command execution timed out after {} seconds",
                self.timeout.as_secs()
            ),
        };

        if !output.status.success() {
            tracing::warn!("Command '{}' exited with {}", command, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        "LocalExecutor"
    }
}

/// Lexically normalise `/`-separated paths in a command line: repeated
/// separators and `.` segments are dropped and `dir/..` pairs are folded.
/// Segments are whatever lies between slashes, so a command without a
/// slash is returned unchanged.
pub fn normalize_path(command: &str) -> String {
    if command.is_empty() {
        return String::new();
    }
    let absolute = command.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in command.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(part),
            },
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
