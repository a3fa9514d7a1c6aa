//! Docker runtime backend.
//!
//! Process control goes through the `docker` CLI via `tokio::process::Command`,
//! every call bounded by the configured timeout. The egress counter is read
//! from procfs of the container's init process, which lives in the container
//! network namespace and therefore reports the container's own interfaces.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::Command;

use super::{net_dev, ContainerRuntime};
use crate::config::{short_id, RuntimeConfig};
use crate::error::AppError;

const STARTED_AT_FORMAT: &str = "{{.State.StartedAt}}";
const PID_FORMAT: &str = "{{.State.Pid}}";

/// Captured result of one CLI invocation.
#[derive(Debug, Clone)]
struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Talks to a local Docker daemon through its CLI.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker_bin: String,
    proc_root: PathBuf,
    timeout: Duration,
    interfaces: Vec<String>,
}

impl DockerRuntime {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            docker_bin: config.docker_bin.clone(),
            proc_root: config.proc_root.clone(),
            timeout: Duration::from_secs(config.command_timeout_secs),
            interfaces: config.interfaces.clone(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput, AppError> {
        let rendered = args.join(" ");
        tracing::debug!("exec: {} {rendered}", self.docker_bin);

        let mut command = Command::new(&self.docker_bin);
        command.args(args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(AppError::RuntimeUnavailable(format!(
                    "failed to execute {}: {e}",
                    self.docker_bin
                )))
            }
            Err(_) => {
                return Err(AppError::RuntimeUnavailable(format!(
                    "`{} {rendered}` timed out after {}s",
                    self.docker_bin,
                    self.timeout.as_secs()
                )))
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run a docker subcommand against one container, classifying failures.
    async fn run_for(&self, service_id: &str, args: &[&str]) -> Result<String, AppError> {
        let output = self.run(args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(classify_failure(service_id, &output.stderr))
        }
    }

    async fn inspect(&self, service_id: &str, format: &str) -> Result<String, AppError> {
        self.run_for(
            service_id,
            &["inspect", "--type", "container", "--format", format, service_id],
        )
        .await
    }
}

impl ContainerRuntime for DockerRuntime {
    async fn egress_counter(&self, service_id: &str) -> Result<u64, AppError> {
        let pid = running_pid(service_id, &self.inspect(service_id, PID_FORMAT).await?)?;

        let path = self.proc_root.join(pid.to_string()).join("net").join("dev");
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            AppError::RuntimeUnavailable(format!("failed to read {}: {e}", path.display()))
        })?;

        net_dev::egress_bytes(&contents, &self.interfaces).ok_or_else(|| {
            AppError::RuntimeUnavailable(format!(
                "no counted interfaces in {}",
                path.display()
            ))
        })
    }

    async fn started_at(&self, service_id: &str) -> Result<DateTime<Utc>, AppError> {
        parse_started_at(&self.inspect(service_id, STARTED_AT_FORMAT).await?)
    }

    async fn stop(&self, service_id: &str) -> Result<(), AppError> {
        self.run_for(service_id, &["stop", service_id]).await.map(|_| ())
    }

    async fn start(&self, service_id: &str) -> Result<(), AppError> {
        self.run_for(service_id, &["start", service_id]).await.map(|_| ())
    }
}

fn classify_failure(service_id: &str, stderr: &str) -> AppError {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("no such object") || lowered.contains("no such container") {
        AppError::UnknownService(service_id.to_string())
    } else if stderr.is_empty() {
        AppError::RuntimeUnavailable(format!(
            "docker exited with an error for {}",
            short_id(service_id)
        ))
    } else {
        AppError::RuntimeUnavailable(stderr.to_string())
    }
}

fn parse_pid(raw: &str) -> Result<u32, AppError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| AppError::RuntimeUnavailable(format!("unexpected container pid {raw:?}: {e}")))
}

/// Docker reports pid 0 for a created or stopped container.
fn running_pid(service_id: &str, raw: &str) -> Result<u32, AppError> {
    match parse_pid(raw)? {
        0 => Err(AppError::ContainerNotRunning(short_id(service_id).to_string())),
        pid => Ok(pid),
    }
}

fn parse_started_at(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::RuntimeUnavailable(format!("unexpected start time {raw:?}: {e}")))
}
