//! Container runtime access.
//!
//! The bootstrap procedure only needs three calls from the runtime hosting
//! ArangoDB: a status query, a file copy into the container, and script
//! execution through `arangosh`. [`ContainerRuntime`] is that seam;
//! [`DockerCli`] implements it by shelling out to `docker` (or any CLI with
//! the same verbs, such as `podman`).

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BootstrapError, BootstrapResult};

/// Credentials and database an `arangosh` script runs with.
#[derive(Clone)]
pub struct ScriptContext {
    pub username: String,
    pub password: String,
    pub database: String,
}

impl ScriptContext {
    /// Root context against `_system`.
    pub fn system(root_password: &str) -> Self {
        Self {
            username: "root".to_string(),
            password: root_password.to_string(),
            database: "_system".to_string(),
        }
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Result of a remote script execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Administrative interface of the process hosting the database.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Free-text status of `target`, empty when no such container exists.
    async fn status(&self, target: &str) -> BootstrapResult<String>;

    /// Stage a local file at `remote` inside `target`.
    async fn copy_into(&self, target: &str, local: &Path, remote: &str) -> BootstrapResult<()>;

    /// Run the script at `remote` inside `target` and wait for it to exit.
    async fn exec_script(
        &self,
        target: &str,
        remote: &str,
        ctx: &ScriptContext,
    ) -> BootstrapResult<ExecOutput>;

    /// Command an operator should run to read the target's logs.
    fn log_hint(&self, target: &str) -> String {
        format!("docker logs {target}")
    }
}

/// [`ContainerRuntime`] backed by the docker command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    endpoint: String,
}

impl DockerCli {
    /// Default server endpoint as seen from inside the container.
    pub const DEFAULT_ENDPOINT: &'static str = "tcp://127.0.0.1:8529";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for the status query of `target`.
    fn status_args(target: &str) -> Vec<String> {
        vec![
            "ps".to_string(),
            "--all".to_string(),
            "--filter".to_string(),
            format!("name=^/?{target}$"),
            "--format".to_string(),
            "{{.Status}}".to_string(),
        ]
    }

    /// Arguments for running `remote` through arangosh inside `target`.
    fn exec_args(&self, target: &str, remote: &str, ctx: &ScriptContext) -> Vec<String> {
        vec![
            "exec".to_string(),
            target.to_string(),
            "arangosh".to_string(),
            "--server.endpoint".to_string(),
            self.endpoint.clone(),
            "--server.username".to_string(),
            ctx.username.clone(),
            "--server.password".to_string(),
            ctx.password.clone(),
            "--server.database".to_string(),
            ctx.database.clone(),
            "--javascript.execute".to_string(),
            remote.to_string(),
        ]
    }

    async fn output(&self, args: &[String]) -> BootstrapResult<std::process::Output> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                BootstrapError::Runtime(format!("Failed to execute {}: {}", self.program, e))
            })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn status(&self, target: &str) -> BootstrapResult<String> {
        let output = self.output(&Self::status_args(target)).await?;
        if !output.status.success() {
            return Err(BootstrapError::Runtime(format!(
                "{} ps failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn copy_into(&self, target: &str, local: &Path, remote: &str) -> BootstrapResult<()> {
        let args = vec![
            "cp".to_string(),
            local.to_string_lossy().into_owned(),
            format!("{target}:{remote}"),
        ];
        let output = self.output(&args).await?;
        if !output.status.success() {
            return Err(BootstrapError::Runtime(format!(
                "{} cp into '{}' failed: {}",
                self.program,
                target,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn exec_script(
        &self,
        target: &str,
        remote: &str,
        ctx: &ScriptContext,
    ) -> BootstrapResult<ExecOutput> {
        debug!(target, remote, ?ctx, "executing script");
        let output = self.output(&self.exec_args(target, remote, ctx)).await?;

        let result = ExecOutput {
            // Killed by a signal: no code to report.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(exit_code = result.exit_code, stdout = %result.stdout.trim(), "script finished");
        Ok(result)
    }

    fn log_hint(&self, target: &str) -> String {
        format!("{} logs {}", self.program, target)
    }
}
