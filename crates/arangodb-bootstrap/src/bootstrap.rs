//! The bootstrap procedure.
//!
//! ```text
//! WAITING ──> PROVISIONING ──> [SEEDING] ──> DONE
//!    │              │
//!    └──────────────┴──> ABORTED
//! ```
//!
//! A readiness timeout or a failed provisioning script aborts the run. A
//! failed seeding step still ends in `DONE`, with the warning flag set.

use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::BootstrapConfig;
use crate::error::BootstrapResult;
use crate::output::Reporter;
use crate::provision::{IdempotentProvisioner, PROVISION_TEMPLATE, ProvisionOutcome};
use crate::readiness::{ReadinessWaiter, ReadyResult};
use crate::runtime::ContainerRuntime;
use crate::seed::{self, SEED_TEMPLATE, SeedBatch, SeedStatus};
use crate::template::{TemplatedCommandRunner, render, with_script_path};

/// Procedure states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Waiting,
    Provisioning,
    Seeding,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "WAITING",
            Self::Provisioning => "PROVISIONING",
            Self::Seeding => "SEEDING",
            Self::Done => "DONE",
            Self::Aborted => "ABORTED",
        })
    }
}

/// Connection settings an MCP server needs afterwards. No secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub url: String,
    pub database: String,
    pub username: String,
}

/// Everything a successful run did.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub container: String,
    pub ready: ReadyResult,
    pub provision: ProvisionOutcome,
    pub seed: SeedStatus,
    /// Set when a best-effort step failed
    pub warning: bool,
    pub phases: Vec<Phase>,
    pub connection: ConnectionInfo,
}

/// A script as it would be submitted, secrets masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedScript {
    pub name: &'static str,
    pub body: String,
}

/// Records phase transitions.
#[derive(Debug, Default)]
struct PhaseLog {
    phases: Vec<Phase>,
}

impl PhaseLog {
    fn enter(&mut self, phase: Phase) {
        match self.phases.last() {
            Some(from) => info!(from = %from, to = %phase, "phase transition"),
            None => info!(to = %phase, "phase transition"),
        }
        self.phases.push(phase);
    }
}

/// Runs the procedure against one container runtime.
pub struct Bootstrap<'a> {
    runtime: &'a dyn ContainerRuntime,
    config: &'a BootstrapConfig,
    reporter: &'a Reporter,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        config: &'a BootstrapConfig,
        reporter: &'a Reporter,
    ) -> Self {
        Self {
            runtime,
            config,
            reporter,
        }
    }

    /// Wait, provision and optionally seed.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the procedure to `ABORTED`: invalid
    /// configuration, readiness timeout or cancellation, or a provisioning
    /// failure. Seeding problems are reported in the result instead.
    pub async fn run(&self, cancel: &CancellationToken) -> BootstrapResult<BootstrapReport> {
        let mut log = PhaseLog::default();
        let result = self.run_phases(&mut log, cancel).await;
        if let Err(e) = &result {
            log.enter(Phase::Aborted);
            error!(error = %e, phases = ?log.phases, "bootstrap aborted");
        }
        result
    }

    async fn run_phases(
        &self,
        log: &mut PhaseLog,
        cancel: &CancellationToken,
    ) -> BootstrapResult<BootstrapReport> {
        let config = self.config;
        config.validate()?;
        let waiter = ReadinessWaiter::new(config.max_attempts, config.poll_interval())?;

        log.enter(Phase::Waiting);
        let ready = waiter
            .wait_until_ready(self.runtime, &config.container, self.reporter, cancel)
            .await?;
        self.reporter.success(&format!(
            "Container '{}' is ready ({})",
            config.container, ready.status
        ));

        log.enter(Phase::Provisioning);
        let runner =
            TemplatedCommandRunner::new(self.runtime, &config.container, &config.remote_dir);
        let root = config.root_context();
        let provision = IdempotentProvisioner::new(&runner, root.clone())
            .ensure_database_and_principal(&config.provisioning_request())
            .await?;
        self.reporter.success(&format!(
            "Database '{}' {}, user '{}' {}, permission '{}' granted",
            provision.database,
            provision.database_state,
            provision.username,
            provision.principal_state,
            provision.permission
        ));

        let seed = if config.seed {
            log.enter(Phase::Seeding);
            let batch = SeedBatch::sample(&config.seed_collection);
            let status = seed::seed(&runner, &root, &batch, &config.database).await;
            match &status {
                SeedStatus::Seeded {
                    collection,
                    inserted: Some(inserted),
                } => self.reporter.success(&format!(
                    "Seeded '{}' ({} new records)",
                    collection, inserted
                )),
                SeedStatus::Seeded { collection, .. } => self
                    .reporter
                    .success(&format!("Seeded '{collection}'")),
                SeedStatus::Failed { message, .. } => {
                    warn!(%message, "seeding failed, continuing");
                    self.reporter
                        .warning(&format!("Sample data was not loaded: {message}"));
                }
                SeedStatus::Skipped => {}
            }
            status
        } else {
            SeedStatus::Skipped
        };

        log.enter(Phase::Done);
        Ok(BootstrapReport {
            container: config.container.clone(),
            ready,
            warning: seed.is_failure(),
            provision,
            seed,
            phases: log.phases.clone(),
            connection: ConnectionInfo {
                url: config.host_url.clone(),
                database: config.database.clone(),
                username: config.username.clone(),
            },
        })
    }
}

/// The scripts a run with `config` would submit, with passwords masked.
///
/// Real runs stage each script under a random name; here the path is
/// `<remote_dir>/<name>.js`.
pub fn dry_run_scripts(config: &BootstrapConfig) -> Vec<RenderedScript> {
    let remote = |name: &str| format!("{}/{name}.js", config.remote_dir.trim_end_matches('/'));

    let mut scripts = vec![RenderedScript {
        name: "provision",
        body: render(
            PROVISION_TEMPLATE,
            &with_script_path(
                &config.provisioning_request().redacted_bindings(),
                &remote("provision"),
            ),
        ),
    }];
    if config.seed {
        let batch = SeedBatch::sample(&config.seed_collection);
        scripts.push(RenderedScript {
            name: "seed",
            body: render(
                SEED_TEMPLATE,
                &with_script_path(&batch.bindings(&config.database), &remote("seed")),
            ),
        });
    }
    scripts
}
