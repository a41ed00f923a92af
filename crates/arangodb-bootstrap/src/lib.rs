//! # arangodb-bootstrap
//!
//! Brings a freshly started ArangoDB container into the state the MCP
//! database servers expect:
//!
//! - waits until the container reports ready, within a bounded budget
//! - creates the database if it is missing
//! - creates or updates the user and grants it access to the database
//! - optionally loads a small sample collection (best effort)
//!
//! Every step is idempotent, so the tool can be re-run at any time.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: container, database mcp_arangodb_test, user mcp_arangodb_user
//! arangodb-bootstrap
//!
//! # Custom names, with sample data
//! arangodb-bootstrap --db-name shop --user shop_app --password s3cret --seed
//!
//! # Show what would run
//! arangodb-bootstrap --dry-run
//! ```
//!
//! Exit code 0 means the database and user are ready; 1 means the container
//! never became ready, provisioning failed or the options were invalid.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod provision;
pub mod readiness;
pub mod runtime;
pub mod seed;
pub mod template;

use std::io::IsTerminal;

use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

pub use bootstrap::{Bootstrap, BootstrapReport, Phase};
pub use cli::{Cli, OutputFormat};
pub use config::BootstrapConfig;
pub use error::{BootstrapError, BootstrapResult};
pub use output::Reporter;
pub use provision::{IdempotentProvisioner, ObjectState, Permission, ProvisioningRequest};
pub use readiness::{ReadinessWaiter, ReadyResult};
pub use runtime::{ContainerRuntime, DockerCli, ExecOutput, ScriptContext};
pub use seed::{SeedBatch, SeedStatus};
pub use template::{TemplatedCommandRunner, render};

/// Run the tool for parsed arguments and return the process exit code.
pub async fn run(cli: Cli) -> u8 {
    init_tracing(cli.verbose, cli.quiet);

    let colored = !cli.no_color && std::io::stdout().is_terminal();
    let reporter = Reporter::new(cli.format, colored, cli.quiet);

    let result = execute(&cli, &reporter).await;
    if let Err(e) = &result {
        reporter.display_error(e);
    }
    exit_code(&result)
}

/// Exit code for the outcome of a run.
pub fn exit_code<T>(result: &BootstrapResult<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

async fn execute(cli: &Cli, reporter: &Reporter) -> BootstrapResult<()> {
    let mut config = BootstrapConfig::load(cli.config.as_deref())?;
    config.apply_cli(cli);
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");

    if cli.dry_run {
        return reporter.display_scripts(&bootstrap::dry_run_scripts(&config));
    }

    let runtime = DockerCli::new(&config.runtime).with_endpoint(&config.endpoint);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = Bootstrap::new(&runtime, &config, reporter)
        .run(&cancel)
        .await?;
    reporter.display_report(&report)
}

/// Initialize the stderr tracing subscriber; `RUST_LOG` takes precedence.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // Ignore the error: a subscriber may already be installed (tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
