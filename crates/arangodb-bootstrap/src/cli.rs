//! CLI argument parsing

use clap::error::ErrorKind;
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::provision::Permission;

/// Main CLI application structure
#[derive(Parser, Debug, Clone)]
#[command(
    name = "arangodb-bootstrap",
    version,
    about = "Wait for an ArangoDB container and provision its database and user",
    long_about = "Waits until the ArangoDB container reports ready, then idempotently creates\n\
                  the database, creates or updates the user and grants it access.\n\
                  With --seed, a sample collection is filled on a best-effort basis.\n\n\
                  Running it again with the same options leaves the server unchanged.\n\n\
                  SECURITY WARNING:\n\
                  - Passwords are passed to arangosh on its command line inside the container\n\
                  - Prefer environment variables or a config file over flags for secrets"
)]
pub struct Cli {
    /// Root password of the ArangoDB server
    #[arg(long, env = "ARANGO_ROOT_PASSWORD", hide_env_values = true)]
    pub root_password: Option<String>,

    /// Database to create
    #[arg(long = "db-name", env = "ARANGO_DB")]
    pub db_name: Option<String>,

    /// User to create or update
    #[arg(long, env = "ARANGO_USERNAME")]
    pub user: Option<String>,

    /// Password to set for the user
    #[arg(long, env = "ARANGO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Access level granted on the database
    #[arg(long, value_enum)]
    pub permission: Option<Permission>,

    /// Insert sample records after provisioning
    #[arg(long)]
    pub seed: bool,

    /// Name of the ArangoDB container
    #[arg(long, env = "ARANGO_CONTAINER")]
    pub container: Option<String>,

    /// Container runtime binary (docker, podman)
    #[arg(long, env = "CONTAINER_RUNTIME")]
    pub runtime: Option<String>,

    /// Readiness checks before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds between readiness checks
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Config file (TOML, YAML or JSON)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Output format of the final report
    #[arg(long, short = 'f', value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Print the scripts that would run, with secrets masked, and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Output formats
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable with colors
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Exit code for a failed parse: help and version are not failures.
pub fn parse_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}
