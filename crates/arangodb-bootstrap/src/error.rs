//! Error types for the bootstrap procedure

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Bootstrap errors with enough context to tell the operator where to look
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The container never reported ready within the attempt budget
    #[error(
        "Container '{target}' did not become ready after {attempts} attempts ({waited:?}). \
         Check the container logs with: {log_hint}"
    )]
    ReadinessTimeout {
        target: String,
        attempts: u32,
        waited: Duration,
        log_hint: String,
    },

    /// The readiness wait was interrupted by the operator
    #[error("Interrupted while waiting for container '{target}' (after {attempts} attempts)")]
    Cancelled { target: String, attempts: u32 },

    /// The provisioning script exited non-zero
    #[error(
        "Provisioning of database '{database}' failed (exit code {exit_code}). \
         Check the container logs with: {log_hint}"
    )]
    ProvisionFailed {
        database: String,
        exit_code: i32,
        log_hint: String,
    },

    /// The container runtime could not be invoked or returned garbage
    #[error("Container runtime error: {0}")]
    Runtime(String),

    /// Invalid invocation options
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::ReadinessTimeout { .. } => vec![
                "Check that the container is running (docker ps --all)",
                "Start it with: docker compose up -d",
                "Increase the budget with --max-attempts or --poll-interval",
            ],
            Self::ProvisionFailed { .. } => vec![
                "Verify the root password matches ARANGO_ROOT_PASSWORD of the container",
                "Re-run with -vv to see the script output",
            ],
            Self::Runtime(_) => vec![
                "Check that the container runtime is installed and on PATH",
                "Use --runtime to select docker or podman explicitly",
            ],
            Self::InvalidArguments(_) | Self::Config(_) => vec![
                "Use --help to see the accepted options",
                "Check the config file and ARANGO_BOOTSTRAP__* environment variables",
            ],
            _ => vec![],
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ReadinessTimeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled { .. } => ErrorCategory::Interrupted,
            Self::ProvisionFailed { .. } => ErrorCategory::Provisioning,
            Self::Runtime(_) => ErrorCategory::Runtime,
            Self::InvalidArguments(_) => ErrorCategory::User,
            Self::Config(_) => ErrorCategory::Config,
            Self::Json(_) | Self::Yaml(_) => ErrorCategory::Parsing,
            Self::Io(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    Interrupted,
    Provisioning,
    Runtime,
    User,
    Config,
    Parsing,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Timeout"),
            Self::Interrupted => write!(f, "Interrupted"),
            Self::Provisioning => write!(f, "Provisioning"),
            Self::Runtime => write!(f, "Container Runtime"),
            Self::User => write!(f, "User Input"),
            Self::Config => write!(f, "Configuration"),
            Self::Parsing => write!(f, "Parsing"),
            Self::System => write!(f, "System"),
        }
    }
}

/// Result type for bootstrap operations
pub type BootstrapResult<T> = Result<T, BootstrapError>;
