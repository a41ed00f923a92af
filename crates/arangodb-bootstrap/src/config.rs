//! Bootstrap configuration.
//!
//! Values are layered, lowest priority first:
//!
//! 1. built-in defaults ([`BootstrapConfig::default`])
//! 2. a config file (TOML, YAML or JSON, picked by extension)
//! 3. `ARANGO_BOOTSTRAP__*` environment variables
//! 4. command-line flags ([`BootstrapConfig::apply_cli`])
//!
//! Without `--config`, `<config_dir>/arangodb-bootstrap/config.toml` is read
//! when it exists.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{BootstrapError, BootstrapResult};
use crate::provision::{Permission, ProvisioningRequest};
use crate::runtime::ScriptContext;
use crate::seed::DEFAULT_SEED_COLLECTION;

/// Prefix of environment overrides, e.g. `ARANGO_BOOTSTRAP__MAX_ATTEMPTS=60`.
pub const ENV_PREFIX: &str = "ARANGO_BOOTSTRAP";

pub const DEFAULT_CONTAINER: &str = "mcp_arangodb_test";
pub const DEFAULT_ROOT_PASSWORD: &str = "changeme";
pub const DEFAULT_DATABASE: &str = "mcp_arangodb_test";
pub const DEFAULT_USERNAME: &str = "mcp_arangodb_user";
pub const DEFAULT_PASSWORD: &str = "mcp_arangodb_password";

/// Everything one bootstrap run needs, passed explicitly to each component.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Container name
    pub container: String,
    /// Container runtime binary (`docker`, `podman`)
    pub runtime: String,
    /// Server endpoint as seen from inside the container
    pub endpoint: String,
    /// URL clients on the host use, printed in the summary
    pub host_url: String,
    pub root_password: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub permission: Permission,
    pub seed: bool,
    pub seed_collection: String,
    pub max_attempts: u32,
    pub poll_interval_secs: u64,
    /// Directory inside the container where scripts are staged
    pub remote_dir: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            runtime: "docker".to_string(),
            endpoint: "tcp://127.0.0.1:8529".to_string(),
            host_url: "http://localhost:8529".to_string(),
            root_password: DEFAULT_ROOT_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            permission: Permission::ReadWrite,
            seed: false,
            seed_collection: DEFAULT_SEED_COLLECTION.to_string(),
            max_attempts: 30,
            poll_interval_secs: 2,
            remote_dir: "/tmp".to_string(),
        }
    }
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("container", &self.container)
            .field("runtime", &self.runtime)
            .field("endpoint", &self.endpoint)
            .field("host_url", &self.host_url)
            .field("root_password", &"<redacted>")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("permission", &self.permission)
            .field("seed", &self.seed)
            .field("seed_collection", &self.seed_collection)
            .field("max_attempts", &self.max_attempts)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("remote_dir", &self.remote_dir)
            .finish()
    }
}

impl BootstrapConfig {
    /// Load defaults, then `path` (or the default file if present), then
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `path` does not exist, has an
    /// unsupported extension, or any layer fails to parse.
    pub fn load(path: Option<&Path>) -> BootstrapResult<Self> {
        let file = match path {
            Some(path) if !path.exists() => {
                return Err(BootstrapError::InvalidArguments(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        Self::load_layers(file.as_deref(), Some(ENV_PREFIX))
    }

    /// Layer loading with an explicit env prefix; `None` skips the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file has an unsupported extension or a layer
    /// fails to parse.
    pub fn load_layers(file: Option<&Path>, env_prefix: Option<&str>) -> BootstrapResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = file {
            let format = match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml" | "yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => {
                    return Err(BootstrapError::InvalidArguments(format!(
                        "Unsupported configuration file format: {}. Use .toml, .yaml, .yml, or .json",
                        path.display()
                    )));
                }
            };
            builder = builder.add_source(File::from(path).format(format));
        }

        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Apply explicit command-line values on top of the loaded layers.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.container {
            self.container.clone_from(v);
        }
        if let Some(v) = &cli.runtime {
            self.runtime.clone_from(v);
        }
        if let Some(v) = &cli.root_password {
            self.root_password.clone_from(v);
        }
        if let Some(v) = &cli.db_name {
            self.database.clone_from(v);
        }
        if let Some(v) = &cli.user {
            self.username.clone_from(v);
        }
        if let Some(v) = &cli.password {
            self.password.clone_from(v);
        }
        if let Some(v) = cli.permission {
            self.permission = v;
        }
        if let Some(v) = cli.max_attempts {
            self.max_attempts = v;
        }
        if let Some(v) = cli.poll_interval {
            self.poll_interval_secs = v;
        }
        self.seed |= cli.seed;
    }

    /// Reject values no run can succeed with.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidArguments`] naming the first bad field.
    pub fn validate(&self) -> BootstrapResult<()> {
        let required = [
            ("container", &self.container),
            ("runtime", &self.runtime),
            ("database", &self.database),
            ("username", &self.username),
            ("seed_collection", &self.seed_collection),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(BootstrapError::InvalidArguments(format!(
                "{name} must not be empty"
            )));
        }
        if self.max_attempts == 0 {
            return Err(BootstrapError::InvalidArguments(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn provisioning_request(&self) -> ProvisioningRequest {
        ProvisioningRequest {
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            permission: self.permission,
        }
    }

    pub fn root_context(&self) -> ScriptContext {
        ScriptContext::system(&self.root_password)
    }
}

/// `<config_dir>/arangodb-bootstrap/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("arangodb-bootstrap").join("config.toml"))
}
