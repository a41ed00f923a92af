//! Idempotent database and user provisioning.
//!
//! One script submission ensures the database exists, upserts the user with
//! the requested password and grants the requested access level. Re-running
//! it against an already provisioned server changes nothing but the
//! password, which is set to the same value again.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BootstrapError, BootstrapResult};
use crate::runtime::ScriptContext;
use crate::template::{Bindings, TemplatedCommandRunner, escape_js_string, parse_result_line};

/// Script creating the database and user, see `templates/provision.js`.
pub const PROVISION_TEMPLATE: &str = include_str!("../templates/provision.js");

/// Access level granted on the database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Permission {
    /// Read and write
    #[default]
    #[value(name = "rw")]
    #[serde(rename = "rw")]
    ReadWrite,
    /// Read only
    #[value(name = "ro")]
    #[serde(rename = "ro")]
    ReadOnly,
    /// Explicitly no access
    #[value(name = "none")]
    #[serde(rename = "none")]
    None,
}

impl Permission {
    /// ArangoDB access level string
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadWrite => "rw",
            Self::ReadOnly => "ro",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired end state of the administrative objects.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub database: String,
    pub username: String,
    pub password: String,
    pub permission: Permission,
}

impl ProvisioningRequest {
    /// Template bindings, escaped for the script's string literals.
    pub fn bindings(&self) -> Bindings {
        self.bindings_with_password(&self.password)
    }

    /// Same as [`Self::bindings`] with the password masked.
    pub fn redacted_bindings(&self) -> Bindings {
        self.bindings_with_password("********")
    }

    fn bindings_with_password(&self, password: &str) -> Bindings {
        Bindings::from([
            ("DB_NAME".to_string(), escape_js_string(&self.database)),
            ("DB_USER".to_string(), escape_js_string(&self.username)),
            ("DB_PASSWORD".to_string(), escape_js_string(password)),
            ("PERMISSION".to_string(), self.permission.as_str().to_string()),
        ])
    }
}

impl fmt::Debug for ProvisioningRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningRequest")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("permission", &self.permission)
            .finish()
    }
}

/// What provisioning did to an administrative object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectState {
    Created,
    AlreadyPresent,
    Updated,
    /// The script succeeded without reporting details
    Ensured,
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::AlreadyPresent => "already present",
            Self::Updated => "updated",
            Self::Ensured => "ensured",
        })
    }
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub database: String,
    pub database_state: ObjectState,
    pub username: String,
    pub principal_state: ObjectState,
    pub permission: Permission,
}

#[derive(Deserialize)]
struct ScriptReport {
    database: ObjectState,
    principal: ObjectState,
}

/// Ensures a database and user exist inside the target container.
pub struct IdempotentProvisioner<'r, 'a> {
    runner: &'r TemplatedCommandRunner<'a>,
    root: ScriptContext,
}

impl<'r, 'a> IdempotentProvisioner<'r, 'a> {
    pub fn new(runner: &'r TemplatedCommandRunner<'a>, root: ScriptContext) -> Self {
        Self { runner, root }
    }

    /// Create the database if missing, upsert the user and grant access.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::ProvisionFailed`] when the script exits
    /// non-zero, or the runtime error when it could not be submitted at all.
    pub async fn ensure_database_and_principal(
        &self,
        request: &ProvisioningRequest,
    ) -> BootstrapResult<ProvisionOutcome> {
        info!(?request, target = self.runner.target(), "provisioning");

        let result = self
            .runner
            .render_and_submit(
                "provision",
                PROVISION_TEMPLATE,
                &request.bindings(),
                &self.root,
            )
            .await?;

        if !result.success() {
            warn!(
                exit_code = result.exit_code,
                stderr = %result.stderr.trim(),
                "provisioning script failed"
            );
            return Err(BootstrapError::ProvisionFailed {
                database: request.database.clone(),
                exit_code: result.exit_code,
                log_hint: self.runner.log_hint(),
            });
        }

        let (database_state, principal_state) =
            match parse_result_line::<ScriptReport>(&result.stdout) {
                Some(report) => (report.database, report.principal),
                None => {
                    warn!("provisioning script printed no result line");
                    (ObjectState::Ensured, ObjectState::Ensured)
                }
            };

        info!(
            database = %request.database,
            %database_state,
            username = %request.username,
            %principal_state,
            permission = %request.permission,
            "provisioning complete"
        );

        Ok(ProvisionOutcome {
            database: request.database.clone(),
            database_state,
            username: request.username.clone(),
            principal_state,
            permission: request.permission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{placeholders, render, with_script_path};

    fn request() -> ProvisioningRequest {
        ProvisioningRequest {
            database: "mcp_arangodb_test".to_string(),
            username: "mcp_arangodb_user".to_string(),
            password: r#"p"w\d"#.to_string(),
            permission: Permission::ReadWrite,
        }
    }

    #[test]
    fn test_template_fully_bound() {
        let bindings = with_script_path(&request().bindings(), "/tmp/provision-1.js");
        let script = render(PROVISION_TEMPLATE, &bindings);
        assert!(placeholders(&script).is_empty());
        assert!(script.contains("fs.remove(scriptPath)"));
        assert!(script.contains(r#"const dbName = "mcp_arangodb_test";"#));
        assert!(script.contains(r#"const userPassword = "p\"w\\d";"#));
        assert!(script.contains(r#"const permission = "rw";"#));
    }

    #[test]
    fn test_redacted_bindings_hide_password() {
        let script = render(PROVISION_TEMPLATE, &request().redacted_bindings());
        assert!(!script.contains("p\\\"w"));
        assert!(script.contains("********"));
    }

    #[test]
    fn test_request_debug_redacts_password() {
        let rendered = format!("{:?}", request());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("p\\\"w"));
    }

    #[test]
    fn test_permission_strings() {
        assert_eq!(Permission::default(), Permission::ReadWrite);
        assert_eq!(Permission::ReadOnly.to_string(), "ro");
        assert_eq!(
            Permission::from_str("none", false).unwrap(),
            Permission::None
        );
        let parsed: Permission = serde_json::from_str("\"ro\"").unwrap();
        assert_eq!(parsed, Permission::ReadOnly);
    }

    #[test]
    fn test_script_report_parses() {
        let report: ScriptReport =
            parse_result_line(r#"@@bootstrap {"database":"already_present","principal":"created"}"#)
                .unwrap();
        assert_eq!(report.database, ObjectState::AlreadyPresent);
        assert_eq!(report.principal, ObjectState::Created);
    }
}
