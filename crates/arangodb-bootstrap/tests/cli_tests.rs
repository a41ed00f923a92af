//! Invocation surface: flag parsing, exit codes and dry runs.

use arangodb_bootstrap::cli::{Cli, parse_exit_code};
use arangodb_bootstrap::{BootstrapConfig, Permission, bootstrap::dry_run_scripts, template};
use clap::Parser;
use std::io::Write;

#[test]
fn test_unknown_flag_is_usage_error() {
    let err = Cli::try_parse_from(["arangodb-bootstrap", "--databse", "x"]).unwrap_err();
    assert_eq!(parse_exit_code(&err), 1);
}

#[test]
fn test_help_and_version_succeed() {
    for flag in ["--help", "--version"] {
        let err = Cli::try_parse_from(["arangodb-bootstrap", flag]).unwrap_err();
        assert_eq!(parse_exit_code(&err), 0, "{flag}");
    }
}

#[test]
fn test_file_then_flags() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{ "database": "from_file", "username": "file_user", "permission": "none" }}"#
    )
    .unwrap();

    let mut config = BootstrapConfig::load_layers(Some(file.path()), None).unwrap();
    let cli = Cli::try_parse_from(["arangodb-bootstrap", "--user", "flag_user"]).unwrap();
    config.apply_cli(&cli);

    assert_eq!(config.database, "from_file");
    assert_eq!(config.username, "flag_user");
    assert_eq!(config.permission, Permission::None);
}

#[test]
fn test_dry_run_scripts_are_fully_rendered() {
    let config = BootstrapConfig {
        database: "alpha".to_string(),
        seed: true,
        ..BootstrapConfig::default()
    };

    for script in dry_run_scripts(&config) {
        assert!(
            template::placeholders(&script.body).is_empty(),
            "{} left placeholders",
            script.name
        );
        assert!(script.body.contains("alpha"));
        assert_eq!(script.body.matches("${DB_NAME}").count(), 0);
    }
}
