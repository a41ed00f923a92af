//! Operator-facing output

use std::sync::{Arc, Mutex};

use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::bootstrap::{BootstrapReport, RenderedScript};
use crate::cli::OutputFormat;
use crate::error::{BootstrapError, BootstrapResult};
use crate::seed::SeedStatus;

/// Prints progress lines and the final report.
///
/// In machine formats (JSON, YAML) stdout carries only the report; progress
/// goes to stderr.
#[derive(Debug, Clone)]
pub struct Reporter {
    format: OutputFormat,
    colored: bool,
    quiet: bool,
    /// When set, progress, success and warning lines are kept here instead
    /// of being printed
    recorded: Option<Arc<Mutex<Vec<String>>>>,
}

impl Reporter {
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool, quiet: bool) -> Self {
        Self {
            format,
            colored,
            quiet,
            recorded: None,
        }
    }

    /// Keeps every line in memory; see [`Self::lines`].
    #[must_use]
    pub fn recording() -> Self {
        Self {
            recorded: Some(Arc::default()),
            ..Self::new(OutputFormat::Human, false, false)
        }
    }

    /// Lines kept by a [`Self::recording`] reporter, in order.
    pub fn lines(&self) -> Vec<String> {
        self.recorded
            .as_ref()
            .and_then(|lines| lines.lock().ok().map(|l| l.to_vec()))
            .unwrap_or_default()
    }

    fn record(&self, text: &str) -> bool {
        match &self.recorded {
            Some(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(text.to_string());
                }
                true
            }
            None => false,
        }
    }

    /// Prints nothing but the final report and errors.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(OutputFormat::Human, false, true)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// One line per readiness attempt
    pub fn progress(&self, text: &str) {
        if self.colored {
            self.line(&text.bright_black().to_string());
        } else {
            self.line(text);
        }
    }

    pub fn success(&self, text: &str) {
        if self.colored {
            self.line(&format!("{} {}", "✓".bright_green().bold(), text));
        } else {
            self.line(&format!("✓ {text}"));
        }
    }

    /// Warnings are shown even in quiet mode.
    pub fn warning(&self, text: &str) {
        if self.record(&format!("Warning: {text}")) {
            return;
        }
        if self.colored {
            eprintln!("{}: {}", "Warning".bright_yellow().bold(), text);
        } else {
            eprintln!("Warning: {text}");
        }
    }

    fn line(&self, text: &str) {
        if self.quiet || self.record(text) {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{text}"),
            OutputFormat::Json | OutputFormat::Yaml => eprintln!("{text}"),
        }
    }

    /// Display the report of a successful run
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized.
    pub fn display_report(&self, report: &BootstrapReport) -> BootstrapResult<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_header("ArangoDB is ready");
                println!("{}", summary_table(report));

                self.print_header("Environment for MCP servers");
                self.print_kv("ARANGO_URL", &report.connection.url);
                self.print_kv("ARANGO_DB", &report.connection.database);
                self.print_kv("ARANGO_USERNAME", &report.connection.username);
                self.print_kv("ARANGO_PASSWORD", "<the --password value>");

                if report.warning {
                    println!();
                    self.warning("Finished with warnings; provisioning itself succeeded");
                }
                Ok(())
            }
            _ => self.display(report),
        }
    }

    /// Display scripts rendered by `--dry-run`
    ///
    /// # Errors
    ///
    /// Returns an error if the scripts cannot be serialized.
    pub fn display_scripts(&self, scripts: &[RenderedScript]) -> BootstrapResult<()> {
        match self.format {
            OutputFormat::Human => {
                for script in scripts {
                    self.print_header(&format!("{}.js", script.name));
                    println!("{}", script.body);
                }
                Ok(())
            }
            _ => self.display(scripts),
        }
    }

    /// Display error with suggestions
    pub fn display_error(&self, error: &BootstrapError) {
        if self.colored {
            eprintln!(
                "{} [{}]: {}",
                "Error".bright_red().bold(),
                error.category(),
                error
            );

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("Error [{}]: {error}", error.category());

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    fn display<T: Serialize + ?Sized>(&self, value: &T) -> BootstrapResult<()> {
        let text = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            _ => serde_json::to_string_pretty(value)?,
        };
        println!("{text}");
        Ok(())
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_cyan().bold());
            println!("{}", "=".repeat(text.len()).bright_cyan());
        } else {
            println!("\n{text}");
            println!("{}", "=".repeat(text.len()));
        }
    }

    fn print_kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("  {}={}", key.bright_green().bold(), value);
        } else {
            println!("  {key}={value}");
        }
    }
}

/// Summary of a run as a table
fn summary_table(report: &BootstrapReport) -> Table {
    let provision = &report.provision;
    let seed = match &report.seed {
        SeedStatus::Skipped => "skipped".to_string(),
        SeedStatus::Seeded {
            collection,
            inserted: Some(inserted),
        } => format!("{collection}: {inserted} new records"),
        SeedStatus::Seeded { collection, .. } => format!("{collection}: seeded"),
        SeedStatus::Failed {
            exit_code: Some(code),
            ..
        } => format!("failed (exit code {code})"),
        SeedStatus::Failed { .. } => "failed".to_string(),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Item", "Value", "State"]);
    table.add_row(vec![
        "Container".to_string(),
        report.container.clone(),
        format!("ready after {} checks", report.ready.attempts),
    ]);
    table.add_row(vec![
        "Database".to_string(),
        provision.database.clone(),
        provision.database_state.to_string(),
    ]);
    table.add_row(vec![
        "User".to_string(),
        provision.username.clone(),
        provision.principal_state.to_string(),
    ]);
    table.add_row(vec![
        "Permission".to_string(),
        provision.permission.to_string(),
        "granted".to_string(),
    ]);
    table.add_row(vec!["Sample data".to_string(), String::new(), seed]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{ConnectionInfo, Phase};
    use crate::provision::{ObjectState, Permission, ProvisionOutcome};
    use crate::readiness::ReadyResult;
    use std::time::Duration;

    fn report(seed: SeedStatus) -> BootstrapReport {
        BootstrapReport {
            container: "arango".to_string(),
            ready: ReadyResult {
                attempts: 3,
                status: "Up 4 seconds".to_string(),
                waited: Duration::from_secs(4),
            },
            provision: ProvisionOutcome {
                database: "alpha".to_string(),
                database_state: ObjectState::AlreadyPresent,
                username: "bob".to_string(),
                principal_state: ObjectState::Created,
                permission: Permission::ReadWrite,
            },
            warning: seed.is_failure(),
            seed,
            phases: vec![Phase::Waiting, Phase::Provisioning, Phase::Done],
            connection: ConnectionInfo {
                url: "http://localhost:8529".to_string(),
                database: "alpha".to_string(),
                username: "bob".to_string(),
            },
        }
    }

    #[test]
    fn test_summary_table_rows() {
        let rendered = summary_table(&report(SeedStatus::Failed {
            exit_code: Some(1),
            message: "boom".to_string(),
        }))
        .to_string();
        assert!(rendered.contains("already present"));
        assert!(rendered.contains("created"));
        assert!(rendered.contains("failed (exit code 1)"));
        assert!(rendered.contains("ready after 3 checks"));
    }

    #[test]
    fn test_report_json_shape() {
        let json = serde_json::to_value(report(SeedStatus::Skipped)).unwrap();
        assert_eq!(json["provision"]["database_state"], "already_present");
        assert_eq!(json["provision"]["permission"], "rw");
        assert_eq!(json["ready"]["waited_secs"], 4.0);
        assert_eq!(json["seed"]["status"], "skipped");
        assert_eq!(json["phases"][2], "DONE");
        assert_eq!(json["warning"], false);
    }

    #[test]
    fn test_summary_without_count() {
        let rendered = summary_table(&report(SeedStatus::Seeded {
            collection: "users".to_string(),
            inserted: None,
        }))
        .to_string();
        assert!(rendered.contains("users: seeded"));
        assert!(!rendered.contains("new records"));
    }

    #[test]
    fn test_recording_reporter_keeps_lines() {
        let reporter = Reporter::recording();
        reporter.progress("one");
        reporter.success("two");
        reporter.warning("three");
        assert_eq!(reporter.lines(), ["one", "✓ two", "Warning: three"]);
        assert!(Reporter::silent().lines().is_empty());
    }

    #[test]
    fn test_reporter_creation() {
        let reporter = Reporter::new(OutputFormat::Json, true, false);
        assert!(reporter.colored);
        assert_eq!(reporter.format(), OutputFormat::Json);
        assert!(Reporter::silent().quiet);
    }
}
