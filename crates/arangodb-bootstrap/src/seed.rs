//! Optional sample data.
//!
//! Seeding is best effort: whatever goes wrong is reported as
//! [`SeedStatus::Failed`] and never aborts the bootstrap.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::runtime::ScriptContext;
use crate::template::{Bindings, TemplatedCommandRunner, escape_js_string, parse_result_line};

/// Script inserting a [`SeedBatch`], see `templates/seed.js`.
pub const SEED_TEMPLATE: &str = include_str!("../templates/seed.js");

/// Collection the sample records go to unless configured otherwise.
pub const DEFAULT_SEED_COLLECTION: &str = "users";

/// Records to insert into one collection. Each record has a fixed `_key`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedBatch {
    pub collection: String,
    pub records: Vec<Value>,
}

impl SeedBatch {
    /// The sample users shipped with the workshop material.
    pub fn sample(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: vec![
                json!({ "_key": "alice", "name": "Alice", "email": "alice@example.com", "role": "admin" }),
                json!({ "_key": "bob", "name": "Bob", "email": "bob@example.com", "role": "developer" }),
                json!({ "_key": "carol", "name": "Carol", "email": "carol@example.com", "role": "analyst" }),
            ],
        }
    }

    pub fn bindings(&self, database: &str) -> Bindings {
        Bindings::from([
            ("DB_NAME".to_string(), escape_js_string(database)),
            ("COLLECTION".to_string(), escape_js_string(&self.collection)),
            // JSON array literal, valid JavaScript as is
            ("RECORDS".to_string(), Value::Array(self.records.clone()).to_string()),
        ])
    }
}

/// How the seeding step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedStatus {
    /// Seeding was not requested
    Skipped,
    /// `inserted` is absent when the script printed no result line
    Seeded {
        collection: String,
        inserted: Option<u64>,
    },
    /// `exit_code` is absent when the script never ran
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
}

impl SeedStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Deserialize)]
struct ScriptReport {
    inserted: u64,
}

/// Run `batch` against `database`. Never fails; see [`SeedStatus`].
pub async fn seed(
    runner: &TemplatedCommandRunner<'_>,
    root: &ScriptContext,
    batch: &SeedBatch,
    database: &str,
) -> SeedStatus {
    info!(collection = %batch.collection, database, records = batch.records.len(), "seeding");

    let result = match runner
        .render_and_submit("seed", SEED_TEMPLATE, &batch.bindings(database), root)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "seed script could not be submitted");
            return SeedStatus::Failed {
                exit_code: None,
                message: e.to_string(),
            };
        }
    };

    if !result.success() {
        warn!(exit_code = result.exit_code, stderr = %result.stderr.trim(), "seed script failed");
        return SeedStatus::Failed {
            exit_code: Some(result.exit_code),
            message: format!(
                "seed script exited with code {}; check: {}",
                result.exit_code,
                runner.log_hint()
            ),
        };
    }

    let inserted = parse_result_line::<ScriptReport>(&result.stdout).map(|r| r.inserted);
    if inserted.is_none() {
        warn!("seed script printed no result line");
    }
    SeedStatus::Seeded {
        collection: batch.collection.clone(),
        inserted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BootstrapResult;
    use crate::runtime::{ContainerRuntime, ExecOutput};
    use crate::template::{placeholders, render, with_script_path};
    use async_trait::async_trait;
    use std::path::Path;

    #[test]
    fn test_sample_records_have_keys() {
        let batch = SeedBatch::sample(DEFAULT_SEED_COLLECTION);
        assert_eq!(batch.records.len(), 3);
        assert!(batch.records.iter().all(|r| r["_key"].is_string()));
    }

    #[test]
    fn test_seed_template_fully_bound() {
        let batch = SeedBatch::sample("people");
        let bindings = with_script_path(&batch.bindings("alpha"), "/tmp/seed-1.js");
        let script = render(SEED_TEMPLATE, &bindings);
        assert!(placeholders(&script).is_empty());
        assert!(script.contains(r#"const dbName = "alpha";"#));
        assert!(script.contains(r#"const collectionName = "people";"#));
        assert!(script.contains(r#""_key":"alice""#));
    }

    /// Accepts any script and answers with a fixed result.
    struct Answer(ExecOutput);

    #[async_trait]
    impl ContainerRuntime for Answer {
        async fn status(&self, _target: &str) -> BootstrapResult<String> {
            Ok("Up".to_string())
        }

        async fn copy_into(&self, _: &str, _: &Path, _: &str) -> BootstrapResult<()> {
            Ok(())
        }

        async fn exec_script(
            &self,
            _: &str,
            _: &str,
            _: &ScriptContext,
        ) -> BootstrapResult<ExecOutput> {
            Ok(self.0.clone())
        }
    }

    async fn seed_against(output: ExecOutput) -> SeedStatus {
        let runtime = Answer(output);
        let runner = TemplatedCommandRunner::new(&runtime, "arango", "/tmp");
        seed(
            &runner,
            &ScriptContext::system("pw"),
            &SeedBatch::sample("people"),
            "alpha",
        )
        .await
    }

    #[tokio::test]
    async fn test_count_from_result_line() {
        let status = seed_against(ExecOutput {
            stdout: "Inserted 2 of 3\n@@bootstrap {\"collection\":\"people\",\"inserted\":2}\n"
                .to_string(),
            ..ExecOutput::default()
        })
        .await;
        assert_eq!(
            status,
            SeedStatus::Seeded {
                collection: "people".to_string(),
                inserted: Some(2)
            }
        );
    }

    #[tokio::test]
    async fn test_missing_result_line_leaves_count_unknown() {
        let status = seed_against(ExecOutput::default()).await;
        assert_eq!(
            status,
            SeedStatus::Seeded {
                collection: "people".to_string(),
                inserted: None
            }
        );
        assert!(!status.is_failure());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() {
        let status = seed_against(ExecOutput {
            exit_code: 4,
            ..ExecOutput::default()
        })
        .await;
        assert!(matches!(status, SeedStatus::Failed { exit_code: Some(4), .. }));
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let failed = SeedStatus::Failed {
            exit_code: Some(1),
            message: "boom".to_string(),
        };
        assert!(failed.is_failure());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["exit_code"], 1);
        assert!(!SeedStatus::Skipped.is_failure());
    }
}
