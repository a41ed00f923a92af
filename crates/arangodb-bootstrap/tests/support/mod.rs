//! In-memory stand-in for an ArangoDB container.
//!
//! Staged scripts are "executed" by reading the `const` bindings from their
//! header and applying the same create/upsert/grant/insert rules the real
//! scripts follow, so end state can be asserted across runs. A script that
//! runs removes its own staged copy, as the real ones do.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arangodb_bootstrap::{BootstrapError, BootstrapResult, ContainerRuntime, ExecOutput, ScriptContext};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct ArangoState {
    /// Status answers; the last one repeats
    pub statuses: Vec<String>,
    pub status_calls: usize,
    pub root_password: String,
    pub databases: BTreeSet<String>,
    /// user -> password
    pub users: BTreeMap<String, String>,
    /// (user, database) -> access level
    pub grants: BTreeMap<(String, String), String>,
    /// (database, collection) -> document keys
    pub collections: BTreeMap<(String, String), BTreeSet<String>>,
    /// remote path -> script body
    pub staged: HashMap<String, String>,
    pub executed: Vec<String>,
    pub fail_provision_with: Option<i32>,
    pub fail_seed_with: Option<i32>,
}

pub struct FakeArango {
    state: Mutex<ArangoState>,
}

impl FakeArango {
    /// A server that is ready immediately and knows only `_system`.
    pub fn ready() -> Self {
        Self::with_statuses(&["Up 10 seconds (healthy)"])
    }

    pub fn with_statuses(statuses: &[&str]) -> Self {
        let state = ArangoState {
            statuses: statuses.iter().map(|s| (*s).to_string()).collect(),
            root_password: "changeme".to_string(),
            databases: BTreeSet::from(["_system".to_string()]),
            ..ArangoState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, ArangoState> {
        self.state.lock().unwrap()
    }

    fn provision(state: &mut ArangoState, script: &str) -> ExecOutput {
        let db = binding(script, "dbName");
        let user = binding(script, "userName");
        let password = binding(script, "userPassword");
        let permission = binding(script, "permission");

        let database = if state.databases.insert(db.clone()) {
            "created"
        } else {
            "already_present"
        };
        let principal = match state.users.insert(user.clone(), password) {
            Some(_) => "updated",
            None => "created",
        };
        state.grants.insert((user, db), permission);

        ExecOutput {
            exit_code: 0,
            stdout: format!(
                "@@bootstrap {{\"database\":\"{database}\",\"principal\":\"{principal}\"}}\n"
            ),
            stderr: String::new(),
        }
    }

    fn seed(state: &mut ArangoState, script: &str) -> ExecOutput {
        let db = binding(script, "dbName");
        let collection = binding(script, "collectionName");
        let records: Vec<Value> = serde_json::from_str(&raw_binding(script, "records")).unwrap();

        if !state.databases.contains(&db) {
            return ExecOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("database not found: {db}"),
            };
        }

        let keys = state.collections.entry((db, collection.clone())).or_default();
        let inserted = records
            .iter()
            .filter_map(|r| r["_key"].as_str())
            .filter(|k| keys.insert((*k).to_string()))
            .count();

        ExecOutput {
            exit_code: 0,
            stdout: format!(
                "@@bootstrap {{\"collection\":\"{collection}\",\"inserted\":{inserted}}}\n"
            ),
            stderr: String::new(),
        }
    }
}

/// Text after `const <name> = ` up to the trailing semicolon.
fn raw_binding(script: &str, name: &str) -> String {
    let prefix = format!("const {name} = ");
    script
        .lines()
        .find_map(|l| l.strip_prefix(&prefix))
        .map(|v| v.trim_end_matches(';').to_string())
        .unwrap_or_else(|| panic!("script has no binding for {name}"))
}

/// A string binding, decoded from its JSON-escaped literal.
fn binding(script: &str, name: &str) -> String {
    serde_json::from_str(&raw_binding(script, name)).unwrap()
}

#[async_trait]
impl ContainerRuntime for FakeArango {
    async fn status(&self, _target: &str) -> BootstrapResult<String> {
        let mut state = self.state();
        let n = state.status_calls;
        state.status_calls += 1;
        Ok(state
            .statuses
            .get(n)
            .or(state.statuses.last())
            .cloned()
            .unwrap_or_default())
    }

    async fn copy_into(&self, _target: &str, local: &Path, remote: &str) -> BootstrapResult<()> {
        let body = std::fs::read_to_string(local)?;
        self.state().staged.insert(remote.to_string(), body);
        Ok(())
    }

    async fn exec_script(
        &self,
        _target: &str,
        remote: &str,
        ctx: &ScriptContext,
    ) -> BootstrapResult<ExecOutput> {
        let mut state = self.state();
        state.executed.push(remote.to_string());

        let script = state
            .staged
            .get(remote)
            .cloned()
            .ok_or_else(|| BootstrapError::Runtime(format!("no such file: {remote}")))?;

        if ctx.password != state.root_password {
            return Ok(ExecOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "not authorized".to_string(),
            });
        }

        // The script ran; its `finally` block deletes the staged copy.
        if script.contains("fs.remove(scriptPath)") {
            let path = binding(&script, "scriptPath");
            state.staged.remove(&path);
        }

        if script.contains("users.grantDatabase") {
            if let Some(code) = state.fail_provision_with {
                return Ok(ExecOutput {
                    exit_code: code,
                    ..ExecOutput::default()
                });
            }
            Ok(Self::provision(&mut state, &script))
        } else {
            if let Some(code) = state.fail_seed_with {
                return Ok(ExecOutput {
                    exit_code: code,
                    ..ExecOutput::default()
                });
            }
            Ok(Self::seed(&mut state, &script))
        }
    }
}
