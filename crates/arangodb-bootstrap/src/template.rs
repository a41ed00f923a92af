//! Script templating and remote submission.
//!
//! Templates carry `${KEY}` placeholders. [`render`] substitutes them
//! literally in a single pass; [`TemplatedCommandRunner`] writes the result to
//! a private temporary file, stages it inside the container and runs it.
//!
//! The staged copy is bound as `${SCRIPT_PATH}`; every template removes its
//! own file before exiting, since it may carry a password in clear text.

use std::collections::BTreeMap;
use std::io::Write;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{BootstrapError, BootstrapResult};
use crate::runtime::{ContainerRuntime, ExecOutput, ScriptContext};

/// Placeholder name to substituted text.
pub type Bindings = BTreeMap<String, String>;

/// Outcome of one script submission. Only the exit status is interpreted.
pub type SubmitResult = ExecOutput;

/// Prefix of the single machine-readable line a script may print.
pub const RESULT_MARKER: &str = "@@bootstrap ";

/// Placeholder bound to the script's own path inside the container.
pub const SCRIPT_PATH_KEY: &str = "SCRIPT_PATH";

/// `bindings` plus [`SCRIPT_PATH_KEY`] set to `remote`.
pub fn with_script_path(bindings: &Bindings, remote: &str) -> Bindings {
    let mut bindings = bindings.clone();
    bindings.insert(SCRIPT_PATH_KEY.to_string(), escape_js_string(remote));
    bindings
}

/// Replace every `${KEY}` with `bindings[KEY]`.
///
/// Unbound placeholders are kept verbatim. Substituted text is never
/// rescanned, so a value containing `${...}` stays as it is.
pub fn render(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let key = after.find('}').map(|end| &after[..end]).filter(|k| is_key(k));
        match key {
            Some(key) => {
                match bindings.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[key.len() + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Names of the placeholders still present in `text`, in order of appearance.
pub fn placeholders(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}').map(|end| &after[..end]).filter(|k| is_key(k)) {
            Some(key) => {
                found.push(key);
                rest = &after[key.len() + 1..];
            }
            None => rest = after,
        }
    }
    found
}

fn is_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape `value` for use inside a double-quoted JavaScript string literal.
pub fn escape_js_string(value: &str) -> String {
    // A JSON string literal is a valid JS string literal; drop its quotes.
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Parse the last [`RESULT_MARKER`] line of a script's stdout.
pub fn parse_result_line<T: DeserializeOwned>(stdout: &str) -> Option<T> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(RESULT_MARKER))
        .and_then(|json| serde_json::from_str(json).ok())
}

/// Renders templates and runs them inside one container.
pub struct TemplatedCommandRunner<'a> {
    runtime: &'a dyn ContainerRuntime,
    target: String,
    remote_dir: String,
}

impl<'a> TemplatedCommandRunner<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        target: impl Into<String>,
        remote_dir: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            target: target.into(),
            remote_dir: remote_dir.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Where the operator should look when a script fails.
    pub fn log_hint(&self) -> String {
        self.runtime.log_hint(&self.target)
    }

    /// Render `template`, stage it in the container and execute it.
    ///
    /// The local copy lives in a uniquely named temporary file that is
    /// removed when this call returns, on every path. The remote copy gets
    /// the same name under `remote_dir` and is bound as `${SCRIPT_PATH}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or the
    /// runtime fails to copy or execute it. A script that runs and exits
    /// non-zero is not an error here; inspect [`SubmitResult::exit_code`].
    pub async fn render_and_submit(
        &self,
        name: &str,
        template: &str,
        bindings: &Bindings,
        ctx: &ScriptContext,
    ) -> BootstrapResult<SubmitResult> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{name}-"))
            .suffix(".js")
            .tempfile()?;

        let file_name = file
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BootstrapError::Runtime(format!(
                    "temporary script path is not valid UTF-8: {}",
                    file.path().display()
                ))
            })?;
        let remote = format!("{}/{}", self.remote_dir.trim_end_matches('/'), file_name);

        let script = render(template, &with_script_path(bindings, &remote));
        let unresolved = placeholders(&script);
        if !unresolved.is_empty() {
            warn!(script = name, ?unresolved, "unresolved placeholders left in script");
        }
        file.write_all(script.as_bytes())?;
        file.flush()?;

        debug!(script = name, local = %file.path().display(), %remote, "staging script");
        self.runtime
            .copy_into(&self.target, file.path(), &remote)
            .await?;
        let result = self
            .runtime
            .exec_script(&self.target, &remote, ctx)
            .await?;
        debug!(script = name, exit_code = result.exit_code, "script submitted");

        Ok(result)
    }
}
