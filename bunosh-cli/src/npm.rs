//! `package.json` scripts as commands

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bunosh_core::{BoundFunction, CallError, Command, TaskEngine};
use bunosh_execution::{exec, ExecRequest};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

/// Scripts from `dir/package.json`, skipping those that call bunosh itself
pub fn read_scripts(dir: &Path) -> BTreeMap<String, String> {
    let path = dir.join("package.json");
    let Ok(text) = std::fs::read_to_string(&path) else {
        return BTreeMap::new();
    };
    match serde_json::from_str::<PackageJson>(&text) {
        Ok(package) => package
            .scripts
            .into_iter()
            .filter(|(_, command)| !command.contains("bunosh"))
            .collect(),
        Err(err) => {
            warn!("Ignoring unreadable {}: {}", path.display(), err);
            BTreeMap::new()
        }
    }
}

/// `npm run <script>` with the script name quoted for `shell`
fn run_command(script: &str, shell: &str) -> String {
    let is_cmd = Path::new(shell)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.eq_ignore_ascii_case("cmd"));
    let quoted = if is_cmd {
        format!("\"{}\"", script.replace('"', "\"\""))
    } else {
        format!("'{}'", script.replace('\'', "'\\''"))
    };
    format!("npm run {}", quoted)
}

/// Runs `npm run <script>` as a shell task
pub struct NpmScript {
    engine: TaskEngine,
    script: String,
    dir: PathBuf,
    shell: String,
}

#[async_trait]
impl BoundFunction for NpmScript {
    async fn call(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        let request = ExecRequest::new(run_command(&self.script, &self.shell))
            .with_cwd(&self.dir)
            .with_shell(self.shell.clone());
        let result = exec(&self.engine, request).await;
        serde_json::to_value(&result).map_err(|e| CallError::Failed(e.to_string()))
    }
}

/// One command per script in `dir/package.json`
pub fn npm_commands(dir: &Path, engine: &TaskEngine, shell: &str) -> Vec<Command> {
    let scripts = read_scripts(dir);
    debug!("Found {} npm script(s)", scripts.len());
    scripts
        .into_iter()
        .map(|(script, body)| {
            let function = Arc::new(NpmScript {
                engine: engine.clone(),
                script: script.clone(),
                dir: dir.to_path_buf(),
                shell: shell.to_string(),
            });
            Command::npm(script, function).with_comment(Some(body))
        })
        .collect()
}
