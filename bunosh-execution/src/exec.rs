//! Shell command execution

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use bunosh_config::domains::execution::default_shell;
use bunosh_core::{infer_task_name, TaskEngine, TaskKind, TaskOptions, TaskResult, TaskScope};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecError;

/// A shell command to run as a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub command: String,
    /// Task name; inferred from the command when unset
    pub name: Option<String>,
    pub cwd: Option<PathBuf>,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
    pub shell: String,
}

impl ExecRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            name: None,
            cwd: None,
            env: BTreeMap::new(),
            shell: default_shell().to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn task_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| infer_task_name(&self.command))
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.shell);
        let is_cmd = Path::new(&self.shell)
            .file_stem()
            .is_some_and(|stem| stem.eq_ignore_ascii_case("cmd"));
        cmd.arg(if is_cmd { "/C" } else { "-c" })
            .arg(&self.command)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

/// Run a shell command as a task.
///
/// Succeeds when the command exits with status 0; the output is every line
/// the command printed, stderr included, in arrival order.
pub async fn exec(engine: &TaskEngine, request: ExecRequest) -> TaskResult {
    let name = request.task_name();
    engine
        .run_with(name, TaskOptions::kind(TaskKind::Exec), move |scope| {
            run_command(scope, request)
        })
        .await
}

async fn run_command(scope: TaskScope, request: ExecRequest) -> Result<String, ExecError> {
    debug!(
        "Running `{}` with {} (cwd: {:?})",
        request.command, request.shell, request.cwd
    );
    let io_error = |source: std::io::Error| ExecError::Io {
        command: request.command.clone(),
        source,
    };

    let mut child = request.to_command().spawn().map_err(|source| ExecError::Spawn {
        command: request.command.clone(),
        source,
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_error(std::io::Error::other("stdout not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_error(std::io::Error::other("stderr not captured")))?;

    let lines = stream_lines(&scope, stdout, stderr)
        .await
        .map_err(io_error)?;
    let status = child.wait().await.map_err(io_error)?;

    let code = status.code();
    scope.set_exit_code(code.unwrap_or(-1));
    debug!("`{}` exited with {:?}", request.command, code);

    if status.success() {
        Ok(lines.join("\n"))
    } else {
        Err(ExecError::failed(code, &lines))
    }
}

/// Forward both streams line by line as they arrive
async fn stream_lines(
    scope: &TaskScope,
    stdout: impl AsyncRead + Unpin,
    stderr: impl AsyncRead + Unpin,
) -> std::io::Result<Vec<String>> {
    let mut out = BufReader::new(stdout).split(b'\n');
    let mut err = BufReader::new(stderr).split(b'\n');
    let (mut out_done, mut err_done) = (false, false);
    let mut captured = Vec::new();

    loop {
        tokio::select! {
            segment = out.next_segment(), if !out_done => match segment? {
                Some(bytes) => {
                    let line = decode_line(&bytes);
                    scope.output(&line);
                    captured.push(line);
                }
                None => out_done = true,
            },
            segment = err.next_segment(), if !err_done => match segment? {
                Some(bytes) => {
                    let line = decode_line(&bytes);
                    scope.error_output(&line);
                    captured.push(line);
                }
                None => err_done = true,
            },
            else => break,
        }
    }
    Ok(captured)
}

fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}
