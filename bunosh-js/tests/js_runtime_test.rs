use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use bunosh_core::{RecordedEvent, RecordingReporter, RuntimeContext, TaskEngine, TaskKind};
use bunosh_http::{AiError, HttpManager};
use bunosh_js::{commands_from_source, JsExecutionError, JsRuntime, JsServices};
use bunosh_parser::parse_source;
use serde_json::{json, Value};

struct Harness {
    runtime: Arc<JsRuntime>,
    reporter: Arc<RecordingReporter>,
    exit_code: Arc<AtomicI32>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(source: &str) -> Self {
        let reporter = Arc::new(RecordingReporter::new());
        let exit_code = Arc::new(AtomicI32::new(-1));
        let recorded = exit_code.clone();
        let ctx = RuntimeContext::new(reporter.clone())
            .with_exit_handler(move |code| recorded.store(code, Ordering::SeqCst));
        let dir = tempfile::tempdir().unwrap();

        let services = JsServices::new(TaskEngine::new(Arc::new(ctx)), HttpManager::new().unwrap())
            .with_ai(Err(AiError::MissingCredential {
                remediations: vec!["OPENAI_API_KEY (provider 'openai')".into()],
            }))
            .with_base_dir(dir.path());
        let file = parse_source(source).unwrap();
        Self {
            runtime: Arc::new(JsRuntime::from_source(&file, Arc::new(services))),
            reporter,
            exit_code,
            _dir: dir,
        }
    }

    async fn call(&self, function: &str, args: Vec<Value>) -> Result<Value, JsExecutionError> {
        self.runtime.invoke(function, args).await
    }

    fn ctx(&self) -> &Arc<RuntimeContext> {
        self.runtime.services().engine().context()
    }

    fn base_dir(&self) -> &std::path::Path {
        self._dir.path()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_function_returns_value() {
    let harness = Harness::new(
        "/** Greets */\nexport function greet(name = 'World') { return `Hello, ${name}!`; }",
    );
    let value = harness.call("greet", vec![json!("Ann")]).await.unwrap();
    assert_eq!(value, json!("Hello, Ann!"));

    // a missing argument falls back to the JavaScript default
    let value = harness.call("greet", vec![]).await.unwrap();
    assert_eq!(value, json!("Hello, World!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_commands_call_through_local_binding() {
    let source = "function build(target = 'all') { return { target }; }\nexport { build as compile };";
    let harness = Harness::new(source);
    let file = parse_source(source).unwrap();
    let commands = commands_from_source(&file, "", &harness.runtime);

    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].cli_name(), "compile");
    let value = commands[0].invoke(vec![json!("web")]).await.unwrap();
    assert_eq!(value, json!({ "target": "web" }));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_exec_inside_task() {
    let harness = Harness::new(
        r#"
import { exec, task } from 'bunosh';

export async function build() {
  const result = await task('Build', async () => {
    const out = await exec`echo compiled`;
    return out.output;
  });
  return result.status;
}
"#,
    );
    let value = harness.call("build", vec![]).await.unwrap();
    assert_eq!(value, json!("success"));

    let history = harness.ctx().history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].name, "Build");
    assert_eq!(history[0].kind, TaskKind::Task);
    assert_eq!(history[1].kind, TaskKind::Exec);
    assert_eq!(history[1].name, "echo compiled");

    let outputs: Vec<_> = harness
        .reporter
        .events_for("echo compiled")
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Output(_, line, false) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(outputs, vec!["compiled".to_string()]);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_failed_command_does_not_throw() {
    let harness = Harness::new(
        r#"
export async function check() {
  const result = await exec`echo broken >&2; exit 2`;
  return { failed: result.hasFailed, output: result.output };
}
"#,
    );
    let value = harness.call("check", vec![]).await.unwrap();
    assert_eq!(value, json!({ "failed": true, "output": "broken" }));
    assert_eq!(harness.ctx().exit_code(), 1);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_parallel_commands_get_ordinal_prefixes() {
    let harness = Harness::new(
        r#"
export async function both() {
  const results = await Promise.all([exec`sleep 0.2; echo a`, exec`sleep 0.2; echo b`]);
  return results.map(r => r.output);
}
"#,
    );
    let value = harness.call("both", vec![]).await.unwrap();
    assert_eq!(value, json!(["a", "b"]));

    let mut prefixes: Vec<_> = harness
        .reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Start(event) => Some(event.prefix),
            _ => None,
        })
        .collect();
    // both commands were live together; start order between threads may vary
    prefixes.sort();
    assert_eq!(prefixes, vec!["".to_string(), "❰2❱".to_string()]);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_parallel_tasks_run_their_commands_concurrently() {
    let harness = Harness::new(
        r#"
export async function fanout() {
  await parallel(
    task('slow', async () => { await exec`sleep 0.6`; say('slow done'); }),
    task('quick', async () => { await exec`sleep 0.1`; say('quick done'); }),
  );
}
"#,
    );
    let started = std::time::Instant::now();
    harness.call("fanout", vec![]).await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed < std::time::Duration::from_millis(1100), "took {:?}", elapsed);

    // the quick task finished while the slow one was still waiting
    let said: Vec<_> = harness
        .reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Say(message, _) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(said, vec!["quick done", "slow done"]);
    assert_eq!(harness.ctx().exit_code(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_thrown_error_is_reported() {
    let harness = Harness::new("export async function fail() { throw new Error('nope'); }");
    let err = harness.call("fail", vec![]).await.unwrap_err();
    assert!(matches!(err, JsExecutionError::Thrown(ref message) if message == "nope"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_task_try_downgrades_failure() {
    let harness = Harness::new(
        r#"
export async function attempt() {
  const ok = await task.try('Flaky', () => { throw new TypeError('flaked'); });
  return ok;
}
"#,
    );
    let value = harness.call("attempt", vec![]).await.unwrap();
    assert_eq!(value, json!(false));

    let events = harness.reporter.events_for("Flaky");
    assert!(events
        .iter()
        .any(|e| matches!(e, RecordedEvent::Error(_, message) if message == "TypeError: flaked")));
    assert_eq!(harness.ctx().exit_code(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_on_failures_exits() {
    let harness = Harness::new(
        r#"
export async function strict() {
  stopOnFailures();
  await task('Broken', () => { throw new Error('bad'); });
  return 'continued';
}
"#,
    );
    let value = harness.call("strict", vec![]).await.unwrap();
    // the exit handler in this harness only records the code
    assert_eq!(value, json!("continued"));
    assert_eq!(harness.exit_code.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_other_modules_are_stubbed() {
    let harness = Harness::new(
        r#"
import fs from 'fs';
import { join } from 'path';

export function usesFs() { return fs.readFileSync('x'); }
export function loads() { return typeof join; }
"#,
    );
    assert_eq!(harness.call("loads", vec![]).await.unwrap(), json!("function"));
    let err = harness.call("usesFs", vec![]).await.unwrap_err();
    assert!(err.to_string().contains("'readFileSync' from module 'fs'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_write_to_file_with_line_builder() {
    let harness = Harness::new(
        r#"
export async function config(env = 'dev') {
  const result = await writeToFile('out/app.conf', line => {
    line`env=${env}`;
    line`debug=true`;
  });
  return result.status;
}
"#,
    );
    let value = harness.call("config", vec![json!("prod")]).await.unwrap();
    assert_eq!(value, json!("success"));
    let written = std::fs::read_to_string(harness.base_dir().join("out/app.conf")).unwrap();
    assert_eq!(written, "env=prod\ndebug=true\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ai_without_credentials_fails_task() {
    let harness = Harness::new(
        "export async function summarize() { const r = await ai('Summarize the changelog', { type: 'object' }); return r.output; }",
    );
    let value = harness.call("summarize", vec![]).await.unwrap();
    assert!(value.as_str().unwrap().contains("OPENAI_API_KEY"));
    let history = harness.ctx().history();
    assert_eq!(history[0].kind, TaskKind::Ai);
    assert_eq!(harness.ctx().exit_code(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_exposes_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"healthy":true}"#)
        .create_async()
        .await;

    let harness = Harness::new(&format!(
        r#"
export async function health() {{
  const response = await fetch('{}/status');
  const body = await response.json();
  return {{ ok: response.ok, status: response.status, healthy: body.healthy }};
}}
"#,
        server.url()
    ));
    let value = harness.call("health", vec![]).await.unwrap();
    assert_eq!(value, json!({ "ok": true, "status": 200, "healthy": true }));
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_say_goes_to_reporter() {
    let harness = Harness::new("export function hello() { say('hi', 2); yell('loud'); }");
    harness.call("hello", vec![]).await.unwrap();
    let said: Vec<_> = harness
        .reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Say(message, loud) => Some((message, loud)),
            _ => None,
        })
        .collect();
    assert_eq!(said, vec![("hi 2".to_string(), false), ("loud".to_string(), true)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_syntax_error_in_script_body() {
    let harness = Harness::new("export function broken() { return 1; }\nthrow new Error('top level');");
    let err = harness.call("broken", vec![]).await.unwrap_err();
    assert!(matches!(err, JsExecutionError::RuntimeError(_)));
}
