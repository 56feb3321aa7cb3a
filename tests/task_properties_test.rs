//! Cross-crate task behaviour: ordering, exit codes, parsing

use anyhow::Result;
use bunosh_core::{
    ArgSpec, Literal, RecordingReporter, RuntimeContext, RuntimeOptions, TaskEngine, TaskStatus,
};
use bunosh_execution::{exec, ExecRequest};
use bunosh_parser::parse_source;
use serde_json::json;
use std::sync::Arc;

fn engine_with(options: RuntimeOptions) -> TaskEngine {
    let ctx = RuntimeContext::new(Arc::new(RecordingReporter::new()))
        .with_options(options)
        .with_exit_handler(|_| {});
    TaskEngine::new(Arc::new(ctx))
}

async fn run_mixed(engine: &TaskEngine) {
    engine.run("ok", |_| async { Ok::<_, String>("done") }).await;
    engine
        .run("broken", |_| async { Err::<(), _>("nope".to_string()) })
        .await;
    engine
        .try_run("flaky", |_| async { Err::<(), _>("meh".to_string()) })
        .await;
}

#[tokio::test]
async fn test_history_follows_start_order() {
    let engine = engine_with(RuntimeOptions::default());
    run_mixed(&engine).await;

    let history = engine.context().history();
    let names: Vec<_> = history.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["ok", "broken", "flaky"]);
    assert!(history.windows(2).all(|w| w[0].id < w[1].id));

    let statuses: Vec<_> = history.iter().map(|t| t.status).collect();
    assert_eq!(
        statuses,
        vec![TaskStatus::Success, TaskStatus::Fail, TaskStatus::Warning]
    );
}

#[tokio::test]
async fn test_exit_code_aggregation() {
    let engine = engine_with(RuntimeOptions::default());
    run_mixed(&engine).await;
    assert_eq!(engine.context().exit_code(), 1);

    // warnings alone never fail the run
    let engine = engine_with(RuntimeOptions::default());
    engine
        .try_run("flaky", |_| async { Err::<(), _>("meh".to_string()) })
        .await;
    assert_eq!(engine.context().exit_code(), 0);

    let ignoring = engine_with(RuntimeOptions {
        ignore_failures: true,
        ..RuntimeOptions::default()
    });
    run_mixed(&ignoring).await;
    assert_eq!(ignoring.context().exit_code(), 0);

    let testing = engine_with(RuntimeOptions {
        test_mode: true,
        ..RuntimeOptions::default()
    });
    run_mixed(&testing).await;
    assert_eq!(testing.context().exit_code(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_shell_command_keeps_stderr() {
    let engine = engine_with(RuntimeOptions::default());
    let result = exec(&engine, ExecRequest::new("echo 'no such target' >&2; exit 2")).await;

    assert!(result.has_failed());
    assert_eq!(result.output(), &json!("no such target"));
    assert_eq!(engine.context().exit_code(), 1);
}

#[test]
fn test_greet_signature() -> Result<()> {
    let source = "/**\n * Greets someone\n */\nexport function greet(name = 'World') {}\n";
    let file = parse_source(source)?;
    let greet = file.function("greet");

    assert_eq!(greet.summary(), Some("Greets someone"));
    assert_eq!(
        greet.positional(),
        vec![ArgSpec::optional("name", Literal::String("World".into()))]
    );
    assert!(greet.options().is_none());
    Ok(())
}

#[test]
fn test_parse_is_repeatable() -> Result<()> {
    let source = r#"import { exec } from 'bunosh';
/** Deploys */
export async function deploy(env, region = 'eu', opts = { force: false, tag: null }) {}
function helper() {}
export { helper as assist };
"#;
    let first = parse_source(source)?;
    let second = parse_source(source)?;

    assert_eq!(first.functions(), second.functions());
    assert_eq!(first.exported_names(), second.exported_names());
    assert_eq!(first.to_script(), second.to_script());
    Ok(())
}
