//! End-to-end runs of a Bunoshfile through the CLI

use anyhow::Result;
use bunosh_cli::App;
use bunosh_core::{RecordedEvent, RecordingReporter, TaskKind, TaskStatus};
use std::path::Path;
use std::sync::Arc;

const RELEASE_FILE: &str = r#"import { exec, fetch, writeToFile, parallel } from 'bunosh';

/**
 * Cuts a release
 */
export async function release(version, opts = { api: '' }) {
  await exec`echo building ${version}`;
  const res = await fetch(`${opts.api}/changes`);
  const changes = await res.json();
  await writeToFile('CHANGELOG.md', line => {
    line`# ${version}`;
    for (const change of changes) line`- ${change}`;
  });
  await parallel(exec`echo lint`, exec`echo test`);
}

export async function broken() {
  const result = await exec`echo missing >&2; exit 4`;
  if (result.hasFailed) console.log(`recovered from: ${result.output}`);
}
"#;

async fn run(dir: &Path, reporter: &Arc<RecordingReporter>, args: &[&str]) -> i32 {
    App::new(dir)
        .with_reporter(reporter.clone())
        .with_exit_handler(|_| {})
        .run(args.iter().map(|a| a.to_string()).collect())
        .await
}

fn started_kinds(reporter: &RecordingReporter) -> Vec<TaskKind> {
    reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Start(event) => Some(event.kind),
            _ => None,
        })
        .collect()
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_release_workflow() -> Result<()> {
    println!("🧪 Running release workflow end to end...");

    let mut server = mockito::Server::new_async().await;
    let changes = server
        .mock("GET", "/changes")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["fix parser", "faster exec"]"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("Bunoshfile.js"), RELEASE_FILE)?;
    let reporter = Arc::new(RecordingReporter::new());

    let code = run(
        dir.path(),
        &reporter,
        &["release", "1.2.0", "--api", &server.url()],
    )
    .await;
    assert_eq!(code, 0, "events: {:#?}", reporter.events());
    changes.assert_async().await;

    let kinds = started_kinds(&reporter);
    assert_eq!(
        kinds,
        vec![
            TaskKind::Command,
            TaskKind::Exec,
            TaskKind::Fetch,
            TaskKind::WriteFile,
            TaskKind::Exec,
            TaskKind::Exec,
        ]
    );

    let changelog = std::fs::read_to_string(dir.path().join("CHANGELOG.md"))?;
    assert_eq!(changelog, "# 1.2.0\n- fix parser\n- faster exec\n");

    let failures = reporter
        .events()
        .into_iter()
        .filter(|e| matches!(e, RecordedEvent::Error(..)))
        .count();
    assert_eq!(failures, 0);

    println!("✅ Release workflow completed");
    Ok(())
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_failed_command_inside_function() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("Bunoshfile.js"), RELEASE_FILE)?;
    let reporter = Arc::new(RecordingReporter::new());

    // the function handles the failure, but the failed task still counts
    assert_eq!(run(dir.path(), &reporter, &["broken"]).await, 1);

    let events = reporter.events();
    let exec_error = events.iter().find_map(|e| match e {
        RecordedEvent::Error(event, message) if event.kind == TaskKind::Exec => {
            Some((event.details.exit_code, message.clone()))
        }
        _ => None,
    });
    assert_eq!(exec_error, Some((Some(4), "missing".to_string())));

    assert!(events.iter().any(|e| matches!(
        e,
        RecordedEvent::Finish(event) if event.kind == TaskKind::Command
            && event.status == TaskStatus::Success
    )));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_npm_scripts_become_commands() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("Bunoshfile.js"), RELEASE_FILE)?;
    std::fs::write(
        dir.path().join("package.json"),
        r#"{ "scripts": { "lint": "eslint .", "tasks": "bunosh release" } }"#,
    )?;
    let reporter = Arc::new(RecordingReporter::new());

    // scripts that call bunosh are not re-exported
    assert_eq!(run(dir.path(), &reporter, &["npm:tasks"]).await, 1);
    assert!(reporter.events().is_empty());

    assert_eq!(run(dir.path(), &reporter, &["--help"]).await, 0);
    Ok(())
}
