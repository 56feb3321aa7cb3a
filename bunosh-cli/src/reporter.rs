//! Terminal formatters for task events

use std::io::Write;
use std::time::Duration;

use bunosh_core::{Reporter, TaskDetails, TaskEvent, TaskKind};
use colored::Colorize;

fn kind_label(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Task => "task",
        TaskKind::Exec => "exec",
        TaskKind::Fetch => "fetch",
        TaskKind::WriteFile => "write",
        TaskKind::Ai => "ai",
        TaskKind::Command => "run",
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// `(1.20s, exit 2, HTTP 404)` style suffix
fn details_suffix(details: &TaskDetails) -> String {
    let mut parts = Vec::new();
    if let Some(duration) = details.duration {
        parts.push(format_duration(duration));
    }
    if let Some(code) = details.exit_code {
        parts.push(format!("exit {}", code));
    }
    if let Some(status) = details.status_code {
        parts.push(format!("HTTP {}", status));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn with_prefix(prefix: &str, text: String) -> String {
    if prefix.is_empty() {
        text
    } else {
        format!("{} {}", prefix, text)
    }
}

fn emit(line: String) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", line);
}

/// Colored output for interactive terminals
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn start_line(event: &TaskEvent) -> String {
        with_prefix(
            &event.prefix,
            format!("{} {} {}", "▶".cyan(), kind_label(event.kind).dimmed(), event.name.bold()),
        )
    }

    pub fn finish_line(event: &TaskEvent) -> String {
        with_prefix(
            &event.prefix,
            format!(
                "{} {}{}",
                "✓".green(),
                event.name,
                details_suffix(&event.details).dimmed()
            ),
        )
    }

    pub fn error_lines(event: &TaskEvent, message: &str) -> Vec<String> {
        let mut lines = vec![with_prefix(
            &event.prefix,
            format!(
                "{} {}{}",
                "✗".red(),
                event.name.red(),
                details_suffix(&event.details).dimmed()
            ),
        )];
        // command output was already streamed
        if event.kind != TaskKind::Exec {
            lines.extend(
                message
                    .lines()
                    .map(|line| with_prefix(&event.prefix, format!("  {}", line.red()))),
            );
        }
        lines
    }
}

impl Reporter for ConsoleReporter {
    fn start(&self, event: &TaskEvent) {
        emit(Self::start_line(event));
    }

    fn finish(&self, event: &TaskEvent) {
        emit(Self::finish_line(event));
    }

    fn error(&self, event: &TaskEvent, message: &str) {
        for line in Self::error_lines(event, message) {
            emit(line);
        }
    }

    fn output(&self, event: &TaskEvent, line: &str, is_error: bool) {
        let text = if is_error {
            line.yellow().to_string()
        } else {
            line.to_string()
        };
        emit(with_prefix(&event.prefix, format!("  {}", text)));
    }

    fn say(&self, message: &str, loud: bool) {
        if loud {
            emit(message.to_uppercase().bold().yellow().to_string());
        } else {
            emit(message.to_string());
        }
    }
}

/// Plain output with GitHub Actions style grouping
#[derive(Debug, Default, Clone, Copy)]
pub struct CiReporter;

impl CiReporter {
    fn escape(message: &str) -> String {
        message
            .replace('%', "%25")
            .replace('\r', "%0D")
            .replace('\n', "%0A")
    }

    pub fn error_lines(event: &TaskEvent, message: &str) -> Vec<String> {
        vec![
            "::endgroup::".to_string(),
            format!(
                "::error title={}::{}",
                Self::escape(&event.name),
                Self::escape(message)
            ),
            with_prefix(
                &event.prefix,
                format!("✗ {}{}", event.name, details_suffix(&event.details)),
            ),
        ]
    }
}

impl Reporter for CiReporter {
    fn start(&self, event: &TaskEvent) {
        emit(format!(
            "::group::{}",
            with_prefix(&event.prefix, format!("{} {}", kind_label(event.kind), event.name))
        ));
    }

    fn finish(&self, event: &TaskEvent) {
        emit("::endgroup::".to_string());
        emit(with_prefix(
            &event.prefix,
            format!("✓ {}{}", event.name, details_suffix(&event.details)),
        ));
    }

    fn error(&self, event: &TaskEvent, message: &str) {
        for line in Self::error_lines(event, message) {
            emit(line);
        }
    }

    fn output(&self, event: &TaskEvent, line: &str, _is_error: bool) {
        emit(with_prefix(&event.prefix, line.to_string()));
    }

    fn say(&self, message: &str, _loud: bool) {
        emit(message.to_string());
    }
}
