//! User-facing startup diagnostics

use std::path::Path;

use bunosh_config::ConfigError;
use bunosh_parser::{ErrorCategory, SyntaxError};
use colored::Colorize;

use crate::discovery::{DiscoveryError, BUNOSHFILE};

fn hints(category: ErrorCategory) -> &'static [&'static str] {
    match category {
        ErrorCategory::DuplicateDeclaration => &[
            "Two top-level declarations share a name.",
            "Rename one of them, or import a helper under an alias (`import { a as b }`).",
        ],
        ErrorCategory::UnexpectedToken => &[
            "Check for a missing bracket, parenthesis or comma near this location.",
            "Template literals must close with a backtick.",
        ],
        ErrorCategory::Generic => &["Fix the syntax at this location and run the command again."],
    }
}

/// Message for a parse failure, pointing at the offending line
pub fn syntax_diagnostic(path: &Path, error: &SyntaxError, source: Option<&str>) -> String {
    let mut lines = vec![
        format!("{} {}", "✗".red(), "Cannot build commands".red().bold()),
        format!(
            "  {}:{}:{} {} [{}]",
            path.display(),
            error.line,
            error.column,
            error.message,
            error.reason.code()
        ),
    ];
    if let Some(text) = source.and_then(|s| s.lines().nth(error.line.saturating_sub(1))) {
        lines.push(String::new());
        lines.push(format!("  {:>4} | {}", error.line, text));
        lines.push(format!(
            "       | {}{}",
            " ".repeat(error.column.saturating_sub(1)),
            "^".red()
        ));
    }
    lines.push(String::new());
    for hint in hints(error.category()) {
        lines.push(format!("  {} {}", "ℹ".blue(), hint));
    }
    lines.join("\n")
}

/// Message for any discovery failure
pub fn discovery_diagnostic(error: &DiscoveryError) -> String {
    match error {
        DiscoveryError::NotFound { dir } => [
            format!("{} {} not found in {}", "⚠".yellow(), BUNOSHFILE, dir.display()),
            String::new(),
            format!("  Run {} to create one,", "bunosh init".cyan()),
            format!("  or point to an existing file with {}.", "--bunoshfile <path>".cyan()),
        ]
        .join("\n"),
        DiscoveryError::Syntax { path, error } => {
            let source = std::fs::read_to_string(path).ok();
            syntax_diagnostic(path, error, source.as_deref())
        }
        DiscoveryError::Read { .. } => format!("{} {}", "✗".red(), error),
    }
}

/// Message for an invalid configuration
pub fn config_diagnostic(error: &ConfigError) -> String {
    [
        format!("{} {}", "✗".red(), "Invalid configuration".red().bold()),
        format!("  {}", error),
        String::new(),
        format!(
            "  {} Check the file passed with --config and any BUNOSH_* environment variables.",
            "ℹ".blue()
        ),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunosh_parser::SyntaxReason;

    #[test]
    fn test_syntax_diagnostic_points_at_column() {
        colored::control::set_override(false);
        let error = SyntaxError::new(SyntaxReason::UnexpectedToken, 2, 5, "Unexpected token ')'");
        let text = syntax_diagnostic(
            Path::new("Bunoshfile.js"),
            &error,
            Some("export function a() {}\nlet x);\n"),
        );
        assert!(text.contains("Bunoshfile.js:2:5 Unexpected token ')' [unexpected-token]"));
        assert!(text.contains("     2 | let x);\n       |     ^"));
        assert!(text.contains("missing bracket"));
    }

    #[test]
    fn test_duplicate_declaration_hint() {
        colored::control::set_override(false);
        let error = SyntaxError::new(
            SyntaxReason::DuplicateDeclaration,
            1,
            1,
            "Identifier 'a' has already been declared",
        );
        let text = syntax_diagnostic(Path::new("Bunoshfile.js"), &error, None);
        assert!(text.contains("Rename one of them"));
    }

    #[test]
    fn test_missing_file_guidance() {
        colored::control::set_override(false);
        let text = discovery_diagnostic(&DiscoveryError::NotFound {
            dir: "/work".into(),
        });
        assert!(text.contains("bunosh init"));
    }
}
