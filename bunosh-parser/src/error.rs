//! Syntax errors raised while reading a Bunoshfile

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Machine-readable reason for a syntax error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyntaxReason {
    DuplicateDeclaration,
    UnexpectedToken,
    UnexpectedEof,
    UnterminatedString,
    UnterminatedTemplate,
    UnterminatedComment,
    UnterminatedRegexp,
    InvalidCharacter,
}

impl SyntaxReason {
    pub fn code(&self) -> &'static str {
        match self {
            SyntaxReason::DuplicateDeclaration => "duplicate-declaration",
            SyntaxReason::UnexpectedToken => "unexpected-token",
            SyntaxReason::UnexpectedEof => "unexpected-eof",
            SyntaxReason::UnterminatedString => "unterminated-string",
            SyntaxReason::UnterminatedTemplate => "unterminated-template",
            SyntaxReason::UnterminatedComment => "unterminated-comment",
            SyntaxReason::UnterminatedRegexp => "unterminated-regexp",
            SyntaxReason::InvalidCharacter => "invalid-character",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyntaxReason::DuplicateDeclaration => ErrorCategory::DuplicateDeclaration,
            SyntaxReason::UnexpectedToken | SyntaxReason::UnexpectedEof => {
                ErrorCategory::UnexpectedToken
            }
            _ => ErrorCategory::Generic,
        }
    }
}

impl fmt::Display for SyntaxReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse grouping used to pick a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    DuplicateDeclaration,
    UnexpectedToken,
    Generic,
}

/// Malformed source, with a 1-based location
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} ({line}:{column})")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub reason: SyntaxReason,
    pub message: String,
}

impl SyntaxError {
    pub fn new(reason: SyntaxReason, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            reason,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.reason.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let err = SyntaxError::new(
            SyntaxReason::UnexpectedToken,
            3,
            7,
            "Unexpected token '}'",
        );
        assert_eq!(err.to_string(), "Unexpected token '}' (3:7)");
        assert_eq!(err.reason.code(), "unexpected-token");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            SyntaxReason::UnexpectedEof.category(),
            ErrorCategory::UnexpectedToken
        );
        assert_eq!(
            SyntaxReason::UnterminatedString.category(),
            ErrorCategory::Generic
        );
    }
}
