//! Parameter and doc comment extraction for one function

use std::sync::Arc;

use bunosh_core::{ArgSpec, BoundFunction, Command, Literal, OptionSpec};
use serde::Serialize;

use crate::lexer::{Comment, Token, TokenKind};
use crate::parser::{find_at_depth, split_commas, FunctionDecl, TokenIndex};

/// One parameter of an exported function
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Param {
    /// Positional argument; `default: None` means required
    Positional {
        name: String,
        default: Option<Literal>,
    },
    /// Trailing parameter defaulted to an object literal, flattened to options
    OptionsBag(Vec<OptionSpec>),
}

/// Signature and description of an exported function
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedFunction {
    pub name: String,
    pub params: Vec<Param>,
    pub doc_comment: Option<String>,
}

impl ParsedFunction {
    /// Result for a name that is not declared in the file
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Positional parameters in declaration order
    pub fn positional(&self) -> Vec<ArgSpec> {
        self.params
            .iter()
            .filter_map(|p| match p {
                Param::Positional { name, default } => Some(ArgSpec {
                    name: name.clone(),
                    default: default.clone(),
                }),
                Param::OptionsBag(_) => None,
            })
            .collect()
    }

    /// Options of the trailing options object, if the function has one
    pub fn options(&self) -> Option<Vec<OptionSpec>> {
        self.params.iter().find_map(|p| match p {
            Param::OptionsBag(options) => Some(options.clone()),
            Param::Positional { .. } => None,
        })
    }

    /// First description line that is not an `@` tag
    pub fn summary(&self) -> Option<&str> {
        self.doc_comment.as_deref().and_then(|doc| {
            doc.lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('@'))
        })
    }

    /// Build the command model for this function
    pub fn to_command(&self, namespace: &str, function: Arc<dyn BoundFunction>) -> Command {
        let command = Command::new(self.name.clone(), function)
            .with_namespace(namespace)
            .with_args(self.positional())
            .with_comment(self.doc_comment.clone());
        match self.options() {
            Some(options) => command.with_options(options),
            None => command,
        }
    }
}

pub(crate) fn extract(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    exported_name: &str,
    decl: &FunctionDecl,
) -> ParsedFunction {
    ParsedFunction {
        name: exported_name.to_string(),
        params: extract_params(tokens, matching, decl.params),
        doc_comment: doc_comment(tokens, matching, decl),
    }
}

fn extract_params(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    (start, end): (TokenIndex, TokenIndex),
) -> Vec<Param> {
    let parts: Vec<_> = split_commas(tokens, matching, start, end)
        .into_iter()
        .filter(|(s, e)| s < e)
        .collect();
    let last = parts.len().saturating_sub(1);

    let mut params = Vec::new();
    for (index, (s, e)) in parts.into_iter().enumerate() {
        let assign = find_at_depth(tokens, matching, s, e, "=");
        let default = assign.map(|eq| (eq + 1, e));

        if index == last {
            if let Some((ds, de)) = default {
                if is_object_literal(tokens, matching, ds, de) {
                    params.push(Param::OptionsBag(extract_options(tokens, matching, ds)));
                    continue;
                }
            }
        }

        let target_end = assign.unwrap_or(e);
        let name = match (&tokens[s].kind, target_end - s) {
            (TokenKind::Ident(name), 1) => Some(name.clone()),
            (TokenKind::Punct("..."), 2) => tokens[s + 1].ident().map(str::to_string),
            _ => None,
        };
        let rest = tokens[s].is_punct("...");
        let name = name.unwrap_or_else(|| format!("arg{}", index + 1));

        let default = match default {
            None if rest || target_end - s != 1 => Some(Literal::Null),
            None => None,
            Some((ds, de)) => Some(literal(tokens, ds, de).unwrap_or(Literal::Null)),
        };
        params.push(Param::Positional { name, default });
    }
    params
}

fn is_object_literal(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    start: TokenIndex,
    end: TokenIndex,
) -> bool {
    tokens[start].is_punct("{") && matching[start] == Some(end - 1)
}

/// Single literal token in `[start, end)`
fn literal(tokens: &[Token], start: TokenIndex, end: TokenIndex) -> Option<Literal> {
    if end != start + 1 {
        return None;
    }
    match &tokens[start].kind {
        TokenKind::Str(s) => Some(Literal::String(s.clone())),
        TokenKind::Number(n) => Some(Literal::Number(*n)),
        TokenKind::Ident(word) => match word.as_str() {
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            "null" => Some(Literal::Null),
            _ => None,
        },
        _ => None,
    }
}

fn extract_options(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    open: TokenIndex,
) -> Vec<OptionSpec> {
    let Some(close) = matching[open] else {
        return Vec::new();
    };
    let mut options = Vec::new();
    for (s, e) in split_commas(tokens, matching, open + 1, close) {
        if e < s + 3 || !tokens[s + 1].is_punct(":") {
            continue;
        }
        let key = match &tokens[s].kind {
            TokenKind::Ident(key) | TokenKind::Str(key) => key.clone(),
            _ => continue,
        };
        let value = if tokens[s + 2].is_punct("!") {
            literal(tokens, s + 3, e).map(|lit| Literal::Bool(!lit.is_truthy()))
        } else {
            literal(tokens, s + 2, e)
        };
        if let Some(value) = value {
            options.push(OptionSpec::new(key, value));
        }
    }
    options
}

fn doc_comment(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    decl: &FunctionDecl,
) -> Option<String> {
    if let Some(comment) = tokens[decl.doc_anchor].comments.last() {
        if comment.block {
            if let Some(text) = normalize_comment(comment) {
                return Some(text);
            }
        }
    }

    let body = decl.body?;
    let first = body + 1;
    if matching[body] == Some(first) {
        return None;
    }
    tokens[first].comments.first().and_then(normalize_comment)
}

/// Strip comment decoration: `/**`, leading `*` on each line, surrounding blank lines
fn normalize_comment(comment: &Comment) -> Option<String> {
    let lines: Vec<String> = comment
        .text
        .lines()
        .map(|line| {
            let line = line.trim();
            line.trim_start_matches('*').trim().to_string()
        })
        .collect();
    let first = lines.iter().position(|l| !l.is_empty())?;
    let last = lines.iter().rposition(|l| !l.is_empty())?;
    Some(lines[first..=last].join("\n"))
}
