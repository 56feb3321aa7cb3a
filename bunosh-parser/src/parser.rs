//! Module-level statement parser
//!
//! Reads the top level of a Bunoshfile: imports, exports, function and
//! variable declarations. Function bodies and other statements are skipped
//! as balanced token groups; only their boundaries matter here.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{SyntaxError, SyntaxReason};
use crate::lexer::{tokenize, Span, Token, TokenKind};

/// Index of a token in the stream
pub(crate) type TokenIndex = usize;

/// A top-level binding whose value is a function
#[derive(Debug, Clone)]
pub(crate) struct FunctionDecl {
    pub name: String,
    /// Tokens strictly between the parameter parentheses, or a lone identifier
    pub params: (TokenIndex, TokenIndex),
    /// Opening brace of a block body
    pub body: Option<TokenIndex>,
    /// Token whose leading comments hold the doc comment
    pub doc_anchor: TokenIndex,
}

/// `export { local as exported }` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub exported: String,
    pub local: String,
}

/// Text replacement applied when lowering to a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub span: Span,
    pub replacement: String,
}

/// Binding imported from a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportBinding {
    Default(String),
    Namespace(String),
    Named { imported: String, local: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Lexical,
    Var,
}

pub(crate) struct ModuleSyntax {
    pub tokens: Vec<Token>,
    pub matching: Vec<Option<TokenIndex>>,
    pub functions: Vec<FunctionDecl>,
    pub exports: Vec<ExportEntry>,
    pub edits: Vec<Edit>,
}

pub(crate) fn parse_module(src: &str) -> Result<ModuleSyntax, SyntaxError> {
    let tokens = tokenize(src)?;
    let matching = match_groups(&tokens)?;
    let mut parser = Parser {
        tokens: &tokens,
        matching,
        pos: 0,
        lexical: HashSet::new(),
        vars: HashSet::new(),
        functions: Vec::new(),
        exports: Vec::new(),
        edits: Vec::new(),
    };
    parser.parse()?;
    debug!(
        "Parsed module: {} functions, {} exports",
        parser.functions.len(),
        parser.exports.len()
    );

    let Parser {
        matching,
        functions,
        exports,
        edits,
        ..
    } = parser;
    Ok(ModuleSyntax {
        tokens,
        matching,
        functions,
        exports,
        edits,
    })
}

fn unexpected(token: &Token) -> SyntaxError {
    if token.is_eof() {
        SyntaxError::new(
            SyntaxReason::UnexpectedEof,
            token.line,
            token.column,
            "Unexpected end of input",
        )
    } else {
        SyntaxError::new(
            SyntaxReason::UnexpectedToken,
            token.line,
            token.column,
            format!("Unexpected token '{}'", token.describe()),
        )
    }
}

/// Pair every bracket with its partner; fails on imbalance
fn match_groups(tokens: &[Token]) -> Result<Vec<Option<TokenIndex>>, SyntaxError> {
    let mut matching = vec![None; tokens.len()];
    let mut stack: Vec<(TokenIndex, &'static str)> = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        let TokenKind::Punct(p) = &token.kind else {
            continue;
        };
        match *p {
            "(" | "[" | "{" => stack.push((index, *p)),
            ")" | "]" | "}" => {
                let expected = match *p {
                    ")" => "(",
                    "]" => "[",
                    _ => "{",
                };
                match stack.pop() {
                    Some((open, kind)) if kind == expected => {
                        matching[open] = Some(index);
                        matching[index] = Some(open);
                    }
                    _ => return Err(unexpected(token)),
                }
            }
            _ => {}
        }
    }
    if !stack.is_empty() {
        if let Some(eof) = tokens.last() {
            return Err(unexpected(eof));
        }
    }
    Ok(matching)
}

const DECLARATION_KEYWORDS: &[&str] = &["import", "export", "function", "const", "let", "var", "class"];

struct Parser<'t> {
    tokens: &'t [Token],
    matching: Vec<Option<TokenIndex>>,
    pos: TokenIndex,
    lexical: HashSet<String>,
    vars: HashSet<String>,
    functions: Vec<FunctionDecl>,
    exports: Vec<ExportEntry>,
    edits: Vec<Edit>,
}

impl<'t> Parser<'t> {
    fn tok(&self, index: TokenIndex) -> &'t Token {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn is_punct(&self, index: TokenIndex, p: &str) -> bool {
        self.tok(index).is_punct(p)
    }

    fn is_ident(&self, index: TokenIndex, name: &str) -> bool {
        self.tok(index).is_ident(name)
    }

    fn expect_punct(&self, index: TokenIndex, p: &str) -> Result<(), SyntaxError> {
        if self.is_punct(index, p) {
            Ok(())
        } else {
            Err(unexpected(self.tok(index)))
        }
    }

    fn expect_ident(&self, index: TokenIndex) -> Result<&'t str, SyntaxError> {
        self.tok(index).ident().ok_or_else(|| unexpected(self.tok(index)))
    }

    fn partner(&self, index: TokenIndex) -> Result<TokenIndex, SyntaxError> {
        self.matching
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| unexpected(self.tok(index)))
    }

    /// Index after the token, jumping over a whole group when it opens one
    fn step(&self, index: TokenIndex) -> TokenIndex {
        match self.matching.get(index).copied().flatten() {
            Some(close) if close > index => close + 1,
            _ => index + 1,
        }
    }

    fn parse(&mut self) -> Result<(), SyntaxError> {
        while !self.tok(self.pos).is_eof() {
            self.pos = self.statement(self.pos)?;
        }
        Ok(())
    }

    fn starts_declaration(&self, index: TokenIndex) -> bool {
        let token = self.tok(index);
        match token.ident() {
            Some("import") => !self.is_punct(index + 1, "(") && !self.is_punct(index + 1, "."),
            Some("async") => {
                self.is_ident(index + 1, "function") && !self.tok(index + 1).newline_before
            }
            Some(name) => DECLARATION_KEYWORDS.contains(&name),
            None => false,
        }
    }

    /// Whether a token leaves an expression open across a line break
    fn continues_expression(&self, index: TokenIndex) -> bool {
        match &self.tok(index).kind {
            TokenKind::Punct(p) => !matches!(*p, ")" | "]" | "}" | ";" | "++" | "--"),
            TokenKind::Ident(name) => matches!(
                name.as_str(),
                "return" | "typeof" | "instanceof" | "in" | "of" | "new" | "delete" | "void"
                    | "throw" | "await" | "yield" | "extends"
            ),
            _ => false,
        }
    }

    /// End of the expression or statement starting at `index`.
    ///
    /// Stops before a depth-0 `,` when `stop_at_comma` is set, after a `;`,
    /// or before a declaration keyword that begins a new line.
    fn expression_end(&self, index: TokenIndex, stop_at_comma: bool) -> TokenIndex {
        let mut i = index;
        let mut prev: Option<TokenIndex> = None;
        loop {
            let token = self.tok(i);
            if token.is_eof() {
                return i;
            }
            if let Some(prev) = prev {
                if token.newline_before
                    && self.starts_declaration(i)
                    && !self.continues_expression(prev)
                {
                    return i;
                }
            }
            if token.is_punct(";") || (stop_at_comma && token.is_punct(",")) {
                return i;
            }
            if matches!(&token.kind, TokenKind::Punct(")" | "]" | "}")) {
                // stray closer of an enclosing group
                return i;
            }
            let next = self.step(i);
            // a group counts as its closing token
            prev = Some(next - 1);
            i = next;
        }
    }

    fn skip_statement(&self, index: TokenIndex) -> TokenIndex {
        let end = self.expression_end(index, false);
        if self.is_punct(end, ";") {
            end + 1
        } else if end == index {
            index + 1
        } else {
            end
        }
    }

    fn consume_semicolon(&self, index: TokenIndex) -> TokenIndex {
        if self.is_punct(index, ";") {
            index + 1
        } else {
            index
        }
    }

    fn declare(&mut self, name: &str, kind: DeclKind, at: TokenIndex) -> Result<(), SyntaxError> {
        let clash = match kind {
            DeclKind::Lexical => self.lexical.contains(name) || self.vars.contains(name),
            DeclKind::Var => self.lexical.contains(name),
        };
        if clash {
            let token = self.tok(at);
            return Err(SyntaxError::new(
                SyntaxReason::DuplicateDeclaration,
                token.line,
                token.column,
                format!("Identifier '{}' has already been declared", name),
            ));
        }
        match kind {
            DeclKind::Lexical => self.lexical.insert(name.to_string()),
            DeclKind::Var => self.vars.insert(name.to_string()),
        };
        Ok(())
    }

    fn statement(&mut self, index: TokenIndex) -> Result<TokenIndex, SyntaxError> {
        let token = self.tok(index);
        match token.ident() {
            Some("import") if self.starts_declaration(index) => self.import_declaration(index),
            Some("export") => self.export_declaration(index),
            Some("function") => self.function_declaration(index, index, false),
            Some("async") if self.starts_declaration(index) => {
                self.function_declaration(index, index, false)
            }
            Some("const") | Some("let") | Some("var")
                if self.tok(index + 1).ident().is_some()
                    || self.is_punct(index + 1, "{")
                    || self.is_punct(index + 1, "[") =>
            {
                self.variable_declaration(index, index, false)
            }
            Some("class") => self.class_declaration(index, false),
            _ => Ok(self.skip_statement(index)),
        }
    }

    fn import_declaration(&mut self, index: TokenIndex) -> Result<TokenIndex, SyntaxError> {
        let mut i = index + 1;
        let mut bindings = Vec::new();

        if !matches!(self.tok(i).kind, TokenKind::Str(_)) {
            let clause = i;
            if let Some(name) = self.tok(i).ident() {
                if name != "from" || self.is_ident(i + 1, "from") {
                    bindings.push((ImportBinding::Default(name.to_string()), i));
                    i += 1;
                    if self.is_punct(i, ",") {
                        i += 1;
                    }
                }
            }
            if self.is_punct(i, "*") {
                if !self.is_ident(i + 1, "as") {
                    return Err(unexpected(self.tok(i + 1)));
                }
                let local = self.expect_ident(i + 2)?;
                bindings.push((ImportBinding::Namespace(local.to_string()), i + 2));
                i += 3;
            } else if self.is_punct(i, "{") {
                let close = self.partner(i)?;
                let mut j = i + 1;
                while j < close {
                    let imported = match &self.tok(j).kind {
                        TokenKind::Ident(name) => name.clone(),
                        TokenKind::Str(name) => name.clone(),
                        _ => return Err(unexpected(self.tok(j))),
                    };
                    let (local, local_at) = if self.is_ident(j + 1, "as") {
                        (self.expect_ident(j + 2)?.to_string(), j + 2)
                    } else {
                        (imported.clone(), j)
                    };
                    j = if local_at == j { j + 1 } else { j + 3 };
                    bindings.push((ImportBinding::Named { imported, local }, local_at));
                    if self.is_punct(j, ",") {
                        j += 1;
                    } else if j != close {
                        return Err(unexpected(self.tok(j)));
                    }
                }
                i = close + 1;
            }
            if i == clause {
                return Err(unexpected(self.tok(i)));
            }
            if !self.is_ident(i, "from") {
                return Err(unexpected(self.tok(i)));
            }
            i += 1;
        }

        let source = match &self.tok(i).kind {
            TokenKind::Str(source) => source.clone(),
            _ => return Err(unexpected(self.tok(i))),
        };
        i += 1;
        if (self.is_ident(i, "with") || self.is_ident(i, "assert"))
            && !self.tok(i).newline_before
            && self.is_punct(i + 1, "{")
        {
            i = self.step(i + 1);
        }
        let end = self.consume_semicolon(i);

        for (binding, at) in &bindings {
            let local = match binding {
                ImportBinding::Default(local)
                | ImportBinding::Namespace(local)
                | ImportBinding::Named { local, .. } => local,
            };
            self.declare(local, DeclKind::Lexical, *at)?;
        }

        let bindings: Vec<ImportBinding> = bindings.into_iter().map(|(b, _)| b).collect();
        self.edits.push(Edit {
            span: self.span_between(index, end),
            replacement: crate::lower::import_replacement(&source, &bindings),
        });
        Ok(end)
    }

    fn export_declaration(&mut self, index: TokenIndex) -> Result<TokenIndex, SyntaxError> {
        let i = index + 1;
        let token = self.tok(i);
        match token.ident() {
            Some("default") => self.export_default(index),
            Some("function") | Some("async")
                if token.is_ident("function") || self.is_ident(i + 1, "function") =>
            {
                self.blank_keyword(index);
                self.function_declaration(i, index, true)
            }
            Some("const") | Some("let") | Some("var") => {
                self.blank_keyword(index);
                self.variable_declaration(i, index, true)
            }
            Some("class") => {
                self.blank_keyword(index);
                self.class_declaration(i, true)
            }
            _ if token.is_punct("{") => {
                let close = self.partner(i)?;
                let mut entries = Vec::new();
                let mut j = i + 1;
                while j < close {
                    let local = match &self.tok(j).kind {
                        TokenKind::Ident(name) => name.clone(),
                        TokenKind::Str(name) => name.clone(),
                        _ => return Err(unexpected(self.tok(j))),
                    };
                    let exported = if self.is_ident(j + 1, "as") {
                        let exported = match &self.tok(j + 2).kind {
                            TokenKind::Ident(name) | TokenKind::Str(name) => name.clone(),
                            _ => return Err(unexpected(self.tok(j + 2))),
                        };
                        j += 3;
                        exported
                    } else {
                        j += 1;
                        local.clone()
                    };
                    entries.push(ExportEntry { exported, local });
                    if self.is_punct(j, ",") {
                        j += 1;
                    } else if j != close {
                        return Err(unexpected(self.tok(j)));
                    }
                }
                let mut end = close + 1;
                let reexport = self.is_ident(end, "from");
                if reexport {
                    if !matches!(self.tok(end + 1).kind, TokenKind::Str(_)) {
                        return Err(unexpected(self.tok(end + 1)));
                    }
                    end += 2;
                } else {
                    self.exports.extend(entries);
                }
                let end = self.consume_semicolon(end);
                self.blank_statement(index, end);
                Ok(end)
            }
            _ if token.is_punct("*") => {
                let end = self.skip_statement(i);
                self.blank_statement(index, end);
                Ok(end)
            }
            _ => Err(unexpected(token)),
        }
    }

    fn export_default(&mut self, index: TokenIndex) -> Result<TokenIndex, SyntaxError> {
        let i = index + 2;
        let declaration_name = |offset: TokenIndex| self.tok(i + offset).ident().is_some();
        let named_function = (self.is_ident(i, "function")
            && (declaration_name(1) || (self.is_punct(i + 1, "*") && declaration_name(2))))
            || (self.is_ident(i, "async")
                && self.is_ident(i + 1, "function")
                && declaration_name(2));
        let named_class = self.is_ident(i, "class")
            && declaration_name(1)
            && !self.is_ident(i + 1, "extends");

        let span = self.span_between(index, i);
        if named_function {
            self.edits.push(Edit {
                span,
                replacement: String::new(),
            });
            self.function_declaration(i, index, false)
        } else if named_class {
            self.edits.push(Edit {
                span,
                replacement: String::new(),
            });
            self.class_declaration(i, false)
        } else {
            self.edits.push(Edit {
                span,
                replacement: "void".to_string(),
            });
            Ok(self.skip_statement(i))
        }
    }

    fn function_declaration(
        &mut self,
        index: TokenIndex,
        doc_anchor: TokenIndex,
        exported: bool,
    ) -> Result<TokenIndex, SyntaxError> {
        let mut i = index;
        if self.is_ident(i, "async") {
            i += 1;
        }
        if !self.is_ident(i, "function") {
            return Err(unexpected(self.tok(i)));
        }
        i += 1;
        if self.is_punct(i, "*") {
            i += 1;
        }
        let name = self.expect_ident(i)?;
        let name_at = i;
        i += 1;
        self.expect_punct(i, "(")?;
        let params_close = self.partner(i)?;
        let params = (i + 1, params_close);
        let body = params_close + 1;
        self.expect_punct(body, "{")?;
        let end = self.partner(body)? + 1;

        self.declare(name, DeclKind::Lexical, name_at)?;
        self.functions.push(FunctionDecl {
            name: name.to_string(),
            params,
            body: Some(body),
            doc_anchor,
        });
        if exported {
            self.exports.push(ExportEntry {
                exported: name.to_string(),
                local: name.to_string(),
            });
        }
        Ok(end)
    }

    fn variable_declaration(
        &mut self,
        index: TokenIndex,
        doc_anchor: TokenIndex,
        exported: bool,
    ) -> Result<TokenIndex, SyntaxError> {
        let kind = if self.is_ident(index, "var") {
            DeclKind::Var
        } else {
            DeclKind::Lexical
        };
        let mut i = index + 1;
        loop {
            let target = self.tok(i);
            let mut names = Vec::new();
            let single = match &target.kind {
                TokenKind::Ident(name) => {
                    names.push((name.clone(), i));
                    i += 1;
                    Some(name.clone())
                }
                TokenKind::Punct("{") | TokenKind::Punct("[") => {
                    let close = self.partner(i)?;
                    self.pattern_names(i, close, &mut names)?;
                    i = close + 1;
                    None
                }
                _ => return Err(unexpected(target)),
            };
            for (name, at) in &names {
                self.declare(name, kind, *at)?;
                if exported {
                    self.exports.push(ExportEntry {
                        exported: name.clone(),
                        local: name.clone(),
                    });
                }
            }

            if self.is_punct(i, "=") {
                let init = i + 1;
                let end = self.expression_end(init, true);
                if let (Some(name), Some((params, body))) = (single, self.function_value(init, end)) {
                    self.functions.push(FunctionDecl {
                        name,
                        params,
                        body,
                        doc_anchor,
                    });
                }
                i = end;
            }

            if self.is_punct(i, ",") {
                i += 1;
                continue;
            }
            return Ok(self.consume_semicolon(i));
        }
    }

    /// Parameters and body of a function or arrow expression spanning `[start, end)`
    #[allow(clippy::type_complexity)]
    fn function_value(
        &self,
        start: TokenIndex,
        end: TokenIndex,
    ) -> Option<((TokenIndex, TokenIndex), Option<TokenIndex>)> {
        let mut i = start;
        if self.is_ident(i, "async") && i + 1 < end {
            i += 1;
        }
        if self.is_ident(i, "function") {
            i += 1;
            if self.is_punct(i, "*") {
                i += 1;
            }
            if self.tok(i).ident().is_some() {
                i += 1;
            }
            if !self.is_punct(i, "(") {
                return None;
            }
            let close = self.partner(i).ok()?;
            let body = close + 1;
            return self.is_punct(body, "{").then_some(((i + 1, close), Some(body)));
        }

        let (params, arrow) = if self.is_punct(i, "(") {
            let close = self.partner(i).ok()?;
            ((i + 1, close), close + 1)
        } else if self.tok(i).ident().is_some() {
            ((i, i + 1), i + 1)
        } else {
            return None;
        };
        if !self.is_punct(arrow, "=>") || arrow >= end {
            return None;
        }
        let body = self.is_punct(arrow + 1, "{").then_some(arrow + 1);
        Some((params, body))
    }

    fn class_declaration(&mut self, index: TokenIndex, exported: bool) -> Result<TokenIndex, SyntaxError> {
        let name_at = index + 1;
        let name = self.expect_ident(name_at)?;
        let mut i = name_at + 1;
        while !self.is_punct(i, "{") {
            if self.tok(i).is_eof() {
                return Err(unexpected(self.tok(i)));
            }
            i = self.step(i);
        }
        let end = self.partner(i)? + 1;
        self.declare(name, DeclKind::Lexical, name_at)?;
        if exported {
            self.exports.push(ExportEntry {
                exported: name.to_string(),
                local: name.to_string(),
            });
        }
        Ok(end)
    }

    /// Collect the names bound by an object or array pattern
    fn pattern_names(
        &self,
        open: TokenIndex,
        close: TokenIndex,
        names: &mut Vec<(String, TokenIndex)>,
    ) -> Result<(), SyntaxError> {
        let object = self.is_punct(open, "{");
        for (start, end) in self.split_commas(open + 1, close) {
            if start == end {
                continue;
            }
            if self.is_punct(start, "...") {
                let name = self.expect_ident(start + 1)?;
                names.push((name.to_string(), start + 1));
                continue;
            }
            let target = if object {
                match self.find_at_depth(start, end, ":") {
                    Some(colon) => colon + 1,
                    None => {
                        let name = self.expect_ident(start)?;
                        names.push((name.to_string(), start));
                        continue;
                    }
                }
            } else {
                start
            };
            match &self.tok(target).kind {
                TokenKind::Ident(name) => names.push((name.clone(), target)),
                TokenKind::Punct("{") | TokenKind::Punct("[") => {
                    let inner_close = self.partner(target)?;
                    self.pattern_names(target, inner_close, names)?;
                }
                _ => return Err(unexpected(self.tok(target))),
            }
        }
        Ok(())
    }

    fn find_at_depth(&self, start: TokenIndex, end: TokenIndex, p: &str) -> Option<TokenIndex> {
        find_at_depth(self.tokens, &self.matching, start, end, p)
    }

    fn split_commas(&self, start: TokenIndex, end: TokenIndex) -> Vec<(TokenIndex, TokenIndex)> {
        split_commas(self.tokens, &self.matching, start, end)
    }

    fn span_between(&self, first: TokenIndex, end: TokenIndex) -> Span {
        let last = end.saturating_sub(1).max(first);
        Span {
            start: self.tok(first).span.start,
            end: self.tok(last).span.end,
        }
    }

    fn blank_keyword(&mut self, index: TokenIndex) {
        self.edits.push(Edit {
            span: self.tok(index).span,
            replacement: String::new(),
        });
    }

    fn blank_statement(&mut self, index: TokenIndex, end: TokenIndex) {
        self.edits.push(Edit {
            span: self.span_between(index, end),
            replacement: String::new(),
        });
    }
}

/// First depth-0 occurrence of a punctuator in `[start, end)`
pub(crate) fn find_at_depth(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    start: TokenIndex,
    end: TokenIndex,
    p: &str,
) -> Option<TokenIndex> {
    let mut i = start;
    while i < end {
        if tokens[i].is_punct(p) {
            return Some(i);
        }
        i = match matching[i] {
            Some(close) if close > i => close + 1,
            _ => i + 1,
        };
    }
    None
}

/// Split `[start, end)` at depth-0 commas
pub(crate) fn split_commas(
    tokens: &[Token],
    matching: &[Option<TokenIndex>],
    start: TokenIndex,
    end: TokenIndex,
) -> Vec<(TokenIndex, TokenIndex)> {
    let mut parts = Vec::new();
    let mut part_start = start;
    let mut i = start;
    while i < end {
        if tokens[i].is_punct(",") {
            parts.push((part_start, i));
            part_start = i + 1;
            i += 1;
            continue;
        }
        i = match matching[i] {
            Some(close) if close > i => close + 1,
            _ => i + 1,
        };
    }
    if part_start < end {
        parts.push((part_start, end));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(src: &str) -> Vec<String> {
        parse_module(src)
            .unwrap()
            .exports
            .into_iter()
            .map(|e| e.exported)
            .collect()
    }

    #[test]
    fn test_export_forms() {
        let src = r#"
import { exec, task as t } from 'bunosh';
import fs from 'fs';

export function build() {}
export async function deploy(env) { await exec`deploy ${env}`; }
export const lint = () => exec`eslint .`;
const helper = function () {};
function internal() {}
export { internal, helper as assist };
export default function main() {}
"#;
        assert_eq!(
            names(src),
            vec!["build", "deploy", "lint", "internal", "assist"]
        );
        let module = parse_module(src).unwrap();
        let functions: Vec<_> = module.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            functions,
            vec!["build", "deploy", "lint", "helper", "internal", "main"]
        );
    }

    #[test]
    fn test_statements_without_semicolons() {
        let src = "const a = 1\nconst b = a +\n  2\nif (a) { run() }\nexport function c() {}\n";
        assert_eq!(names(src), vec!["c"]);
    }

    #[test]
    fn test_group_ending_statement_without_semicolon() {
        let src = "export const x = () => {}\nexport function c() {}\n";
        assert_eq!(names(src), vec!["x", "c"]);

        let src = "const o = { a: 1 }\nexport function c() {}\n";
        assert_eq!(names(src), vec!["c"]);

        let src = "const list = [1, 2]\nexport async function d() {}\n";
        assert_eq!(names(src), vec!["d"]);
    }

    #[test]
    fn test_duplicate_lexical_declaration() {
        let err = parse_module("const a = 1;\nfunction b() {}\nlet a = 2;").err().unwrap();
        assert_eq!(err.reason, SyntaxReason::DuplicateDeclaration);
        assert_eq!((err.line, err.column), (3, 5));
        assert!(err.message.contains("'a'"));
    }

    #[test]
    fn test_duplicate_function_and_import() {
        let err = parse_module("import { exec } from 'bunosh';\nexport function exec() {}")
            .err()
            .unwrap();
        assert_eq!(err.reason, SyntaxReason::DuplicateDeclaration);

        let err = parse_module("export function a() {}\nexport function a() {}")
            .err()
            .unwrap();
        assert_eq!(err.reason, SyntaxReason::DuplicateDeclaration);
    }

    #[test]
    fn test_var_redeclaration_is_allowed() {
        assert!(parse_module("var a = 1; var a = 2;").is_ok());
        assert!(parse_module("var a = 1; let a = 2;").is_err());
    }

    #[test]
    fn test_destructuring_declarations() {
        let err = parse_module("const { a, b: [c, ...d] } = obj;\nlet d = 1;").err().unwrap();
        assert_eq!(err.reason, SyntaxReason::DuplicateDeclaration);
        assert!(err.message.contains("'d'"));
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse_module("export function a() {\n  if (x) {\n}\n").err().unwrap();
        assert_eq!(err.reason, SyntaxReason::UnexpectedEof);

        let err = parse_module("export function a() {}\n}").err().unwrap();
        assert_eq!(err.reason, SyntaxReason::UnexpectedToken);
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_malformed_export() {
        let err = parse_module("export 42;").err().unwrap();
        assert_eq!(err.reason, SyntaxReason::UnexpectedToken);
        assert_eq!(err.message, "Unexpected token 'number'");
    }

    #[test]
    fn test_dynamic_import_is_an_expression() {
        assert_eq!(
            names("import('./x.js').then(m => m);\nexport function a() {}"),
            vec!["a"]
        );
    }

    #[test]
    fn test_reexports_are_not_local() {
        assert!(names("export { a } from './other.js';\nexport * from './x.js';").is_empty());
    }
}
