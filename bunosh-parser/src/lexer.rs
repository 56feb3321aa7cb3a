//! JavaScript tokenizer
//!
//! Produces a flat token stream for module-level analysis. Template literals
//! (including nested `${}` substitutions) and regular expressions are each
//! consumed as a single token. Comments are kept as leading trivia on the
//! token that follows them.

use crate::error::{SyntaxError, SyntaxReason};

/// Byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A comment preceding a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Text between the delimiters
    pub text: String,
    pub block: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident(String),
    /// `#name` class member
    PrivateName(String),
    Punct(&'static str),
    /// String literal, escapes decoded
    Str(String),
    Number(f64),
    Template,
    Regex,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    /// A line terminator appears between the previous token and this one
    pub newline_before: bool,
    pub comments: Vec<Comment>,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == name)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Short rendering for error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::PrivateName(s) => format!("#{}", s),
            TokenKind::Punct(p) => p.to_string(),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Number(_) => "number".to_string(),
            TokenKind::Template => "template".to_string(),
            TokenKind::Regex => "regular expression".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

/// Keywords after which a `/` starts a regular expression
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Tokenize a whole source file; the last token is always `Eof`
pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let eof = token.is_eof();
        tokens.push(token);
        if eof {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    regex_allowed: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut lexer = Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            regex_allowed: true,
        };
        if src.starts_with('\u{feff}') {
            lexer.pos = '\u{feff}'.len_utf8();
        }
        if lexer.rest().starts_with("#!") {
            while let Some(ch) = lexer.peek() {
                if ch == '\n' {
                    break;
                }
                lexer.bump();
            }
        }
        lexer
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, reason: SyntaxReason, line: usize, column: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(reason, line, column, message)
    }

    /// Skip whitespace and comments; returns collected comments and whether a newline was seen
    fn skip_trivia(&mut self) -> Result<(Vec<Comment>, bool), SyntaxError> {
        let mut comments = Vec::new();
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n') | Some('\r') | Some('\u{2028}') | Some('\u{2029}') => {
                    newline = true;
                    self.bump();
                }
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    let body_start = self.pos;
                    while let Some(ch) = self.peek() {
                        if ch == '\n' || ch == '\r' {
                            break;
                        }
                        self.bump();
                    }
                    comments.push(Comment {
                        text: self.src[body_start..self.pos].to_string(),
                        block: false,
                        span: Span { start, end: self.pos },
                    });
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    let body_start = self.pos;
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error(
                                    SyntaxReason::UnterminatedComment,
                                    line,
                                    column,
                                    "Unterminated comment",
                                ))
                            }
                            Some('*') if self.peek_at(1) == Some('/') => {
                                let body_end = self.pos;
                                self.bump();
                                self.bump();
                                comments.push(Comment {
                                    text: self.src[body_start..body_end].to_string(),
                                    block: true,
                                    span: Span { start, end: self.pos },
                                });
                                break;
                            }
                            Some('\n') => {
                                newline = true;
                                self.bump();
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok((comments, newline)),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let (comments, newline_before) = self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let start = self.pos;

        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(ch) if is_ident_start(ch) => TokenKind::Ident(self.read_ident()),
            Some('\\') if self.peek_at(1) == Some('u') => TokenKind::Ident(self.read_ident()),
            Some('#') if self.peek_at(1).is_some_and(is_ident_start) => {
                self.bump();
                TokenKind::PrivateName(self.read_ident())
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(line, column)?,
            Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(line, column)?
            }
            Some(quote @ ('"' | '\'')) => self.read_string(quote, line, column)?,
            Some('`') => {
                self.read_template(line, column)?;
                TokenKind::Template
            }
            Some('/') if self.regex_allowed => {
                self.read_regex(line, column)?;
                TokenKind::Regex
            }
            Some(ch) => match PUNCTUATORS.iter().find(|p| self.rest().starts_with(**p)) {
                Some(p) => {
                    // `?.5` is a conditional followed by a number
                    if *p == "?." && self.peek_at(2).is_some_and(|c| c.is_ascii_digit()) {
                        self.bump();
                        TokenKind::Punct("?")
                    } else {
                        for _ in 0..p.len() {
                            self.bump();
                        }
                        TokenKind::Punct(*p)
                    }
                }
                None => {
                    return Err(self.error(
                        SyntaxReason::InvalidCharacter,
                        line,
                        column,
                        format!("Invalid or unexpected character '{}'", ch.escape_default()),
                    ))
                }
            },
        };

        self.regex_allowed = match &kind {
            TokenKind::Ident(name) => REGEX_PRECEDING_KEYWORDS.contains(&name.as_str()),
            TokenKind::Punct(p) => !matches!(*p, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Eof => true,
            _ => false,
        };

        Ok(Token {
            kind,
            span: Span {
                start,
                end: self.pos,
            },
            line,
            column,
            newline_before,
            comments,
        })
    }

    fn read_ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if is_ident_part(ch) {
                name.push(ch);
                self.bump();
            } else if ch == '\\' && self.peek_at(1) == Some('u') {
                self.bump();
                self.bump();
                match self.read_unicode_escape() {
                    Some(decoded) => name.push(decoded),
                    None => break,
                }
            } else {
                break;
            }
        }
        name
    }

    fn read_number(&mut self, line: usize, column: usize) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_digit(radix) || c == '_') {
                self.bump();
            }
            let digits: String = self.src[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            if self.peek() == Some('n') {
                self.bump();
            }
            let value = u64::from_str_radix(&digits, radix).map_err(|_| {
                self.error(SyntaxReason::InvalidCharacter, line, column, "Invalid number literal")
            })?;
            self.ensure_number_end(line, column)?;
            return Ok(TokenKind::Number(value as f64));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..=digit_at {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if self.peek() == Some('n') {
            self.bump();
        }
        self.ensure_number_end(line, column)?;
        let value = text.parse::<f64>().map_err(|_| {
            self.error(SyntaxReason::InvalidCharacter, line, column, "Invalid number literal")
        })?;
        Ok(TokenKind::Number(value))
    }

    fn ensure_number_end(&self, line: usize, column: usize) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(ch) if is_ident_start(ch) || ch.is_ascii_digit() => Err(self.error(
                SyntaxReason::InvalidCharacter,
                line,
                column,
                "Identifier directly after number",
            )),
            _ => Ok(()),
        }
    }

    fn read_unicode_escape(&mut self) -> Option<char> {
        let code = if self.peek() == Some('{') {
            self.bump();
            let mut hex = String::new();
            while let Some(ch) = self.peek() {
                self.bump();
                if ch == '}' {
                    break;
                }
                hex.push(ch);
            }
            u32::from_str_radix(&hex, 16).ok()?
        } else {
            let mut hex = String::new();
            for _ in 0..4 {
                hex.push(self.bump()?);
            }
            u32::from_str_radix(&hex, 16).ok()?
        };
        char::from_u32(code).or(Some('\u{fffd}'))
    }

    fn read_string(&mut self, quote: char, line: usize, column: usize) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return Err(self.error(
                        SyntaxReason::UnterminatedString,
                        line,
                        column,
                        "Unterminated string constant",
                    ))
                }
                Some(ch) if ch == quote => {
                    self.bump();
                    return Ok(TokenKind::Str(value));
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        None => continue,
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('b') => value.push('\u{8}'),
                        Some('f') => value.push('\u{c}'),
                        Some('v') => value.push('\u{b}'),
                        Some('0') => value.push('\0'),
                        Some('x') => {
                            let hex: String = [self.bump(), self.bump()].iter().flatten().collect();
                            if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                                value.push(ch);
                            }
                        }
                        Some('u') => {
                            if let Some(ch) = self.read_unicode_escape() {
                                value.push(ch);
                            }
                        }
                        Some('\r') => {
                            if self.peek() == Some('\n') {
                                self.bump();
                            }
                        }
                        Some('\n') => {}
                        Some(other) => value.push(other),
                    }
                }
                Some(ch) => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
    }

    fn read_template(&mut self, line: usize, column: usize) -> Result<(), SyntaxError> {
        let unterminated = |lexer: &Self| {
            lexer.error(
                SyntaxReason::UnterminatedTemplate,
                line,
                column,
                "Unterminated template",
            )
        };

        self.bump();
        loop {
            match self.peek() {
                None => return Err(unterminated(self)),
                Some('`') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    self.regex_allowed = true;
                    let mut depth = 0usize;
                    loop {
                        let token = self.next_token()?;
                        match &token.kind {
                            TokenKind::Eof => return Err(unterminated(self)),
                            TokenKind::Punct("{") => depth += 1,
                            TokenKind::Punct("}") if depth == 0 => break,
                            TokenKind::Punct("}") => depth -= 1,
                            _ => {}
                        }
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn read_regex(&mut self, line: usize, column: usize) -> Result<(), SyntaxError> {
        let unterminated = |lexer: &Self| {
            lexer.error(
                SyntaxReason::UnterminatedRegexp,
                line,
                column,
                "Unterminated regular expression",
            )
        };

        self.bump();
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => return Err(unterminated(self)),
                Some('\\') => {
                    self.bump();
                    if matches!(self.peek(), None | Some('\n')) {
                        return Err(unterminated(self));
                    }
                    self.bump();
                }
                Some('[') => {
                    in_class = true;
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    self.bump();
                }
                Some('/') if !in_class => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        Ok(())
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_alphabetic()
}

fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_alphanumeric() || ch == '\u{200c}' || ch == '\u{200d}'
}
