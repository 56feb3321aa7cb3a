//! Bunoshfile source parser
//!
//! Statically reads a JavaScript module and recovers, for each exported
//! function, its positional parameters with defaults, the options object
//! flattened into CLI flags, and its doc comment. The same parse also
//! lowers the module into a classic script the embedded engine can run.
//!
//! ```
//! use bunosh_parser::parse_source;
//!
//! let file = parse_source("/** Greets */\nexport function greet(name = 'World') {}").unwrap();
//! let greet = file.function("greet");
//! assert_eq!(greet.doc_comment.as_deref(), Some("Greets"));
//! ```

pub mod error;
pub mod extract;
pub mod lexer;
pub mod lower;
pub mod parser;

pub use error::{ErrorCategory, SyntaxError, SyntaxReason};
pub use extract::{Param, ParsedFunction};
pub use parser::ExportEntry;

use parser::ModuleSyntax;

/// A parsed Bunoshfile
pub struct SourceFile {
    text: String,
    syntax: ModuleSyntax,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("exports", &self.syntax.exports)
            .finish_non_exhaustive()
    }
}

/// Parse a source file; fails only on malformed source
pub fn parse_source(text: &str) -> Result<SourceFile, SyntaxError> {
    let syntax = parser::parse_module(text)?;
    Ok(SourceFile {
        text: text.to_string(),
        syntax,
    })
}

/// Parse and extract a single function in one step
pub fn parse_function(text: &str, name: &str) -> Result<ParsedFunction, SyntaxError> {
    Ok(parse_source(text)?.function(name))
}

impl SourceFile {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Named exports in declaration order
    pub fn exports(&self) -> &[ExportEntry] {
        &self.syntax.exports
    }

    pub fn exported_names(&self) -> Vec<&str> {
        self.syntax
            .exports
            .iter()
            .map(|e| e.exported.as_str())
            .collect()
    }

    /// Local binding behind an exported name
    pub fn local_name(&self, exported: &str) -> Option<&str> {
        self.syntax
            .exports
            .iter()
            .find(|e| e.exported == exported)
            .map(|e| e.local.as_str())
    }

    /// Signature of an exported function; empty when the name is unknown
    pub fn function(&self, name: &str) -> ParsedFunction {
        let local = self.local_name(name).unwrap_or(name);
        match self.syntax.functions.iter().find(|f| f.name == local) {
            Some(decl) => extract::extract(&self.syntax.tokens, &self.syntax.matching, name, decl),
            None => ParsedFunction::empty(name),
        }
    }

    /// Signatures of every exported function, in export order
    pub fn functions(&self) -> Vec<ParsedFunction> {
        self.syntax
            .exports
            .iter()
            .filter(|e| self.syntax.functions.iter().any(|f| f.name == e.local))
            .map(|e| self.function(&e.exported))
            .collect()
    }

    /// The module rewritten as a classic script
    pub fn to_script(&self) -> String {
        lower::apply_edits(&self.text, &self.syntax.edits)
    }
}
