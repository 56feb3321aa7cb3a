//! Lowering a Bunoshfile module to a classic script
//!
//! The embedded engine evaluates scripts, not modules. Export keywords are
//! erased, export lists dropped and imports rewritten into reads from
//! globals. Every replacement keeps the line structure of the original so
//! runtime error locations still point at the user's source.

use crate::parser::{Edit, ImportBinding};

/// Global object exposing the bunosh API to scripts
pub const BUNOSH_GLOBAL: &str = "globalThis.bunosh";

/// Loader for modules other than bunosh itself
pub const MODULE_LOADER: &str = "globalThis.__bunosh_module";

fn is_bunosh_module(source: &str) -> bool {
    source == "bunosh" || source.starts_with("bunosh/")
}

pub(crate) fn import_replacement(source: &str, bindings: &[ImportBinding]) -> String {
    let target = if is_bunosh_module(source) {
        BUNOSH_GLOBAL.to_string()
    } else {
        format!("{}({})", MODULE_LOADER, js_string(source))
    };

    let mut statements = Vec::new();
    let mut named = Vec::new();
    for binding in bindings {
        match binding {
            ImportBinding::Default(local) | ImportBinding::Namespace(local) => {
                statements.push(format!("const {} = {};", local, target));
            }
            ImportBinding::Named { imported, local } if imported == local => {
                named.push(local.clone());
            }
            ImportBinding::Named { imported, local } => {
                named.push(format!("{}: {}", js_string(imported), local));
            }
        }
    }
    if !named.is_empty() {
        statements.push(format!("const {{ {} }} = {};", named.join(", "), target));
    }
    statements.join(" ")
}

fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Apply edits to the source, keeping the number of lines unchanged
pub(crate) fn apply_edits(src: &str, edits: &[Edit]) -> String {
    let mut edits: Vec<&Edit> = edits.iter().collect();
    edits.sort_by_key(|e| e.span.start);

    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            continue;
        }
        out.push_str(&src[cursor..edit.span.start]);
        let original = &src[edit.span.start..edit.span.end];
        out.push_str(&edit.replacement);

        let newlines = original.matches('\n').count();
        if newlines > 0 {
            out.push_str(&"\n".repeat(newlines));
        } else {
            let width = original.chars().count();
            let used = edit.replacement.chars().count();
            if width > used {
                out.push_str(&" ".repeat(width - used));
            }
        }
        cursor = edit.span.end;
    }
    out.push_str(&src[cursor..]);
    out
}
