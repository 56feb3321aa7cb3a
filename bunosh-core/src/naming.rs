//! Name transformations between JavaScript identifiers and CLI tokens

/// Convert a camelCase identifier to a dash-separated lowercase token.
///
/// A dash is inserted where an uppercase letter follows a lowercase letter
/// or digit: `helloWorld` → `hello-world`, `forceRun` → `force-run`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if matches!(prev, Some(p) if p.is_lowercase() || p.is_ascii_digit()) {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}
