//! Finding and parsing Bunoshfiles
//!
//! `Bunoshfile.js` is the root file; siblings named `Bunoshfile.<ns>.js`
//! contribute commands under namespace `<ns>`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use bunosh_parser::{parse_source, SourceFile, SyntaxError};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

pub const BUNOSHFILE: &str = "Bunoshfile.js";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("{} not found in {}", BUNOSHFILE, .dir.display())]
    NotFound { dir: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build commands from {}: {error}", .path.display())]
    Syntax { path: PathBuf, error: SyntaxError },
}

/// One parsed Bunoshfile
#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    /// Empty for the root file
    pub namespace: String,
    pub source: SourceFile,
}

/// Every Bunoshfile of a project
#[derive(Debug)]
pub struct Discovery {
    /// Directory the files live in; commands run relative to it
    pub dir: PathBuf,
    pub files: Vec<LoadedFile>,
}

/// Locate the root file: `start` may name the file itself or its directory
pub fn locate(start: Option<&Path>, cwd: &Path) -> (PathBuf, PathBuf) {
    let start = match start {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.to_path_buf(),
    };
    if start.is_dir() {
        let file = start.join(BUNOSHFILE);
        (start, file)
    } else {
        let dir = start
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        (dir, start)
    }
}

/// Read and parse the root file and its namespaced siblings
pub fn discover(start: Option<&Path>, cwd: &Path) -> Result<Discovery, DiscoveryError> {
    let (dir, root) = locate(start, cwd);
    if !root.is_file() {
        return Err(DiscoveryError::NotFound { dir });
    }

    let mut files = vec![load(&root, String::new())?];
    for (namespace, path) in namespaced_files(&dir)? {
        files.push(load(&path, namespace)?);
    }
    debug!("Discovered {} Bunoshfile(s) in {}", files.len(), dir.display());
    Ok(Discovery { dir, files })
}

static NAMESPACED_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Bunoshfile\.([A-Za-z0-9_-]+)\.js$").expect("namespace pattern is valid")
});

fn namespaced_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(captures) = NAMESPACED_FILE.captures(&name) {
            found.push((captures[1].to_string(), entry.path()));
        }
    }
    found.sort();
    Ok(found)
}

fn load(path: &Path, namespace: String) -> Result<LoadedFile, DiscoveryError> {
    let text = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let source = parse_source(&text).map_err(|error| DiscoveryError::Syntax {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(LoadedFile {
        path: path.to_path_buf(),
        namespace,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovers_namespaced_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BUNOSHFILE), "export function build() {}").unwrap();
        std::fs::write(dir.path().join("Bunoshfile.dev.js"), "export function serve() {}").unwrap();
        std::fs::write(dir.path().join("Bunoshfile.js.bak"), "broken {").unwrap();

        let discovery = discover(None, dir.path()).unwrap();
        let namespaces: Vec<_> = discovery.files.iter().map(|f| f.namespace.as_str()).collect();
        assert_eq!(namespaces, vec!["", "dev"]);
        assert_eq!(discovery.files[1].source.exported_names(), vec!["serve"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(None, dir.path()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { .. }));
    }

    #[test]
    fn test_syntax_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BUNOSHFILE), "export function build( {").unwrap();
        match discover(None, dir.path()).unwrap_err() {
            DiscoveryError::Syntax { path, .. } => assert!(path.ends_with(BUNOSHFILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("tasks.js");
        std::fs::write(&custom, "export function a() {}").unwrap();
        let discovery = discover(Some(&custom), Path::new("/")).unwrap();
        assert_eq!(discovery.dir, dir.path());
        assert_eq!(discovery.files.len(), 1);
    }
}
