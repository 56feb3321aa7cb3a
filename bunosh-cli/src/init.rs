//! `bunosh init`

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::discovery::BUNOSHFILE;

pub const TEMPLATE: &str = r#"import { exec, fetch, writeToFile, task, say } from 'bunosh';

/**
 * Says hello
 */
export async function hello(name = 'World') {
  say(`Hello, ${name}!`);
}

/**
 * Builds the project
 * @param env target environment
 */
export async function build(env = 'development', opts = { verbose: false }) {
  await task('Install dependencies', () => exec`npm install`);
  await exec`npm run build`.env({ NODE_ENV: env });
  if (opts.verbose) say(`Built for ${env}`);
}

/**
 * Writes a release note
 */
export async function notes(version) {
  await writeToFile('RELEASE.md', line => {
    line`# Release ${version}`;
    line``;
  });
}
"#;

/// Write the template into `dir`; refuses to overwrite
pub fn init(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(BUNOSHFILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::write(&path, TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_into_commands() {
        let file = bunosh_parser::parse_source(TEMPLATE).unwrap();
        assert_eq!(file.exported_names(), vec!["hello", "build", "notes"]);
        let build = file.function("build");
        assert_eq!(build.summary(), Some("Builds the project"));
        assert_eq!(build.options().unwrap()[0].flag, "verbose");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), TEMPLATE);
        assert!(init(dir.path()).is_err());
    }
}
