//! Global flags
//!
//! Subcommands depend on the Bunoshfile, so the flags that locate it are
//! read before `clap` sees the command line.

use clap::{Arg, ArgAction};
use std::path::PathBuf;

pub const BUNOSHFILE_FLAG: &str = "bunoshfile";
pub const CONFIG_FLAG: &str = "config";
pub const LOG_LEVEL_FLAG: &str = "log-level";

/// Flags no Bunoshfile option may take over
pub const RESERVED_FLAGS: &[&str] = &["help", "version", BUNOSHFILE_FLAG, CONFIG_FLAG, LOG_LEVEL_FLAG];

/// Flags known before discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Path to the Bunoshfile or the directory holding it
    pub bunoshfile: Option<PathBuf>,
    /// Path to a YAML configuration file
    pub config: Option<PathBuf>,
    /// Log level override (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

impl GlobalArgs {
    /// Scan raw arguments (without the program name) for global flags.
    /// Both `--flag value` and `--flag=value` are accepted; scanning stops
    /// at `--`.
    pub fn prescan<S: AsRef<str>>(args: &[S]) -> Self {
        let mut globals = GlobalArgs::default();
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                break;
            }
            let Some(flag) = arg.strip_prefix("--") else {
                continue;
            };
            let (name, inline) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };
            let slot = match name {
                BUNOSHFILE_FLAG | CONFIG_FLAG | LOG_LEVEL_FLAG => name,
                _ => continue,
            };
            let Some(value) = inline.or_else(|| iter.next().map(str::to_string)) else {
                continue;
            };
            match slot {
                BUNOSHFILE_FLAG => globals.bunoshfile = Some(PathBuf::from(value)),
                CONFIG_FLAG => globals.config = Some(PathBuf::from(value)),
                _ => globals.log_level = Some(value),
            }
        }
        globals
    }
}

/// First argument naming a subcommand, skipping global flags and their values
pub fn requested_command<S: AsRef<str>>(args: &[S]) -> Option<&str> {
    let mut skip_value = false;
    for arg in args {
        let arg = arg.as_ref();
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--" {
            return None;
        }
        if let Some(flag) = arg.strip_prefix("--") {
            skip_value = !flag.contains('=')
                && matches!(flag, BUNOSHFILE_FLAG | CONFIG_FLAG | LOG_LEVEL_FLAG);
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return Some(arg);
    }
    None
}

/// Global flags as `clap` arguments, so parsing accepts them anywhere
pub fn global_args() -> Vec<Arg> {
    vec![
        Arg::new(BUNOSHFILE_FLAG)
            .long(BUNOSHFILE_FLAG)
            .value_name("PATH")
            .help("Path to the Bunoshfile or its directory")
            .global(true)
            .action(ArgAction::Set),
        Arg::new(CONFIG_FLAG)
            .long(CONFIG_FLAG)
            .value_name("PATH")
            .help("Path to a YAML configuration file")
            .global(true)
            .action(ArgAction::Set),
        Arg::new(LOG_LEVEL_FLAG)
            .long(LOG_LEVEL_FLAG)
            .value_name("LEVEL")
            .help("Set the log level (trace, debug, info, warn, error)")
            .global(true)
            .action(ArgAction::Set),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescan_both_forms() {
        let globals = GlobalArgs::prescan(&[
            "build",
            "--bunoshfile",
            "ci/Bunoshfile.js",
            "--config=bunosh.yaml",
            "--log-level",
            "debug",
        ]);
        assert_eq!(globals.bunoshfile, Some(PathBuf::from("ci/Bunoshfile.js")));
        assert_eq!(globals.config, Some(PathBuf::from("bunosh.yaml")));
        assert_eq!(globals.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_requested_command_skips_global_values() {
        assert_eq!(requested_command(&["--config", "init", "build"]), Some("build"));
        assert_eq!(requested_command(&["--log-level=debug", "init"]), Some("init"));
        assert_eq!(requested_command(&["--help"]), None);
        assert_eq!(requested_command::<&str>(&[]), None);
    }

    #[test]
    fn test_prescan_ignores_other_flags_and_stops_at_separator() {
        let globals = GlobalArgs::prescan(&["deploy", "--force", "--", "--config", "x.yaml"]);
        assert_eq!(globals, GlobalArgs::default());

        let dangling = GlobalArgs::prescan(&["--bunoshfile"]);
        assert_eq!(dangling.bunoshfile, None);
    }
}
