//! Grouped help listing

use std::collections::BTreeMap;
use std::fmt::Write;

use bunosh_core::{Command, CommandKind};
use colored::Colorize;

/// Help text: main commands, one group per namespace, then npm scripts
pub fn render_help(commands: &[Command]) -> String {
    let mut main = Vec::new();
    let mut namespaced: BTreeMap<&str, Vec<&Command>> = BTreeMap::new();
    let mut npm = Vec::new();
    for command in commands {
        match command.kind() {
            CommandKind::Npm => npm.push(command),
            CommandKind::Bunosh if command.namespace().is_empty() => main.push(command),
            CommandKind::Bunosh => namespaced.entry(command.namespace()).or_default().push(command),
        }
    }

    let width = commands
        .iter()
        .map(|c| usage(c).chars().count())
        .chain(std::iter::once("init".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{} bunosh <command> [args] [options]\n", "Usage:".bold());

    let _ = writeln!(out, "{}", "Commands:".bold());
    for command in main {
        write_entry(&mut out, command, width);
    }
    let _ = writeln!(
        out,
        "  {}{}  {}",
        "init".cyan(),
        " ".repeat(width.saturating_sub("init".len())),
        "Create a Bunoshfile.js in the current directory".dimmed()
    );

    for (namespace, commands) in namespaced {
        let _ = writeln!(out, "\n{}", format!("Commands ({}):", namespace).bold());
        for command in commands {
            write_entry(&mut out, command, width);
        }
    }

    if !npm.is_empty() {
        let _ = writeln!(out, "\n{}", "npm scripts:".bold());
        for command in npm {
            write_entry(&mut out, command, width);
        }
    }

    let _ = writeln!(out, "\n{}", "Options:".bold());
    let _ = writeln!(out, "  --bunoshfile <PATH>  Path to the Bunoshfile or its directory");
    let _ = writeln!(out, "  --config <PATH>      Path to a YAML configuration file");
    let _ = writeln!(out, "  --log-level <LEVEL>  Set the log level");
    let _ = writeln!(out, "  -h, --help           Print help");
    let _ = write!(out, "  -V, --version        Print version");
    out
}

/// Command name followed by its positional parameters
fn usage(command: &Command) -> String {
    let mut text = command.cli_name();
    for arg in command.args() {
        if arg.is_required() {
            let _ = write!(text, " <{}>", arg.name);
        } else {
            let _ = write!(text, " [{}]", arg.name);
        }
    }
    text
}

fn write_entry(out: &mut String, command: &Command, width: usize) {
    let usage = usage(command);
    let padding = width.saturating_sub(usage.chars().count());
    let _ = writeln!(
        out,
        "  {}{}  {}",
        usage.cyan(),
        " ".repeat(padding),
        command.summary().unwrap_or_default().dimmed()
    );
}
