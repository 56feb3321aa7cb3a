//! Command registry and the `clap` surface built from it

use bunosh_core::{ArgSpec, Command, Literal, OptionSpec};
use clap::{Arg, ArgAction, ArgMatches};
use serde_json::{Map, Value};
use tracing::warn;

use crate::cli::{global_args, RESERVED_FLAGS};
use crate::help::render_help;

pub const INIT_COMMAND: &str = "init";

/// Every command available in this invocation, sorted by CLI name
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    /// Commands named `init` or repeating an earlier name are dropped
    pub fn new(mut commands: Vec<Command>) -> Self {
        commands.sort_by_key(|c| c.cli_name());
        let mut kept: Vec<Command> = Vec::with_capacity(commands.len());
        for command in commands {
            let name = command.cli_name();
            if name == INIT_COMMAND || kept.last().is_some_and(|c| c.cli_name() == name) {
                warn!("Skipping '{}': the command name is already taken", command.full_name());
                continue;
            }
            kept.push(command);
        }
        Self { commands: kept }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn find(&self, cli_name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.cli_name() == cli_name)
    }

    /// Root `clap` command with one subcommand per registered command
    pub fn build_cli(&self) -> clap::Command {
        let mut root = clap::Command::new("bunosh")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Run exported Bunoshfile functions as commands")
            .disable_help_subcommand(true)
            .override_help(render_help(&self.commands))
            .args(global_args())
            .subcommand(
                clap::Command::new(INIT_COMMAND).about("Create a Bunoshfile.js in the current directory"),
            );
        for command in &self.commands {
            root = root.subcommand(subcommand(command));
        }
        root
    }
}

fn arg_id(spec: &ArgSpec) -> String {
    format!("arg:{}", spec.name)
}

fn option_id(spec: &OptionSpec) -> String {
    format!("opt:{}", spec.flag)
}

fn is_reserved(spec: &OptionSpec) -> bool {
    RESERVED_FLAGS.contains(&spec.flag.as_str())
}

fn subcommand(command: &Command) -> clap::Command {
    let mut sub = clap::Command::new(command.cli_name());
    if let Some(summary) = command.summary() {
        sub = sub.about(summary.to_string());
    }
    if let Some(comment) = command.comment() {
        sub = sub.long_about(comment.to_string());
    }

    for spec in command.args() {
        let mut arg = Arg::new(arg_id(spec))
            .value_name(spec.name.clone())
            .action(ArgAction::Set);
        arg = match &spec.default {
            None => arg.required(true),
            Some(Literal::Null) => arg.required(false),
            Some(literal) => arg.required(false).default_value(literal.to_string()),
        };
        sub = sub.arg(arg);
    }

    for spec in command.options() {
        if is_reserved(spec) {
            warn!(
                "Option --{} of {} collides with a global flag and is ignored",
                spec.flag,
                command.cli_name()
            );
            continue;
        }
        let arg = Arg::new(option_id(spec)).long(spec.flag.clone());
        let arg = if spec.default.is_flag() {
            arg.action(ArgAction::SetTrue)
        } else {
            arg.action(ArgAction::Set)
                .value_name("VALUE")
                .default_value(spec.default.to_string())
        };
        sub = sub.arg(arg);
    }
    sub
}

/// Interpret a command line value using the declared default's type
fn typed_value(raw: &str, default: Option<&Literal>) -> Value {
    match default {
        Some(Literal::Number(_)) => raw
            .parse::<f64>()
            .ok()
            .map(|n| Literal::Number(n).to_json())
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(Literal::Bool(_)) => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

/// Arguments for a call, rebuilt from parsed matches
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<Value>,
}

impl Invocation {
    /// Positional values in declared order, then the options object.
    ///
    /// A missing optional argument is passed as `null`, which leaves the
    /// function's own default in effect.
    pub fn from_matches(command: &Command, matches: &ArgMatches) -> Self {
        let mut args: Vec<Value> = command
            .args()
            .iter()
            .map(|spec| match matches.get_one::<String>(&arg_id(spec)) {
                Some(raw) => typed_value(raw, spec.default.as_ref()),
                None => spec.default.as_ref().map(Literal::to_json).unwrap_or(Value::Null),
            })
            .collect();

        if command.takes_options() {
            let mut options = Map::new();
            for spec in command.options() {
                let key = spec.key.clone();
                if is_reserved(spec) {
                    options.insert(key, spec.default.to_json());
                    continue;
                }
                let id = option_id(spec);
                let value = match &spec.default {
                    Literal::Bool(_) => Value::Bool(matches.get_flag(&id)),
                    Literal::Null if matches.get_flag(&id) => Value::Bool(true),
                    Literal::Null => Value::Null,
                    default => matches
                        .get_one::<String>(&id)
                        .map(|raw| typed_value(raw, Some(default)))
                        .unwrap_or_else(|| default.to_json()),
                };
                options.insert(key, value);
            }
            args.push(Value::Object(options));
        }
        Self { args }
    }
}
