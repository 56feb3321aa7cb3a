//! One bunosh invocation from argument list to exit code

use std::path::PathBuf;
use std::sync::Arc;

use bunosh_config::{BunoshConfig, ConfigLoader, OutputMode};
use bunosh_core::{
    Command, NullReporter, Reporter, RuntimeContext, RuntimeOptions, TaskEngine, TaskKind,
    TaskOptions,
};
use bunosh_http::{HttpManager, ProviderRegistry};
use bunosh_js::{commands_from_source, JsRuntime, JsServices};
use clap::error::ErrorKind;
use colored::Colorize;
use tracing::{debug, info};

use crate::cli::{requested_command, GlobalArgs};
use crate::diagnostics::{config_diagnostic, discovery_diagnostic};
use crate::discovery::{discover, locate, DiscoveryError};
use crate::init::init;
use crate::logging::init_tracing;
use crate::npm::npm_commands;
use crate::registry::{Invocation, Registry, INIT_COMMAND};
use crate::reporter::{CiReporter, ConsoleReporter};

type ExitHandler = Arc<dyn Fn(i32) + Send + Sync>;

/// Runs the CLI against a working directory
pub struct App {
    cwd: PathBuf,
    reporter: Option<Arc<dyn Reporter>>,
    exit_handler: Option<ExitHandler>,
}

impl App {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            reporter: None,
            exit_handler: None,
        }
    }

    /// Use this reporter instead of the one chosen by the output mode
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Replace process termination on stop-on-failure
    pub fn with_exit_handler(mut self, handler: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit_handler = Some(Arc::new(handler));
        self
    }

    /// Run with arguments excluding the program name; returns the exit code
    pub async fn run(&self, args: Vec<String>) -> i32 {
        let globals = GlobalArgs::prescan(&args);

        let config_path = globals.config.as_ref().map(|path| self.cwd.join(path));
        let config = match ConfigLoader::new().load(config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", config_diagnostic(&err));
                return 1;
            }
        };
        if let Err(err) = init_tracing(globals.log_level.as_deref(), &config.logging) {
            eprintln!("Failed to initialize logging: {}", err);
        }
        info!("bunosh {} starting", env!("CARGO_PKG_VERSION"));

        let ctx = Arc::new(self.context(&config));
        let engine = TaskEngine::new(ctx.clone());

        let requested = requested_command(&args);
        let lenient = requested == Some(INIT_COMMAND)
            || args.iter().any(|a| matches!(a.as_str(), "-h" | "--help" | "-V" | "--version"));

        let (dir, commands) = match discover(globals.bunoshfile.as_deref(), &self.cwd) {
            Ok(discovery) => {
                let services = match self.services(&config, &engine, discovery.dir.clone()) {
                    Ok(services) => Arc::new(services),
                    Err(message) => {
                        eprintln!("{} {}", "✗".red(), message);
                        return 1;
                    }
                };
                let mut commands: Vec<Command> = Vec::new();
                for file in &discovery.files {
                    let runtime = Arc::new(JsRuntime::from_source(&file.source, services.clone()));
                    commands.extend(commands_from_source(&file.source, &file.namespace, &runtime));
                }
                commands.extend(npm_commands(&discovery.dir, &engine, &config.execution.shell));
                (discovery.dir, commands)
            }
            Err(DiscoveryError::NotFound { dir }) if lenient => (dir, Vec::new()),
            Err(err) => {
                eprintln!("{}", discovery_diagnostic(&err));
                return 1;
            }
        };

        let registry = Registry::new(commands);
        let mut cli = registry.build_cli();
        let argv = std::iter::once("bunosh".to_string()).chain(args.iter().cloned());
        let matches = match cli.try_get_matches_from_mut(argv) {
            Ok(matches) => matches,
            Err(err) => {
                return match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        let _ = err.print();
                        0
                    }
                    ErrorKind::InvalidSubcommand => {
                        eprintln!(
                            "{} Unknown command '{}'\n",
                            "✗".red(),
                            requested.unwrap_or_default()
                        );
                        eprintln!("{}", cli.render_help());
                        1
                    }
                    _ => {
                        let _ = err.print();
                        err.exit_code()
                    }
                };
            }
        };

        match matches.subcommand() {
            None => {
                println!("{}", cli.render_help());
                0
            }
            Some((INIT_COMMAND, _)) => {
                let target = match &globals.bunoshfile {
                    Some(path) => locate(Some(path.as_path()), &self.cwd).0,
                    None => dir,
                };
                match init(&target) {
                    Ok(path) => {
                        println!("{} Created {}", "✓".green(), path.display());
                        0
                    }
                    Err(err) => {
                        eprintln!("{} {:#}", "✗".red(), err);
                        1
                    }
                }
            }
            Some((name, sub)) => {
                let Some(command) = registry.find(name) else {
                    eprintln!("{} Unknown command '{}'", "✗".red(), name);
                    return 1;
                };
                let invocation = Invocation::from_matches(command, sub);
                debug!("Invoking {} with {:?}", command.full_name(), invocation.args);
                let result = engine
                    .run_with(
                        command.cli_name(),
                        TaskOptions::kind(TaskKind::Command),
                        |_scope| command.invoke(invocation.args),
                    )
                    .await;
                debug!("{} finished: {:?}", command.cli_name(), result.status());

                let summary = ctx.summary();
                info!(
                    "{} task(s): {} succeeded, {} failed, {} warning(s)",
                    summary.total, summary.succeeded, summary.failed, summary.warnings
                );
                ctx.exit_code()
            }
        }
    }

    fn context(&self, config: &BunoshConfig) -> RuntimeContext {
        let mode = config.output.mode.detect();
        let reporter: Arc<dyn Reporter> = match (&self.reporter, mode) {
            (Some(reporter), _) => reporter.clone(),
            (None, OutputMode::Ci) => Arc::new(CiReporter),
            (None, OutputMode::Silent) => Arc::new(NullReporter),
            (None, _) => Arc::new(ConsoleReporter),
        };
        let options = RuntimeOptions {
            stop_on_failure: config.execution.stop_on_failure,
            ignore_failures: config.execution.ignore_failures,
            silent: mode == OutputMode::Silent,
            test_mode: config.execution.test_mode,
        };
        let ctx = RuntimeContext::new(reporter).with_options(options);
        match &self.exit_handler {
            Some(handler) => {
                let handler = handler.clone();
                ctx.with_exit_handler(move |code| handler(code))
            }
            None => ctx,
        }
    }

    fn services(
        &self,
        config: &BunoshConfig,
        engine: &TaskEngine,
        dir: PathBuf,
    ) -> Result<JsServices, String> {
        let http = HttpManager::with_config(config.http.clone())
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        // resolved once per run; a missing credential only fails `ai` tasks
        let ai = ProviderRegistry::builtin().resolve_from_env(&config.ai);
        Ok(JsServices::new(engine.clone(), http)
            .with_ai(ai)
            .with_shell(config.execution.shell.clone())
            .with_base_dir(dir))
    }
}
