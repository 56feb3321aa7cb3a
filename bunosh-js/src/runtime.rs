//! Running Bunoshfile functions in the embedded engine
//!
//! Each invocation gets a fresh engine context on a blocking thread: the
//! prelude is installed, the lowered script is evaluated and the exported
//! function is called. Promise jobs run between host completions until no
//! operation is left in flight.

use std::path::PathBuf;
use std::sync::Arc;

use boa_engine::{Context, Source};
use bunosh_config::domains::execution::default_shell;
use bunosh_config::AiConfig;
use bunosh_core::TaskEngine;
use bunosh_http::{AiError, AiProvider, HttpManager, ProviderRegistry};
use bunosh_parser::SourceFile;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::bridge::{next_completion, register_natives, BridgeGuard};
use crate::conversion::{eval_json, js_string_literal};
use crate::error::JsExecutionError;
use crate::error_handling::{describe_js_error, script_error};

const PRELUDE: &str = include_str!("prelude.js");

const OUTCOME: &str = "JSON.stringify(globalThis.__bunosh_outcome === undefined ? null : globalThis.__bunosh_outcome)";

/// Host services reachable from scripts
pub struct JsServices {
    pub(crate) engine: TaskEngine,
    pub(crate) http: HttpManager,
    pub(crate) ai: Result<Arc<dyn AiProvider>, AiError>,
    pub(crate) shell: String,
    pub(crate) base_dir: PathBuf,
}

impl JsServices {
    /// Services with the AI provider resolved from the environment
    pub fn new(engine: TaskEngine, http: HttpManager) -> Self {
        let ai = ProviderRegistry::builtin().resolve_from_env(&AiConfig::default());
        Self {
            engine,
            http,
            ai,
            shell: default_shell().to_string(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_ai(mut self, ai: Result<Arc<dyn AiProvider>, AiError>) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Directory relative paths and commands are resolved against
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }
}

/// A loaded script ready to have its functions invoked
pub struct JsRuntime {
    script: String,
    services: Arc<JsServices>,
}

impl JsRuntime {
    /// Several runtimes may share one set of services
    pub fn new(script: impl Into<String>, services: Arc<JsServices>) -> Self {
        Self {
            script: script.into(),
            services,
        }
    }

    /// Runtime for a parsed Bunoshfile
    pub fn from_source(file: &SourceFile, services: Arc<JsServices>) -> Self {
        Self::new(file.to_script(), services)
    }

    pub fn services(&self) -> &Arc<JsServices> {
        &self.services
    }

    /// Call a function defined by the script with JSON arguments
    pub async fn invoke(
        self: &Arc<Self>,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, JsExecutionError> {
        let handle = Handle::current();
        let runtime = self.clone();
        let function = function.to_string();
        tokio::task::spawn_blocking(move || runtime.invoke_blocking(handle, &function, &args))
            .await
            .map_err(|e| JsExecutionError::ContextError(e.to_string()))?
    }

    fn invoke_blocking(
        &self,
        handle: Handle,
        function: &str,
        args: &[Value],
    ) -> Result<Value, JsExecutionError> {
        debug!("Invoking script function {}", function);
        let _bridge = BridgeGuard::install(self.services.clone(), handle);
        let mut context = Context::default();

        register_natives(&mut context)
            .map_err(|e| JsExecutionError::ContextError(e.to_string()))?;
        load(&mut context, PRELUDE)?;
        load(&mut context, &self.script)?;
        run_event_loop(&mut context)?;

        let args = Value::Array(args.to_vec()).to_string();
        let call = format!("__bunosh_invoke({}, {})", function, js_string_literal(&args));
        trace!("Evaluating {}", call);
        context
            .eval(Source::from_bytes(&call))
            .map_err(|e| JsExecutionError::RuntimeError(describe_js_error(&e, &mut context)))?;
        run_event_loop(&mut context)?;

        let outcome = eval_json(&mut context, OUTCOME)?;
        settle(function, outcome)
    }
}

/// Run promise jobs, feeding each finished host operation back to the
/// script, until nothing is left in flight
fn run_event_loop(context: &mut Context) -> Result<(), JsExecutionError> {
    context.run_jobs();
    while let Some((id, value)) = next_completion() {
        trace!("Operation {} completed", id);
        let raw = value.to_string();
        let call = format!("__bunosh_complete({}, {})", id, js_string_literal(&raw));
        context
            .eval(Source::from_bytes(&call))
            .map_err(|e| JsExecutionError::RuntimeError(describe_js_error(&e, context)))?;
        context.run_jobs();
    }
    Ok(())
}

fn load(context: &mut Context, source: &str) -> Result<(), JsExecutionError> {
    match context.eval(Source::from_bytes(source)) {
        Ok(_) => Ok(()),
        Err(e) => Err(script_error(&e, context)),
    }
}

fn settle(function: &str, outcome: Value) -> Result<Value, JsExecutionError> {
    match outcome {
        Value::Null => Err(JsExecutionError::Incomplete(function.to_string())),
        Value::Object(mut fields) => {
            if fields.get("ok").and_then(Value::as_bool) == Some(true) {
                Ok(fields.remove("value").unwrap_or(Value::Null))
            } else {
                let message = match fields.remove("error") {
                    Some(Value::String(message)) => message,
                    Some(other) => other.to_string(),
                    None => "unknown error".to_string(),
                };
                Err(JsExecutionError::Thrown(message))
            }
        }
        other => Err(JsExecutionError::InvalidOutputFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settle_outcomes() {
        assert_eq!(
            settle("f", json!({ "ok": true, "value": 3 })).unwrap(),
            json!(3)
        );
        assert!(matches!(
            settle("f", json!({ "ok": false, "error": "boom" })),
            Err(JsExecutionError::Thrown(message)) if message == "boom"
        ));
        assert!(matches!(
            settle("f", Value::Null),
            Err(JsExecutionError::Incomplete(name)) if name == "f"
        ));
    }
}
