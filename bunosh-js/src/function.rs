//! Commands backed by script functions

use std::sync::Arc;

use async_trait::async_trait;
use bunosh_core::{BoundFunction, CallError, Command};
use bunosh_parser::SourceFile;
use serde_json::Value;

use crate::runtime::JsRuntime;

/// One exported function, called through its local binding
pub struct JsFunction {
    runtime: Arc<JsRuntime>,
    local_name: String,
}

impl JsFunction {
    pub fn new(runtime: Arc<JsRuntime>, local_name: impl Into<String>) -> Self {
        Self {
            runtime,
            local_name: local_name.into(),
        }
    }
}

#[async_trait]
impl BoundFunction for JsFunction {
    async fn call(&self, args: Vec<Value>) -> Result<Value, CallError> {
        self.runtime
            .invoke(&self.local_name, args)
            .await
            .map_err(CallError::from)
    }
}

/// Build a command for every exported function of a Bunoshfile
pub fn commands_from_source(
    file: &SourceFile,
    namespace: &str,
    runtime: &Arc<JsRuntime>,
) -> Vec<Command> {
    file.functions()
        .into_iter()
        .map(|parsed| {
            let local = file.local_name(&parsed.name).unwrap_or(&parsed.name);
            let function = Arc::new(JsFunction::new(runtime.clone(), local));
            parsed.to_command(namespace, function)
        })
        .collect()
}
