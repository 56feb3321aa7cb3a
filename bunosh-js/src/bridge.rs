//! Native functions backing the script API
//!
//! The engine context lives on one blocking thread. Host work is spawned on
//! the tokio runtime and addressed from JavaScript by numeric handles. Each
//! finished operation is queued as a completion, and the runtime loop hands
//! completions back to the script one at a time.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use boa_engine::{Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction};
use bunosh_core::{infer_task_name, ActiveTask, FailureMode, TaskKind, TaskOptions, TaskResult};
use bunosh_execution::{exec, write_to_file, ExecRequest, WriteRequest};
use bunosh_http::{fetch_response, generate_structured, FetchBody, FetchRequest, HttpMethod};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::conversion::{bool_arg, js_string, number_arg, string_arg};
use crate::runtime::JsServices;

thread_local! {
    static BRIDGE: RefCell<Option<Bridge>> = const { RefCell::new(None) };
}

/// A finished host operation: its handle and `{status, output}` value
pub(crate) type Completion = (u64, Value);

/// Host state for the function running on this thread
pub(crate) struct Bridge {
    services: Arc<JsServices>,
    handle: Handle,
    next_id: u64,
    in_flight: usize,
    sender: UnboundedSender<Completion>,
    completions: Option<UnboundedReceiver<Completion>>,
    tasks: HashMap<u64, ActiveTask>,
}

impl Bridge {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Installs a bridge for the current thread and removes it on drop
pub(crate) struct BridgeGuard;

impl BridgeGuard {
    pub(crate) fn install(services: Arc<JsServices>, handle: Handle) -> Self {
        let (sender, receiver) = unbounded_channel();
        BRIDGE.with(|cell| {
            *cell.borrow_mut() = Some(Bridge {
                services,
                handle,
                next_id: 0,
                in_flight: 0,
                sender,
                completions: Some(receiver),
                tasks: HashMap::new(),
            });
        });
        BridgeGuard
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        // Unsettled tasks report on drop, which must happen outside the borrow
        let bridge = BRIDGE.with(|cell| cell.borrow_mut().take());
        if let Some(bridge) = bridge {
            if !bridge.tasks.is_empty() {
                warn!("{} task(s) never settled", bridge.tasks.len());
            }
            drop(bridge);
        }
    }
}

fn with_bridge<R>(f: impl FnOnce(&mut Bridge) -> R) -> JsResult<R> {
    BRIDGE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(bridge) => Ok(f(bridge)),
        None => Err(JsNativeError::error()
            .with_message("bunosh runtime is not active")
            .into()),
    })
}

fn unknown_handle(kind: &str, id: u64) -> boa_engine::JsError {
    JsNativeError::error()
        .with_message(format!("unknown {} handle {}", kind, id))
        .into()
}

/// Block until some host operation finishes.
///
/// Returns `None` once nothing is in flight, which means no further
/// progress can come from the host.
pub(crate) fn next_completion() -> Option<Completion> {
    let (handle, mut receiver) = BRIDGE.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let bridge = borrow.as_mut()?;
        if bridge.in_flight == 0 {
            return None;
        }
        Some((bridge.handle.clone(), bridge.completions.take()?))
    })?;
    let next = handle.block_on(receiver.recv());
    BRIDGE.with(|cell| {
        if let Some(bridge) = cell.borrow_mut().as_mut() {
            bridge.completions = Some(receiver);
            if next.is_some() {
                bridge.in_flight -= 1;
            }
        }
    });
    next
}

type NativeFn = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// Register every `__bunosh_*` native on the global object
pub(crate) fn register_natives(context: &mut Context) -> JsResult<()> {
    let natives: [(&str, usize, NativeFn); 9] = [
        ("__bunosh_start", 1, start),
        ("__bunosh_task_begin", 3, task_begin),
        ("__bunosh_task_end", 3, task_end),
        ("__bunosh_print", 2, print),
        ("__bunosh_say", 2, say),
        ("__bunosh_flag", 2, flag),
        ("__bunosh_env", 0, env),
        ("__bunosh_cwd", 0, cwd),
        ("__bunosh_exit", 1, exit),
    ];
    for (name, length, function) in natives {
        context.register_global_callable(
            JsString::from(name),
            length,
            NativeFunction::from_fn_ptr(function),
        )?;
    }
    Ok(())
}

fn start(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let payload = string_arg(args, 0, context)?;
    let operation: Operation = serde_json::from_str(&payload).map_err(|e| {
        JsNativeError::typ().with_message(format!("invalid operation: {}", e))
    })?;
    let id = with_bridge(|bridge| {
        let id = bridge.allocate();
        let services = bridge.services.clone();
        let sender = bridge.sender.clone();
        let join = bridge.handle.spawn(operation.run(services));
        bridge.handle.spawn(async move {
            let value = join
                .await
                .unwrap_or_else(|err| result_json(&TaskResult::fail(err.to_string())));
            let _ = sender.send((id, value));
        });
        bridge.in_flight += 1;
        id
    })?;
    Ok(JsValue::from(id as f64))
}

fn task_begin(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, context)?;
    let source = string_arg(args, 1, context)?;
    let mode = string_arg(args, 2, context)?;

    let name = if name.trim().is_empty() {
        infer_task_name(&source)
    } else {
        name
    };
    let options = match mode.as_str() {
        "warn" => TaskOptions::kind(TaskKind::Task).with_mode(FailureMode::Warn),
        "silent" => TaskOptions::kind(TaskKind::Task).with_silent(true),
        _ => TaskOptions::kind(TaskKind::Task),
    };

    let id = with_bridge(|bridge| {
        let task = bridge.services.engine.begin(name, options);
        let id = bridge.allocate();
        bridge.tasks.insert(id, task);
        id
    })?;
    Ok(JsValue::from(id as f64))
}

fn task_end(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let id = number_arg(args, 0, context)? as u64;
    let ok = bool_arg(args, 1);
    let payload = string_arg(args, 2, context)?;

    let task = with_bridge(|bridge| bridge.tasks.remove(&id))?
        .ok_or_else(|| unknown_handle("task", id))?;
    let outcome = if ok {
        Ok(serde_json::from_str::<Value>(&payload).unwrap_or(Value::String(payload)))
    } else {
        Err(payload)
    };
    let result = task.complete(outcome);
    Ok(js_string(&result_json(&result).to_string()))
}

fn print(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let stream = string_arg(args, 0, context)?;
    let message = string_arg(args, 1, context)?;
    if stream == "err" {
        eprintln!("{}", message);
    } else {
        println!("{}", message);
    }
    Ok(JsValue::undefined())
}

fn say(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let message = string_arg(args, 0, context)?;
    let loud = bool_arg(args, 1);
    let reporter = with_bridge(|bridge| bridge.services.engine.context().reporter())?;
    reporter.say(&message, loud);
    Ok(JsValue::undefined())
}

fn flag(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, context)?;
    let value = bool_arg(args, 1);
    let ctx = with_bridge(|bridge| bridge.services.engine.context().clone())?;
    match name.as_str() {
        "stopOnFailure" => ctx.set_stop_on_failure(value),
        "ignoreFailures" => ctx.set_ignore_failures(value),
        "silent" => ctx.set_silent(value),
        other => {
            return Err(JsNativeError::typ()
                .with_message(format!("unknown runtime flag '{}'", other))
                .into())
        }
    }
    debug!("Runtime flag {} set to {}", name, value);
    Ok(JsValue::undefined())
}

fn env(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let vars: BTreeMap<String, String> = std::env::vars().collect();
    Ok(js_string(&json!(vars).to_string()))
}

fn cwd(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let dir = with_bridge(|bridge| bridge.services.base_dir.display().to_string())?;
    Ok(js_string(&dir))
}

fn exit(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let code = number_arg(args, 0, context)?;
    let ctx = with_bridge(|bridge| bridge.services.engine.context().clone())?;
    ctx.exit(code as i32);
    Ok(JsValue::undefined())
}

fn result_json(result: &TaskResult) -> Value {
    json!({ "status": result.status().as_str(), "output": result.output() })
}

/// A primitive requested by the script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub(crate) enum Operation {
    Exec {
        command: String,
        #[serde(default)]
        cwd: Option<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    Fetch {
        url: String,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: Option<Value>,
    },
    WriteToFile {
        path: String,
        content: String,
    },
    Ai {
        prompt: String,
        #[serde(default)]
        schema: Value,
    },
}

impl Operation {
    /// Perform the operation; the value is `{status, output}` plus extras
    pub(crate) async fn run(self, services: Arc<JsServices>) -> Value {
        let engine = &services.engine;
        match self {
            Operation::Exec { command, cwd, env } => {
                let dir = match cwd {
                    Some(dir) => services.resolve(&dir),
                    None => services.base_dir.clone(),
                };
                let request = env.into_iter().fold(
                    ExecRequest::new(command)
                        .with_shell(services.shell.clone())
                        .with_cwd(dir),
                    |request, (key, value)| request.with_env(key, value),
                );
                result_json(&exec(engine, request).await)
            }
            Operation::Fetch {
                url,
                method,
                headers,
                body,
            } => {
                let method = match HttpMethod::from_str(method.as_deref().unwrap_or("GET")) {
                    Ok(method) => method,
                    Err(err) => return result_json(&TaskResult::fail(err.to_string())),
                };
                let mut request = headers.into_iter().fold(
                    FetchRequest::get(url).with_method(method),
                    |request, (name, value)| request.with_header(name, value),
                );
                match body {
                    None | Some(Value::Null) => {}
                    Some(Value::String(text)) => request = request.with_body(FetchBody::Text(text)),
                    Some(json) => request = request.with_body(FetchBody::Json(json)),
                }
                let (result, response) = fetch_response(engine, &services.http, request).await;
                let mut value = result_json(&result);
                value["response"] = serde_json::to_value(response).unwrap_or(Value::Null);
                value
            }
            Operation::WriteToFile { path, content } => {
                let request = WriteRequest::new(services.resolve(&path), content);
                result_json(&write_to_file(engine, request).await)
            }
            Operation::Ai { prompt, schema } => {
                let result =
                    generate_structured(engine, &services.http, &services.ai, &prompt, &schema)
                        .await;
                result_json(&result)
            }
        }
    }
}

impl JsServices {
    /// Resolve a script-relative path against the base directory
    pub(crate) fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_deserialize_from_script_payloads() {
        let exec: Operation =
            serde_json::from_str(r#"{"kind":"exec","command":"ls","cwd":null,"env":{"A":"1"}}"#)
                .unwrap();
        assert_eq!(
            exec,
            Operation::Exec {
                command: "ls".into(),
                cwd: None,
                env: BTreeMap::from([("A".to_string(), "1".to_string())]),
            }
        );

        let write: Operation =
            serde_json::from_str(r#"{"kind":"writeToFile","path":"a.txt","content":"x"}"#).unwrap();
        assert!(matches!(write, Operation::WriteToFile { .. }));

        let fetch: Operation =
            serde_json::from_str(r#"{"kind":"fetch","url":"http://x","body":{"a":1}}"#).unwrap();
        assert!(matches!(fetch, Operation::Fetch { method: None, .. }));
    }

    #[test]
    fn test_natives_fail_without_bridge() {
        let mut context = Context::default();
        register_natives(&mut context).unwrap();
        let err = context
            .eval(boa_engine::Source::from_bytes("__bunosh_cwd()"))
            .unwrap_err();
        assert!(err.to_string().contains("not active"));
    }
}
