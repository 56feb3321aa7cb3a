//! Command model
//!
//! One [`Command`] per exported Bunoshfile function (or external script
//! entry). Commands are built once at startup and never change afterwards.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::CallError;
use crate::naming::kebab_case;

/// Namespace used for package manager scripts
pub const NPM_NAMESPACE: &str = "npm";

/// A literal default value recovered from source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Literal {
    /// JavaScript truthiness of the literal
    pub fn is_truthy(&self) -> bool {
        match self {
            Literal::Null => false,
            Literal::Bool(b) => *b,
            Literal::Number(n) => *n != 0.0 && !n.is_nan(),
            Literal::String(s) => !s.is_empty(),
        }
    }

    /// Whether an option with this default is a plain on/off flag
    pub fn is_flag(&self) -> bool {
        matches!(self, Literal::Null | Literal::Bool(_))
    }

    /// Text shown in help; `None` for `null`
    pub fn display_value(&self) -> Option<String> {
        match self {
            Literal::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                write!(f, "{}", *n as i64)
            }
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{}", s),
        }
    }
}

/// A positional parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgSpec {
    pub name: String,
    /// `None` marks the argument as required
    pub default: Option<Literal>,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Literal) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// One property of a trailing options object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
    /// Property name as written in source (`forceRun`)
    pub key: String,
    /// Dash-cased CLI flag (`force-run`)
    pub flag: String,
    pub default: Literal,
}

impl OptionSpec {
    pub fn new(key: impl Into<String>, default: Literal) -> Self {
        let key = key.into();
        let flag = kebab_case(&key);
        Self { key, flag, default }
    }
}

/// Callable behind a command
#[async_trait]
pub trait BoundFunction: Send + Sync {
    async fn call(&self, args: Vec<Value>) -> Result<Value, CallError>;
}

#[async_trait]
impl<F, Fut> BoundFunction for F
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CallError>> + Send,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, CallError> {
        (self)(args).await
    }
}

/// Where a command comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Exported Bunoshfile function
    Bunosh,
    /// `package.json` script
    Npm,
}

/// A CLI-invocable wrapper around one function
#[derive(Clone)]
pub struct Command {
    name: String,
    namespace: String,
    kind: CommandKind,
    args: Vec<ArgSpec>,
    options: Option<Vec<OptionSpec>>,
    comment: Option<String>,
    function: Arc<dyn BoundFunction>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("options", &self.options)
            .field("comment", &self.comment)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new(name: impl Into<String>, function: Arc<dyn BoundFunction>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            kind: CommandKind::Bunosh,
            args: Vec::new(),
            options: None,
            comment: None,
            function,
        }
    }

    /// Command for a package manager script
    pub fn npm(script: impl Into<String>, function: Arc<dyn BoundFunction>) -> Self {
        Self {
            namespace: NPM_NAMESPACE.to_string(),
            kind: CommandKind::Npm,
            ..Self::new(script, function)
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_args(mut self, args: Vec<ArgSpec>) -> Self {
        self.args = args;
        self
    }

    /// Declare the trailing options object
    pub fn with_options(mut self, options: Vec<OptionSpec>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Declared options, empty when there is no options object
    pub fn options(&self) -> &[OptionSpec] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Whether the function takes a trailing options object
    pub fn takes_options(&self) -> bool {
        self.options.is_some()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// `namespace:name`, or just the name without a namespace
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.namespace, self.name)
        }
    }

    /// Name used on the command line; only the function segment is kebab-cased
    pub fn cli_name(&self) -> String {
        if self.kind == CommandKind::Npm {
            return self.full_name();
        }
        let name = kebab_case(&self.name);
        if self.namespace.is_empty() {
            name
        } else {
            format!("{}:{}", self.namespace, name)
        }
    }

    pub fn required_params(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter(|a| a.is_required())
            .map(|a| a.name.as_str())
            .collect()
    }

    /// First comment line that is not an `@` tag
    pub fn summary(&self) -> Option<&str> {
        self.comment.as_deref().and_then(|comment| {
            comment
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('@'))
        })
    }

    pub async fn invoke(&self, args: Vec<Value>) -> Result<Value, CallError> {
        self.function.call(args).await
    }
}
