//! Moving values across the engine boundary as JSON text

use boa_engine::{Context, JsResult, JsString, JsValue, Source};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::error::JsExecutionError;
use crate::error_handling::describe_js_error;

/// Quote text as a JavaScript string literal
pub fn js_string_literal(text: &str) -> String {
    // JSON strings are valid JavaScript string literals
    JsonValue::String(text.to_string()).to_string()
}

/// Evaluate an expression that yields JSON text and parse it
pub fn eval_json(context: &mut Context, expression: &str) -> Result<JsonValue, JsExecutionError> {
    trace!("Reading JSON from expression: {}", expression);
    let value = context
        .eval(Source::from_bytes(expression))
        .map_err(|e| JsExecutionError::ContextError(describe_js_error(&e, context)))?;
    if value.is_undefined() {
        return Ok(JsonValue::Null);
    }
    let text = value
        .to_string(context)
        .map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))?
        .to_std_string_escaped();
    serde_json::from_str(&text).map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))
}

/// Argument `index` coerced to a Rust string
pub(crate) fn string_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    let value = args.get(index).cloned().unwrap_or_else(JsValue::undefined);
    Ok(value.to_string(context)?.to_std_string_escaped())
}

/// Argument `index` coerced to a number
pub(crate) fn number_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<f64> {
    args.get(index)
        .cloned()
        .unwrap_or_else(JsValue::undefined)
        .to_number(context)
}

pub(crate) fn bool_arg(args: &[JsValue], index: usize) -> bool {
    args.get(index).is_some_and(JsValue::to_boolean)
}

pub(crate) fn js_string(text: &str) -> JsValue {
    JsValue::from(JsString::from(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(js_string_literal("a\"b\n"), r#""a\"b\n""#);
    }

    #[test]
    fn test_eval_json_round_trip() {
        let mut context = Context::default();
        let literal = js_string_literal(&json!({ "name": "x", "n": [1, 2] }).to_string());
        let value = eval_json(&mut context, &format!("JSON.stringify(JSON.parse({}))", literal)).unwrap();
        assert_eq!(value, json!({ "name": "x", "n": [1, 2] }));
        assert_eq!(eval_json(&mut context, "undefined").unwrap(), JsonValue::Null);
    }
}
