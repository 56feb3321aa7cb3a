//! Turning engine errors into readable messages

use boa_engine::{Context, JsError};

use crate::error::JsExecutionError;

/// Message of a thrown value, `Kind: message` for native errors
pub fn describe_js_error(error: &JsError, context: &mut Context) -> String {
    match error.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}

/// Classify an error raised while evaluating script source
pub fn script_error(error: &JsError, context: &mut Context) -> JsExecutionError {
    let message = describe_js_error(error, context);
    if message.starts_with("SyntaxError") {
        JsExecutionError::CompileError(message)
    } else {
        JsExecutionError::RuntimeError(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    #[test]
    fn test_syntax_errors_are_compile_errors() {
        let mut context = Context::default();
        let err = context.eval(Source::from_bytes("let = ;")).unwrap_err();
        assert!(matches!(
            script_error(&err, &mut context),
            JsExecutionError::CompileError(_)
        ));
    }

    #[test]
    fn test_thrown_errors_keep_their_message() {
        let mut context = Context::default();
        let err = context
            .eval(Source::from_bytes("throw new TypeError('bad input')"))
            .unwrap_err();
        let message = describe_js_error(&err, &mut context);
        assert!(message.contains("bad input"));
        assert!(matches!(
            script_error(&err, &mut context),
            JsExecutionError::RuntimeError(_)
        ));
    }
}
