//! Embedded JavaScript runtime for Bunoshfiles
//!
//! Scripts run on the Boa engine. The bunosh API (`exec`, `fetch`, `task`,
//! `writeToFile`, `ai` and friends) is a JavaScript prelude over a small set
//! of native functions that hand the real work to the primitive crates.

mod bridge;
pub mod conversion;
pub mod error;
pub mod error_handling;
pub mod function;
pub mod runtime;

pub use error::JsExecutionError;
pub use function::{commands_from_source, JsFunction};
pub use runtime::{JsRuntime, JsServices};
