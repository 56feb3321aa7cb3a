//! Shell and file task primitives
//!
//! Each primitive performs its I/O inside a tracked task: output is streamed
//! line by line to the reporter while it arrives and the outcome becomes a
//! [`TaskResult`](bunosh_core::TaskResult) instead of an error.

pub mod error;
pub mod exec;
pub mod files;

pub use error::ExecError;
pub use exec::{exec, ExecRequest};
pub use files::{write_to_file, WriteRequest};
