//! bunosh command line
//!
//! Discovers Bunoshfiles, turns their exported functions (and the project's
//! npm scripts) into subcommands and runs the chosen one as a task.

pub mod app;
pub mod cli;
pub mod diagnostics;
pub mod discovery;
pub mod help;
pub mod init;
pub mod logging;
pub mod npm;
pub mod registry;
pub mod reporter;

pub use app::App;
