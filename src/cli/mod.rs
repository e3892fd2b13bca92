//! Command-line interface for templet.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{CacheArgs, CacheSubcommand, Cli, Commands, CreateArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
