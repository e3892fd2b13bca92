//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`].

pub mod cache;
pub mod create;
pub mod dispatcher;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
