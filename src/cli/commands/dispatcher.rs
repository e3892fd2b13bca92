//! Command dispatching.

use crate::cache::RepoCache;
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    settings: Settings,
}

impl CommandDispatcher {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The repository cache described by the settings.
    pub fn cache(&self) -> RepoCache {
        RepoCache::new(self.settings.cache_dir()).with_default_ttl(self.settings.ttl_hours())
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Create(args) => {
                let cmd = super::create::CreateCommand::new(args.clone(), &self.settings, self.cache());
                cmd.execute(ui)
            }
            Commands::Cache(args) => {
                let cmd = super::cache::CacheCommand::new(args.clone(), self.cache());
                cmd.execute(ui)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn command_result_codes() {
        assert_eq!(CommandResult::success().exit_code, 0);
        let failure = CommandResult::failure(2);
        assert!(!failure.success);
        assert_eq!(failure.exit_code, 2);
    }

    #[test]
    fn cache_follows_settings() {
        let settings = Settings {
            cache_dir: Some(PathBuf::from("/tmp/templet-cache")),
            ttl_hours: Some(2),
            ..Settings::default()
        };
        let cache = CommandDispatcher::new(settings).cache();
        assert_eq!(cache.root(), PathBuf::from("/tmp/templet-cache"));
        assert_eq!(cache.default_ttl_hours(), 2);
    }
}
