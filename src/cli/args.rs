//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

use crate::placeholders::REDACTED;

/// templet - Provision projects from template repositories.
#[derive(Debug, Parser)]
#[command(name = "templet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides ~/.templet/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show the placeholder source report
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a project from a template
    Create(CreateArgs),

    /// Manage the repository cache
    Cache(CacheArgs),
}

/// Arguments for the `create` command.
#[derive(Clone, Args)]
pub struct CreateArgs {
    /// Template repository (owner/name, URL, github:owner/name or local path)
    pub repo: String,

    /// Template name within the repository
    pub template: String,

    /// Directory to create the project in
    pub target: PathBuf,

    /// Branch to fetch
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    /// Option token (`value` or `dimension=value[+value]`), repeatable
    #[arg(short = 'o', long = "option")]
    pub options: Vec<String>,

    /// Placeholder value as TOKEN=value, repeatable
    #[arg(short = 's', long = "set")]
    pub set: Vec<String>,

    /// IDE preset to apply (vscode, cursor, windsurf)
    #[arg(long)]
    pub ide: Option<String>,

    /// Show what would be created without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore cached copies and fetch again
    #[arg(long)]
    pub no_cache: bool,

    /// Cache time-to-live in hours for this run
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Never prompt for placeholder values
    #[arg(long)]
    pub non_interactive: bool,
}

/// Placeholder values may be secrets, so `set` is shown by token only.
impl fmt::Debug for CreateArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<String> = self
            .set
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((token, _)) => format!("{token}={REDACTED}"),
                None => REDACTED.to_string(),
            })
            .collect();
        f.debug_struct("CreateArgs")
            .field("repo", &self.repo)
            .field("template", &self.template)
            .field("target", &self.target)
            .field("branch", &self.branch)
            .field("options", &self.options)
            .field("set", &set)
            .field("ide", &self.ide)
            .field("dry_run", &self.dry_run)
            .field("no_cache", &self.no_cache)
            .field("ttl", &self.ttl)
            .field("non_interactive", &self.non_interactive)
            .finish()
    }
}

/// Arguments for the `cache` command.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

/// Cache subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CacheSubcommand {
    /// List cached repositories
    List,
    /// Remove stale and corrupted entries
    Gc {
        /// Judge staleness with this TTL instead of the recorded one
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Remove every entry
    Clear,
    /// Remove the entry for one repository
    Evict {
        /// Template repository
        repo: String,
        /// Branch of the entry
        #[arg(short, long, default_value = "main")]
        branch: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_collects_repeated_flags() {
        let cli = Cli::parse_from([
            "templet", "create", "user/repo", "node", "out", "-o", "aws", "-o",
            "features=lint+test", "-s", "AUTHOR=Ada", "--dry-run",
        ]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.options, vec!["aws", "features=lint+test"]);
        assert_eq!(args.set, vec!["AUTHOR=Ada"]);
        assert_eq!(args.branch, "main");
        assert!(args.dry_run);
    }

    #[test]
    fn debug_output_hides_placeholder_values() {
        let cli = Cli::parse_from([
            "templet", "--debug", "create", "user/repo", "node", "out", "-s",
            "DB_PASSWORD=hunter2",
        ]);
        let rendered = format!("{cli:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("DB_PASSWORD=[REDACTED]"));
    }

    #[test]
    fn cache_evict_takes_branch() {
        let cli = Cli::parse_from(["templet", "cache", "evict", "user/repo", "--branch", "dev"]);
        let Commands::Cache(CacheArgs {
            command: CacheSubcommand::Evict { repo, branch },
        }) = cli.command
        else {
            panic!("expected cache evict");
        };
        assert_eq!(repo, "user/repo");
        assert_eq!(branch, "dev");
    }
}
