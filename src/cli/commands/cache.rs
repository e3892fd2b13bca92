//! Cache command implementation.
//!
//! Provides `templet cache list`, `templet cache gc`, etc.

use crate::cache::{RepoCache, SlotState};
use crate::error::Result;
use crate::locator::RepoLocator;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use crate::cli::args::{CacheArgs, CacheSubcommand};

/// The cache command implementation.
pub struct CacheCommand {
    args: CacheArgs,
    cache: RepoCache,
}

impl CacheCommand {
    pub fn new(args: CacheArgs, cache: RepoCache) -> Self {
        Self { args, cache }
    }
}

impl Command for CacheCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &self.args.command {
            CacheSubcommand::List => list_cache(&self.cache, ui)?,
            CacheSubcommand::Gc { ttl } => {
                let removed = self.cache.sweep(*ttl)?;
                ui.success(&format!(
                    "Removed {} stale or corrupted {}",
                    removed,
                    entries(removed)
                ));
            }
            CacheSubcommand::Clear => {
                let removed = self.cache.clear()?;
                ui.success(&format!("Cleared {} {}", removed, entries(removed)));
            }
            CacheSubcommand::Evict { repo, branch } => {
                let locator = RepoLocator::parse(repo)?;
                if self.cache.evict(&locator, branch)? {
                    ui.success(&format!("Evicted {}#{}", locator, branch));
                } else {
                    ui.message(&format!("{}#{} is not cached", locator, branch));
                }
            }
        }
        Ok(CommandResult::success())
    }
}

fn entries(count: usize) -> &'static str {
    if count == 1 {
        "entry"
    } else {
        "entries"
    }
}

fn list_cache(cache: &RepoCache, ui: &mut dyn UserInterface) -> Result<()> {
    let slots = cache.list()?;
    if slots.is_empty() {
        ui.message("Cache is empty");
        return Ok(());
    }

    ui.message(&format!(
        "{} cached {} in {}:\n",
        slots.len(),
        entries(slots.len()),
        cache.root().display()
    ));
    for slot in slots {
        let label = slot.state.label();
        match &slot.state {
            SlotState::Fresh(entry) | SlotState::Stale(entry) => {
                let meta = &entry.metadata;
                ui.message(&format!(
                    "  {}#{} [{}] fetched {}, {} template{}",
                    meta.locator,
                    meta.branch,
                    label,
                    meta.refreshed_at.format("%Y-%m-%d %H:%M UTC"),
                    meta.template_count,
                    if meta.template_count == 1 { "" } else { "s" }
                ));
            }
            SlotState::Corrupted(reason) => {
                ui.message(&format!("  {} [{}] {}", slot.key, label, reason));
            }
            SlotState::Missing => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResolveOptions;
    use crate::fetch::DirectoryFetcher;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn cached_repo(cache: &RepoCache) -> (TempDir, RepoLocator) {
        let repo = TempDir::new().unwrap();
        fs::write(repo.path().join("template.yml"), "name: node\n").unwrap();
        let locator = RepoLocator::parse(repo.path().to_str().unwrap()).unwrap();
        cache
            .ensure(&locator, "main", &ResolveOptions::default(), &DirectoryFetcher::new())
            .unwrap();
        (repo, locator)
    }

    fn run(cache: &RepoCache, command: CacheSubcommand) -> MockUI {
        let mut ui = MockUI::new();
        CacheCommand::new(CacheArgs { command }, cache.clone())
            .execute(&mut ui)
            .unwrap();
        ui
    }

    #[test]
    fn list_empty_cache() {
        let temp = TempDir::new().unwrap();
        let ui = run(&RepoCache::new(temp.path()), CacheSubcommand::List);
        assert!(ui.has_message("Cache is empty"));
    }

    #[test]
    fn list_shows_fresh_entry() {
        let temp = TempDir::new().unwrap();
        let cache = RepoCache::new(temp.path());
        let (_repo, locator) = cached_repo(&cache);

        let ui = run(&cache, CacheSubcommand::List);
        assert!(ui.has_message("1 cached entry"));
        assert!(ui.has_message(&format!("{}#main [fresh]", locator.normalized())));
    }

    #[test]
    fn evict_then_clear() {
        let temp = TempDir::new().unwrap();
        let cache = RepoCache::new(temp.path());
        let (repo, _locator) = cached_repo(&cache);

        let ui = run(
            &cache,
            CacheSubcommand::Evict {
                repo: repo.path().display().to_string(),
                branch: "main".to_string(),
            },
        );
        assert!(ui.has_success("Evicted"));

        let ui = run(&cache, CacheSubcommand::Clear);
        assert!(ui.has_success("Cleared 0 entries"));
    }
}
