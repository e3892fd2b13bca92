//! Create command implementation.
//!
//! Provides `templet create <repo> <template> <target>`.

use std::collections::BTreeMap;

use crate::cache::{RepoCache, ResolveOptions};
use crate::config::Settings;
use crate::error::{Result, TempletError};
use crate::locator::RepoLocator;
use crate::pipeline::{ProvisionOutcome, ProvisionRequest, Provisioner};
use crate::placeholders::PlaceholderSources;
use crate::plan::render;
use crate::runtime::CustomizationRuntime;
use crate::ui::{UiPrompter, UserInterface};

use super::dispatcher::{Command, CommandResult};
use crate::cli::args::CreateArgs;

/// The create command implementation.
pub struct CreateCommand {
    args: CreateArgs,
    settings: Settings,
    cache: RepoCache,
}

impl CreateCommand {
    pub fn new(args: CreateArgs, settings: &Settings, cache: RepoCache) -> Self {
        Self {
            args,
            settings: settings.clone(),
            cache,
        }
    }

    fn request(&self) -> Result<ProvisionRequest> {
        let locator = RepoLocator::parse(&self.args.repo)?;
        let mut request = ProvisionRequest::new(locator, &self.args.template, &self.args.target);
        request.branch = self.args.branch.clone();
        request.option_tokens = self.args.options.clone();
        request.ide = self.args.ide.clone();
        request.cache = ResolveOptions {
            no_cache: self.args.no_cache,
            ttl_override: self.args.ttl,
        };
        request.dry_run = self.args.dry_run;
        Ok(request)
    }

    fn provisioner(&self) -> Provisioner {
        Provisioner::new(self.cache.clone())
            .with_fetch_timeout(self.settings.fetch_timeout())
            .with_runtime(CustomizationRuntime::new().with_timeout(self.settings.setup_timeout()))
            .with_setup_failure_policy(self.settings.on_setup_failure)
    }
}

impl Command for CreateCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let request = self.request()?;
        let flags = parse_assignments(&self.args.set)?;
        let interactive = !self.args.non_interactive && ui.is_interactive();

        if ui.output_mode().shows_progress() {
            ui.show_header(&format!(
                "{} from {}#{}",
                display_template(&request.template),
                request.locator,
                request.branch
            ));
        }

        let outcome = {
            let mut prompter = UiPrompter::new(ui);
            let mut sources = PlaceholderSources::new()
                .with_flags(flags)
                .with_process_env()
                .with_config(self.settings.placeholders.clone());
            if interactive {
                sources = sources.with_prompter(&mut prompter);
            }
            self.provisioner().provision(&request, &mut sources)?
        };

        match outcome {
            ProvisionOutcome::Preview {
                operations,
                resolution,
                ..
            } => {
                if ui.output_mode().shows_details() && !resolution.report.is_empty() {
                    ui.message(&format!("Placeholders:\n{}", resolution.report));
                }
                ui.message(render(&operations).trim_end());
            }
            ProvisionOutcome::Created {
                target,
                report,
                resolution,
                warnings,
                ..
            } => {
                if ui.output_mode().shows_details() && !resolution.report.is_empty() {
                    ui.message(&format!("Placeholders:\n{}", resolution.report));
                }
                for warning in &warnings {
                    ui.warning(warning);
                }
                if let Some(setup) = &report.setup {
                    ui.message(&format!(
                        "Ran {} ({} tool call{})",
                        setup.script.display(),
                        setup.tool_calls,
                        if setup.tool_calls == 1 { "" } else { "s" }
                    ));
                }
                ui.success(&format!(
                    "Created {} ({} directories, {} files)",
                    target.display(),
                    report.directories,
                    report.files
                ));
            }
        }

        Ok(CommandResult::success())
    }
}

fn display_template(name: &str) -> &str {
    if name.is_empty() {
        "Template"
    } else {
        name
    }
}

/// Parse `TOKEN=value` pairs, reporting every malformed entry.
pub fn parse_assignments(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    let mut issues = Vec::new();
    for entry in raw {
        match entry.split_once('=') {
            Some((token, value)) if !token.trim().is_empty() => {
                values.insert(token.trim().to_string(), value.to_string());
            }
            _ => issues.push(format!("'{entry}' is not a TOKEN=value assignment")),
        }
    }
    if issues.is_empty() {
        Ok(values)
    } else {
        Err(TempletError::Validation { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn template_repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        write(
            &temp.path().join("template.yml"),
            "name: node\nplaceholders:\n  AUTHOR: { type: text, required: true }\n",
        );
        write(&temp.path().join("README.md"), "by {{AUTHOR}}\n");
        temp
    }

    fn args(repo: &TempDir, target: &Path) -> CreateArgs {
        CreateArgs {
            repo: repo.path().display().to_string(),
            template: "node".to_string(),
            target: target.to_path_buf(),
            branch: "main".to_string(),
            options: Vec::new(),
            set: Vec::new(),
            ide: None,
            dry_run: false,
            no_cache: false,
            ttl: None,
            non_interactive: false,
        }
    }

    #[test]
    fn parse_assignments_reports_every_bad_entry() {
        let err = parse_assignments(&["A=1".to_string(), "oops".to_string(), "=x".to_string()])
            .unwrap_err();
        let TempletError::Validation { issues } = err else {
            panic!("expected validation error");
        };
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn parse_assignments_keeps_equals_in_values() {
        let values = parse_assignments(&["URL=a=b".to_string()]).unwrap();
        assert_eq!(values["URL"], "a=b");
    }

    #[test]
    fn prompts_for_missing_placeholder() {
        let repo = template_repo();
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let target = out.path().join("demo");

        let mut ui = MockUI::new();
        ui.set_prompt_response("AUTHOR", "Ada");
        let cmd = CreateCommand::new(
            args(&repo, &target),
            &Settings::default(),
            RepoCache::new(cache.path()),
        );
        let result = cmd.execute(&mut ui).unwrap();

        assert!(result.success);
        assert!(ui.has_success("Created"));
        assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "by Ada\n");
    }

    #[test]
    fn non_interactive_run_fails_on_missing_placeholder() {
        let repo = template_repo();
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let mut ui = MockUI::new();
        let mut create = args(&repo, &out.path().join("demo"));
        create.non_interactive = true;
        let cmd = CreateCommand::new(create, &Settings::default(), RepoCache::new(cache.path()));

        let err = cmd.execute(&mut ui).unwrap_err();
        assert!(matches!(err, TempletError::MissingPlaceholders { .. }));
        assert!(ui.prompts_shown().is_empty());
    }

    #[test]
    fn dry_run_prints_plan() {
        let repo = template_repo();
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let settings = Settings::default();

        let mut ui = MockUI::new();
        let mut first = args(&repo, &out.path().join("first"));
        first.set = vec!["AUTHOR=Ada".to_string()];
        CreateCommand::new(first.clone(), &settings, RepoCache::new(cache.path()))
            .execute(&mut ui)
            .unwrap();

        let mut preview = first;
        preview.target = out.path().join("second");
        preview.dry_run = true;
        CreateCommand::new(preview, &settings, RepoCache::new(cache.path()))
            .execute(&mut ui)
            .unwrap();

        assert!(ui.has_message("Dry run: 2 operations"));
        assert!(ui.has_message("Files to copy (1):"));
        assert!(!out.path().join("second").exists());
    }
}
