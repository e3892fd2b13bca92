//! End-to-end provisioning.
//!
//! [`Provisioner`] wires the cache, option normalization, placeholder
//! resolution, planning and execution together. A dry run walks the same
//! validation path against the cache without fetching or writing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{RepoCache, ResolveOptions};
use crate::error::{Result, TempletError};
use crate::fetch::{fetcher_for, RepoFetcher};
use crate::locator::RepoLocator;
use crate::options::{NormalizedOptions, OptionsNormalizer};
use crate::placeholders::{PlaceholderDefinition, PlaceholderResolver, PlaceholderSources, Resolution};
use crate::plan::{build_plan, DryRunEngine, MaterializationOperation, MaterializeReport, Materializer};
use crate::runtime::{CustomizationRuntime, ProjectContext};
use crate::template::Template;

/// Default deadline for a repository fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// What to do when the setup script fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupFailurePolicy {
    /// Fail the whole run.
    Abort,
    /// Keep the project and report a warning.
    #[default]
    Warn,
}

/// One provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub locator: RepoLocator,
    pub branch: String,
    /// Template name; empty selects the only template.
    pub template: String,
    pub target: PathBuf,
    pub option_tokens: Vec<String>,
    pub ide: Option<String>,
    pub cache: ResolveOptions,
    pub dry_run: bool,
}

impl ProvisionRequest {
    pub fn new(locator: RepoLocator, template: &str, target: impl Into<PathBuf>) -> Self {
        Self {
            locator,
            branch: "main".to_string(),
            template: template.to_string(),
            target: target.into(),
            option_tokens: Vec::new(),
            ide: None,
            cache: ResolveOptions::default(),
            dry_run: false,
        }
    }
}

/// Result of a provisioning run.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// Dry run: the operations a real run would perform.
    Preview {
        operations: Vec<MaterializationOperation>,
        options: NormalizedOptions,
        resolution: Resolution,
    },
    /// Real run.
    Created {
        target: PathBuf,
        report: MaterializeReport,
        options: NormalizedOptions,
        resolution: Resolution,
        /// Non-fatal problems, including a downgraded setup failure.
        warnings: Vec<String>,
    },
}

/// Orchestrates a provisioning run.
pub struct Provisioner {
    cache: RepoCache,
    fetcher: Option<Box<dyn RepoFetcher>>,
    fetch_timeout: Duration,
    runtime: CustomizationRuntime,
    on_setup_failure: SetupFailurePolicy,
}

impl Provisioner {
    pub fn new(cache: RepoCache) -> Self {
        Self {
            cache,
            fetcher: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            runtime: CustomizationRuntime::new(),
            on_setup_failure: SetupFailurePolicy::default(),
        }
    }

    /// Use `fetcher` instead of picking one per locator.
    pub fn with_fetcher(mut self, fetcher: Box<dyn RepoFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_runtime(mut self, runtime: CustomizationRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_setup_failure_policy(mut self, policy: SetupFailurePolicy) -> Self {
        self.on_setup_failure = policy;
        self
    }

    pub fn cache(&self) -> &RepoCache {
        &self.cache
    }

    /// Run `request`, drawing placeholder values from `sources`.
    pub fn provision(
        &self,
        request: &ProvisionRequest,
        sources: &mut PlaceholderSources<'_>,
    ) -> Result<ProvisionOutcome> {
        let target = std::path::absolute(&request.target)?;

        if request.dry_run {
            let engine = DryRunEngine::new(&self.cache).with_ttl_override(request.cache.ttl_override);
            let template = engine.template(&request.locator, &request.branch, &request.template)?;
            let (options, resolution) = prepare(&template, request, sources)?;
            let operations = build_plan(&template, &target)?;
            return Ok(ProvisionOutcome::Preview {
                operations,
                options,
                resolution,
            });
        }

        let entry = match &self.fetcher {
            Some(fetcher) => {
                self.cache
                    .ensure(&request.locator, &request.branch, &request.cache, fetcher.as_ref())?
            }
            None => {
                let fetcher = fetcher_for(&request.locator, self.fetch_timeout);
                self.cache
                    .ensure(&request.locator, &request.branch, &request.cache, fetcher.as_ref())?
            }
        };
        let template = crate::template::find(&entry.directory, &request.template)?;
        let (options, resolution) = prepare(&template, request, sources)?;
        let operations = build_plan(&template, &target)?;

        let context = ProjectContext::new(project_name(&target), &target)
            .with_ide(request.ide.clone())
            .with_options(&options, &template.manifest.dimensions);
        let mut report = Materializer::new(resolution.values.clone())
            .with_runtime(self.runtime)
            .execute(&operations, &target, &context)?;

        let mut warnings = options.warnings.clone();
        if let Some(err) = report.setup_error.take() {
            match self.on_setup_failure {
                SetupFailurePolicy::Abort => return Err(err),
                SetupFailurePolicy::Warn => {
                    tracing::warn!("{}", err);
                    warnings.push(err.to_string());
                }
            }
        }

        Ok(ProvisionOutcome::Created {
            target,
            report,
            options,
            resolution,
            warnings,
        })
    }
}

/// Validate options and resolve placeholders for `template`.
fn prepare(
    template: &Template,
    request: &ProvisionRequest,
    sources: &mut PlaceholderSources<'_>,
) -> Result<(NormalizedOptions, Resolution)> {
    let manifest = &template.manifest;
    let options = OptionsNormalizer::for_manifest(manifest)
        .normalize(&request.option_tokens)?
        .reject_unknown()?;

    let definitions = PlaceholderDefinition::from_specs(&manifest.placeholders)
        .map_err(|issues| TempletError::Validation { issues })?;
    let resolution = PlaceholderResolver::new().resolve(&definitions, sources)?;
    tracing::debug!("Placeholder sources:\n{}", resolution.report);

    Ok((options, resolution))
}

fn project_name(target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::DirectoryFetcher;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn template_repo(script: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(
            &root.join("template.yml"),
            r#"
name: node
setup: setup.mjs
dimensions:
  deployment: { arity: single, values: [aws, gcp], default: aws }
placeholders:
  PROJECT_NAME: { type: text, required: true }
"#,
        );
        write(&root.join("setup.mjs"), script);
        write(&root.join("README.md"), "# {{PROJECT_NAME}}\n");
        temp
    }

    fn provisioner(cache: &TempDir) -> Provisioner {
        Provisioner::new(RepoCache::new(cache.path())).with_fetcher(Box::new(DirectoryFetcher::new()))
    }

    fn request(repo: &TempDir, target: PathBuf) -> ProvisionRequest {
        let locator = RepoLocator::parse(repo.path().to_str().unwrap()).unwrap();
        ProvisionRequest::new(locator, "node", target)
    }

    #[test]
    fn warn_policy_keeps_project() {
        let repo = template_repo("export default () => { throw new Error('boom'); };");
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let target = out.path().join("demo");

        let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
        let outcome = provisioner(&cache)
            .provision(&request(&repo, target.clone()), &mut sources)
            .unwrap();

        let ProvisionOutcome::Created { warnings, .. } = outcome else {
            panic!("expected a real run");
        };
        assert!(warnings.iter().any(|w| w.contains("boom")));
        assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "# demo\n");
        assert!(target.join("setup.mjs").exists());
    }

    #[test]
    fn abort_policy_surfaces_failure() {
        let repo = template_repo("export default () => { throw new Error('boom'); };");
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
        let err = provisioner(&cache)
            .with_setup_failure_policy(SetupFailurePolicy::Abort)
            .provision(&request(&repo, out.path().join("demo")), &mut sources)
            .unwrap_err();
        assert!(matches!(err, TempletError::SetupFailed { .. }));
    }

    #[test]
    fn dry_run_requires_cached_repository() {
        let repo = template_repo("export default () => {};");
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let mut req = request(&repo, out.path().join("demo"));
        req.dry_run = true;
        let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
        let err = provisioner(&cache).provision(&req, &mut sources).unwrap_err();
        assert!(matches!(err, TempletError::PreviewUnavailable { .. }));
        assert!(!out.path().join("demo").exists());
    }

    #[test]
    fn dry_run_after_real_run_matches_its_operations() {
        let repo = template_repo("export default () => {};");
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let provisioner = provisioner(&cache);

        let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
        let created = provisioner
            .provision(&request(&repo, out.path().join("first")), &mut sources)
            .unwrap();
        let ProvisionOutcome::Created { report, .. } = created else {
            panic!("expected a real run");
        };

        let mut req = request(&repo, out.path().join("second"));
        req.dry_run = true;
        let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
        let ProvisionOutcome::Preview { operations, .. } =
            provisioner.provision(&req, &mut sources).unwrap()
        else {
            panic!("expected a preview");
        };

        assert_eq!(crate::plan::counts(&operations), (report.directories, report.files, 1));
        assert!(!out.path().join("second").exists());
    }

    #[test]
    fn missing_placeholder_fails_before_writing() {
        let repo = template_repo("export default () => {};");
        let cache = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let mut sources = PlaceholderSources::new();
        let err = provisioner(&cache)
            .provision(&request(&repo, out.path().join("demo")), &mut sources)
            .unwrap_err();
        assert!(matches!(err, TempletError::MissingPlaceholders { .. }));
        assert!(!out.path().join("demo").exists());
    }
}
