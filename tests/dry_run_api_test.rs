//! End-to-end tests: cache, options, placeholders, preview and execution.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use templet::cache::{cache_key, CacheResolution, RepoCache, ResolveOptions};
use templet::fetch::{FetchOutcome, RepoFetcher};
use templet::locator::RepoLocator;
use templet::options::OptionsNormalizer;
use templet::pipeline::{ProvisionOutcome, ProvisionRequest, Provisioner};
use templet::placeholders::{PlaceholderDefinition, PlaceholderResolver, PlaceholderSources};
use templet::plan::{counts, render, DryRunEngine, MaterializationOperation};
use templet::{Result, TempletError};

const MANIFEST: &str = r#"
name: starter
setup: setup.mjs
dimensions:
  deployment:
    arity: single
    values: [aws, gcp]
    default: aws
  features:
    arity: multi
    values: [lint, docker]
placeholders:
  PROJECT_NAME: { type: text, required: true }
  AUTHOR: { type: text }
"#;

/// Serves the starter template without touching the network.
struct StarterFetcher {
    with_setup: bool,
}

impl RepoFetcher for StarterFetcher {
    fn fetch(&self, _locator: &RepoLocator, _branch: &str, dest: &Path) -> Result<FetchOutcome> {
        fs::create_dir_all(dest.join("src"))?;
        fs::write(dest.join("template.yml"), MANIFEST)?;
        fs::write(dest.join("package.json"), "{\"name\": \"{{PROJECT_NAME}}\"}\n")?;
        fs::write(dest.join("README.md"), "# {{PROJECT_NAME}}\n")?;
        fs::write(dest.join("src").join("index.js"), "console.log('{{PROJECT_NAME}}');\n")?;
        if self.with_setup {
            fs::write(
                dest.join("setup.mjs"),
                "export default ({ tools }) => { tools.files.append('README.md', 'ready'); };\n",
            )?;
        }
        Ok(FetchOutcome::default())
    }
}

fn repo() -> RepoLocator {
    RepoLocator::parse("user/repo").unwrap()
}

fn file_copies(ops: &[MaterializationOperation]) -> Vec<PathBuf> {
    ops.iter()
        .filter_map(|op| match op {
            MaterializationOperation::FileCopy { destination, .. } => Some(destination.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn cached_template_previews_without_writing() {
    let temp = TempDir::new().unwrap();
    let cache = RepoCache::new(temp.path().join("cache"));
    let entry = cache
        .ensure(
            &repo(),
            "main",
            &ResolveOptions::default(),
            &StarterFetcher { with_setup: false },
        )
        .unwrap();
    assert_eq!(entry.key, cache_key(&repo(), "main"));

    let resolution = cache
        .resolve(&repo(), "main", &ResolveOptions::default())
        .unwrap();
    let CacheResolution::Hit(hit) = resolution else {
        panic!("expected a hit");
    };
    assert_eq!(hit.directory, cache.slot(&entry.key).directory);

    let template = templet::template::find(&hit.directory, "starter").unwrap();
    let options = OptionsNormalizer::for_manifest(&template.manifest)
        .normalize::<&str>(&[])
        .unwrap();
    assert_eq!(options.single("deployment"), Some("aws"));
    assert!(options.values("features").is_empty());

    let definitions = PlaceholderDefinition::from_specs(&template.manifest.placeholders).unwrap();
    let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
    let values = PlaceholderResolver::new()
        .resolve(&definitions, &mut sources)
        .unwrap();
    assert_eq!(values.get("PROJECT_NAME"), Some("demo"));
    assert_eq!(values.get("AUTHOR"), None);

    let target = temp.path().join("out").join("demo");
    let ops = DryRunEngine::new(&cache)
        .plan(&repo(), "main", "starter", &target)
        .unwrap();
    assert_eq!(
        file_copies(&ops),
        vec![
            target.join("README.md"),
            target.join("package.json"),
            target.join("src").join("index.js"),
        ]
    );
    assert!(!target.exists());
    assert!(render(&ops).contains("Files to copy (3):"));
}

#[test]
fn preview_of_uncached_repository_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let cache = RepoCache::new(temp.path());

    let err = DryRunEngine::new(&cache)
        .plan(&repo(), "main", "starter", &temp.path().join("demo"))
        .unwrap_err();
    assert!(matches!(err, TempletError::PreviewUnavailable { .. }));
    assert!(cache.list().unwrap().is_empty());
}

#[test]
fn preview_of_expired_cache_is_unavailable_and_leaves_it_alone() {
    let temp = TempDir::new().unwrap();
    let cache = RepoCache::new(temp.path());
    let entry = cache
        .ensure(
            &repo(),
            "main",
            &ResolveOptions::default(),
            &StarterFetcher { with_setup: false },
        )
        .unwrap();

    let paths = cache.slot(&entry.key);
    let mut meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.metadata).unwrap()).unwrap();
    meta["refreshed_at"] = "2020-01-01T00:00:00Z".into();
    let backdated = serde_json::to_string(&meta).unwrap();
    fs::write(&paths.metadata, &backdated).unwrap();

    let err = DryRunEngine::new(&cache)
        .plan(&repo(), "main", "starter", &temp.path().join("demo"))
        .unwrap_err();
    let TempletError::PreviewUnavailable { reason, .. } = err else {
        panic!("expected PreviewUnavailable, got {err:?}");
    };
    assert!(reason.contains("expired"));

    assert_eq!(fs::read_to_string(&paths.metadata).unwrap(), backdated);
    assert!(paths.directory.join("README.md").is_file());
    assert!(!temp.path().join("demo").exists());
}

#[test]
fn preview_matches_real_run() {
    let temp = TempDir::new().unwrap();
    let provisioner = Provisioner::new(RepoCache::new(temp.path().join("cache")))
        .with_fetcher(Box::new(StarterFetcher { with_setup: true }));

    let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
    let real = provisioner
        .provision(
            &ProvisionRequest::new(repo(), "starter", temp.path().join("real")),
            &mut sources,
        )
        .unwrap();
    let ProvisionOutcome::Created {
        target,
        report,
        warnings,
        ..
    } = real
    else {
        panic!("expected a real run");
    };
    assert!(warnings.is_empty());
    assert_eq!(
        fs::read_to_string(target.join("README.md")).unwrap(),
        "# demo\nready\n"
    );
    assert!(!target.join("setup.mjs").exists());
    assert!(!target.join("template.yml").exists());

    let mut request = ProvisionRequest::new(repo(), "starter", temp.path().join("preview"));
    request.dry_run = true;
    let mut sources = PlaceholderSources::new().flag("PROJECT_NAME", "demo");
    let ProvisionOutcome::Preview { operations, .. } =
        provisioner.provision(&request, &mut sources).unwrap()
    else {
        panic!("expected a preview");
    };

    assert_eq!(counts(&operations), (2, 3, 1));
    assert_eq!(counts(&operations), (report.directories, report.files, 1));
    assert!(!temp.path().join("preview").exists());
}
