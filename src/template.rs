//! Templates inside a fetched repository.
//!
//! A template is any directory carrying a manifest file. A repository may
//! hold one template at its root or several in subdirectories. When a
//! template directory has a `template/` subdirectory, only that
//! subdirectory is project content; otherwise the whole template directory
//! is content, minus the manifest itself.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, TempletError};
use crate::manifest::TemplateManifest;

/// Manifest file names, in lookup order.
pub const MANIFEST_FILES: [&str; 3] = ["template.yml", "template.yaml", "template.json"];

/// Name of the optional content subdirectory.
pub const CONTENT_DIR: &str = "template";

const MAX_DISCOVERY_DEPTH: usize = 3;
const SKIPPED_DIRS: [&str; 2] = [".git", "node_modules"];

/// A loaded template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Template name (manifest `name`, else directory name).
    pub name: String,
    /// Directory holding the manifest.
    pub root: PathBuf,
    /// Directory whose contents are copied into new projects.
    pub content_root: PathBuf,
    /// Path of the manifest file.
    pub manifest_path: PathBuf,
    /// Parsed manifest.
    pub manifest: TemplateManifest,
}

impl Template {
    /// Load the template rooted at `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = manifest_in(dir).ok_or_else(|| TempletError::ManifestNotFound {
            path: dir.to_path_buf(),
        })?;
        let manifest = TemplateManifest::load(&manifest_path)?;

        let name = manifest
            .name
            .clone()
            .or_else(|| {
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "default".to_string());

        let nested = dir.join(CONTENT_DIR);
        let content_root = if nested.is_dir() {
            nested
        } else {
            dir.to_path_buf()
        };

        Ok(Self {
            name,
            root: dir.to_path_buf(),
            content_root,
            manifest_path,
            manifest,
        })
    }

    /// Absolute path of the setup script, when the manifest declares one.
    pub fn setup_script(&self) -> Option<PathBuf> {
        self.manifest
            .setup_script
            .as_ref()
            .map(|rel| self.root.join(rel))
    }

    /// Whether `path` is template metadata rather than project content.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if path == self.manifest_path {
            return true;
        }
        if self.setup_script().as_deref() == Some(path) {
            return true;
        }
        path.file_name()
            .is_some_and(|name| SKIPPED_DIRS.iter().any(|s| name == *s))
    }
}

/// The manifest file in `dir`, if any.
pub fn manifest_in(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Directories under `repo` that carry a manifest, sorted.
///
/// Content directories of discovered templates are not searched.
pub fn discover(repo: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(repo)
        .max_depth(MAX_DISCOVERY_DEPTH)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry
            .file_name()
            .to_str()
            .is_some_and(|n| SKIPPED_DIRS.contains(&n))
        {
            walker.skip_current_dir();
            continue;
        }
        if manifest_in(entry.path()).is_some() {
            found.push(entry.path().to_path_buf());
            if entry.depth() > 0 {
                walker.skip_current_dir();
            }
        }
    }

    found
}

/// Load every template in `repo`, skipping ones whose manifest fails to parse.
pub fn load_all(repo: &Path) -> Vec<Template> {
    discover(repo)
        .iter()
        .filter_map(|dir| match Template::load(dir) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!("Skipping template at {}: {}", dir.display(), e);
                None
            }
        })
        .collect()
}

/// Find a template by name.
///
/// An empty name selects the only template when the repository holds
/// exactly one.
pub fn find(repo: &Path, name: &str) -> Result<Template> {
    let mut templates = load_all(repo);

    if name.is_empty() && templates.len() == 1 {
        return Ok(templates.remove(0));
    }

    let available: Vec<String> = templates.iter().map(|t| t.name.clone()).collect();
    templates
        .into_iter()
        .find(|t| t.name == name)
        .ok_or_else(|| TempletError::UnknownTemplate {
            name: name.to_string(),
            available,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn root_template_uses_whole_directory() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("template.yml"), "name: root\n");
        write(&temp.path().join("README.md"), "hi");

        let template = find(temp.path(), "root").unwrap();
        assert_eq!(template.content_root, temp.path());
        assert!(template.is_excluded(&temp.path().join("template.yml")));
        assert!(!template.is_excluded(&temp.path().join("README.md")));
    }

    #[test]
    fn nested_templates_are_discovered() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("templates/node/template.yml"), "name: node\n");
        write(&temp.path().join("templates/node/template/index.js"), "x");
        write(&temp.path().join("templates/react/template.json"), r#"{"name":"react"}"#);
        write(&temp.path().join("docs/readme.md"), "no manifest");

        let dirs = discover(temp.path());
        assert_eq!(dirs.len(), 2);

        let node = find(temp.path(), "node").unwrap();
        assert_eq!(node.content_root, temp.path().join("templates/node/template"));
    }

    #[test]
    fn name_falls_back_to_directory() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("starter/template.yml"), "description: nameless\n");

        let template = find(temp.path(), "starter").unwrap();
        assert_eq!(template.name, "starter");
    }

    #[test]
    fn empty_name_selects_single_template() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("only/template.yml"), "name: only\n");
        assert_eq!(find(temp.path(), "").unwrap().name, "only");
    }

    #[test]
    fn unknown_template_lists_available() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a/template.yml"), "name: a\n");
        let err = find(temp.path(), "b").unwrap_err();
        assert!(
            matches!(err, TempletError::UnknownTemplate { ref available, .. } if available == &["a"])
        );
    }

    #[test]
    fn setup_script_is_excluded_from_content() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("template.yml"), "name: x\nsetup: setup.mjs\n");
        write(&temp.path().join("setup.mjs"), "");

        let template = Template::load(temp.path()).unwrap();
        let script = template.setup_script().unwrap();
        assert!(template.is_excluded(&script));
    }

    #[test]
    fn missing_manifest_is_reported() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Template::load(temp.path()),
            Err(TempletError::ManifestNotFound { .. })
        ));
    }
}
