//! Editor presets applied by setup scripts.

use serde_json::{json, Value};

/// A file an IDE preset writes, merged into any existing content.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetFile {
    /// Path relative to the project root.
    pub path: &'static str,
    pub content: Value,
}

/// Names of the built-in presets.
pub const PRESETS: [&str; 3] = ["vscode", "cursor", "windsurf"];

/// Files for a preset, or `None` when the name is unknown.
pub fn preset_files(name: &str) -> Option<Vec<PresetFile>> {
    let settings = json!({
        "editor.formatOnSave": true,
        "editor.tabSize": 2,
        "files.trimTrailingWhitespace": true,
        "files.insertFinalNewline": true,
    });
    let extensions = json!({
        "recommendations": ["editorconfig.editorconfig", "esbenp.prettier-vscode"],
    });

    let files = match name.trim().to_ascii_lowercase().as_str() {
        "vscode" => vec![
            PresetFile {
                path: ".vscode/settings.json",
                content: settings,
            },
            PresetFile {
                path: ".vscode/extensions.json",
                content: extensions,
            },
        ],
        "cursor" => vec![
            PresetFile {
                path: ".vscode/settings.json",
                content: settings,
            },
            PresetFile {
                path: ".cursor/settings.json",
                content: json!({ "cursor.general.enableShadowWorkspace": false }),
            },
        ],
        "windsurf" => vec![
            PresetFile {
                path: ".vscode/settings.json",
                content: settings,
            },
            PresetFile {
                path: ".windsurf/settings.json",
                content: json!({ "windsurf.autocompleteSpeed": "default" }),
            },
        ],
        _ => return None,
    };
    Some(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_preset_resolves() {
        for name in PRESETS {
            let files = preset_files(name).unwrap();
            assert!(files.iter().any(|f| f.path == ".vscode/settings.json"));
        }
    }

    #[test]
    fn preset_names_are_case_insensitive() {
        assert!(preset_files("VSCode").is_some());
        assert!(preset_files("emacs").is_none());
    }
}
