//! Terminal styling.

use console::Style;

/// Styles for terminal output.
#[derive(Debug, Clone)]
pub struct TempletTheme {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub header: Style,
}

impl Default for TempletTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl TempletTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            header: Style::new().bold().cyan(),
        }
    }

    /// Theme without colors.
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            header: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{} {}", self.success.apply_to("✓"), msg)
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{} {}", self.warning.apply_to("⚠"), self.warning.apply_to(msg))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{} {}", self.error.apply_to("✗"), self.error.apply_to(msg))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(title))
    }
}

/// Colors are off when `NO_COLOR` is set or stdout is not a terminal.
pub fn should_use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_formats_markers() {
        let theme = TempletTheme::plain();
        assert_eq!(theme.format_success("Created"), "✓ Created");
        assert_eq!(theme.format_warning("Careful"), "⚠ Careful");
        assert_eq!(theme.format_error("Failed"), "✗ Failed");
        assert_eq!(theme.format_header("templet"), "templet");
    }

    #[test]
    fn default_theme_keeps_text() {
        let theme = TempletTheme::default();
        assert!(theme.format_success("Created").contains("Created"));
    }
}
