//! Terminal output and prompting.
//!
//! Commands talk to the terminal through [`UserInterface`], so they can be
//! driven by [`MockUI`] in tests. [`UiPrompter`] lets placeholder
//! resolution ask the user for values through the same interface.

pub mod mock;
pub mod output;
pub mod prompts;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use output::OutputMode;
pub use prompts::prompt_user;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, TempletTheme};

use crate::error::Result;
use crate::placeholders::{PlaceholderDefinition, Prompter};

/// A question for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Stable identifier, such as a placeholder token.
    pub key: String,
    pub question: String,
    pub default: Option<String>,
    /// Hide the answer while typing.
    pub secret: bool,
}

impl Prompt {
    pub fn input(key: &str, question: &str) -> Self {
        Self {
            key: key.to_string(),
            question: question.to_string(),
            default: None,
            secret: false,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Abstraction over terminal output and input.
pub trait UserInterface {
    fn output_mode(&self) -> OutputMode;

    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    /// Errors are shown in every output mode.
    fn error(&mut self, msg: &str);

    fn show_header(&mut self, title: &str);

    /// Ask a question and return the raw answer.
    fn prompt(&mut self, prompt: &Prompt) -> Result<String>;

    fn is_interactive(&self) -> bool;
}

/// Asks for placeholder values through a [`UserInterface`].
pub struct UiPrompter<'u> {
    ui: &'u mut dyn UserInterface,
}

impl<'u> UiPrompter<'u> {
    pub fn new(ui: &'u mut dyn UserInterface) -> Self {
        Self { ui }
    }
}

impl Prompter for UiPrompter<'_> {
    fn ask(
        &mut self,
        definition: &PlaceholderDefinition,
        suggested: Option<&str>,
    ) -> Result<Option<String>> {
        if !self.ui.is_interactive() {
            return Ok(None);
        }

        let question = match &definition.description {
            Some(description) => format!("{} ({})", description, definition.token),
            None => format!("{} ({})", definition.token, definition.kind),
        };
        let mut prompt = Prompt::input(&definition.token, &question);
        if definition.sensitive {
            prompt = prompt.secret();
        } else if let Some(suggested) = suggested {
            prompt = prompt.with_default(suggested);
        }

        let answer = self.ui.prompt(&prompt)?;
        Ok(Some(answer).filter(|a| !a.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompter_asks_with_suggestion() {
        let mut ui = MockUI::new();
        let definition = PlaceholderDefinition::text("AUTHOR");

        let answer = UiPrompter::new(&mut ui).ask(&definition, Some("Ada")).unwrap();
        assert_eq!(answer.as_deref(), Some("Ada"));
        assert_eq!(ui.prompts_shown()[0].default.as_deref(), Some("Ada"));
    }

    #[test]
    fn sensitive_placeholders_are_secret_without_default() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("API_KEY", "s3cret");
        let definition = PlaceholderDefinition::text("API_KEY").sensitive();

        let answer = UiPrompter::new(&mut ui).ask(&definition, Some("old")).unwrap();
        assert_eq!(answer.as_deref(), Some("s3cret"));
        let shown = &ui.prompts_shown()[0];
        assert!(shown.secret);
        assert_eq!(shown.default, None);
    }

    #[test]
    fn empty_answer_defers_to_other_sources() {
        let mut ui = MockUI::new();
        let definition = PlaceholderDefinition::text("AUTHOR");
        let answer = UiPrompter::new(&mut ui).ask(&definition, None).unwrap();
        assert_eq!(answer, None);
    }

    #[test]
    fn non_interactive_ui_is_not_asked() {
        let mut ui = MockUI::new();
        ui.set_interactive(false);
        let definition = PlaceholderDefinition::text("AUTHOR");
        assert_eq!(UiPrompter::new(&mut ui).ask(&definition, None).unwrap(), None);
        assert!(ui.prompts_shown().is_empty());
    }
}
