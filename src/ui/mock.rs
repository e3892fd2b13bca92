//! Mock UI for tests.

use std::collections::HashMap;

use crate::error::Result;

use super::{OutputMode, Prompt, UserInterface};

/// Captures everything shown and answers prompts from a table.
#[derive(Debug)]
pub struct MockUI {
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    prompt_responses: HashMap<String, String>,
    prompts_shown: Vec<Prompt>,
    interactive: bool,
}

impl Default for MockUI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUI {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            successes: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            headers: Vec::new(),
            prompt_responses: HashMap::new(),
            prompts_shown: Vec::new(),
            interactive: true,
        }
    }

    /// Answer the prompt for `key` with `response`.
    pub fn set_prompt_response(&mut self, key: &str, response: &str) {
        self.prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn prompts_shown(&self) -> &[Prompt] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }

    pub fn has_header(&self, title: &str) -> bool {
        self.headers.iter().any(|h| h.contains(title))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        OutputMode::Verbose
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<String> {
        self.prompts_shown.push(prompt.clone());
        Ok(self
            .prompt_responses
            .get(&prompt.key)
            .cloned()
            .or_else(|| prompt.default.clone())
            .unwrap_or_default())
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_output() {
        let mut ui = MockUI::new();
        ui.message("hello");
        ui.success("done");
        ui.warning("careful");
        ui.error("broken");
        ui.show_header("templet");

        assert!(ui.has_message("hello"));
        assert!(ui.has_success("done"));
        assert!(ui.has_warning("careful"));
        assert!(ui.has_error("broken"));
        assert!(ui.has_header("templet"));
    }

    #[test]
    fn prompt_prefers_response_over_default() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("AUTHOR", "Ada");

        let answer = ui
            .prompt(&Prompt::input("AUTHOR", "Author").with_default("Bob"))
            .unwrap();
        assert_eq!(answer, "Ada");

        let answer = ui
            .prompt(&Prompt::input("LICENSE", "License").with_default("MIT"))
            .unwrap();
        assert_eq!(answer, "MIT");
        assert_eq!(ui.prompts_shown().len(), 2);
    }
}
