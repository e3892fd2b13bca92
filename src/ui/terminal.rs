//! Terminal output.

use console::Term;
use std::io::Write;

use crate::error::{Result, TempletError};

use super::{prompt_user, should_use_colors, OutputMode, Prompt, TempletTheme, UserInterface};

/// Writes to stdout, prompting on the terminal when interactive.
pub struct TerminalUI {
    term: Term,
    theme: TempletTheme,
    mode: OutputMode,
    interactive: bool,
}

impl TerminalUI {
    pub fn new(mode: OutputMode, interactive: bool) -> Self {
        let theme = if should_use_colors() {
            TempletTheme::new()
        } else {
            TempletTheme::plain()
        };

        Self {
            term: Term::stdout(),
            theme,
            mode,
            interactive,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        let _ = writeln!(Term::stderr(), "{}", self.theme.format_error(msg));
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_progress() {
            writeln!(self.term, "{}", self.theme.format_header(title)).ok();
        }
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<String> {
        if !self.is_interactive() {
            return Err(TempletError::validation(format!(
                "cannot prompt for {} without a terminal",
                prompt.key
            )));
        }
        prompt_user(prompt, &self.term)
    }

    fn is_interactive(&self) -> bool {
        self.interactive && self.term.is_term()
    }
}

/// Create the UI for this process.
pub fn create_ui(interactive: bool, mode: OutputMode) -> Box<dyn UserInterface> {
    Box::new(TerminalUI::new(mode, interactive))
}
