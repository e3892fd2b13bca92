//! Interactive prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};

use crate::error::{Result, TempletError};

use super::Prompt;

fn map_dialoguer_err(e: dialoguer::Error) -> TempletError {
    TempletError::Io(e.into())
}

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Ask for a line of text. An empty answer is returned as-is.
pub fn prompt_user(prompt: &Prompt, term: &Term) -> Result<String> {
    let theme = prompt_theme();
    if prompt.secret {
        return Password::with_theme(&theme)
            .with_prompt(&prompt.question)
            .allow_empty_password(true)
            .interact_on(term)
            .map_err(map_dialoguer_err);
    }

    let input = Input::<String>::with_theme(&theme)
        .with_prompt(&prompt.question)
        .allow_empty(true);
    match &prompt.default {
        Some(default) => input
            .default(default.clone())
            .interact_on(term)
            .map_err(map_dialoguer_err),
        None => input.interact_on(term).map_err(map_dialoguer_err),
    }
}
