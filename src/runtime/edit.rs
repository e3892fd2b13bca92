//! Structured text edits.

use serde::Serialize;

/// One edit to a text file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextEdit {
    /// Insert `text` as new lines after the line containing `marker`.
    InsertAfter { marker: String, text: String },
    /// Insert `text` as new lines before the line containing `marker`.
    InsertBefore { marker: String, text: String },
    /// Replace everything between the lines holding `start` and `end`.
    /// The marker lines stay.
    ReplaceBetween {
        start: String,
        end: String,
        text: String,
    },
    /// Append `text` on a new line at the end.
    Append { text: String },
    /// Replace every literal occurrence of `search`.
    Replace { search: String, replacement: String },
}

/// Apply `edit` to `content`.
pub fn apply(content: &str, edit: &TextEdit) -> Result<String, String> {
    match edit {
        TextEdit::InsertAfter { marker, text } => {
            let (_, line_end) = line_bounds(content, marker)?;
            Ok(splice(content, line_end, line_end, &as_lines(text)))
        }
        TextEdit::InsertBefore { marker, text } => {
            let (line_start, _) = line_bounds(content, marker)?;
            Ok(splice(content, line_start, line_start, &as_lines(text)))
        }
        TextEdit::ReplaceBetween { start, end, text } => {
            let (_, body_start) = line_bounds(content, start)?;
            let rest = &content[body_start..];
            let found = rest
                .find(end.as_str())
                .ok_or_else(|| format!("end marker '{end}' not found after '{start}'"))?;
            let body_end = body_start + rest[..found].rfind('\n').map(|i| i + 1).unwrap_or(0);
            Ok(splice(content, body_start, body_end, &as_lines(text)))
        }
        TextEdit::Append { text } => {
            let mut out = content.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&as_lines(text));
            Ok(out)
        }
        TextEdit::Replace {
            search,
            replacement,
        } => {
            if search.is_empty() {
                return Err("search text is empty".to_string());
            }
            if !content.contains(search.as_str()) {
                return Err(format!("text '{search}' not found"));
            }
            Ok(content.replace(search.as_str(), replacement))
        }
    }
}

/// Byte range of the whole line containing `marker`, including its newline.
fn line_bounds(content: &str, marker: &str) -> Result<(usize, usize), String> {
    if marker.is_empty() {
        return Err("marker is empty".to_string());
    }
    let at = content
        .find(marker)
        .ok_or_else(|| format!("marker '{marker}' not found"))?;
    let start = content[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = content[at..]
        .find('\n')
        .map(|i| at + i + 1)
        .unwrap_or(content.len());
    Ok((start, end))
}

fn as_lines(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

fn splice(content: &str, from: usize, to: usize, insert: &str) -> String {
    let mut out = String::with_capacity(content.len() + insert.len());
    out.push_str(&content[..from]);
    if from > 0 && !content[..from].ends_with('\n') {
        out.push('\n');
    }
    out.push_str(insert);
    out.push_str(&content[to..]);
    out
}
