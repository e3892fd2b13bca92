//! Audit trail of placeholder resolution.
//!
//! The report is the only view of resolution meant for logs and terminals.
//! Sensitive values are masked when an entry is recorded, so the plaintext
//! never reaches the report at all.

use serde::Serialize;
use std::fmt;

use super::sources::ValueSource;

/// Text shown in place of sensitive values.
pub const REDACTED: &str = "[REDACTED]";

/// One resolved placeholder as it may be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub token: String,
    pub source: ValueSource,
    /// The value, or [`REDACTED`] for sensitive placeholders.
    pub display: String,
    pub sensitive: bool,
}

/// Ordered `{token, source}` trail with sensitive values redacted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    entries: Vec<ReportEntry>,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved value, masking it when sensitive.
    pub fn record(&mut self, token: &str, value: &str, source: ValueSource, sensitive: bool) {
        let display = if sensitive {
            REDACTED.to_string()
        } else {
            value.to_string()
        };
        self.entries.push(ReportEntry {
            token: token.to_string(),
            source,
            display,
            sensitive,
        });
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// The entry for `token`, if it was resolved.
    pub fn get(&self, token: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.token == token)
    }

    /// Source that supplied `token`.
    pub fn source_of(&self, token: &str) -> Option<ValueSource> {
        self.get(token).map(|e| e.source)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.entries.iter().map(|e| e.token.len()).max().unwrap_or(0);
        for entry in &self.entries {
            writeln!(
                f,
                "{:width$}  {}  ({})",
                entry.token,
                entry.display,
                entry.source,
                width = width
            )?;
        }
        Ok(())
    }
}
