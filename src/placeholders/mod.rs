//! Placeholder definitions, sources and resolution.
//!
//! Templates mark text with `{{TOKEN}}` placeholders. Values come from
//! several ranked sources; the resolver picks one per token, coerces it to
//! the declared type and records where it came from.

pub mod definition;
pub mod report;
pub mod resolver;
pub mod sources;
pub mod substitute;

pub use definition::{canonical_token, PlaceholderDefinition, PlaceholderType};
pub use report::{ReportEntry, ResolutionReport, REDACTED};
pub use resolver::{PlaceholderResolver, Resolution};
pub use sources::{PlaceholderSources, Prompter, ScriptedPrompter, ValueSource, ENV_PREFIX};
pub use substitute::substitute;
