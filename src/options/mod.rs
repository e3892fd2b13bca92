//! Option tokens and dimension normalization.

pub mod normalizer;
pub mod token;

pub use normalizer::{NormalizedOptions, OptionsNormalizer};
pub use token::OptionToken;
