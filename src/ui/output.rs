//! Output verbosity.

use std::str::FromStr;

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Also show the placeholder source report.
    Verbose,
    #[default]
    Normal,
    /// Show results and warnings only.
    Quiet,
    /// Show nothing except errors.
    Silent,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "normal" => Ok(Self::Normal),
            "quiet" => Ok(Self::Quiet),
            "silent" => Ok(Self::Silent),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

impl OutputMode {
    /// Check if this mode shows the resolution report.
    pub fn shows_details(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Check if this mode shows progress messages.
    pub fn shows_progress(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }

    /// Check if this mode shows status messages.
    pub fn shows_status(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("QUIET".parse::<OutputMode>().unwrap(), OutputMode::Quiet);
        assert!("loud".parse::<OutputMode>().is_err());
    }

    #[test]
    fn visibility_by_mode() {
        assert!(OutputMode::Verbose.shows_details());
        assert!(!OutputMode::Normal.shows_details());
        assert!(!OutputMode::Quiet.shows_progress());
        assert!(OutputMode::Quiet.shows_status());
        assert!(!OutputMode::Silent.shows_status());
    }
}
