//! Log markers used to detect readiness from a container's log stream.

use regex::Regex;

use crate::project::ConfigError;

/// A timestamped regex that signals readiness when it matches a log line.
///
/// The offset records how far into the monitored window the marker is
/// expected to fire; it is diagnostic only and never gates matching. The
/// pattern is compiled once at configuration load so an invalid pattern
/// fails before any engine call.
#[derive(Debug, Clone)]
pub struct LogMarker {
    offset_ms: u64,
    pattern: Regex,
    description: String,
}

impl LogMarker {
    /// Compiles a marker from its pattern text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMarker`] if the pattern is not a valid
    /// regular expression.
    pub fn new(
        offset_ms: u64,
        pattern: &str,
        description: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let compiled = Regex::new(pattern).map_err(|source| ConfigError::InvalidMarker {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            offset_ms,
            pattern: compiled,
            description: description.into(),
        })
    }

    /// Expected offset from monitor attach, in milliseconds.
    #[must_use]
    pub const fn offset_ms(&self) -> u64 {
        self.offset_ms
    }

    /// Returns whether the marker's pattern matches the given log line.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    /// Human-readable description for progress reporting.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}
