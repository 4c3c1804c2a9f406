//! Typed error kinds and the bounded error aggregator.
//!
//! Every layer recovers locally from `Parse`, `Validation`, and `Rule`
//! errors; the pipeline surfaces `Io` upward but continues with other
//! files. `Config` errors abort before a pipeline run starts.

use std::fmt;

use thiserror::Error;

/// A single error kind recognized by the aggregator. Mirrors the five
/// kinds laid out by the error handling design: source/JSON that could
/// not be parsed, generated text that failed reparse or a safety
/// threshold, filesystem failures, a single misbehaving rule, and
/// caller-supplied configuration problems.
#[derive(Debug, Error)]
pub enum NeurolintError {
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("validation failed in {file}: {message}")]
    Validation { file: String, message: String },

    #[error("io error on {file}: {message}")]
    Io { file: String, message: String },

    #[error("rule '{description}' raised during apply: {message}")]
    Rule { description: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NeurolintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Io { .. } => ErrorKind::Io,
            Self::Rule { .. } => ErrorKind::Rule,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Validation,
    Io,
    Rule,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::Io => "io",
            Self::Rule => "rule",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

/// A severity-free record the aggregator keeps: either a hard error or an
/// advisory warning, bucketed by the file it came from.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub file: String,
    pub message: String,
    pub kind: ErrorKind,
}

/// Bounded, classified error/warning collector.
///
/// Caps default to 100 each for errors and warnings, matching the error
/// handling design. Once a cap is hit further records of that kind are
/// dropped and `truncated` is set.
#[derive(Debug)]
pub struct ErrorAggregator {
    error_cap: usize,
    warning_cap: usize,
    errors: Vec<Recorded>,
    warnings: Vec<Recorded>,
    errors_truncated: bool,
    warnings_truncated: bool,
}

impl Default for ErrorAggregator {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

impl ErrorAggregator {
    pub fn new(error_cap: usize, warning_cap: usize) -> Self {
        Self {
            error_cap,
            warning_cap,
            errors: Vec::new(),
            warnings: Vec::new(),
            errors_truncated: false,
            warnings_truncated: false,
        }
    }

    pub fn record_error(&mut self, file: impl Into<String>, kind: ErrorKind, message: impl Into<String>) {
        if self.errors.len() >= self.error_cap {
            self.errors_truncated = true;
            return;
        }
        self.errors.push(Recorded {
            file: file.into(),
            message: message.into(),
            kind,
        });
    }

    pub fn record_warning(&mut self, file: impl Into<String>, kind: ErrorKind, message: impl Into<String>) {
        if self.warnings.len() >= self.warning_cap {
            self.warnings_truncated = true;
            return;
        }
        self.warnings.push(Recorded {
            file: file.into(),
            message: message.into(),
            kind,
        });
    }

    pub fn errors(&self) -> &[Recorded] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Recorded] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.errors_truncated || self.warnings_truncated
    }

    pub fn errors_truncated(&self) -> bool {
        self.errors_truncated
    }

    pub fn warnings_truncated(&self) -> bool {
        self.warnings_truncated
    }

    /// Count of recorded (non-truncated) errors by kind.
    pub fn count_by_kind(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|r| r.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_within_cap() {
        let mut agg = ErrorAggregator::new(2, 2);
        agg.record_error("a.ts", ErrorKind::Parse, "bad token");
        agg.record_error("b.ts", ErrorKind::Io, "not found");
        assert_eq!(agg.errors().len(), 2);
        assert!(!agg.truncated());
    }

    #[test]
    fn test_truncates_past_cap() {
        let mut agg = ErrorAggregator::new(1, 1);
        agg.record_error("a.ts", ErrorKind::Parse, "bad token");
        agg.record_error("b.ts", ErrorKind::Io, "not found");
        assert_eq!(agg.errors().len(), 1);
        assert!(agg.errors_truncated());
        assert!(agg.truncated());
    }

    #[test]
    fn test_warnings_separate_cap() {
        let mut agg = ErrorAggregator::new(100, 1);
        agg.record_warning("a.ts", ErrorKind::Validation, "low confidence");
        agg.record_warning("b.ts", ErrorKind::Validation, "low confidence");
        assert_eq!(agg.warnings().len(), 1);
        assert!(agg.warnings_truncated());
        assert!(!agg.errors_truncated());
    }

    #[test]
    fn test_count_by_kind() {
        let mut agg = ErrorAggregator::default();
        agg.record_error("a.ts", ErrorKind::Parse, "x");
        agg.record_error("b.ts", ErrorKind::Parse, "y");
        agg.record_error("c.ts", ErrorKind::Io, "z");
        assert_eq!(agg.count_by_kind(ErrorKind::Parse), 2);
        assert_eq!(agg.count_by_kind(ErrorKind::Io), 1);
    }

    #[test]
    fn test_default_caps_are_100() {
        let agg = ErrorAggregator::default();
        assert_eq!(agg.error_cap, 100);
        assert_eq!(agg.warning_cap, 100);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::Parse.to_string(), "parse");
        assert_eq!(ErrorKind::Config.to_string(), "config");
    }
}
