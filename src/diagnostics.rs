use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Record nothing.
    #[default]
    Silent,
    /// Record warnings and errors as one-line messages.
    Warn,
    /// Record everything, including info messages and full error chains.
    #[value(name = "error_detail")]
    ErrorDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Everything recorded is also emitted as a `tracing` event.
#[derive(Debug, Default)]
pub struct Diagnostics {
    verbosity: Verbosity,
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new(verbosity: Verbosity) -> Self {
        Diagnostics {
            verbosity,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn info(&self, message: impl Into<String>) {
        if self.verbosity == Verbosity::ErrorDetail {
            let message = message.into();
            tracing::info!("{}", message);
            self.push(Severity::Info, message);
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        if self.verbosity != Verbosity::Silent {
            let message = message.into();
            tracing::warn!("{}", message);
            self.push(Severity::Warning, message);
        }
    }

    /// Warning with the failure cause attached at `error_detail`.
    pub fn warn_with(&self, message: impl Into<String>, cause: &dyn Display) {
        let message = self.with_detail(message.into(), cause);
        self.warn(message);
    }

    /// Error with the failure cause attached at `error_detail`.
    pub fn error_with(&self, message: impl Into<String>, cause: &dyn Display) {
        if self.verbosity != Verbosity::Silent {
            let message = self.with_detail(message.into(), cause);
            tracing::error!("{}", message);
            self.push(Severity::Error, message);
        }
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Hand over everything recorded so far, leaving the channel empty.
    pub fn drain(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    fn with_detail(&self, message: String, cause: &dyn Display) -> String {
        match self.verbosity {
            Verbosity::ErrorDetail => format!("{}: {}", message, cause),
            _ => message,
        }
    }

    fn push(&self, severity: Severity, message: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Diagnostic { severity, message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_records_nothing() {
        let d = Diagnostics::new(Verbosity::Silent);
        d.info("loaded");
        d.warn("skipped a row");
        d.error_with("file missing", &"No such file");
        assert!(d.entries().is_empty());
    }

    #[test]
    fn warn_drops_info_and_detail() {
        let d = Diagnostics::new(Verbosity::Warn);
        d.info("loaded");
        d.warn_with("skipped Downtown", &"bad polygon");
        d.error_with("file missing", &"No such file");
        let entries = d.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[0].message, "skipped Downtown");
        assert_eq!(entries[1].severity, Severity::Error);
        assert_eq!(entries[1].message, "file missing");
    }

    #[test]
    fn error_detail_records_everything_with_causes() {
        let d = Diagnostics::new(Verbosity::ErrorDetail);
        d.info("loaded");
        d.error_with("file missing", &"No such file");
        let entries = d.entries();
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[1].message, "file missing: No such file");
    }

    #[test]
    fn cli_and_config_spell_levels_the_same() {
        use clap::ValueEnum;
        for (name, level) in [
            ("silent", Verbosity::Silent),
            ("warn", Verbosity::Warn),
            ("error_detail", Verbosity::ErrorDetail),
        ] {
            assert_eq!(Verbosity::from_str(name, false), Ok(level));
            let from_config: Verbosity = serde_json::from_str(&format!("\"{}\"", name)).unwrap();
            assert_eq!(from_config, level);
        }
    }

    #[test]
    fn drain_empties_the_channel() {
        let d = Diagnostics::new(Verbosity::Warn);
        d.warn("one");
        assert_eq!(d.drain().len(), 1);
        assert!(d.entries().is_empty());
    }
}
