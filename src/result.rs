//! Accumulated output and outcome of a release run or a single phase.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

/// Outcome code of a run or phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ResultCode {
    /// Not finished yet
    #[default]
    Undefined,
    /// Completed successfully
    Success,
    /// Stopped on an error
    Error,
}

/// Severity of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    /// Debug detail
    Debug,
    /// Informational
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Debug => "[DEBUG] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Warn => "[WARNING] ",
            LogLevel::Error => "[ERROR] ",
        }
    }
}

/// One recorded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
}

/// Output and outcome of a release run or phase
///
/// Phases write into their own result; the release manager merges each
/// phase's result into the run-level result whether or not the phase
/// succeeded. The run-level code is set by the manager only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseResult {
    code: ResultCode,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    entries: Vec<LogEntry>,
    output: String,
}

impl ReleaseResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty result stamped with the current time as start time
    pub fn started() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Outcome code
    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// Set the outcome code
    pub fn set_code(&mut self, code: ResultCode) {
        self.code = code;
    }

    /// Whether the outcome is success
    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Success
    }

    /// Start timestamp
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// End timestamp
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Stamp the end time
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Record an informational message
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.record(LogLevel::Info, message);
    }

    /// Record a warning
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.record(LogLevel::Warn, message);
    }

    /// Record an error
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.record(LogLevel::Error, message);
    }

    /// Record a debug message
    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}", message);
        self.record(LogLevel::Debug, message);
    }

    fn record(&mut self, level: LogLevel, message: String) {
        let _ = writeln!(self.output, "{}{}", level.prefix(), message);
        self.entries.push(LogEntry { level, message });
    }

    /// Append raw output
    pub fn append_output(&mut self, output: &str) {
        self.output.push_str(output);
    }

    /// Merge a phase's messages and output into this result
    ///
    /// The phase's code is not consulted.
    pub fn merge(&mut self, phase: &ReleaseResult) {
        self.entries.extend(phase.entries.iter().cloned());
        self.append_output(&phase.output);
    }

    /// Everything recorded so far, in order
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Messages at a given level, in order
    pub fn messages(&self, level: LogLevel) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |e| e.level == level)
            .map(|e| e.message.as_str())
    }

    /// All recorded entries
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_independent() {
        let mut result = ReleaseResult::new();
        result.info("tagging");
        result.warn("no upstream");
        result.debug("detail");
        result.error("failed");

        assert_eq!(result.messages(LogLevel::Info).collect::<Vec<_>>(), vec!["tagging"]);
        assert_eq!(result.messages(LogLevel::Warn).collect::<Vec<_>>(), vec!["no upstream"]);
        assert_eq!(result.messages(LogLevel::Error).count(), 1);
        assert!(result.output().starts_with("[INFO] tagging\n[WARNING] no upstream\n"));
    }

    #[test]
    fn merge_keeps_run_code() {
        let mut run = ReleaseResult::started();
        let mut phase = ReleaseResult::new();
        phase.info("phase output");
        phase.set_code(ResultCode::Error);

        run.merge(&phase);
        run.append_output("raw\n");

        assert_eq!(run.code(), ResultCode::Undefined);
        assert!(run.output().contains("[INFO] phase output"));
        assert!(run.output().ends_with("raw\n"));
        assert!(run.start_time().is_some());
        assert!(run.end_time().is_none());
    }
}
