//! Terminal progress for release goals.

use super::OutputManager;
use crate::listener::{LoggingListener, ReleaseListener};

/// Prints phase progress as it happens
///
/// Ordering is still checked by an inner [`LoggingListener`].
#[derive(Debug)]
pub struct ConsoleListener {
    output: OutputManager,
    inner: LoggingListener,
    total: usize,
    position: usize,
}

impl ConsoleListener {
    /// Create a listener printing through `output`
    pub fn new(output: OutputManager) -> Self {
        Self {
            output,
            inner: LoggingListener::new(),
            total: 0,
            position: 0,
        }
    }

    fn next_position(&mut self) -> String {
        self.position += 1;
        format!("[{}/{}]", self.position, self.total)
    }
}

impl ReleaseListener for ConsoleListener {
    fn goal_start(&mut self, goal: &str, phases: &[String]) {
        self.inner.goal_start(goal, phases);
        self.total = phases.len();
        self.position = 0;
        let _ = self.output.section(&format!("{} ({} phases)", goal, phases.len()));
    }

    fn phase_start(&mut self, name: &str) {
        self.inner.phase_start(name);
        let position = self.next_position();
        let _ = self.output.phase(&position, name);
    }

    fn phase_skip(&mut self, name: &str) {
        self.inner.phase_skip(name);
        let position = self.next_position();
        let _ = self.output.skipped(&position, name);
    }

    fn phase_end(&mut self) {
        self.inner.phase_end();
    }

    fn goal_end(&mut self) {
        self.inner.goal_end();
    }

    fn error(&mut self, reason: &str) {
        self.inner.error(reason);
    }
}
