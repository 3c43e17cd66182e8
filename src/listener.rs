//! Progress notifications from the release manager.

/// Observer of goal and phase progress
///
/// `phase_start`/`phase_skip` calls arrive in the order of the phase list
/// passed to `goal_start`.
pub trait ReleaseListener {
    /// A goal is starting with the given ordered phases
    fn goal_start(&mut self, goal: &str, phases: &[String]);

    /// A phase is about to run
    fn phase_start(&mut self, name: &str);

    /// A phase completed in an earlier run and is skipped
    fn phase_skip(&mut self, name: &str);

    /// The running phase completed
    fn phase_end(&mut self);

    /// The goal completed
    fn goal_end(&mut self);

    /// The run stopped on an error
    fn error(&mut self, reason: &str);
}

/// Listener that reports progress through the `log` facade
///
/// Tracks a cursor into the goal's phase list and warns when a phase event
/// arrives out of order.
#[derive(Debug, Default)]
pub struct LoggingListener {
    goal: Option<String>,
    phases: Vec<String>,
    cursor: usize,
    mismatches: usize,
}

impl LoggingListener {
    /// Create a listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of out-of-order phase events seen
    pub fn mismatches(&self) -> usize {
        self.mismatches
    }

    fn advance(&mut self, name: &str) -> String {
        let expected = self.phases.get(self.cursor).cloned();
        if expected.as_deref() != Some(name) {
            self.mismatches += 1;
            log::warn!(
                "Expected phase {} but got '{}'",
                expected.map(|e| format!("'{}'", e)).unwrap_or_else(|| "<none>".to_string()),
                name
            );
        }
        self.cursor += 1;
        format!("[{}/{}]", self.cursor, self.phases.len())
    }
}

impl ReleaseListener for LoggingListener {
    fn goal_start(&mut self, goal: &str, phases: &[String]) {
        log::info!("Starting '{}' with {} phase(s)", goal, phases.len());
        self.goal = Some(goal.to_string());
        self.phases = phases.to_vec();
        self.cursor = 0;
    }

    fn phase_start(&mut self, name: &str) {
        let position = self.advance(name);
        log::info!("{} {}", position, name);
    }

    fn phase_skip(&mut self, name: &str) {
        let position = self.advance(name);
        log::info!("{} {} (skipped, already completed)", position, name);
    }

    fn phase_end(&mut self) {}

    fn goal_end(&mut self) {
        if let Some(goal) = self.goal.take() {
            log::info!("'{}' completed", goal);
        }
    }

    fn error(&mut self, reason: &str) {
        log::error!("{}", reason);
    }
}
