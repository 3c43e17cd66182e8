//! Interactive input for versions and tag names.

use crate::error::{ExecutionError, Result};
use std::io::{BufRead, Write};
use std::sync::Mutex;

/// Asks the user for a value
pub trait Prompter: Send + Sync {
    /// Ask `message`, returning `default` when the answer is empty
    fn prompt(&self, message: &str, default: &str) -> Result<String>;
}

/// Prompter reading answers from stdin
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&self, message: &str, default: &str) -> Result<String> {
        let prompt_failed = |e: std::io::Error| ExecutionError::Prompt { reason: e.to_string() };

        print!("{} [{}]: ", message, default);
        std::io::stdout().flush().map_err(prompt_failed)?;

        let mut input = String::new();
        let read = std::io::stdin().lock().read_line(&mut input).map_err(prompt_failed)?;
        if read == 0 {
            return Err(ExecutionError::Prompt {
                reason: format!("No input available for '{}'", message),
            }
            .into());
        }

        let answer = input.trim();
        Ok(if answer.is_empty() { default } else { answer }.to_string())
    }
}

/// Prompter that always accepts the default
#[derive(Debug, Default)]
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn prompt(&self, message: &str, default: &str) -> Result<String> {
        log::debug!("{} -> {}", message, default);
        Ok(default.to_string())
    }
}

/// Prompter replaying canned answers, then falling back to defaults
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Answer prompts with `answers` in order
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut answers: Vec<String> = answers.into_iter().map(Into::into).collect();
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, _message: &str, default: &str) -> Result<String> {
        let mut answers = self
            .answers
            .lock()
            .map_err(|e| ExecutionError::Prompt { reason: e.to_string() })?;
        Ok(match answers.pop() {
            Some(answer) if !answer.is_empty() => answer,
            _ => default.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_then_defaults() {
        let prompter = ScriptedPrompter::new(["2.0", ""]);
        assert_eq!(prompter.prompt("release", "1.0").unwrap(), "2.0");
        assert_eq!(prompter.prompt("dev", "1.1-SNAPSHOT").unwrap(), "1.1-SNAPSHOT");
        assert_eq!(prompter.prompt("tag", "app-2.0").unwrap(), "app-2.0");
    }

    #[test]
    fn defaults_prompter_never_blocks() {
        assert_eq!(DefaultsPrompter.prompt("release", "1.0").unwrap(), "1.0");
    }
}
