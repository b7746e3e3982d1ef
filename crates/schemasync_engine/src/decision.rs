//! Interactive decisions (confirmations and choices).

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Source of user decisions.
///
/// The engine never reads a terminal itself: every confirmation and choice
/// goes through this trait so sessions without a user can refuse to guess.
pub trait DecisionProvider {
    /// Returns true if a user can answer prompts.
    fn is_interactive(&self) -> bool;

    /// Asks a yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> SyncResult<bool>;

    /// Asks the user to pick one of `options`.
    fn select(&self, prompt: &str, options: &[String], default: Option<&str>) -> SyncResult<String>;
}

/// Whether a migration needs confirmation before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Ask the decision provider.
    Prompt,
    /// Apply without asking.
    AutoApprove,
}

/// Decision provider for sessions without a user; every prompt fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl DecisionProvider for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    fn confirm(&self, prompt: &str, _default: bool) -> SyncResult<bool> {
        Err(SyncError::validation(format!(
            "cannot ask \"{}\" in a non-interactive session",
            prompt
        )))
    }

    fn select(&self, prompt: &str, _options: &[String], _default: Option<&str>) -> SyncResult<String> {
        Err(SyncError::validation(format!(
            "cannot ask \"{}\" in a non-interactive session",
            prompt
        )))
    }
}

/// A scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Answer to [`DecisionProvider::confirm`].
    Confirm(bool),
    /// Answer to [`DecisionProvider::select`].
    Select(String),
}

/// Decision provider that replays scripted answers, for testing.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    answers: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedDecisions {
    /// Creates a provider that will give `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Returns the prompts asked so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Returns true once every scripted answer was consumed.
    pub fn is_exhausted(&self) -> bool {
        self.answers.lock().is_empty()
    }

    fn next(&self, prompt: &str) -> SyncResult<Answer> {
        self.prompts.lock().push(prompt.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| SyncError::validation(format!("no scripted answer for \"{}\"", prompt)))
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn is_interactive(&self) -> bool {
        true
    }

    fn confirm(&self, prompt: &str, _default: bool) -> SyncResult<bool> {
        match self.next(prompt)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(SyncError::validation(format!(
                "expected a confirmation for \"{}\", got {:?}",
                prompt, other
            ))),
        }
    }

    fn select(&self, prompt: &str, options: &[String], _default: Option<&str>) -> SyncResult<String> {
        match self.next(prompt)? {
            Answer::Select(choice) if options.contains(&choice) => Ok(choice),
            other => Err(SyncError::validation(format!(
                "invalid scripted choice for \"{}\": {:?}",
                prompt, other
            ))),
        }
    }
}
