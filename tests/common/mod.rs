//! Shared test utilities
//!
//! These are test utilities - not all may be used in every test file but are
//! available across the integration suite.

#![allow(dead_code)]

pub mod mock_review;
pub mod repo;

use git_rv::error::{Error, Result};
use git_rv::git::Git;
use git_rv::prompt::{Prompter, resolve_choice};
use git_rv::workflow::WorkflowContext;
use mock_review::MockReviewService;
use repo::RemotePair;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A working clone, its remote, and mock collaborators, wired together
pub struct Harness {
    pub pair: RemotePair,
    pub git: Git,
    pub review: MockReviewService,
    pub prompter: ScriptedPrompter,
}

impl Harness {
    pub fn new() -> Self {
        let pair = RemotePair::new();
        let git = Git::open(&pair.work);
        Self {
            pair,
            git,
            review: MockReviewService::new(),
            prompter: ScriptedPrompter::new(),
        }
    }

    pub fn ctx(&self) -> WorkflowContext<'_> {
        WorkflowContext {
            git: &self.git,
            review: &self.review,
            prompter: &self.prompter,
        }
    }
}

/// Prompter that answers from pre-loaded scripts instead of a terminal
///
/// Choice answers go through the same value-or-index resolution the
/// interactive path supports, so tests can exercise both forms.
#[derive(Default)]
pub struct ScriptedPrompter {
    choices: Mutex<VecDeque<String>>,
    confirms: Mutex<VecDeque<bool>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next multi-candidate choice
    pub fn push_choice(&self, answer: &str) {
        self.choices.lock().unwrap().push_back(answer.to_string());
    }

    /// Queue an answer for the next confirmation
    pub fn push_confirm(&self, answer: bool) {
        self.confirms.lock().unwrap().push_back(answer);
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&self, _question: &str, empty_message: &str, choices: &[String]) -> Result<String> {
        match choices {
            [] => Err(Error::NoChoices(empty_message.to_string())),
            [only] => Ok(only.clone()),
            _ => {
                let answer = self
                    .choices
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("no scripted answer for choice prompt");
                resolve_choice(&answer, choices)
            }
        }
    }

    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(false))
    }
}
