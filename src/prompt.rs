//! Interactive decision points
//!
//! Workflows ask questions through [`Prompter`] so tests can script the
//! answers; [`TerminalPrompt`] is the interactive implementation.

use crate::error::{Error, Result};
use dialoguer::{Confirm, Select};

/// Answers the questions a workflow cannot decide on its own
pub trait Prompter: Send + Sync {
    /// Pick one of `choices`
    ///
    /// An empty candidate list fails with `empty_message`; a single
    /// candidate is returned without prompting.
    fn choose(&self, question: &str, empty_message: &str, choices: &[String]) -> Result<String>;

    /// Ask a yes/no question
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Resolve a free-form answer against a candidate list
///
/// The answer may be one of the candidate values or a zero-based index into
/// the list; anything else is an invalid choice.
pub fn resolve_choice(answer: &str, choices: &[String]) -> Result<String> {
    if choices.iter().any(|choice| choice == answer) {
        return Ok(answer.to_string());
    }
    answer
        .parse::<usize>()
        .ok()
        .and_then(|index| choices.get(index).cloned())
        .ok_or_else(|| Error::InvalidChoice(answer.to_string()))
}

/// Prompts on the controlling terminal via `dialoguer`
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

fn interact_failed(e: dialoguer::Error) -> Error {
    Error::Io(std::io::Error::other(e))
}

impl Prompter for TerminalPrompt {
    fn choose(&self, question: &str, empty_message: &str, choices: &[String]) -> Result<String> {
        match choices {
            [] => Err(Error::NoChoices(empty_message.to_string())),
            [only] => Ok(only.clone()),
            _ => {
                let index = Select::new()
                    .with_prompt(question)
                    .items(choices)
                    .default(0)
                    .interact()
                    .map_err(interact_failed)?;
                Ok(choices[index].clone())
            }
        }
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .interact()
            .map_err(interact_failed)
    }
}
