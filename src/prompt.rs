//! Interactive prompts: multi-select, single-select and confirmation

use crate::error::{Result, VdcError};
use std::collections::VecDeque;

/// One selectable option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub title: String,
    pub checked: bool,
}

impl Choice {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            checked: false,
        }
    }

    pub fn checked(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            checked: true,
        }
    }
}

/// User interaction capability injected into the waste workflows.
///
/// Selections are returned as indices into `choices`.
pub trait Prompter {
    fn ask_multi_select(&mut self, message: &str, choices: &[Choice]) -> Result<Vec<usize>>;

    /// `None` when the user gives up
    fn ask_single_select(&mut self, message: &str, choices: &[Choice]) -> Result<Option<usize>>;

    fn ask_confirm(&mut self, message: &str) -> Result<bool>;
}

/// Arrow-key prompts on the controlling terminal.
///
/// Escape or `q` counts as declining: nothing selected, no confirmation.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn ask_multi_select(&mut self, message: &str, choices: &[Choice]) -> Result<Vec<usize>> {
        if choices.is_empty() {
            return Ok(Vec::new());
        }
        let defaults: Vec<bool> = choices.iter().map(|c| c.checked).collect();
        let picked = dialoguer::MultiSelect::new()
            .with_prompt(message)
            .items(&titles(choices))
            .defaults(&defaults)
            .interact_opt()
            .map_err(|e| prompt_failed(message, e))?;
        Ok(picked.unwrap_or_default())
    }

    fn ask_single_select(&mut self, message: &str, choices: &[Choice]) -> Result<Option<usize>> {
        if choices.is_empty() {
            return Ok(None);
        }
        let default = choices.iter().position(|c| c.checked).unwrap_or(0);
        dialoguer::Select::new()
            .with_prompt(message)
            .items(&titles(choices))
            .default(default)
            .interact_opt()
            .map_err(|e| prompt_failed(message, e))
    }

    fn ask_confirm(&mut self, message: &str) -> Result<bool> {
        let answer = dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact_opt()
            .map_err(|e| prompt_failed(message, e))?;
        Ok(answer.unwrap_or(false))
    }
}

fn titles(choices: &[Choice]) -> Vec<&str> {
    choices.iter().map(|c| c.title.as_str()).collect()
}

/// No terminal to talk to, or the terminal went away mid-prompt
fn prompt_failed(message: &str, error: dialoguer::Error) -> VdcError {
    VdcError::Generic(anyhow::Error::new(error).context(format!("Prompt '{}' failed", message)))
}

/// A canned answer for `ScriptedPrompter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Pick choices by title
    Select(Vec<String>),
    /// Pick every offered choice
    All,
    /// Keep the pre-checked choices
    Defaults,
    /// Pick nothing / abort a single-select
    Nothing,
    Confirm(bool),
}

/// Prompter replaying canned answers, recording every prompt it sees
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    /// `(message, offered choice titles)` for each prompt
    pub seen: Vec<(String, Vec<String>)>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            seen: Vec::new(),
        }
    }

    /// Choice titles offered by the first prompt whose message contains `needle`
    pub fn offered(&self, needle: &str) -> Option<&[String]> {
        self.seen
            .iter()
            .find(|(message, _)| message.contains(needle))
            .map(|(_, titles)| titles.as_slice())
    }

    fn next(&mut self, message: &str, choices: &[Choice]) -> Answer {
        self.seen.push((
            message.to_string(),
            choices.iter().map(|c| c.title.clone()).collect(),
        ));
        self.answers.pop_front().unwrap_or(Answer::Nothing)
    }

    fn resolve(answer: &Answer, choices: &[Choice]) -> Vec<usize> {
        match answer {
            Answer::Select(titles) => choices
                .iter()
                .enumerate()
                .filter(|(_, c)| titles.iter().any(|t| title_matches(&c.title, t)))
                .map(|(i, _)| i)
                .collect(),
            Answer::All => (0..choices.len()).collect(),
            Answer::Defaults => choices
                .iter()
                .enumerate()
                .filter(|(_, c)| c.checked)
                .map(|(i, _)| i)
                .collect(),
            Answer::Nothing | Answer::Confirm(_) => Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask_multi_select(&mut self, message: &str, choices: &[Choice]) -> Result<Vec<usize>> {
        let answer = self.next(message, choices);
        Ok(Self::resolve(&answer, choices))
    }

    fn ask_single_select(&mut self, message: &str, choices: &[Choice]) -> Result<Option<usize>> {
        let answer = self.next(message, choices);
        Ok(Self::resolve(&answer, choices).first().copied())
    }

    fn ask_confirm(&mut self, message: &str) -> Result<bool> {
        let answer = self.next(message, &[]);
        Ok(matches!(answer, Answer::Confirm(true)))
    }
}

/// Exact title, or a title whose first column is `wanted`
fn title_matches(title: &str, wanted: &str) -> bool {
    title == wanted || title.split_whitespace().next() == Some(wanted)
}
