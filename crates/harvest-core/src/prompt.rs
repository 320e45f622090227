//! Operator interaction seam.
//!
//! The engine never reads the terminal itself. Everything that needs a human
//! decision goes through [`Prompter`], so the CLI can plug in a terminal
//! implementation and tests can script the answers.

use crate::{MigrateError, Result};
use async_trait::async_trait;

/// Interactive questions asked of the operator.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Single choice among `labels`; returns the chosen index.
    async fn select(&self, message: &str, labels: &[String]) -> Result<usize>;

    /// Free-form line of text.
    async fn input(&self, message: &str) -> Result<String>;

    /// Yes/no question.
    async fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// A labelled value offered in a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice<T> {
    pub label: String,
    pub value: T,
}

impl<T> Choice<T> {
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Answer to a selection that offers an explicit skip entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    Chosen(T),
    Skip,
}

/// Ask the operator to pick one of `choices` and return its value.
pub async fn select_one<T>(
    prompter: &dyn Prompter,
    message: &str,
    choices: Vec<Choice<T>>,
) -> Result<T> {
    let labels: Vec<String> = choices.iter().map(|c| c.label.clone()).collect();
    let index = prompter.select(message, &labels).await?;
    choices
        .into_iter()
        .nth(index)
        .map(|c| c.value)
        .ok_or_else(|| out_of_range(index, labels.len()))
}

/// Like [`select_one`], with `skip_label` appended as the last entry.
pub async fn select_or_skip<T>(
    prompter: &dyn Prompter,
    message: &str,
    choices: Vec<Choice<T>>,
    skip_label: &str,
) -> Result<Selection<T>> {
    let mut labels: Vec<String> = choices.iter().map(|c| c.label.clone()).collect();
    labels.push(skip_label.to_string());

    let index = prompter.select(message, &labels).await?;
    if index == choices.len() {
        return Ok(Selection::Skip);
    }
    choices
        .into_iter()
        .nth(index)
        .map(|c| Selection::Chosen(c.value))
        .ok_or_else(|| out_of_range(index, labels.len()))
}

fn out_of_range(index: usize, len: usize) -> MigrateError {
    MigrateError::Validation {
        field: "selection".to_string(),
        message: format!("index {} out of range for {} choices", index, len),
    }
}
