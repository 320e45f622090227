//! Terminal implementation of the prompt seam.
//!
//! Stdin is read on a blocking task so the runtime keeps serving the OAuth
//! callback listener while the operator types.

use async_trait::async_trait;
use harvest_migrate::{MigrateError, Prompter, Result};
use std::io::{self, BufRead, Write};

/// Numbered-list prompts on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

/// Print `prompt` and read one line. `None` at end of input.
async fn read_line(prompt: String) -> Result<Option<String>> {
    tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim().to_string()))
    })
    .await
    .map_err(|e| MigrateError::Other(format!("Prompt task failed: {}", e)))?
}

/// 1-based menu number to index.
pub(crate) fn parse_selection(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

pub(crate) fn parse_confirm(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select(&self, message: &str, labels: &[String]) -> Result<usize> {
        if labels.is_empty() {
            return Err(MigrateError::Validation {
                field: "selection".to_string(),
                message: format!("nothing to choose for '{}'", message),
            });
        }

        println!();
        println!("{}", message);
        for (i, label) in labels.iter().enumerate() {
            println!("  {}. {}", i + 1, label);
        }

        loop {
            let line = read_line(format!("Enter choice [1-{}]: ", labels.len()))
                .await?
                .ok_or(MigrateError::PromptClosed)?;
            match parse_selection(&line, labels.len()) {
                Some(index) => return Ok(index),
                None => println!("Please enter a number between 1 and {}", labels.len()),
            }
        }
    }

    async fn input(&self, message: &str) -> Result<String> {
        read_line(format!("{}: ", message))
            .await?
            .ok_or(MigrateError::PromptClosed)
    }

    async fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let line = read_line(format!("{} {} ", message, hint))
                .await?
                .ok_or(MigrateError::PromptClosed)?;
            match parse_confirm(&line, default) {
                Some(answer) => return Ok(answer),
                None => println!("Please answer y or n"),
            }
        }
    }
}
