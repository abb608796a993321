//! Confirmation strategies for destructive steps
//!
//! Pipelines never read standard input directly; they ask a [`Confirm`]
//! implementation, which the CLI backs with an interactive prompt.

use std::io::{self, BufRead, Write};

use crate::core::error::Result;

/// Answers yes/no questions before files are deleted or overwritten
pub trait Confirm {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompt on stderr and read the answer from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        eprint!("\t* {question} (y/n): ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(is_affirmative(&input))
    }
}

/// Confirm every question without prompting
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        log::info!("{question} (assuming yes)");
        Ok(true)
    }
}

/// Decline every question without prompting
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&self, question: &str) -> Result<bool> {
        log::info!("{question} (assuming no)");
        Ok(false)
    }
}

/// `y` or `yes`, case-insensitive; anything else, including EOF, declines
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
