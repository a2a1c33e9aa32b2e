// UI prompts and user interaction module

use anyhow::{bail, Result};
use colored::Colorize;
use std::io::{self, IsTerminal};

/// Ask for yes/no confirmation. Non-interactive sessions answer no.
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }
    Ok(dialoguer::Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()?)
}

/// Use `given` if present, otherwise prompt for a comment.
///
/// Fails when the result is blank.
pub fn require_comment(given: Option<&str>, what: &str) -> Result<String> {
    let comment = match given {
        Some(text) => text.trim().to_string(),
        None if io::stdin().is_terminal() => dialoguer::Input::<String>::new()
            .with_prompt(format!("Comment for this {}", what))
            .allow_empty(true)
            .interact_text()?
            .trim()
            .to_string(),
        None => String::new(),
    };

    if comment.is_empty() {
        bail!("A comment is required to {}. Use --comment <TEXT>.", what);
    }
    Ok(comment)
}

/// Display a warning message
pub fn warn(message: &str) {
    println!("{}", format!("Warning: {}", message).yellow().bold());
}

/// Display an info message
pub fn info(message: &str) {
    println!("{}", message.cyan());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

/// Display an error message
pub fn error(message: &str) {
    println!("{}", message.red().bold());
}

/// Display a dimmed/secondary message
pub fn dimmed(message: &str) {
    println!("{}", message.dimmed());
}
