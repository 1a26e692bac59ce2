//! Interactive confirmation of major version updates

use console::{style, Term};
use dialoguer::Confirm;

use crate::error::UpdateError;

/// Asks the user whether to take a major version update
pub trait Prompt: Send + Sync {
    /// Show `notes` and ask to update from `current` to `candidate`
    fn confirm_major(&self, current: &str, candidate: &str, notes: &str)
        -> Result<bool, UpdateError>;
}

/// Prompt on the controlling terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm_major(
        &self,
        current: &str,
        candidate: &str,
        notes: &str,
    ) -> Result<bool, UpdateError> {
        let term = Term::stderr();
        let prompt_err = |e: std::io::Error| UpdateError::Prompt {
            message: e.to_string(),
        };

        term.write_line(&format!(
            "{} {} -> {} is a major version update",
            style("!").yellow().bold(),
            style(current).dim(),
            style(candidate).green().bold()
        ))
        .map_err(prompt_err)?;

        if !notes.trim().is_empty() {
            term.write_line(&format!("\n{}", style("Release notes").bold().underlined()))
                .map_err(prompt_err)?;
            for line in notes.lines() {
                term.write_line(&format!("  {}", line)).map_err(prompt_err)?;
            }
            term.write_line("").map_err(prompt_err)?;
        }

        Confirm::new()
            .with_prompt(format!("Update to {}?", candidate))
            .default(false)
            .interact_on(&term)
            .map_err(|e| UpdateError::Prompt {
                message: e.to_string(),
            })
    }
}

/// Prompt with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

impl Prompt for FixedPrompt {
    fn confirm_major(&self, _: &str, _: &str, _: &str) -> Result<bool, UpdateError> {
        Ok(self.0)
    }
}
