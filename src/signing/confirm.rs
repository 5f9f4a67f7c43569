//! Operator confirmation seam.
//!
//! The signer core takes `&mut dyn Confirm` instead of reading stdin itself,
//! so the gate sequence is testable without a terminal.

use crate::prelude::{Error, Result};
use std::io::{BufRead, Write};

pub trait Confirm {
    /// Show `prompt` and return the operator's yes/no answer. Blocking is
    /// fine; there is no timeout on a human decision.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Interactive confirmation on the controlling terminal. Anything other than
/// an explicit yes is a no.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        write!(out, "{prompt} [y/N] ").map_err(|e| Error::FileIo(e.to_string()))?;
        out.flush().map_err(|e| Error::FileIo(e.to_string()))?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| Error::FileIo(e.to_string()))?;
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}
