//! Operator confirmation.

use std::io::{self, BufRead, IsTerminal, Write};

/// Source of yes/no answers for overwrite and safety questions.
pub trait Prompt {
    /// Ask `question`; `true` means proceed.
    fn confirm(&mut self, question: &str) -> bool;

    /// Whether a human is answering.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Asks on the controlling terminal.
///
/// Without an attached terminal every question is declined instead of
/// blocking on stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        if !self.is_interactive() {
            tracing::debug!(question, "No terminal attached, declining");
            return false;
        }

        let mut stderr = io::stderr().lock();
        if write!(stderr, "{} [y/N] ", question)
            .and_then(|_| stderr.flush())
            .is_err()
        {
            return false;
        }

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(_) => parse_answer(&input),
            Err(_) => false,
        }
    }

    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal() && io::stderr().is_terminal()
    }
}

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompt(pub bool);

impl Prompt for AutoPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "Auto-answering");
        self.0
    }
}

/// `y`/`yes` (any case) is consent; anything else, including empty, declines.
pub fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
