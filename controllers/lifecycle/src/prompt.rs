//! Interactive confirmation.
//!
//! Workflows ask yes/no questions through [`Confirm`]; the binary answers
//! from the terminal, tests from a script.

use std::io::{self, BufRead, Write};
use tracing::warn;

/// Blocking yes/no question.
pub trait Confirm: Send + Sync {
    /// Ask `question` and wait for an answer.
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on stderr and reads stdin until it gets `y`/`yes` or `n`/`no`.
///
/// There is no default answer; a closed stdin counts as `no`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        let stdin = io::stdin();
        let mut stderr = io::stderr();
        loop {
            let _ = write!(stderr, "{question} (y/n): ");
            let _ = stderr.flush();

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) | Err(_) => {
                    warn!("No answer on stdin, assuming 'no'");
                    return false;
                }
                Ok(_) => {}
            }
            match parse_answer(&input) {
                Some(answer) => return answer,
                None => {
                    let _ = writeln!(stderr, "Please answer 'y' or 'n'.");
                }
            }
        }
    }
}

/// `Some(true)` for yes, `Some(false)` for no, `None` otherwise.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Answers from a fixed script and records every question.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: std::sync::Mutex<std::collections::VecDeque<bool>>,
    asked: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedConfirm {
    /// Answer with `answers` in order; panics when asked more often
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: std::sync::Mutex::new(answers.iter().copied().collect()),
            asked: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        self.asked.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected question: {question}"))
    }
}
