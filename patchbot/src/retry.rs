//! Operator-confirmed retry around the per-repository pipeline.
//!
//! A failed repository is re-run from the start (not from the failing step)
//! when the [`RetryPolicy`] agrees; otherwise it is abandoned and the run moves
//! on. Nothing here ever aborts the whole run.

use std::io::{self, BufRead, Write};

use anyhow::Error;
use tracing::{error, info, warn};

use crate::core::types::RepoRef;

/// Decides whether a failed repository is attempted again.
pub trait RetryPolicy {
    fn should_retry(&mut self, repo: &RepoRef, err: &Error, attempt: u32) -> bool;
}

/// Asks the operator on stdout and reads the answer from stdin.
///
/// Only `y`/`yes` retries. EOF and read errors count as no.
pub struct TerminalPrompt<R> {
    input: R,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> RetryPolicy for TerminalPrompt<R> {
    fn should_retry(&mut self, repo: &RepoRef, _err: &Error, attempt: u32) -> bool {
        print!("Retry {repo} (attempt {})? [y/N] ", attempt + 1);
        io::stdout().flush().ok();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => parse_answer(&answer),
        }
    }
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Always gives the same answer. Used for `--no-prompt` and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub bool);

impl RetryPolicy for FixedDecision {
    fn should_retry(&mut self, _repo: &RepoRef, _err: &Error, _attempt: u32) -> bool {
        self.0
    }
}

/// How a retried operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Completed { value: T, attempts: u32 },
    /// The policy declined another attempt after the last failure.
    Abandoned { attempts: u32, last_error: String },
}

/// Run `attempt` until it succeeds or `policy` declines another try.
pub fn run_with_retry<T, P, F>(repo: &RepoRef, policy: &mut P, mut attempt: F) -> RetryOutcome<T>
where
    P: RetryPolicy + ?Sized,
    F: FnMut() -> anyhow::Result<T>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match attempt() {
            Ok(value) => return RetryOutcome::Completed { value, attempts },
            Err(err) => {
                error!(repo = %repo, attempt = attempts, "{err:#}");
                if policy.should_retry(repo, &err, attempts) {
                    info!(repo = %repo, "retrying from the start");
                    continue;
                }
                warn!(repo = %repo, attempts, "abandoning repository");
                return RetryOutcome::Abandoned {
                    attempts,
                    last_error: format!("{err:#}"),
                };
            }
        }
    }
}
