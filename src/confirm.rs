//! Operator confirmation gate
//!
//! A batch is only submitted after an operator has seen its gas estimate and
//! answered with the affirmative token. Anything else, including an empty
//! line or end of input, is a decline.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::error::Result;

/// Answer that lets a batch proceed (case-insensitive)
pub const AFFIRMATIVE: &str = "yes";

/// Whether an operator answer counts as consent
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(AFFIRMATIVE)
}

/// Channel that asks an operator a yes/no question.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Show `prompt` and return `true` only on an affirmative answer
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Line-oriented prompt over any async reader/writer pair
///
/// `confirm` reads with `read_line`, which is not cancel-safe. If the caller
/// drops the future (for example on a confirmation timeout), bytes of a
/// partly read line are lost and a line typed late may answer the next
/// prompt on the same gate. Use a fresh gate per flow when timeouts are on.
pub struct PromptConfirmation<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> PromptConfirmation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

/// Prompt on stdout, answer on stdin
pub type StdinConfirmation = PromptConfirmation<BufReader<Stdin>, Stdout>;

impl StdinConfirmation {
    pub fn stdio() -> Self {
        PromptConfirmation::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> Confirmation for PromptConfirmation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writer.write_all(prompt.as_bytes()).await?;
        writer.flush().await?;

        let mut answer = String::new();
        let read = reader.read_line(&mut answer).await?;
        Ok(read > 0 && is_affirmative(&answer))
    }
}

/// Pre-recorded answers for automated callers and tests.
///
/// Each call consumes the next answer; once exhausted every prompt is
/// declined.
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: StdMutex<VecDeque<String>>,
    prompts: StdMutex<Vec<String>>,
}

impl ScriptedConfirmation {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: StdMutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: StdMutex::new(Vec::new()),
        }
    }

    /// Approve exactly one prompt
    pub fn approve_once() -> Self {
        Self::new([AFFIRMATIVE])
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Confirmation for ScriptedConfirmation {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front());
        Ok(answer.as_deref().is_some_and(is_affirmative))
    }
}
