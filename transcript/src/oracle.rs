//! # Summary
//!
//! Boundary to the text-generation backend that proposes candidate
//! answers. The backend is an external collaborator: it gets a prompt and
//! returns one line of text, or fails, in which case the node simply has
//! no candidate for that round.

use std::process::Stdio;
use std::time;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Error;

/// Fixed instruction placed in front of every transcript.
pub const PREFIX: &str = "You are given chat history in the form of Query: <query> and Answer: <answer>. \
Please answer the latest query and return a single line answer with no prefix.\n\n";

#[async_trait]
pub trait Oracle: Send + Sync + 'static {
    async fn answer(&self, prompt: &str) -> Result<String, Error>;
}

pub fn prompt(transcript: &str) -> String {
    format!("{}{}", PREFIX, transcript)
}

/// Collapses a raw backend response onto a single line.
/// Returns `None` for responses with no text at all.
pub fn normalize(raw: &str) -> Option<String> {
    let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Runs an external program per prompt: the prompt goes to its stdin and
/// the answer is read from its stdout.
#[derive(Clone, Debug)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: time::Duration,
}

impl CommandOracle {
    pub fn new(program: String, args: Vec<String>, timeout: time::Duration) -> Self {
        CommandOracle { program, args, timeout }
    }
}

#[async_trait]
impl Oracle for CommandOracle {
    async fn answer(&self, prompt: &str) -> Result<String, Error> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child.stdin
            .take()
            .ok_or_else(|| Error::Oracle("backend stdin unavailable".to_string()))?;
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            if let Err(error) = stdin.write_all(prompt.as_bytes()).await {
                debug!("backend closed stdin early: {}", error);
            }
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Oracle(format!("no answer within {:?}", self.timeout)))??;

        if !output.status.success() {
            return Err(Error::Oracle(format!("{} exited with {}", self.program, output.status)))
        }
        normalize(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| Error::Oracle("empty answer".to_string()))
    }
}

/// Used when no backend is configured: nodes stage queries but never
/// produce candidates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOracle;

#[async_trait]
impl Oracle for NoOracle {
    async fn answer(&self, _: &str) -> Result<String, Error> {
        Err(Error::Oracle("no answer backend configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_one_line() {
        assert_eq!(normalize("  4\n"), Some("4".to_string()));
        assert_eq!(normalize("two\nplus  two\tis four\n"), Some("two plus two is four".to_string()));
        assert_eq!(normalize(" \n\t"), None);
    }

    #[test]
    fn prompt_starts_with_instruction() {
        let prompt = prompt("Query: 2+2");
        assert!(prompt.starts_with(PREFIX));
        assert!(prompt.ends_with("\n\nQuery: 2+2"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_oracle_reads_stdout() {
        let oracle = CommandOracle::new(
            "sh".to_string(),
            vec!["-c".to_string(), "cat > /dev/null; printf 'four\\n'".to_string()],
            time::Duration::from_secs(5),
        );
        assert_eq!(oracle.answer("Query: 2+2").await.unwrap(), "four");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_oracle_failures_are_errors() {
        let failing = CommandOracle::new(
            "sh".to_string(),
            vec!["-c".to_string(), "exit 3".to_string()],
            time::Duration::from_secs(5),
        );
        assert!(matches!(failing.answer("x").await, Err(Error::Oracle(_))));

        let silent = CommandOracle::new(
            "sh".to_string(),
            vec!["-c".to_string(), "cat > /dev/null".to_string()],
            time::Duration::from_secs(5),
        );
        assert!(matches!(silent.answer("x").await, Err(Error::Oracle(_))));

        assert!(NoOracle.answer("x").await.is_err());
    }
}
