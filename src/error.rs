//! # Summary
//!
//! Error type shared by every fallible operation in the engine.

use crate::message::InstanceId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed message {line:?}: {reason}")]
    Parse { line: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no value chosen for {instance} after {attempts} attempts")]
    NotChosen { instance: InstanceId, attempts: usize },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error("failed to install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

impl Error {
    pub(crate) fn parse<R: Into<String>>(line: &str, reason: R) -> Self {
        Error::Parse {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
