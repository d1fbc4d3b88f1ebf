use std::error::Error as StdError;

use thiserror::Error;

/// wordline's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The fatal error taxonomy the core distinguishes.
///
/// Region- and segment-local failures (a single VAD region or STT call
/// failing) never reach this type — they're recorded as
/// [`crate::types::StageWarning`]s on [`crate::types::JobStats`] instead and
/// the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputUnreadable,
    NoAudioTrack,
    ModelUnavailable,
    OutputUnwritable,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InputUnreadable => "input unreadable",
            ErrorKind::NoAudioTrack => "no audio track",
            ErrorKind::ModelUnavailable => "model unavailable",
            ErrorKind::OutputUnwritable => "output unwritable",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// wordline's crate-wide error type.
///
/// Decoupled from `anyhow` so downstream libraries aren't forced to adopt
/// `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} while processing '{input}' at stage '{stage}': {message}")]
    Pipeline {
        kind: ErrorKind,
        stage: &'static str,
        input: String,
        message: String,
    },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn pipeline(
        kind: ErrorKind,
        stage: &'static str,
        input: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Pipeline {
            kind,
            stage,
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Pipeline { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == Some(ErrorKind::Cancelled)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Other(Box::new(err))
    }
}
