use std::fmt;

/// What went wrong while talking to the upstream listing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Non-success status, either non-retriable or after the last attempt.
    #[error("upstream error (status {status})")]
    Upstream { status: u16 },
    /// The request never produced a response (DNS, connect, I/O).
    #[error("transport error")]
    Transport,
    /// The response body was not the JSON we expected.
    #[error("decode error")]
    Decode,
    /// The task driving a coalesced request panicked or was cancelled.
    #[error("request aborted")]
    Aborted,
}

/// Catalog error. Cloneable so every caller joined on a coalesced request
/// observes the same failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn upstream(status: u16) -> Self {
        Self::new(
            ErrorKind::Upstream { status },
            format!("Jikan request failed: {}", status),
        )
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Transport, err.to_string())
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Decode, err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Last observed upstream status, for `Upstream` errors.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Upstream { status } => Some(status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::decode(err)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
