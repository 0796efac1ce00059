mod control;
mod session;

use std::io;

pub use control::*;
pub use session::*;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unable to connect: {0}")]
    Connect(#[source] io::Error),
    #[error("handshake mismatch")]
    HandshakeMismatch,
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("unable to write to storage: {0}")]
    Storage(#[source] io::Error),
}

impl SessionError {
    /// Only storage failures end the whole download, everything else just ends one session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Storage(_))
    }
}
