//! Error types for the Telegram sender
//!
//! Every variant is terminal for the run; `exit_code` maps each category to a
//! distinct process exit status.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Account not found, sign-up unsupported")]
    SignUpRequired,

    #[error("Account not found, sign-up unsupported: {0} is not implemented")]
    NotImplemented(&'static str),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Message rejected: {0}")]
    Send(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session for this phone is locked by another process")]
    SessionLocked,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for missing or malformed command-line arguments.
pub const USAGE_EXIT_CODE: u8 = 2;

impl Error {
    /// Process exit status for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Usage(_) => USAGE_EXIT_CODE,
            Error::Auth(_) => 3,
            Error::SignUpRequired | Error::NotImplemented(_) => 4,
            Error::PeerNotFound(_) => 5,
            Error::Transport(_) => 6,
            Error::Send(_) => 7,
            Error::Io(_) => 8,
            Error::Config(_) => 9,
            Error::SessionLocked => 10,
        }
    }
}
