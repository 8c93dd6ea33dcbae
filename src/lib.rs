//! Telegram Sender Library
//!
//! Sends one text message from a user account to a username:
//! - Session persistence keyed by a hash of the phone number
//! - Interactive login with verification code and optional 2FA password
//! - Username resolution and a single send with a client-chosen dedup id
//! - Categorized errors with distinct exit codes

pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod peer;
pub mod prompt;
pub mod sender;
pub mod session;
pub mod telegram;

// Re-export common types
pub use auth::{AuthNegotiator, AuthOutcome};
pub use client::{Account, OutboundMessage, PeerHandle, PeerKind, SentMessage, ServiceClient, SignIn};
pub use config::Config;
pub use error::{Error, Result};
pub use prompt::{CredentialPrompt, TerminalPrompt};
pub use sender::{IdGenerator, MessageSender, RandomIdGenerator};
pub use session::{Session, SessionKey, SessionLock, SessionStore};
