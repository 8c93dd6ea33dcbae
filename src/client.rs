//! Capability interface to the messaging service.
//!
//! The production implementation lives in [`crate::telegram`]; everything above it
//! (negotiation, resolution, sending) only sees this trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Session;

/// Kind of entity a username resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    User,
    Group,
    Channel,
}

/// Addressable target, valid only for the connection that resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerHandle {
    pub id: i64,
    pub kind: PeerKind,
    pub username: String,
}

/// Signed-in account summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: Option<String>,
    pub display_name: String,
}

/// Result of submitting a verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    Complete(Account),
    PasswordRequired { hint: Option<String> },
    SignUpRequired { terms: Option<String> },
}

/// One logical send. `random_id` lets the service collapse transport-level retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub peer: PeerHandle,
    pub text: String,
    pub random_id: i64,
    pub background: bool,
}

/// Service acknowledgement of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: Option<i32>,
    pub random_id: i64,
}

#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Whether the restored session is still accepted by the service.
    async fn is_authorized(&self) -> Result<bool>;

    /// Ask the service to deliver a login code to `phone`.
    async fn request_login_code(&self, phone: &str) -> Result<()>;

    /// Submit the code for the pending login request.
    async fn sign_in(&self, code: &str) -> Result<SignIn>;

    /// Complete a 2FA login after [`SignIn::PasswordRequired`].
    async fn check_password(&self, password: &str) -> Result<Account>;

    /// `Ok(None)` when the username does not map to any entity.
    async fn resolve_username(&self, username: &str) -> Result<Option<PeerHandle>>;

    async fn send_message(&self, message: &OutboundMessage) -> Result<SentMessage>;

    /// Serialized authentication state of the current connection.
    fn export_session(&self) -> Result<Session>;
}
