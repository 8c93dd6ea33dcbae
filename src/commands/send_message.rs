//! Send one message to a Telegram username
//!
//! lock → load session → connect → negotiate → resolve → send, strictly in order.

use std::future::Future;
use std::path::Path;

use tracing::info;

use crate::auth::{AuthNegotiator, AuthOutcome};
use crate::client::{PeerHandle, SentMessage, ServiceClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::peer::PeerResolver;
use crate::prompt::{CredentialPrompt, TerminalPrompt};
use crate::sender::{IdGenerator, MessageSender, RandomIdGenerator};
use crate::session::{Session, SessionKey, SessionStore};
use crate::telegram::TelegramClient;

/// One invocation's inputs.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub phone: String,
    pub username: String,
    pub text: String,
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub auth: AuthOutcome,
    pub peer: PeerHandle,
    pub sent: SentMessage,
}

/// Run against any client. `connect` receives the stored session, if one exists.
pub async fn run_with<C, F, Fut, P, G>(
    request: &SendRequest,
    sessions_dir: &Path,
    connect: F,
    prompt: &mut P,
    ids: G,
) -> Result<SendReport>
where
    C: ServiceClient,
    F: FnOnce(Option<Session>) -> Fut,
    Fut: Future<Output = Result<C>>,
    P: CredentialPrompt,
    G: IdGenerator,
{
    if request.text.trim().is_empty() {
        return Err(Error::Usage("message text is empty".to_string()));
    }

    let store = SessionStore::open(sessions_dir)?;
    let key = SessionKey::from_phone(&request.phone);
    let _lock = store.lock(&key)?;

    let stored = store.load(&key)?;
    let restored = stored.is_some();
    info!(session = %key, restored, "starting");

    let client = connect(stored).await?;

    let auth = AuthNegotiator::new(&client, prompt, &store, &key)
        .negotiate(restored)
        .await?;

    let peer = PeerResolver::new(&client).resolve(&request.username).await?;

    let sent = MessageSender::new(ids)
        .send(&client, &peer, &request.text)
        .await?;

    Ok(SendReport { auth, peer, sent })
}

/// CLI entry point
pub async fn run(request: &SendRequest, config: &Config) -> Result<SendReport> {
    config.require_api_credentials()?;

    let mut prompt = TerminalPrompt::stdio(request.phone.clone());
    run_with(
        request,
        &config.sessions_dir,
        |stored| async move { TelegramClient::connect(config, stored.as_ref()).await },
        &mut prompt,
        RandomIdGenerator::new(),
    )
    .await
}
