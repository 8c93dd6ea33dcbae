//! grammers-backed [`ServiceClient`]
//!
//! The live SQLite session is a working copy inside a private temp directory.
//! It is seeded from the stored blob on connect and read back whole by
//! `export_session`, so the on-disk store only ever sees complete files.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::types::peer::Peer;
use grammers_client::types::{LoginToken, PasswordToken};
use grammers_client::{Client, InvocationError, SignInError};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::defs::PeerRef;
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::{
    Account, OutboundMessage, PeerHandle, PeerKind, SentMessage, ServiceClient, SignIn,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::Session;

const WORKING_SESSION: &str = "live.session";

/// RPC errors that mean "no such username" rather than a failure.
const UNKNOWN_USERNAME_ERRORS: [&str; 2] = ["USERNAME_NOT_OCCUPIED", "USERNAME_INVALID"];

/// Map a grammers invocation failure: server-side RPC errors become `rejected`,
/// everything else is a transport failure.
fn classify(err: InvocationError, rejected: fn(String) -> Error) -> Error {
    match err {
        InvocationError::Rpc(rpc) => rejected(rpc.to_string()),
        other => Error::Transport(other.to_string()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Get ID and kind from Peer
fn peer_identity(peer: &Peer) -> (i64, PeerKind) {
    match peer {
        Peer::User(u) => (u.bare_id(), PeerKind::User),
        Peer::Group(g) => (g.id().bare_id(), PeerKind::Group),
        Peer::Channel(c) => (c.bare_id(), PeerKind::Channel),
    }
}

/// A username lookup result, with "no such username" RPC errors folded into `None`.
fn resolved_or_unknown(
    result: std::result::Result<Option<Peer>, InvocationError>,
) -> Result<Option<Peer>> {
    match result {
        Ok(peer) => Ok(peer),
        Err(InvocationError::Rpc(rpc)) if UNKNOWN_USERNAME_ERRORS.contains(&rpc.name.as_str()) => {
            Ok(None)
        }
        Err(e) => Err(classify(e, Error::PeerNotFound)),
    }
}

/// Message id the service assigned to the send tagged with `random_id`.
fn acknowledged_id(updates: &tl::enums::Updates, random_id: i64) -> Option<i32> {
    let updates = match updates {
        tl::enums::Updates::UpdateShortSentMessage(sent) => return Some(sent.id),
        tl::enums::Updates::Updates(u) => &u.updates,
        tl::enums::Updates::Combined(u) => &u.updates,
        _ => return None,
    };

    updates.iter().find_map(|update| match update {
        tl::enums::Update::MessageId(u) if u.random_id == random_id => Some(u.id),
        _ => None,
    })
}

/// Updates are not consumed by a one-shot send; keep the channel empty.
async fn drain_updates(mut updates: mpsc::UnboundedReceiver<UpdatesLike>) {
    while updates.recv().await.is_some() {}
}

/// Connected Telegram client plus the state of an in-progress login.
pub struct TelegramClient {
    client: Client,
    api_hash: String,
    session_path: PathBuf,
    login_token: Mutex<Option<LoginToken>>,
    password_token: Mutex<Option<PasswordToken>>,
    resolved: Mutex<HashMap<i64, Peer>>,
    _workdir: TempDir,
    _handle: Mutex<SenderPoolHandle>,
    runner: JoinHandle<()>,
    drain: JoinHandle<()>,
}

impl TelegramClient {
    /// Open a connection, seeded with `restored` when a stored session exists.
    pub async fn connect(config: &Config, restored: Option<&Session>) -> Result<Self> {
        let (api_id, api_hash) = config.require_api_credentials()?;

        let workdir = tempfile::tempdir()?;
        let session_path = workdir.path().join(WORKING_SESSION);
        if let Some(session) = restored {
            fs::write(&session_path, session.as_bytes())?;
        }

        let session = SqliteSession::open(&session_path)
            .map_err(|e| Error::Auth(format!("Failed to open session: {}", e)))?;
        let pool = SenderPool::new(Arc::new(session), api_id);

        // Create client from pool (need reference to whole pool)
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner = tokio::spawn(async move {
            runner.run().await;
        });
        let drain = tokio::spawn(drain_updates(updates));
        debug!(restored = restored.is_some(), "connected");

        Ok(Self {
            client,
            api_hash: api_hash.to_string(),
            session_path,
            login_token: Mutex::new(None),
            password_token: Mutex::new(None),
            resolved: Mutex::new(HashMap::new()),
            _workdir: workdir,
            _handle: Mutex::new(handle),
            runner,
            drain,
        })
    }
}

impl Drop for TelegramClient {
    fn drop(&mut self) {
        self.drain.abort();
        self.runner.abort();
    }
}

#[async_trait]
impl ServiceClient for TelegramClient {
    async fn is_authorized(&self) -> Result<bool> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| classify(e, Error::Auth))
    }

    async fn request_login_code(&self, phone: &str) -> Result<()> {
        let token = self
            .client
            .request_login_code(phone, &self.api_hash)
            .await
            .map_err(|e| classify(e, Error::Auth))?;
        *lock(&self.login_token) = Some(token);
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignIn> {
        let token = lock(&self.login_token)
            .take()
            .ok_or_else(|| Error::Auth("no login code was requested".to_string()))?;

        match self.client.sign_in(&token, code).await {
            Ok(user) => Ok(SignIn::Complete(Account {
                id: user.raw.id(),
                username: user.username().map(str::to_string),
                display_name: user.full_name(),
            })),
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().map(str::to_string);
                *lock(&self.password_token) = Some(password_token);
                Ok(SignIn::PasswordRequired { hint })
            }
            Err(SignInError::SignUpRequired { .. }) => Ok(SignIn::SignUpRequired { terms: None }),
            Err(SignInError::InvalidCode) => Err(Error::Auth("invalid code".to_string())),
            Err(SignInError::Other(e)) => Err(classify(e, Error::Auth)),
            Err(e) => Err(Error::Auth(e.to_string())),
        }
    }

    async fn check_password(&self, password: &str) -> Result<Account> {
        let token = lock(&self.password_token)
            .take()
            .ok_or_else(|| Error::Auth("no password was requested".to_string()))?;

        match self.client.check_password(token, password).await {
            Ok(user) => Ok(Account {
                id: user.raw.id(),
                username: user.username().map(str::to_string),
                display_name: user.full_name(),
            }),
            Err(SignInError::InvalidPassword) => Err(Error::Auth("invalid password".to_string())),
            Err(SignInError::Other(e)) => Err(classify(e, Error::Auth)),
            Err(e) => Err(Error::Auth(e.to_string())),
        }
    }

    async fn resolve_username(&self, username: &str) -> Result<Option<PeerHandle>> {
        let peer = resolved_or_unknown(self.client.resolve_username(username).await)?;

        Ok(peer.map(|peer| {
            let (id, kind) = peer_identity(&peer);
            lock(&self.resolved).insert(id, peer);
            PeerHandle {
                id,
                kind,
                username: username.to_string(),
            }
        }))
    }

    async fn send_message(&self, message: &OutboundMessage) -> Result<SentMessage> {
        let peer = lock(&self.resolved)
            .get(&message.peer.id)
            .map(PeerRef::from)
            .ok_or_else(|| {
                Error::PeerNotFound(format!(
                    "peer {} was not resolved on this connection",
                    message.peer.id
                ))
            })?;

        let request = tl::functions::messages::SendMessage {
            no_webpage: false,
            silent: false,
            background: message.background,
            clear_draft: false,
            noforwards: false,
            update_stickersets_order: false,
            invert_media: false,
            allow_paid_floodskip: false,
            peer: peer.into(),
            reply_to: None,
            message: message.text.clone(),
            random_id: message.random_id,
            reply_markup: None,
            entities: None,
            schedule_date: None,
            send_as: None,
            quick_reply_shortcut: None,
            effect: None,
            allow_paid_stars: None,
            suggested_post: None,
        };

        debug!(random_id = message.random_id, peer_id = message.peer.id, "sending");
        let updates = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| classify(e, Error::Send))?;

        Ok(SentMessage {
            message_id: acknowledged_id(&updates, message.random_id),
            random_id: message.random_id,
        })
    }

    fn export_session(&self) -> Result<Session> {
        let bytes = fs::read(&self.session_path)?;
        if bytes.is_empty() {
            return Err(Error::Auth("client produced an empty session".to_string()));
        }
        Ok(Session::new(bytes))
    }
}
