//! Login negotiation
//!
//! `NoSession -> Ready` when a stored session is accepted, otherwise
//! `NoSession -> Authenticating -> Ready`. Any credential rejection ends the run.

use tracing::{debug, info, warn};

use crate::client::{Account, ServiceClient, SignIn};
use crate::error::{Error, Result};
use crate::prompt::CredentialPrompt;
use crate::session::{SessionKey, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NoSession,
    Authenticating,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The stored session was accepted; no credentials were asked for.
    Reused,
    /// A fresh login completed and its session was persisted.
    LoggedIn(Account),
}

pub struct AuthNegotiator<'a, C: ?Sized, P> {
    client: &'a C,
    prompt: &'a mut P,
    store: &'a SessionStore,
    key: &'a SessionKey,
    state: AuthState,
}

impl<'a, C, P> AuthNegotiator<'a, C, P>
where
    C: ServiceClient + ?Sized,
    P: CredentialPrompt,
{
    pub fn new(
        client: &'a C,
        prompt: &'a mut P,
        store: &'a SessionStore,
        key: &'a SessionKey,
    ) -> Self {
        Self {
            client,
            prompt,
            store,
            key,
            state: AuthState::NoSession,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    fn transition(&mut self, next: AuthState) {
        debug!(from = ?self.state, to = ?next, "auth state");
        self.state = next;
    }

    /// Drive the negotiation to `Ready`.
    ///
    /// `restored` tells whether the connection was seeded with a stored session;
    /// only then is the service queried before asking for credentials.
    pub async fn negotiate(&mut self, restored: bool) -> Result<AuthOutcome> {
        if restored {
            if self.client.is_authorized().await? {
                self.transition(AuthState::Ready);
                info!(session = %self.key, "reusing stored session");
                return Ok(AuthOutcome::Reused);
            }
            warn!(session = %self.key, "stored session was rejected, logging in again");
        }

        self.transition(AuthState::Authenticating);
        let account = self.authenticate().await?;

        let session = self.client.export_session()?;
        self.store.save(self.key, &session)?;
        self.transition(AuthState::Ready);

        info!(account_id = account.id, "signed in as {}", account.display_name);
        Ok(AuthOutcome::LoggedIn(account))
    }

    async fn authenticate(&mut self) -> Result<Account> {
        let phone = self.prompt.phone().to_string();
        if phone.trim().is_empty() {
            return Err(Error::Usage("phone number is empty".to_string()));
        }

        self.client.request_login_code(&phone).await?;
        let code = self.prompt.code(&phone)?;

        match self.client.sign_in(&code).await? {
            SignIn::Complete(account) => Ok(account),
            SignIn::PasswordRequired { hint } => {
                debug!("account has 2FA enabled");
                let password = self.prompt.password(hint.as_deref())?;
                self.client.check_password(&password).await
            }
            SignIn::SignUpRequired { terms } => {
                self.prompt.accept_terms_of_service(terms.as_deref())?;
                self.prompt.sign_up()?;
                Err(Error::NotImplemented("sign up"))
            }
        }
    }
}
