//! Username to peer resolution

use tracing::debug;

use crate::client::{PeerHandle, ServiceClient};
use crate::error::{Error, Result};

const LINK_PREFIXES: [&str; 4] = ["https://t.me/", "http://t.me/", "t.me/", "@"];

/// Strip `@` and t.me link prefixes from user input.
pub fn normalize_username(input: &str) -> &str {
    let mut name = input.trim();
    for prefix in LINK_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
        }
    }
    name.trim_end_matches('/')
}

pub struct PeerResolver<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: ServiceClient + ?Sized> PeerResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// One round trip; nothing is cached between runs.
    pub async fn resolve(&self, username: &str) -> Result<PeerHandle> {
        let name = normalize_username(username);
        if name.is_empty() {
            return Err(Error::PeerNotFound(format!("'{}' is not a username", username)));
        }

        let peer = self
            .client
            .resolve_username(name)
            .await?
            .ok_or_else(|| Error::PeerNotFound(format!("@{}", name)))?;

        debug!(peer_id = peer.id, kind = ?peer.kind, "resolved @{}", name);
        Ok(peer)
    }
}
