//! Single-shot message sending with client-chosen deduplication ids

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::client::{OutboundMessage, PeerHandle, SentMessage, ServiceClient};
use crate::error::{Error, Result};

/// Source of deduplication identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> i64;
}

/// OS-seeded random ids.
pub struct RandomIdGenerator {
    rng: StdRng,
}

impl RandomIdGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> i64 {
        self.rng.gen()
    }
}

pub struct MessageSender<G> {
    ids: G,
    used: HashSet<i64>,
}

impl<G: IdGenerator> MessageSender<G> {
    pub fn new(ids: G) -> Self {
        Self {
            ids,
            used: HashSet::new(),
        }
    }

    /// Next id not handed out before by this sender.
    fn fresh_id(&mut self) -> i64 {
        loop {
            let id = self.ids.next_id();
            if self.used.insert(id) {
                return id;
            }
            debug!(random_id = id, "discarding repeated id");
        }
    }

    /// Send `text` to `peer` once. The service rejecting it is a `Send` error.
    pub async fn send<C: ServiceClient + ?Sized>(
        &mut self,
        client: &C,
        peer: &PeerHandle,
        text: &str,
    ) -> Result<SentMessage> {
        if text.trim().is_empty() {
            return Err(Error::Usage("message text is empty".to_string()));
        }

        let message = OutboundMessage {
            peer: peer.clone(),
            text: text.to_string(),
            random_id: self.fresh_id(),
            background: false,
        };

        let sent = client.send_message(&message).await?;
        info!(
            peer_id = peer.id,
            random_id = message.random_id,
            message_id = ?sent.message_id,
            "message sent"
        );
        Ok(sent)
    }
}
