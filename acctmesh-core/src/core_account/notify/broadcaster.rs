//! Change notifier
//!
//! Two tokio broadcast channels, one for local [`AccountEvent`]s and one for
//! outbound [`PeerMessage`]s, plus the registry of alias resolvers.
//! Sending never blocks; a message with no live receiver is dropped and a
//! receiver that falls more than `capacity` messages behind sees `Lagged`.
//! Nothing is retried here.

use super::alias::{AliasResolution, AliasResolver};
use super::events::{AccountEvent, PeerMessage};
use crate::core_account::name::AccountName;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default number of buffered notifications per channel
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ChangeNotifier {
    events: broadcast::Sender<AccountEvent>,
    outbound: broadcast::Sender<PeerMessage>,
    resolvers: Arc<RwLock<Vec<Arc<dyn AliasResolver>>>>,
}

impl ChangeNotifier {
    /// Create a notifier buffering up to `capacity` messages per channel
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let (outbound, _) = broadcast::channel(capacity.max(1));
        Self { events, outbound, resolvers: Arc::new(RwLock::new(Vec::new())) }
    }

    /// Emit a local event, returning how many listeners received it
    pub fn emit(&self, event: AccountEvent) -> usize {
        trace!(?event, "account event");
        self.events.send(event).unwrap_or(0)
    }

    /// Hand a change to the transport, returning how many transports
    /// received it
    pub fn publish(&self, message: PeerMessage) -> usize {
        trace!(name = %message.name(), "outbound peer message");
        self.outbound.send(message).unwrap_or(0)
    }

    /// Subscribe to local account events
    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }

    /// Subscribe to outbound peer messages
    pub fn subscribe_outbound(&self) -> broadcast::Receiver<PeerMessage> {
        self.outbound.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn transport_count(&self) -> usize {
        self.outbound.receiver_count()
    }

    /// Add an alias table to consult on lookups. Resolvers are asked in
    /// registration order and the first answer wins.
    pub fn register_alias_resolver(&self, resolver: Arc<dyn AliasResolver>) {
        match self.resolvers.write() {
            Ok(mut resolvers) => resolvers.push(resolver),
            Err(poisoned) => poisoned.into_inner().push(resolver),
        }
    }

    /// Synchronous alias query
    pub fn query_alias(&self, alias: &AccountName) -> Option<AliasResolution> {
        let resolvers = match self.resolvers.read() {
            Ok(resolvers) => resolvers,
            Err(poisoned) => {
                warn!("alias resolver registry poisoned");
                poisoned.into_inner()
            }
        };
        resolvers.iter().find_map(|resolver| resolver.resolve(alias))
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
