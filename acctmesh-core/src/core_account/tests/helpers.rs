//! Shared fixtures for core_account tests

use crate::core_account::name::{AccountName, Timestamp};
use crate::core_account::notify::{
    AliasInvalidator, AliasResolution, AliasResolver, ChangeNotifier, PeerMessage,
};
use crate::core_account::store::AccountStore;
use crate::core_account::sync::{apply_remote, RemoteContext, RemoteOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// In-memory alias table standing in for the module that owns aliases
#[derive(Default)]
pub struct MemoryAliasTable {
    aliases: Arc<Mutex<HashMap<AccountName, (AccountName, Timestamp)>>>,
}

impl MemoryAliasTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, alias: &str, account: &str, alias_ts: Timestamp) {
        self.aliases
            .lock()
            .unwrap()
            .insert(AccountName::new(alias), (AccountName::new(account), alias_ts));
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.lock().unwrap().contains_key(&AccountName::new(alias))
    }
}

impl AliasResolver for MemoryAliasTable {
    fn resolve(&self, alias: &AccountName) -> Option<AliasResolution> {
        let (account, alias_ts) = self.aliases.lock().unwrap().get(alias).cloned()?;
        let table = self.aliases.clone();
        Some(AliasResolution {
            account,
            alias_ts,
            invalidate: AliasInvalidator::new(move |name| {
                table.lock().unwrap().remove(name);
            }),
        })
    }
}

/// One server: a store plus a receiver for what it sends to peers
pub struct Node {
    pub store: AccountStore,
    pub outbound: broadcast::Receiver<PeerMessage>,
}

impl Node {
    pub fn new() -> Self {
        let store = AccountStore::new(ChangeNotifier::new(1024));
        let outbound = store.notifier().subscribe_outbound();
        Node { store, outbound }
    }

    /// Everything this node has queued for its peers
    pub fn drain(&mut self) -> Vec<PeerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.outbound.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Apply messages from a peer without forwarding them
    pub fn receive(&self, messages: &[PeerMessage]) -> Vec<RemoteOutcome> {
        messages
            .iter()
            .map(|msg| apply_remote(&self.store, msg.clone(), &RemoteContext::no_propagation()).unwrap())
            .collect()
    }
}

/// Exchange full state between two nodes, as after a netsplit heals
pub fn burst(a: &mut Node, b: &mut Node) {
    a.drain();
    b.drain();
    a.store.resync().unwrap();
    b.store.resync().unwrap();
    let from_a = a.drain();
    let from_b = b.drain();
    b.receive(&from_a);
    a.receive(&from_b);
}
