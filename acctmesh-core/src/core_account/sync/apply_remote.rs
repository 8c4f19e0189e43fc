/*
    apply_remote.rs - Apply changes received from peer servers

    Flow:
    1. Transport decodes a PeerMessage from a peer
    2. Look up the local incarnation of the account
    3. Account: resolve creation conflicts (lower created_at wins), then
       merge fields into the surviving incarnation
    4. Update / Removal: apply only to the matching incarnation
    5. Optionally pass applied changes on to other peers

    Everything here is idempotent, so the transport may resend freely.
*/

use crate::core_account::field::MergeOutcome;
use crate::core_account::name::{AccountName, Timestamp};
use crate::core_account::notify::PeerMessage;
use crate::core_account::record::AccountRecord;
use crate::core_account::store::{AccountError, AccountResult, AccountStore, RemoveOutcome};
use crate::metrics::{self as m, record_counter, Timer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What applying a remote change did to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteOutcome {
    /// No local account existed; the remote one was created
    Created,
    /// The local account lost the creation conflict and was replaced
    Replaced,
    /// Same incarnation on both sides; `applied` fields were newer
    Merged { applied: usize },
    /// The local account won the creation conflict; nothing changed
    Discarded,
    /// A field update reached the matching incarnation
    Updated(MergeOutcome),
    /// The matching incarnation was removed
    Removed,
    /// Update or removal for an account or incarnation not present here
    Ignored,
}

impl RemoteOutcome {
    /// Whether local state changed
    pub fn changed_state(&self) -> bool {
        match self {
            RemoteOutcome::Created | RemoteOutcome::Replaced | RemoteOutcome::Removed => true,
            RemoteOutcome::Merged { applied } => *applied > 0,
            RemoteOutcome::Updated(outcome) => outcome.is_applied(),
            RemoteOutcome::Discarded | RemoteOutcome::Ignored => false,
        }
    }
}

/// Context for remote operations
#[derive(Debug, Clone)]
pub struct RemoteContext {
    /// Pass applied changes on to other peers. When a remote creation loses
    /// the conflict, the winning local account is re-announced instead.
    pub propagate: bool,
}

impl Default for RemoteContext {
    fn default() -> Self {
        RemoteContext { propagate: true }
    }
}

impl RemoteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply changes locally only (e.g. when loading from a journal)
    pub fn no_propagation() -> Self {
        RemoteContext { propagate: false }
    }
}

/// Apply a message received from a peer
pub fn apply_remote(
    store: &AccountStore,
    message: PeerMessage,
    ctx: &RemoteContext,
) -> AccountResult<RemoteOutcome> {
    let timer = Timer::new(m::REMOTE_APPLY_MS);
    let result = match message {
        PeerMessage::Account { name, created_at, fields } => {
            apply_remote_account(store, &name, created_at, &fields, ctx)
        }
        PeerMessage::Update { name, created_at, key, value } => {
            apply_remote_update(store, &name, created_at, &key, &value, ctx)
        }
        PeerMessage::Removal { name, created_at } => {
            apply_remote_removal(store, &name, created_at, ctx)
        }
    };
    // Failed applies are timed too
    timer.stop();

    let outcome = result?;
    if outcome == RemoteOutcome::Discarded {
        record_counter(m::REMOTE_DISCARDED, 1);
    }
    Ok(outcome)
}

fn local_account(store: &AccountStore, name: &AccountName) -> AccountResult<Option<AccountRecord>> {
    match store.get_account(name, false) {
        Ok(record) => Ok(Some(record)),
        Err(AccountError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Apply a full account announcement.
///
/// Conflict resolution, replacement and field merge happen atomically in
/// the store (see `AccountStore::replace_or_create`).
pub fn apply_remote_account(
    store: &AccountStore,
    name: &AccountName,
    created_at: Timestamp,
    fields: &[(String, String)],
    ctx: &RemoteContext,
) -> AccountResult<RemoteOutcome> {
    store.replace_or_create(name, created_at, fields, ctx.propagate)
}

/// Apply a single field update
pub fn apply_remote_update(
    store: &AccountStore,
    name: &AccountName,
    created_at: Timestamp,
    key: &str,
    value: &str,
    ctx: &RemoteContext,
) -> AccountResult<RemoteOutcome> {
    let fields = [(key.to_string(), value.to_string())];
    match store.merge_incarnation(name, created_at, &fields, ctx.propagate)? {
        Some(mut outcomes) => {
            let outcome = outcomes.pop().map_or(MergeOutcome::Absent, |(_, outcome)| outcome);
            Ok(RemoteOutcome::Updated(outcome))
        }
        None => {
            debug!(%name, key, %created_at, "update for an incarnation not present");
            Ok(RemoteOutcome::Ignored)
        }
    }
}

/// Apply a removal
pub fn apply_remote_removal(
    store: &AccountStore,
    name: &AccountName,
    created_at: Timestamp,
    ctx: &RemoteContext,
) -> AccountResult<RemoteOutcome> {
    match local_account(store, name)? {
        Some(local) if local.created_at() == created_at => {
            match store.remove_account(&local, ctx.propagate)? {
                RemoveOutcome::Removed => Ok(RemoteOutcome::Removed),
                RemoveOutcome::AlreadyRemoved => Ok(RemoteOutcome::Ignored),
            }
        }
        _ => {
            debug!(%name, %created_at, "removal for an incarnation not present");
            Ok(RemoteOutcome::Ignored)
        }
    }
}
