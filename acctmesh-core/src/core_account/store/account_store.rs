/*
    account_store.rs - Authoritative account mapping

    One map from account name to record, serialized behind a single RwLock.
    Account metadata changes rarely compared to message traffic, so a
    store-wide lock is enough to give per-name mutual exclusion.

    Every mutation emits its local notification (and, when `broadcast` is
    set, its outbound peer message) before the write lock is released, so
    listeners observe changes to one name in the order they were applied.

    Record lifecycle: Absent -> Live -> Absent. Removal deletes outright;
    no tombstone is kept. Replacing a losing incarnation with a remote
    creation happens under one write lock, so a concurrent creation of the
    same name cannot slip in between the removal and the insert.
*/

use crate::config::Config;
use crate::core_account::field::{
    Credentials, FieldKind, FieldRegistry, FieldValue, MergeOutcome, SerializeFormat, Stamped,
    HASH_PASSWORD,
};
use crate::core_account::name::{AccountName, Timestamp};
use crate::core_account::notify::{AccountEvent, ChangeNotifier, PeerMessage};
use crate::core_account::record::AccountRecord;
use crate::core_account::store::errors::{AccountError, AccountResult};
use crate::core_account::sync::{resolve_creation, CreationWinner, RemoteOutcome};
use crate::metrics::{self as m, record_counter, record_gauge};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Read-only copy of every live account
pub type AccountDb = BTreeMap<AccountName, AccountRecord>;

/// Helper to convert poison errors into AccountError
fn handle_poison<T>(_err: PoisonError<T>) -> AccountError {
    AccountError::Internal("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// Parameters of an account creation
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: AccountName,
    pub created_at: Timestamp,
    pub credentials: Option<Stamped<Credentials>>,
    pub connect_class: Option<Stamped<String>>,
}

impl NewAccount {
    pub fn new(name: impl Into<AccountName>, created_at: Timestamp) -> Self {
        NewAccount { name: name.into(), created_at, credentials: None, connect_class: None }
    }

    pub fn with_credentials(
        mut self,
        hash: impl Into<String>,
        password: impl Into<String>,
        ts: Timestamp,
    ) -> Self {
        self.credentials = Some(Stamped::new(ts, Credentials::new(hash, password)));
        self
    }

    pub fn with_connect_class(mut self, class: impl Into<String>, ts: Timestamp) -> Self {
        self.connect_class = Some(Stamped::new(ts, class.into()));
        self
    }
}

/// Result of a removal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The handle's incarnation is no longer live; nothing happened
    AlreadyRemoved,
}

struct StoreState {
    accounts: AccountDb,
    registry: FieldRegistry,
}

pub struct AccountStore {
    state: RwLock<StoreState>,
    notifier: ChangeNotifier,
    format: SerializeFormat,
}

impl AccountStore {
    /// Empty store with only the built-in field keys
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self::with_registry(notifier, FieldRegistry::new(), SerializeFormat::default())
    }

    pub fn with_registry(
        notifier: ChangeNotifier,
        registry: FieldRegistry,
        format: SerializeFormat,
    ) -> Self {
        AccountStore {
            state: RwLock::new(StoreState { accounts: BTreeMap::new(), registry }),
            notifier,
            format,
        }
    }

    /// Build a store from configuration: registered fields, notifier
    /// capacity and serialize format
    pub fn from_config(config: &Config) -> Self {
        Self::with_registry(
            ChangeNotifier::new(config.notifier.capacity),
            config.build_registry(),
            config.node.format,
        )
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Format used for every serialized field this store produces or
    /// accepts
    pub fn format(&self) -> SerializeFormat {
        self.format
    }

    fn read_state(&self) -> AccountResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(handle_poison)
    }

    fn write_state(&self) -> AccountResult<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(handle_poison)
    }

    /// Register an extension field key
    pub fn register_field(&self, key: &str, kind: FieldKind) -> AccountResult<Option<FieldKind>> {
        Ok(self.write_state()?.registry.register(key, kind))
    }

    pub fn field_kind(&self, key: &str) -> AccountResult<FieldKind> {
        Ok(self.read_state()?.registry.kind_of(key))
    }

    /// Create an account.
    ///
    /// Fails with `Conflict` without touching the store if the name is
    /// already live. Deciding between two independent creations of the same
    /// name is up to the inbound path (see `sync::apply_remote`).
    pub fn add_account(&self, new: NewAccount, broadcast: bool) -> AccountResult<AccountRecord> {
        let mut state = self.write_state()?;

        if let Some(existing) = state.accounts.get(&new.name) {
            debug!(name = %new.name, existing = %existing.created_at(), "account already exists");
            return Err(AccountError::Conflict {
                name: existing.name().clone(),
                existing: existing.created_at(),
            });
        }

        let mut record = AccountRecord::new(new.name, new.created_at);
        if let Some(credentials) = new.credentials {
            record.set_credentials(credentials.value, credentials.ts);
        }
        if let Some(class) = new.connect_class {
            record.set_connect_class(class.value, class.ts);
        }

        let StoreState { accounts, registry } = &mut *state;
        self.install(accounts, registry, record.clone(), broadcast);
        Ok(record)
    }

    /// Apply a creation announced by a peer.
    ///
    /// With no live account of that name the remote one is created. Against
    /// a live one the creation rule decides: the local account stays, is
    /// replaced by the remote one (with only the remote's fields), or both
    /// are the same incarnation and the fields merge. The whole decision
    /// runs under the write lock.
    ///
    /// With `broadcast`, a created or replacing account is announced to
    /// peers, merged fields are forwarded, and a losing remote creation
    /// triggers a re-announcement of the local winner.
    pub fn replace_or_create(
        &self,
        name: &AccountName,
        created_at: Timestamp,
        fields: &[(String, String)],
        broadcast: bool,
    ) -> AccountResult<RemoteOutcome> {
        let mut guard = self.write_state()?;
        let StoreState { accounts, registry } = &mut *guard;

        let outcome = match accounts.get_mut(name) {
            None => RemoteOutcome::Created,
            Some(local) => {
                match resolve_creation((local.name(), local.created_at()), (name, created_at)) {
                    CreationWinner::Local => {
                        info!(%name, local = %local.created_at(), remote = %created_at, "remote creation lost to local account");
                        if broadcast {
                            self.publish_account(registry, local);
                        }
                        return Ok(RemoteOutcome::Discarded);
                    }
                    CreationWinner::Same => {
                        let outcomes = self.merge_into(registry, local, fields);
                        let record = local.clone();
                        self.announce_merge(registry, &record, &outcomes, broadcast);
                        let applied = outcomes.iter().filter(|(_, o)| o.is_applied()).count();
                        debug!(%name, applied, "merged remote account state");
                        return Ok(RemoteOutcome::Merged { applied });
                    }
                    CreationWinner::Remote => {
                        info!(%name, local = %local.created_at(), remote = %created_at, "local account lost to remote creation, replacing");
                        let losing = local.created_at();
                        self.discard(accounts, name, losing, false);
                        RemoteOutcome::Replaced
                    }
                }
            }
        };

        let mut record = AccountRecord::new(name.clone(), created_at);
        self.merge_into(registry, &mut record, fields);
        self.install(accounts, registry, record, broadcast);
        Ok(outcome)
    }

    /// Insert a new record, then notify listeners and optionally peers
    fn install(
        &self,
        accounts: &mut AccountDb,
        registry: &FieldRegistry,
        record: AccountRecord,
        broadcast: bool,
    ) {
        info!(name = %record.name(), created_at = %record.created_at(), "account added");
        accounts.insert(record.name().clone(), record.clone());
        record_counter(m::ACCOUNTS_ADDED, 1);
        record_gauge(m::ACCOUNTS_COUNT, accounts.len() as f64);

        self.notifier.emit(AccountEvent::Modified {
            name: record.name().clone(),
            entry: Some(record.clone()),
        });
        if broadcast {
            self.publish_account(registry, &record);
        }
    }

    /// Drop the live record of `name`. Listeners hear about the removal
    /// before storage is discarded.
    fn discard(&self, accounts: &mut AccountDb, name: &AccountName, created_at: Timestamp, broadcast: bool) {
        self.notifier.emit(AccountEvent::Modified { name: name.clone(), entry: None });
        if broadcast {
            self.send_removal(name, created_at);
        }

        accounts.remove(name);
        info!(%name, %created_at, "account removed");
        record_counter(m::ACCOUNTS_REMOVED, 1);
        record_gauge(m::ACCOUNTS_COUNT, accounts.len() as f64);
    }

    /// Look up an account, optionally through the alias tables.
    ///
    /// An alias that points at a missing account, or at an account created
    /// after the alias was, is stale: its table is told to drop it and the
    /// lookup reports `NotFound`.
    pub fn get_account(&self, name: &AccountName, resolve_alias: bool) -> AccountResult<AccountRecord> {
        let state = self.read_state()?;

        if let Some(record) = state.accounts.get(name) {
            return Ok(record.clone());
        }

        if resolve_alias {
            if let Some(resolution) = self.notifier.query_alias(name) {
                match state.accounts.get(&resolution.account) {
                    Some(record) if record.created_at() <= resolution.alias_ts => {
                        return Ok(record.clone());
                    }
                    _ => {
                        warn!(alias = %name, account = %resolution.account, "invalidating stale alias");
                        record_counter(m::ALIAS_INVALIDATED, 1);
                        resolution.invalidate.invalidate(name);
                    }
                }
            }
        }

        Err(AccountError::NotFound(name.clone()))
    }

    pub fn contains(&self, name: &AccountName) -> AccountResult<bool> {
        Ok(self.read_state()?.accounts.contains_key(name))
    }

    pub fn len(&self) -> AccountResult<usize> {
        Ok(self.read_state()?.accounts.len())
    }

    pub fn is_empty(&self) -> AccountResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete the incarnation `entry` refers to.
    ///
    /// Removing a handle whose incarnation is gone (already removed, or
    /// replaced by a newer creation) is a no-op. There is no timestamp
    /// check against concurrent updates.
    pub fn remove_account(&self, entry: &AccountRecord, broadcast: bool) -> AccountResult<RemoveOutcome> {
        let mut state = self.write_state()?;

        let live = state
            .accounts
            .get(entry.name())
            .is_some_and(|live| live.created_at() == entry.created_at());
        if !live {
            debug!(name = %entry.name(), created_at = %entry.created_at(), "account already removed");
            return Ok(RemoveOutcome::AlreadyRemoved);
        }

        self.discard(&mut state.accounts, entry.name(), entry.created_at(), broadcast);
        Ok(RemoveOutcome::Removed)
    }

    /// Merge one serialized field update into a live account
    pub fn merge_field(
        &self,
        name: &AccountName,
        key: &str,
        raw: &str,
        broadcast: bool,
    ) -> AccountResult<MergeOutcome> {
        let fields = [(key.to_string(), raw.to_string())];
        let mut outcomes = self.merge_fields(name, &fields, broadcast)?;
        Ok(outcomes.pop().map(|(_, outcome)| outcome).unwrap_or(MergeOutcome::Absent))
    }

    /// Merge several serialized field updates into a live account.
    ///
    /// At most one `Modified` notification is emitted, after all fields
    /// were merged. With `broadcast`, each applied field is sent as its own
    /// update.
    pub fn merge_fields(
        &self,
        name: &AccountName,
        fields: &[(String, String)],
        broadcast: bool,
    ) -> AccountResult<Vec<(String, MergeOutcome)>> {
        self.merge_fields_where(name, None, fields, broadcast)?
            .ok_or_else(|| AccountError::NotFound(name.clone()))
    }

    /// Like `merge_fields`, but only into the incarnation created at
    /// `created_at`. Returns `None` when that incarnation is not live.
    pub fn merge_incarnation(
        &self,
        name: &AccountName,
        created_at: Timestamp,
        fields: &[(String, String)],
        broadcast: bool,
    ) -> AccountResult<Option<Vec<(String, MergeOutcome)>>> {
        self.merge_fields_where(name, Some(created_at), fields, broadcast)
    }

    fn merge_fields_where(
        &self,
        name: &AccountName,
        created_at: Option<Timestamp>,
        fields: &[(String, String)],
        broadcast: bool,
    ) -> AccountResult<Option<Vec<(String, MergeOutcome)>>> {
        let mut guard = self.write_state()?;
        let StoreState { accounts, registry } = &mut *guard;
        let record = match accounts.get_mut(name) {
            Some(record) if created_at.map_or(true, |ts| ts == record.created_at()) => record,
            _ => return Ok(None),
        };

        let outcomes = self.merge_into(registry, record, fields);
        let record = record.clone();
        self.announce_merge(registry, &record, &outcomes, broadcast);
        Ok(Some(outcomes))
    }

    /// Merge serialized updates into `record` without notifying anyone
    fn merge_into(
        &self,
        registry: &FieldRegistry,
        record: &mut AccountRecord,
        fields: &[(String, String)],
    ) -> Vec<(String, MergeOutcome)> {
        let mut outcomes = Vec::with_capacity(fields.len());
        for (key, raw) in fields {
            let outcome = record.merge_field(key, registry.kind_of(key), raw, self.format);
            match outcome {
                MergeOutcome::Applied { malformed } => {
                    record_counter(m::FIELDS_APPLIED, 1);
                    if malformed {
                        record_counter(m::FIELDS_MALFORMED, 1);
                    }
                }
                MergeOutcome::Stale => record_counter(m::FIELDS_STALE, 1),
                MergeOutcome::Absent => {}
            }
            outcomes.push((key.clone(), outcome));
        }
        outcomes
    }

    /// One `Modified` notification if anything was applied, plus one peer
    /// update per applied field when broadcasting
    fn announce_merge(
        &self,
        registry: &FieldRegistry,
        record: &AccountRecord,
        outcomes: &[(String, MergeOutcome)],
        broadcast: bool,
    ) {
        if !outcomes.iter().any(|(_, outcome)| outcome.is_applied()) {
            return;
        }
        debug!(name = %record.name(), "account fields merged");
        self.notifier.emit(AccountEvent::Modified {
            name: record.name().clone(),
            entry: Some(record.clone()),
        });
        if broadcast {
            for (key, _) in outcomes.iter().filter(|(_, outcome)| outcome.is_applied()) {
                self.publish_update(registry, record, key);
            }
        }
    }

    /// Set a typed field from a local change.
    ///
    /// The value must match the kind registered for `key` (string for
    /// unregistered keys); otherwise the write fails with `KindMismatch`.
    pub fn set_field(
        &self,
        name: &AccountName,
        key: &str,
        value: FieldValue,
        ts: Timestamp,
        broadcast: bool,
    ) -> AccountResult<bool> {
        if key == HASH_PASSWORD {
            warn!(key, "use set_credentials for the credentials slot");
            return Ok(false);
        }
        self.mutate(name, key, broadcast, |registry, record| {
            let expected = registry.kind_of(key);
            if !expected.accepts(&value) {
                warn!(%name, key, ?expected, ?value, "typed write does not match the field kind");
                return Err(AccountError::KindMismatch { key: key.to_string(), expected });
            }
            Ok(record.set_field(key, value, ts))
        })
    }

    /// Store a new hash/password pair from a local change
    pub fn set_credentials(
        &self,
        name: &AccountName,
        hash: &str,
        password: &str,
        ts: Timestamp,
        broadcast: bool,
    ) -> AccountResult<bool> {
        self.mutate(name, HASH_PASSWORD, broadcast, |_, record| {
            Ok(record.set_credentials(Credentials::new(hash, password), ts))
        })
    }

    pub fn set_connect_class(
        &self,
        name: &AccountName,
        class: &str,
        ts: Timestamp,
        broadcast: bool,
    ) -> AccountResult<bool> {
        self.mutate(name, crate::core_account::field::CONNECT_CLASS, broadcast, |_, record| {
            Ok(record.set_connect_class(class, ts))
        })
    }

    fn mutate(
        &self,
        name: &AccountName,
        key: &str,
        broadcast: bool,
        apply: impl FnOnce(&FieldRegistry, &mut AccountRecord) -> AccountResult<bool>,
    ) -> AccountResult<bool> {
        let mut guard = self.write_state()?;
        let StoreState { accounts, registry } = &mut *guard;
        let record = accounts.get_mut(name).ok_or_else(|| AccountError::NotFound(name.clone()))?;

        if !apply(&*registry, &mut *record)? {
            debug!(name = %name, key, "local field write not newer than stored value");
            record_counter(m::FIELDS_STALE, 1);
            return Ok(false);
        }
        record_counter(m::FIELDS_APPLIED, 1);

        let record = record.clone();
        self.notifier.emit(AccountEvent::Modified {
            name: record.name().clone(),
            entry: Some(record.clone()),
        });
        if broadcast {
            self.publish_update(registry, &record, key);
        }
        Ok(true)
    }

    /// Announce the full state of `entry` to peers
    pub fn send_account(&self, entry: &AccountRecord) -> AccountResult<()> {
        let state = self.read_state()?;
        self.publish_account(&state.registry, entry);
        Ok(())
    }

    /// Announce one field of `entry` to peers. A field without a value is
    /// not transmitted; returns whether anything was sent.
    pub fn send_update(&self, entry: &AccountRecord, key: &str) -> AccountResult<bool> {
        let state = self.read_state()?;
        Ok(self.publish_update(&state.registry, entry, key))
    }

    /// Announce the removal of the incarnation `(name, created_at)`
    pub fn send_removal(&self, name: &AccountName, created_at: Timestamp) {
        self.notifier.publish(PeerMessage::Removal { name: name.clone(), created_at });
    }

    /// Copy of the full mapping, for bulk resync
    pub fn get_db(&self) -> AccountResult<AccountDb> {
        Ok(self.read_state()?.accounts.clone())
    }

    /// Re-announce every account, e.g. when a peer connects. Returns the
    /// number of accounts sent.
    pub fn resync(&self) -> AccountResult<usize> {
        let state = self.read_state()?;
        for record in state.accounts.values() {
            self.publish_account(&state.registry, record);
        }
        info!(count = state.accounts.len(), "account database resync sent");
        Ok(state.accounts.len())
    }

    fn publish_account(&self, registry: &FieldRegistry, entry: &AccountRecord) {
        self.notifier.publish(PeerMessage::Account {
            name: entry.name().clone(),
            created_at: entry.created_at(),
            fields: entry.serialize_fields(registry, self.format),
        });
    }

    fn publish_update(&self, registry: &FieldRegistry, entry: &AccountRecord, key: &str) -> bool {
        let value = entry.serialize_field(key, registry.kind_of(key), self.format);
        if value.is_empty() {
            return false;
        }
        self.notifier.publish(PeerMessage::Update {
            name: entry.name().clone(),
            created_at: entry.created_at(),
            key: key.to_string(),
            value,
        });
        true
    }
}
