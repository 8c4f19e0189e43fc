/*
    record.rs - Account record

    A record bundles the account's identity (name + creation time) with its
    field slots. Identity is immutable; replacing the creation time means
    removing the record and creating a new one.

    The record holds no merge policy of its own. Field updates are delegated
    to the codec of the key's registered kind; setting a key that has no
    slot yet creates one.
*/

use super::field::{
    Credentials, FieldKind, FieldRegistry, FieldSlot, FieldValue, MergeOutcome, SerializeFormat,
    Stamped, CONNECT_CLASS, HASH_PASSWORD,
};
use super::name::{AccountName, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    name: AccountName,
    created_at: Timestamp,
    hash_password: Option<Stamped<Credentials>>,
    fields: BTreeMap<String, FieldSlot>,
}

impl AccountRecord {
    pub fn new(name: AccountName, created_at: Timestamp) -> Self {
        AccountRecord { name, created_at, hash_password: None, fields: BTreeMap::new() }
    }

    pub fn name(&self) -> &AccountName {
        &self.name
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Whether `(name, created_at)` identifies this incarnation of the account
    pub fn same_incarnation(&self, name: &AccountName, created_at: Timestamp) -> bool {
        self.name == *name && self.created_at == created_at
    }

    pub fn credentials(&self) -> Option<&Stamped<Credentials>> {
        self.hash_password.as_ref()
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash_password.as_ref().map(|s| s.value.hash.as_str())
    }

    pub fn password(&self) -> Option<&str> {
        self.hash_password.as_ref().map(|s| s.value.password.as_str())
    }

    pub fn connect_class(&self) -> Option<&str> {
        self.fields.get(CONNECT_CLASS).and_then(|slot| slot.value.as_str())
    }

    pub fn field(&self, key: &str) -> Option<&FieldSlot> {
        self.fields.get(key)
    }

    /// Keys with a value, the credentials key first when set
    pub fn field_keys(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.fields.len() + 1);
        if self.hash_password.is_some() {
            keys.push(HASH_PASSWORD);
        }
        keys.extend(self.fields.keys().map(String::as_str));
        keys
    }

    /// Serialize one field; empty string when it has no value
    pub fn serialize_field(&self, key: &str, kind: FieldKind, format: SerializeFormat) -> String {
        if key == HASH_PASSWORD {
            Credentials::serialize(self.hash_password.as_ref(), format)
        } else {
            kind.serialize(self.fields.get(key), format)
        }
    }

    /// Serialize every field that has a value
    pub fn serialize_fields(
        &self,
        registry: &FieldRegistry,
        format: SerializeFormat,
    ) -> Vec<(String, String)> {
        self.field_keys()
            .into_iter()
            .map(|key| (key.to_string(), self.serialize_field(key, registry.kind_of(key), format)))
            .collect()
    }

    /// Merge a raw update into `key`
    pub fn merge_field(
        &mut self,
        key: &str,
        kind: FieldKind,
        raw: &str,
        format: SerializeFormat,
    ) -> MergeOutcome {
        if key == HASH_PASSWORD {
            return Credentials::merge(&mut self.hash_password, raw, format);
        }

        let mut slot = self.fields.remove(key);
        let outcome = kind.merge(&mut slot, raw, format);
        if let Some(slot) = slot {
            self.fields.insert(key.to_string(), slot);
        }
        outcome
    }

    /// Set a typed value at `ts`, subject to the same last-writer-wins rule
    pub fn set_field(&mut self, key: &str, value: FieldValue, ts: Timestamp) -> bool {
        match self.fields.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Stamped::new(ts, value));
                true
            }
            Entry::Occupied(mut occupied) => {
                if ts > occupied.get().ts {
                    occupied.insert(Stamped::new(ts, value));
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn set_credentials(&mut self, credentials: Credentials, ts: Timestamp) -> bool {
        super::field::merge_stamped(&mut self.hash_password, Stamped::new(ts, credentials))
    }

    pub fn set_connect_class(&mut self, class: impl Into<String>, ts: Timestamp) -> bool {
        self.set_field(CONNECT_CLASS, FieldValue::String(class.into()), ts)
    }
}
