//! Field key registry
//!
//! Records are schema-less; the schema lives here. Collaborators register
//! the keys they own together with a [`FieldKind`]. Keys nobody registered
//! are still accepted and treated as strings.

use super::FieldKind;
use std::collections::BTreeMap;
use tracing::warn;

/// Key of the built-in hash/password slot
pub const HASH_PASSWORD: &str = "hash_password";

/// Key of the built-in connect class slot
pub const CONNECT_CLASS: &str = "connectclass";

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    kinds: BTreeMap<String, FieldKind>,
}

impl FieldRegistry {
    /// Registry containing only the built-in keys
    pub fn new() -> Self {
        let mut kinds = BTreeMap::new();
        kinds.insert(CONNECT_CLASS.to_string(), FieldKind::String);
        FieldRegistry { kinds }
    }

    /// Register `key` with `kind`, returning the previous kind if any.
    ///
    /// Built-in keys keep their kinds and cannot be re-registered.
    pub fn register(&mut self, key: impl Into<String>, kind: FieldKind) -> Option<FieldKind> {
        let key = key.into();
        if Self::is_reserved(&key) {
            warn!(key, "refusing to register reserved field key");
            return None;
        }
        self.kinds.insert(key, kind)
    }

    /// Whether `key` is one of the built-in slots
    pub fn is_reserved(key: &str) -> bool {
        key == HASH_PASSWORD || key == CONNECT_CLASS
    }

    /// Kind used to decode `key`
    pub fn kind_of(&self, key: &str) -> FieldKind {
        self.kinds.get(key).copied().unwrap_or(FieldKind::String)
    }

    pub fn is_registered(&self, key: &str) -> bool {
        key == HASH_PASSWORD || self.kinds.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}
