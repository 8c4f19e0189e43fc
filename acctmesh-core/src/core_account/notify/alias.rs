/*
    alias.rs - Alias lookup hook

    Alias tables belong to another module. The store only asks: "does this
    name resolve to an account?" and, when the answer turns out to be stale,
    hands the name back through the invalidation capability the resolver
    supplied with its answer.
*/

use crate::core_account::name::{AccountName, Timestamp};
use std::fmt;
use std::sync::Arc;

/// Capability to drop an alias from the table that produced it
#[derive(Clone)]
pub struct AliasInvalidator(Arc<dyn Fn(&AccountName) + Send + Sync>);

impl AliasInvalidator {
    pub fn new(f: impl Fn(&AccountName) + Send + Sync + 'static) -> Self {
        AliasInvalidator(Arc::new(f))
    }

    /// Ask the owning table to forget `alias`
    pub fn invalidate(&self, alias: &AccountName) {
        (self.0)(alias)
    }
}

impl fmt::Debug for AliasInvalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AliasInvalidator(..)")
    }
}

/// Answer to an alias query
#[derive(Debug, Clone)]
pub struct AliasResolution {
    /// Canonical account the alias points at
    pub account: AccountName,
    /// When the alias was created; an account newer than this is a
    /// different incarnation and the alias is stale
    pub alias_ts: Timestamp,
    pub invalidate: AliasInvalidator,
}

/// Alias table owned by a collaborator.
///
/// Called synchronously from `AccountStore::get_account` while the store's
/// read lock is held; implementations must return promptly and must not
/// call back into the store.
pub trait AliasResolver: Send + Sync {
    fn resolve(&self, alias: &AccountName) -> Option<AliasResolution>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_invalidator_receives_original_name() {
        let dropped = Arc::new(Mutex::new(Vec::new()));
        let sink = dropped.clone();
        let invalidator = AliasInvalidator::new(move |name| {
            sink.lock().unwrap().push(name.as_str().to_string());
        });

        invalidator.invalidate(&AccountName::new("Bobby"));
        invalidator.clone().invalidate(&AccountName::new("rob"));

        assert_eq!(*dropped.lock().unwrap(), vec!["Bobby".to_string(), "rob".to_string()]);
    }
}
