/*
    conflict.rs - Creation conflict rule

    Two servers may create the same account name independently while
    partitioned. When they meet again, the creation with the lower creation
    time is authoritative. Equal creation times fall back to comparing the
    raw (display) names byte-wise, lower wins. If even the raw names match,
    both sides hold the same incarnation and their fields merge.

    The rule is a pure function of the two (name, created_at) pairs, so
    every server reaches the same decision on its own.
*/

use crate::core_account::name::{AccountName, Timestamp};
use std::cmp::Ordering;

/// Which creation survives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationWinner {
    /// The record already in the local store
    Local,
    /// The incoming remote creation
    Remote,
    /// Same incarnation on both sides
    Same,
}

/// Decide between a local and a remote creation of the same name
pub fn resolve_creation(
    local: (&AccountName, Timestamp),
    remote: (&AccountName, Timestamp),
) -> CreationWinner {
    let by_time = local.1.cmp(&remote.1);
    let ordering = by_time.then_with(|| local.0.as_str().cmp(remote.0.as_str()));

    match ordering {
        Ordering::Less => CreationWinner::Local,
        Ordering::Greater => CreationWinner::Remote,
        Ordering::Equal => CreationWinner::Same,
    }
}
