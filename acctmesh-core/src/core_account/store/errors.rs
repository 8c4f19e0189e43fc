/*
    errors.rs - Error types for the account store

    Conditions surfaced to callers as errors:
    - creating a name that already exists
    - looking up a name that does not resolve
    - a local typed write whose value does not fit the key's kind

    Malformed field payloads and repeated removals are reported as outcomes
    (MergeOutcome, RemoveOutcome), never as errors.
*/

use crate::core_account::field::FieldKind;
use crate::core_account::name::{AccountName, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    /// An account with this name already exists locally
    #[error("Account already exists: {name} (created at {existing})")]
    Conflict { name: AccountName, existing: Timestamp },

    /// No account matched, after alias resolution if requested
    #[error("Account not found: {0}")]
    NotFound(AccountName),

    /// A typed write does not match the kind registered for the key
    #[error("Value for field {key} does not match its kind {expected:?}")]
    KindMismatch { key: String, expected: FieldKind },

    /// Internal failure (lock poisoned)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for account store operations
pub type AccountResult<T> = Result<T, AccountError>;
