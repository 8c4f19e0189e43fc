//! Notification payloads
//!
//! [`AccountEvent`] goes to local listeners (session handling, other
//! modules). [`PeerMessage`] goes to the transport, which owns framing,
//! server identity and delivery.

use crate::core_account::name::{AccountName, Timestamp};
use crate::core_account::record::AccountRecord;
use crate::core_account::session::UserHandle;
use serde::{Deserialize, Serialize};

/// Local account notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    /// An account was added or changed (`entry` is the new state) or
    /// removed (`entry` is `None`)
    Modified {
        name: AccountName,
        entry: Option<AccountRecord>,
    },

    /// A user was attached to an account, or detached when `account` is
    /// `None`. Session state only; nothing is persisted in the store.
    Login {
        user: UserHandle,
        account: Option<AccountName>,
    },
}

impl AccountEvent {
    /// Account name the event concerns, if any
    pub fn account_name(&self) -> Option<&AccountName> {
        match self {
            AccountEvent::Modified { name, .. } => Some(name),
            AccountEvent::Login { account, .. } => account.as_ref(),
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, AccountEvent::Modified { entry: None, .. })
    }
}

/// Change to propagate to peer servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Full account state: identity plus every field that has a value
    Account {
        name: AccountName,
        created_at: Timestamp,
        fields: Vec<(String, String)>,
    },

    /// One serialized field of an existing account
    Update {
        name: AccountName,
        created_at: Timestamp,
        key: String,
        value: String,
    },

    /// The incarnation `(name, created_at)` was deleted
    Removal {
        name: AccountName,
        created_at: Timestamp,
    },
}

impl PeerMessage {
    pub fn name(&self) -> &AccountName {
        match self {
            PeerMessage::Account { name, .. } => name,
            PeerMessage::Update { name, .. } => name,
            PeerMessage::Removal { name, .. } => name,
        }
    }

    pub fn created_at(&self) -> Timestamp {
        match self {
            PeerMessage::Account { created_at, .. } => *created_at,
            PeerMessage::Update { created_at, .. } => *created_at,
            PeerMessage::Removal { created_at, .. } => *created_at,
        }
    }
}
