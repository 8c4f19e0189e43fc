/*
    core_account - Replicated account directory

    Every server in the mesh holds a full copy of the account directory and
    may create, update or delete accounts on its own. Copies converge using
    only timestamps:
    - per-field last-writer-wins (field)
    - lower-creation-time-wins for independent creations (sync::conflict)

    Modules:
    - name: case-insensitive account names and timestamps
    - field: timestamp-tagged slots, their codec and the key registry
    - record: one account's identity and slots
    - store: the authoritative name -> record mapping
    - notify: local events, outbound peer messages and alias queries
    - session: user login attachment
    - sync: applying changes received from peers
*/

pub mod field;
pub mod name;
pub mod notify;
pub mod record;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
pub mod tests;

// Re-export commonly used types
pub use field::{FieldKind, FieldRegistry, FieldSlot, FieldValue, MergeOutcome, SerializeFormat};
pub use name::{AccountName, Timestamp};
pub use notify::{AccountEvent, AliasInvalidator, AliasResolution, AliasResolver, ChangeNotifier, PeerMessage};
pub use record::AccountRecord;
pub use session::{AccountProvider, SessionRegistry, UserHandle};
pub use store::{AccountDb, AccountError, AccountResult, AccountStore, NewAccount, RemoveOutcome};
pub use sync::{apply_remote, RemoteContext, RemoteOutcome};
