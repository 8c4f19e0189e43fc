/*
    sync - Inbound half of account replication

    - conflict: deterministic rule for independent creations of one name
    - apply_remote: applies peer messages to the local store

    The outbound half lives on the store itself (send_account, send_update,
    send_removal, resync).
*/

pub mod apply_remote;
pub mod conflict;

pub use apply_remote::{
    apply_remote, apply_remote_account, apply_remote_removal, apply_remote_update, RemoteContext,
    RemoteOutcome,
};
pub use conflict::{resolve_creation, CreationWinner};
