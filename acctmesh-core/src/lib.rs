//! acctmesh core library
//!
//! A replicated account directory for a mesh of IRC servers. Each server
//! keeps a full copy; copies converge through per-field last-writer-wins
//! merges and a deterministic rule for conflicting account creations.
//!
//! - [`core_account`]: names, fields, records, the store, notifications
//!   and the inbound replication path
//! - [`config`]: node configuration
//! - [`logging`]: tracing subscriber setup
//! - [`metrics`]: metric names and recording helpers

pub mod config;
pub mod core_account;
pub mod logging;
pub mod metrics;

pub use config::{Config, ConfigError};
pub use core_account::{
    AccountError, AccountEvent, AccountName, AccountRecord, AccountResult, AccountStore,
    ChangeNotifier, NewAccount, PeerMessage, RemoteOutcome, Timestamp,
};
pub use logging::{init_logging, LogLevel};
