/*
    store - The account store

    - account_store: name -> record mapping with create / fetch / remove,
      field merges, and the outbound send operations
    - errors: AccountError and AccountResult
*/

pub mod account_store;
pub mod errors;

pub use account_store::{AccountDb, AccountStore, NewAccount, RemoveOutcome};
pub use errors::{AccountError, AccountResult};
