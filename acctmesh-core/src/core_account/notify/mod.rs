/*
    notify - Change notification contract

    Decouples the account store from the transport and from local modules.
    - events: local notifications (modified, login) and outbound peer messages
    - broadcaster: the ChangeNotifier publishing both
    - alias: synchronous alias query with an invalidation capability

    Notifications for one account are emitted in the order the store applied
    the mutations: the store emits while still holding its write lock.
*/

pub mod alias;
pub mod broadcaster;
pub mod events;

pub use alias::{AliasInvalidator, AliasResolution, AliasResolver};
pub use broadcaster::{ChangeNotifier, DEFAULT_CAPACITY};
pub use events::{AccountEvent, PeerMessage};
