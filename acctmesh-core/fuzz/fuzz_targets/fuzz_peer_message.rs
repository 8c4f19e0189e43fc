#![no_main]

use acctmesh_core::core_account::notify::{ChangeNotifier, PeerMessage};
use acctmesh_core::core_account::sync::{apply_remote, RemoteContext};
use acctmesh_core::AccountStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON-lines peer traffic applied to a fresh store
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let store = AccountStore::new(ChangeNotifier::new(8));
    for line in text.lines() {
        if let Ok(msg) = serde_json::from_str::<PeerMessage>(line) {
            let _ = apply_remote(&store, msg, &RemoteContext::new());
        }
    }
});
