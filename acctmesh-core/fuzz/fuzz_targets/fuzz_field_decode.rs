#![no_main]

use acctmesh_core::core_account::field::{Credentials, FieldKind, SerializeFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw field updates come straight off the wire and must never panic
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    for format in [SerializeFormat::Internal, SerializeFormat::Network] {
        for kind in [
            FieldKind::Timestamp,
            FieldKind::Bool,
            FieldKind::Int { default: -1 },
            FieldKind::String,
        ] {
            let mut slot = None;
            kind.merge(&mut slot, raw, format);

            // Re-serializing a merged slot must merge back to itself
            let serialized = kind.serialize(slot.as_ref(), format);
            let mut again = None;
            kind.merge(&mut again, &serialized, format);
            assert_eq!(slot, again);
        }

        let mut credentials = None;
        Credentials::merge(&mut credentials, raw, format);
    }
});
