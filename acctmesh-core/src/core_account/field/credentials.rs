//! Hash and password slot
//!
//! The hash type and the password are written together and share a single
//! timestamp, so they merge as one unit under the `hash_password` key.
//! Wire form: `<ts> <hash> <password>` (Internal) or `<ts> <hash> :<password>`
//! (Network). The hashing algorithm itself belongs to a collaborator; this
//! slot only stores its output.

use super::codec::{split_raw, Decoded};
use super::{MergeOutcome, SerializeFormat, Stamped};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Name of the hash type the password is stored with
    pub hash: String,
    pub password: String,
}

impl Credentials {
    pub fn new(hash: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials { hash: hash.into(), password: password.into() }
    }

    pub fn serialize(slot: Option<&Stamped<Credentials>>, format: SerializeFormat) -> String {
        match slot {
            None => String::new(),
            Some(slot) => format!(
                "{} {}{}{}",
                slot.ts,
                slot.value.hash,
                format.separator(),
                slot.value.password
            ),
        }
    }

    pub fn decode(raw: &str, format: SerializeFormat) -> Option<Decoded<Credentials>> {
        if raw.is_empty() {
            return None;
        }

        // The hash never contains a space, so the first token after the
        // timestamp is the hash and the remainder the password.
        let (ts, segment) = split_raw(raw, SerializeFormat::Internal);
        let (value, malformed) = match segment.and_then(|s| s.split_once(' ')) {
            Some((hash, password)) => {
                let password = match format {
                    SerializeFormat::Network => password.strip_prefix(':').unwrap_or(password),
                    SerializeFormat::Internal => password,
                };
                (Credentials::new(hash, password), false)
            }
            None => (Credentials::default(), true),
        };

        Some(Decoded { stamped: Stamped::new(ts, value), malformed })
    }

    pub fn merge(
        current: &mut Option<Stamped<Credentials>>,
        raw: &str,
        format: SerializeFormat,
    ) -> MergeOutcome {
        let Some(decoded) = Credentials::decode(raw, format) else {
            return MergeOutcome::Absent;
        };

        if decoded.malformed {
            debug!("hash_password update missing hash or password, clearing both");
        }

        if super::merge_stamped(current, decoded.stamped) {
            MergeOutcome::Applied { malformed: decoded.malformed }
        } else {
            MergeOutcome::Stale
        }
    }
}
