/*
    codec.rs - Serialize and merge for field slots

    Wire form is a single line: `<ts> <value>` (Internal) or `<ts> :<value>`
    (Network). A slot that was never set serializes to the empty string, and
    merging the empty string is a no-op.

    Decoding never fails: an unparsable timestamp reads as zero and a
    missing or unparsable value segment falls back to the kind's default.
*/

use super::{FieldKind, FieldSlot, FieldValue, MergeOutcome, SerializeFormat, Stamped};
use crate::core_account::name::Timestamp;
use tracing::debug;

/// A decoded raw update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub stamped: Stamped<T>,
    /// Set when the value segment fell back to a default
    pub malformed: bool,
}

/// Split a raw update into its timestamp and value segment.
///
/// In Network format one leading ':' is stripped from the value segment.
pub(crate) fn split_raw(raw: &str, format: SerializeFormat) -> (Timestamp, Option<&str>) {
    match raw.find(' ') {
        None => (Timestamp::parse_lenient(raw), None),
        Some(delim) => {
            let ts = Timestamp::parse_lenient(&raw[..delim]);
            let mut value = &raw[delim + 1..];
            if format == SerializeFormat::Network {
                value = value.strip_prefix(':').unwrap_or(value);
            }
            (ts, Some(value))
        }
    }
}

impl FieldKind {
    /// Value stored when an update carries no usable payload
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldKind::Timestamp => FieldValue::Marker,
            FieldKind::Bool => FieldValue::Bool(false),
            FieldKind::Int { default } => FieldValue::Int(*default),
            FieldKind::String => FieldValue::String(String::new()),
        }
    }

    /// Whether `value` has the shape this kind decodes to. A value of any
    /// other shape would be read back differently by peers.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::Timestamp, FieldValue::Marker)
                | (FieldKind::Bool, FieldValue::Bool(_))
                | (FieldKind::Int { .. }, FieldValue::Int(_))
                | (FieldKind::String, FieldValue::String(_))
        )
    }

    /// Decode a raw update. Returns `None` for the empty string.
    pub fn decode(&self, raw: &str, format: SerializeFormat) -> Option<Decoded<FieldValue>> {
        if raw.is_empty() {
            return None;
        }

        let (ts, segment) = split_raw(raw, format);

        let (value, malformed) = match (self, segment) {
            (FieldKind::Timestamp, _) => (FieldValue::Marker, false),
            (FieldKind::Bool, Some(v)) if v.starts_with('1') => (FieldValue::Bool(true), false),
            (FieldKind::Bool, Some(v)) if v.starts_with('0') => (FieldValue::Bool(false), false),
            (FieldKind::Int { default }, Some(v)) => match v.trim().parse::<i32>() {
                Ok(n) => (FieldValue::Int(n), false),
                Err(_) => (FieldValue::Int(*default), true),
            },
            (FieldKind::String, Some(v)) => (FieldValue::String(v.to_string()), false),
            (kind, _) => (kind.default_value(), true),
        };

        Some(Decoded { stamped: Stamped::new(ts, value), malformed })
    }

    /// Serialize a slot, or the empty string if it was never set
    pub fn serialize(&self, slot: Option<&FieldSlot>, format: SerializeFormat) -> String {
        match slot {
            None => String::new(),
            Some(slot) => match slot.value.encode() {
                None => slot.ts.to_string(),
                Some(value) => format!("{}{}{}", slot.ts, format.separator(), value),
            },
        }
    }

    /// Merge a raw update into `current` under last-writer-wins
    pub fn merge(
        &self,
        current: &mut Option<FieldSlot>,
        raw: &str,
        format: SerializeFormat,
    ) -> MergeOutcome {
        let Some(decoded) = self.decode(raw, format) else {
            return MergeOutcome::Absent;
        };

        if decoded.malformed {
            debug!(raw, kind = ?self, "value segment malformed, using default");
        }

        let ts = decoded.stamped.ts;
        if super::merge_stamped(current, decoded.stamped) {
            MergeOutcome::Applied { malformed: decoded.malformed }
        } else {
            debug!(%ts, "discarding stale field update");
            MergeOutcome::Stale
        }
    }
}
