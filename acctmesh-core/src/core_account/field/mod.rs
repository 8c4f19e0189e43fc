/*
    field - Timestamp-tagged attribute slots

    Every per-record attribute is a slot holding a value and the time it was
    last written. Slots merge independently of each other and of the
    record's creation time: an incoming write replaces the slot only when
    its timestamp is strictly greater than the stored one.

    The set of slot shapes is closed (timestamp marker, bool, int with a
    declared default, string); collaborators pick a shape per key through
    the FieldRegistry.
*/

pub mod codec;
pub mod credentials;
pub mod registry;

pub use codec::Decoded;
pub use credentials::Credentials;
pub use registry::{FieldRegistry, CONNECT_CLASS, HASH_PASSWORD};

use super::name::Timestamp;
use serde::{Deserialize, Serialize};

/// How a serialized value segment is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializeFormat {
    /// `<ts> <value>`
    #[default]
    Internal,
    /// `<ts> :<value>`, for transports carrying the value as a trailing
    /// free-text parameter
    Network,
}

impl SerializeFormat {
    pub(crate) fn separator(&self) -> &'static str {
        match self {
            SerializeFormat::Internal => " ",
            SerializeFormat::Network => " :",
        }
    }
}

/// Declared shape of a field key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    /// Presence and freshness only, no payload
    Timestamp,
    Bool,
    /// Signed integer; `default` is used when the value segment is missing
    Int { default: i32 },
    String,
}

/// Payload of a field slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Marker,
    Bool(bool),
    Int(i32),
    String(String),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Value segment as it appears on the wire, `None` for markers
    pub fn encode(&self) -> Option<String> {
        match self {
            FieldValue::Marker => None,
            FieldValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            FieldValue::Int(n) => Some(n.to_string()),
            FieldValue::String(s) => Some(s.clone()),
        }
    }
}

/// A value tagged with its last-write time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub ts: Timestamp,
    pub value: T,
}

/// Slot type used for every registered and schema-less field
pub type FieldSlot = Stamped<FieldValue>;

impl<T> Stamped<T> {
    pub fn new(ts: Timestamp, value: T) -> Self {
        Stamped { ts, value }
    }

    /// Whether a write at `ts` replaces `current`
    pub fn supersedes(current: Option<&Stamped<T>>, ts: Timestamp) -> bool {
        match current {
            None => true,
            Some(existing) => ts > existing.ts,
        }
    }
}

/// Last-writer-wins merge of `incoming` into `slot`.
///
/// Returns true if the slot was replaced.
pub fn merge_stamped<T>(slot: &mut Option<Stamped<T>>, incoming: Stamped<T>) -> bool {
    if Stamped::supersedes(slot.as_ref(), incoming.ts) {
        *slot = Some(incoming);
        true
    } else {
        false
    }
}

/// Result of merging one raw update into a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// The slot took the incoming value. `malformed` is set when the value
    /// segment could not be decoded and the kind's default was stored.
    Applied { malformed: bool },
    /// The incoming timestamp was not newer; nothing changed
    Stale,
    /// The raw update was empty (an absent field); nothing changed
    Absent,
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MergeOutcome::Applied { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, MergeOutcome::Applied { malformed: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supersedes_requires_strictly_newer() {
        let current = Stamped::new(Timestamp(10), 1);
        assert!(Stamped::supersedes(Some(&current), Timestamp(11)));
        assert!(!Stamped::supersedes(Some(&current), Timestamp(10)));
        assert!(!Stamped::supersedes(Some(&current), Timestamp(9)));
        assert!(Stamped::<i32>::supersedes(None, Timestamp(0)));
    }

    #[test]
    fn test_merge_stamped_replaces_absent() {
        let mut slot = None;
        assert!(merge_stamped(&mut slot, Stamped::new(Timestamp(5), "a")));
        assert_eq!(slot, Some(Stamped::new(Timestamp(5), "a")));
    }

    #[test]
    fn test_merge_stamped_keeps_newer() {
        let mut slot = Some(Stamped::new(Timestamp(20), "b"));
        assert!(!merge_stamped(&mut slot, Stamped::new(Timestamp(10), "a")));
        assert_eq!(slot.unwrap().value, "b");
    }

    #[test]
    fn test_field_value_encode() {
        assert_eq!(FieldValue::Marker.encode(), None);
        assert_eq!(FieldValue::Bool(true).encode().as_deref(), Some("1"));
        assert_eq!(FieldValue::Bool(false).encode().as_deref(), Some("0"));
        assert_eq!(FieldValue::Int(-3).encode().as_deref(), Some("-3"));
        assert_eq!(FieldValue::String("x y".into()).encode().as_deref(), Some("x y"));
    }

    #[test]
    fn test_field_kind_config_shape() {
        let kind: FieldKind = serde_json::from_str(r#"{"kind":"int","default":3}"#).unwrap();
        assert_eq!(kind, FieldKind::Int { default: 3 });
        let kind: FieldKind = serde_json::from_str(r#"{"kind":"bool"}"#).unwrap();
        assert_eq!(kind, FieldKind::Bool);
    }
}
