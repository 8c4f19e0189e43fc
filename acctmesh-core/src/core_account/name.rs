/*
    name.rs - Account names and timestamps

    Account names compare under RFC 1459 case mapping, the same rules the
    messaging network applies to nicknames and channels:
    - ASCII A-Z fold to a-z
    - [ ] \ ~ fold to { } | ^

    The display form supplied at creation is kept for output and for the
    creation tie-break; equality, hashing and ordering use the folded form.
*/

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in seconds, as exchanged between servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current wall-clock time
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Timestamp(secs)
    }

    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Lenient parse in the manner of C `atol`: optional leading
    /// whitespace and sign, then as many digits as present. Anything
    /// unparsable yields zero.
    pub fn parse_lenient(s: &str) -> Self {
        let s = s.trim_start();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let mut value: i64 = 0;
        for b in digits.bytes().take_while(|b| b.is_ascii_digit()) {
            value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
        }

        Timestamp(if negative { -value } else { value })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fold a single byte using RFC 1459 case mapping
fn fold_byte(b: u8) -> u8 {
    match b {
        b'A'..=b'Z' => b + 32,
        b'[' => b'{',
        b']' => b'}',
        b'\\' => b'|',
        b'~' => b'^',
        other => other,
    }
}

/// Case-insensitive account name
#[derive(Clone)]
pub struct AccountName {
    display: String,
    folded: String,
}

impl AccountName {
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        // Only ASCII is folded; multi-byte characters pass through intact
        let folded = display
            .chars()
            .map(|c| if c.is_ascii() { char::from(fold_byte(c as u8)) } else { c })
            .collect();
        AccountName { display, folded }
    }

    /// Name as it was given at creation
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Case-folded comparison key
    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }
}

impl PartialEq for AccountName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for AccountName {}

impl Hash for AccountName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for AccountName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccountName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountName({:?})", self.display)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        AccountName::new(s)
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        AccountName::new(s)
    }
}

impl Serialize for AccountName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> Deserialize<'de> for AccountName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(AccountName::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(AccountName::new("Alice"), AccountName::new("alice"));
        assert_eq!(AccountName::new("ALICE"), AccountName::new("aLiCe"));
        assert_ne!(AccountName::new("alice"), AccountName::new("alice2"));
    }

    #[test]
    fn test_rfc1459_brackets_fold() {
        assert_eq!(AccountName::new("foo[bar]"), AccountName::new("FOO{BAR}"));
        assert_eq!(AccountName::new("a\\b~c"), AccountName::new("a|b^c"));
    }

    #[test]
    fn test_display_form_preserved() {
        let name = AccountName::new("Bob[away]");
        assert_eq!(name.as_str(), "Bob[away]");
        assert_eq!(name.folded(), "bob{away}");
        assert_eq!(name.to_string(), "Bob[away]");
    }

    #[test]
    fn test_non_ascii_passthrough() {
        let name = AccountName::new("Zoë");
        assert_eq!(name.folded(), "zoë");
    }

    #[test]
    fn test_hash_matches_folded_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(AccountName::new("Carol"));
        assert!(set.contains(&AccountName::new("CAROL")));
    }

    #[test]
    fn test_timestamp_lenient_parse() {
        assert_eq!(Timestamp::parse_lenient("1234"), Timestamp(1234));
        assert_eq!(Timestamp::parse_lenient("  42abc"), Timestamp(42));
        assert_eq!(Timestamp::parse_lenient("-7"), Timestamp(-7));
        assert_eq!(Timestamp::parse_lenient("garbage"), Timestamp(0));
        assert_eq!(Timestamp::parse_lenient(""), Timestamp(0));
    }

    #[test]
    fn test_name_serde_uses_display_form() {
        let name = AccountName::new("Dave");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Dave\"");
        let back: AccountName = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "Dave");
    }
}
