//! Structured records parsed from ipset listings

use crate::set_type::SetType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a header option or entry attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Flag-only token such as `counters` or `nomatch`
    Flag(bool),
    /// Digit-only value
    Int(u64),
    Text(String),
}

impl AttrValue {
    /// Coerce a raw token: digit-only values become integers
    pub fn from_token(token: &str) -> Self {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = token.parse() {
                return AttrValue::Int(n);
            }
        }
        AttrValue::Text(token.to_string())
    }

}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Flag(b) => write!(f, "{}", b),
            AttrValue::Int(n) => write!(f, "{}", n),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Flag(value)
    }
}

/// Attributes attached to one entry (timeout, comment, counters, skb metadata)
pub type EntryAttrs = IndexMap<String, AttrValue>;

/// Entries of a set keyed by member, in listing order
pub type Members = IndexMap<String, EntryAttrs>;

/// Header of a set as reported by `ipset list <set>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub set_type: SetType,

    pub revision: u32,

    /// Header options, sorted by name
    pub header: BTreeMap<String, AttrValue>,

    /// Header line exactly as printed by the tool
    pub header_orig_line: String,

    pub size_in_memory: u64,

    pub references: u64,

    pub number_of_entries: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Members>,
}

impl SetDescriptor {
    /// Look up a header option
    pub fn option(&self, key: &str) -> Option<&AttrValue> {
        self.header.get(key)
    }

    /// True when the header carries the given flag (e.g. "comment")
    pub fn has_flag(&self, key: &str) -> bool {
        matches!(self.header.get(key), Some(AttrValue::Flag(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_coercion() {
        assert_eq!(AttrValue::from_token("300"), AttrValue::Int(300));
        assert_eq!(AttrValue::from_token("0x1111"), AttrValue::Text("0x1111".into()));
        assert_eq!(AttrValue::from_token("-1"), AttrValue::Text("-1".into()));
        assert_eq!(AttrValue::from_token(""), AttrValue::Text(String::new()));
    }

    #[test]
    fn test_serialize_untagged() {
        let mut attrs = EntryAttrs::new();
        attrs.insert("comment".into(), "office".into());
        attrs.insert("timeout".into(), 300u64.into());
        attrs.insert("nomatch".into(), true.into());

        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r#"{"comment":"office","timeout":300,"nomatch":true}"#);
    }
}
