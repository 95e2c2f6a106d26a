//! Parsing of ipset's textual listings
//!
//! The tool prints fixed, labelled listings rather than a structured format,
//! so each listing is anchored with a regex and the free-form parts are split
//! with shell-like, quote-aware tokenizing.

use crate::error::{IpsetError, Result};
use crate::model::{AttrValue, EntryAttrs, Members, SetDescriptor};
use crate::set_type::SetType;

use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v(\S+),\s*protocol version:\s*(\d+)").expect("valid version regex")
});

static HEADER_V7_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)Name:\s(.*?)\nType:\s(.*?)\nRevision:\s(.*?)\nHeader:\s(.*?)\n",
        r"Size in memory:\s(.*?)\nReferences:\s(.*?)\nNumber of entries:\s(.*?)\n",
    ))
    .expect("valid protocol 7 header regex")
});

static HEADER_V6_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)Name:\s(.*?)\sType:\s(.*?)\sRevision:\s(.*?)\sHeader:\s(.*?)\s",
        r"Size in memory:\s(.*?)\sReferences:\s(.*?)\s",
    ))
    .expect("valid protocol 6 header regex")
});

static MEMBERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Members:\n(.*)").expect("valid members regex"));

/// Header tokens that carry no value
const HEADER_FLAGS: &[&str] = &["comment", "counters", "skbinfo", "forceadd"];

/// Entry tokens that carry no value
const ENTRY_FLAGS: &[&str] = &["nomatch"];

/// Layout of `ipset list` output, which depends on the kernel protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    /// Protocol 6: whitespace separated labels, no entry count
    Protocol6,
    /// Protocol 7: one label per line, with entry count
    Protocol7,
}

impl ListingFormat {
    pub fn from_protocol(protocol: u32) -> Result<Self> {
        match protocol {
            6 => Ok(ListingFormat::Protocol6),
            7 => Ok(ListingFormat::Protocol7),
            other => Err(IpsetError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Parse `ipset --version` output into (version, protocol)
///
/// e.g. `ipset v7.15, protocol version: 7`
pub fn parse_version(output: &str) -> Result<(String, u32)> {
    let caps = VERSION_RE
        .captures(output)
        .ok_or_else(|| IpsetError::unparseable("version", output))?;
    let protocol = caps[2]
        .parse()
        .map_err(|_| IpsetError::unparseable("protocol version", output))?;
    Ok((caps[1].to_string(), protocol))
}

/// Parse `ipset list -name` output
pub fn parse_set_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Split a line the way a POSIX shell would, honoring quotes
///
/// A backslash directly before a double quote is split from it first, so a
/// comment ending in a backslash (`"\\server\share\"`) still terminates.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let escaped = line.replace("\\\"", "\\ \"");
    shlex::split(&escaped).ok_or_else(|| IpsetError::unparseable("unterminated quote", line))
}

/// Pair `key value` tokens, coercing digit-only values
///
/// Known flags, and a trailing key without a value, become `Flag(true)`.
fn pair_tokens<I>(tokens: I, flags: &[&str]) -> Vec<(String, AttrValue)>
where
    I: IntoIterator<Item = String>,
{
    let mut pairs = Vec::new();
    let mut tokens = tokens.into_iter();

    while let Some(key) = tokens.next() {
        let value = if flags.contains(&key.as_str()) {
            AttrValue::Flag(true)
        } else {
            match tokens.next() {
                Some(value) => AttrValue::from_token(&value),
                None => AttrValue::Flag(true),
            }
        };
        pairs.push((key, value));
    }

    pairs
}

/// Parse the `Header:` line of a listing into sorted options
pub fn parse_header_options(line: &str) -> Result<BTreeMap<String, AttrValue>> {
    Ok(pair_tokens(tokenize(line)?, HEADER_FLAGS).into_iter().collect())
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IpsetError::unparseable(field, value))
}

/// Parse the labelled header of `ipset list <set> [-terse]`
pub fn parse_header(output: &str, format: ListingFormat) -> Result<SetDescriptor> {
    let text = format!("{}\n", output);
    let regex = match format {
        ListingFormat::Protocol7 => &*HEADER_V7_RE,
        ListingFormat::Protocol6 => &*HEADER_V6_RE,
    };
    let caps = regex
        .captures(&text)
        .ok_or_else(|| IpsetError::unparseable("set header", output))?;

    let set_type = SetType::from_str(caps[2].trim())
        .map_err(|_| IpsetError::unparseable("set type", &caps[2]))?;
    let header_line = caps[4].trim().to_string();

    let number_of_entries = match format {
        ListingFormat::Protocol7 => parse_number("number of entries", &caps[7])?,
        ListingFormat::Protocol6 => match MEMBERS_RE.captures(&text) {
            Some(members) => members[1].lines().filter(|l| !l.trim().is_empty()).count() as u64,
            None => 0,
        },
    };

    Ok(SetDescriptor {
        name: caps[1].trim().to_string(),
        set_type,
        revision: parse_number("revision", &caps[3])?,
        header: parse_header_options(&header_line)?,
        header_orig_line: header_line,
        size_in_memory: parse_number("size in memory", &caps[5])?,
        references: parse_number("references", &caps[6])?,
        number_of_entries,
        members: None,
    })
}

/// Parse one member line into its key and attributes
pub fn parse_member_line(line: &str) -> Result<Option<(String, EntryAttrs)>> {
    let mut tokens = tokenize(line)?.into_iter();
    let Some(key) = tokens.next() else {
        return Ok(None);
    };
    Ok(Some((key, pair_tokens(tokens, ENTRY_FLAGS).into_iter().collect())))
}

/// Parse the entries following the `Members:` divider of `ipset list <set>`
pub fn parse_members(output: &str) -> Result<Members> {
    let text = format!("{}\n", output);
    let caps = MEMBERS_RE
        .captures(&text)
        .ok_or_else(|| IpsetError::unparseable("members section", output))?;

    let mut members = Members::new();
    for line in caps[1].lines().filter(|l| !l.trim().is_empty()) {
        if let Some((key, attrs)) = parse_member_line(line)? {
            members.insert(key, attrs);
        }
    }
    Ok(members)
}
