//! Parameters for create, add, save and restore

use crate::command::IpsetCommand;
use crate::error::{IpsetError, Result};
use crate::set_type::{Family, Feature, SetType};

/// Options for `ipset create`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOptions {
    /// Protocol family, hash types only (defaults to inet)
    pub family: Option<Family>,

    /// Default entry timeout in seconds
    pub timeout: Option<u64>,

    pub hashsize: Option<u64>,

    pub maxelem: Option<u64>,

    pub bucketsize: Option<u64>,

    /// Address or port range, required by bitmap types
    pub range: Option<String>,

    /// Size of a list:set
    pub size: Option<u64>,

    pub comment: bool,

    pub counters: bool,

    pub skbinfo: bool,

    pub nomatch: bool,

    pub forceadd: bool,

    pub wildcard: bool,

    /// Don't fail when an identical set already exists
    pub ignore_if_exists: bool,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Features this request turns on
    fn requested_features(&self) -> Vec<Feature> {
        [
            (self.counters, Feature::Counters),
            (self.comment, Feature::Comment),
            (self.skbinfo, Feature::Skbinfo),
            (self.forceadd, Feature::Forceadd),
            (self.nomatch, Feature::Nomatch),
            (self.wildcard, Feature::Wildcard),
            (self.bucketsize.is_some(), Feature::Bucketsize),
        ]
        .into_iter()
        .filter_map(|(enabled, feature)| enabled.then_some(feature))
        .collect()
    }

    /// Check every requested option is legal for the set type
    pub fn validate(&self, set_type: SetType) -> Result<()> {
        for feature in self.requested_features() {
            if !set_type.supports(feature) {
                return Err(IpsetError::validation(format!(
                    "'{}' is not supported by {} sets",
                    feature, set_type
                )));
            }
        }

        let hash_only = [
            ("family", self.family.is_some()),
            ("hashsize", self.hashsize.is_some()),
            ("maxelem", self.maxelem.is_some()),
        ];
        for (option, requested) in hash_only {
            if requested && !set_type.is_hash() {
                return Err(IpsetError::validation(format!(
                    "'{}' is only supported by hash sets, not {}",
                    option, set_type
                )));
            }
        }

        if self.family.is_some() && !set_type.accepts_family() {
            return Err(IpsetError::validation(format!(
                "'family' is not supported by {} sets",
                set_type
            )));
        }

        if self.range.is_some() && !set_type.is_bitmap() {
            return Err(IpsetError::validation(format!(
                "'range' is only supported by bitmap sets, not {}",
                set_type
            )));
        }

        if self.size.is_some() && set_type != SetType::ListSet {
            return Err(IpsetError::validation(format!(
                "'size' is only supported by list:set, not {}",
                set_type
            )));
        }

        Ok(())
    }

    /// Build the create command; options appear in a fixed order
    pub fn to_command(&self, name: &str, set_type: SetType) -> IpsetCommand {
        let family = set_type
            .accepts_family()
            .then(|| self.family.unwrap_or_default());

        IpsetCommand::new("create")
            .arg(name)
            .arg(set_type.as_str())
            .opt("family", family)
            .opt("timeout", self.timeout)
            .opt("hashsize", self.hashsize)
            .opt("maxelem", self.maxelem)
            .opt("bucketsize", self.bucketsize)
            .opt("range", self.range.as_deref())
            .opt("size", self.size)
            .flag("comment", self.comment)
            .flag("counters", self.counters)
            .flag("skbinfo", self.skbinfo)
            .flag("nomatch", self.nomatch)
            .flag("forceadd", self.forceadd)
            .flag("wildcard", self.wildcard)
            .exist(self.ignore_if_exists)
    }
}

/// Per-entry attributes for `ipset add`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryOptions {
    pub timeout: Option<u64>,

    /// Entry comment; ipset rejects double quotes even when escaped
    pub comment: Option<String>,

    pub packets: Option<u64>,

    pub bytes: Option<u64>,

    /// e.g. 0x1111/0xff00ffff
    pub skbmark: Option<String>,

    /// e.g. 1:10
    pub skbprio: Option<String>,

    pub skbqueue: Option<u64>,
}

impl EntryOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(comment) = &self.comment {
            if comment.contains('"') {
                return Err(IpsetError::validation(
                    "ipset does not accept double quotes in comments",
                ));
            }
        }
        Ok(())
    }

    pub fn to_command(&self, set_name: &str, entry: &str, ignore_if_exists: bool) -> IpsetCommand {
        IpsetCommand::new("add")
            .arg(set_name)
            .arg(entry)
            .opt("timeout", self.timeout)
            .opt("comment", self.comment.as_deref())
            .opt("packets", self.packets)
            .opt("bytes", self.bytes)
            .opt("skbmark", self.skbmark.as_deref())
            .opt("skbprio", self.skbprio.as_deref())
            .opt("skbqueue", self.skbqueue)
            .exist(ignore_if_exists)
    }
}

/// Options for writing `ipset save` output to a file
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOptions {
    /// Gzip the file; implied by a `.gz` path
    pub gzip: bool,

    /// Gzip level, 0-9
    pub compression_level: u32,

    /// Replace an existing file
    pub overwrite: bool,
}

impl SaveOptions {
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(IpsetError::validation(format!(
                "Invalid compression level {} (expected 0-9)",
                self.compression_level
            )));
        }
        Ok(())
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            gzip: false,
            compression_level: 9,
            overwrite: false,
        }
    }
}

/// Options for `ipset restore`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreOptions {
    /// Drop `create` lines from the dump
    pub skip_create_sets: bool,

    /// Drop `add` lines from the dump
    pub skip_add_entries: bool,

    /// Pass `-exist` so existing sets and entries are not errors
    pub ignore_if_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_accepts_its_own_features() {
        for set_type in SetType::ALL {
            let features = set_type.features();
            let opts = CreateOptions {
                counters: features.contains(&Feature::Counters),
                comment: features.contains(&Feature::Comment),
                skbinfo: features.contains(&Feature::Skbinfo),
                forceadd: features.contains(&Feature::Forceadd),
                nomatch: features.contains(&Feature::Nomatch),
                wildcard: features.contains(&Feature::Wildcard),
                bucketsize: features.contains(&Feature::Bucketsize).then_some(12),
                ..Default::default()
            };
            assert!(opts.validate(set_type).is_ok(), "{} rejected its features", set_type);
        }
    }

    #[test]
    fn test_foreign_features_rejected() {
        let nomatch = CreateOptions {
            nomatch: true,
            ..Default::default()
        };
        assert!(nomatch.validate(SetType::HashNet).is_ok());
        assert!(matches!(
            nomatch.validate(SetType::HashIp),
            Err(IpsetError::Validation(_))
        ));

        let counters = CreateOptions {
            counters: true,
            ..Default::default()
        };
        assert!(counters.validate(SetType::HashMac).is_err());
        assert!(counters.validate(SetType::BitmapPort).is_ok());
    }

    #[test]
    fn test_type_specific_options() {
        let hashsize = CreateOptions {
            hashsize: Some(1024),
            ..Default::default()
        };
        assert!(hashsize.validate(SetType::BitmapIp).is_err());

        let range = CreateOptions {
            range: Some("192.168.0.0/16".into()),
            ..Default::default()
        };
        assert!(range.validate(SetType::BitmapIp).is_ok());
        assert!(range.validate(SetType::HashIp).is_err());

        let family = CreateOptions {
            family: Some(Family::Inet6),
            ..Default::default()
        };
        assert!(family.validate(SetType::HashMac).is_err());
        assert!(family.validate(SetType::HashNetPort).is_ok());
    }

    #[test]
    fn test_create_command_order() {
        let opts = CreateOptions {
            timeout: Some(600),
            hashsize: Some(1024),
            maxelem: Some(65536),
            comment: true,
            counters: true,
            ignore_if_exists: true,
            ..Default::default()
        };

        assert_eq!(
            opts.to_command("blocklist", SetType::HashIp).args(),
            &[
                "create", "blocklist", "hash:ip", "family", "inet", "timeout", "600",
                "hashsize", "1024", "maxelem", "65536", "comment", "counters", "-exist",
            ]
        );

        let bitmap = CreateOptions {
            range: Some("10.0.0.0/24".into()),
            ..Default::default()
        };
        assert_eq!(
            bitmap.to_command("ports", SetType::BitmapIp).args(),
            &["create", "ports", "bitmap:ip", "range", "10.0.0.0/24"]
        );
    }

    #[test]
    fn test_add_command() {
        let opts = EntryOptions {
            timeout: Some(300),
            comment: Some("office printer".into()),
            skbmark: Some("0x1111/0xff00ffff".into()),
            ..Default::default()
        };

        assert_eq!(
            opts.to_command("blocklist", "192.168.1.1", false).args(),
            &[
                "add", "blocklist", "192.168.1.1", "timeout", "300", "comment",
                "office printer", "skbmark", "0x1111/0xff00ffff",
            ]
        );
    }

    #[test]
    fn test_comment_quotes_rejected() {
        let opts = EntryOptions {
            comment: Some("say \"hi\"".into()),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }
}
