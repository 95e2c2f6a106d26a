//! Set types (matching schemes) and the create options each one accepts

use crate::error::IpsetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage method and datatype of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SetType {
    BitmapIp,
    BitmapIpMac,
    BitmapPort,
    HashIp,
    HashIpMac,
    HashIpMark,
    HashIpPort,
    HashIpPortIp,
    HashIpPortNet,
    HashMac,
    HashNet,
    HashNetIface,
    HashNetNet,
    HashNetPort,
    HashNetPortNet,
    ListSet,
}

/// Optional create-time features whose availability depends on the set type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Counters,
    Comment,
    Skbinfo,
    Forceadd,
    Nomatch,
    Wildcard,
    Bucketsize,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Counters => "counters",
            Feature::Comment => "comment",
            Feature::Skbinfo => "skbinfo",
            Feature::Forceadd => "forceadd",
            Feature::Nomatch => "nomatch",
            Feature::Wildcard => "wildcard",
            Feature::Bucketsize => "bucketsize",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use Feature::*;

const EXTENSIONS: &[Feature] = &[Counters, Comment, Skbinfo];
const HASH_BASIC: &[Feature] = &[Counters, Comment, Forceadd, Skbinfo, Bucketsize];
const HASH_NET: &[Feature] = &[Nomatch, Counters, Comment, Forceadd, Skbinfo, Bucketsize];
const HASH_NET_IFACE: &[Feature] = &[
    Nomatch, Counters, Comment, Forceadd, Skbinfo, Bucketsize, Wildcard,
];
const HASH_PLAIN: &[Feature] = &[Forceadd, Skbinfo, Bucketsize];
const HASH_MAC_LIKE: &[Feature] = &[Bucketsize];

impl SetType {
    pub const ALL: [SetType; 16] = [
        SetType::BitmapIp,
        SetType::BitmapIpMac,
        SetType::BitmapPort,
        SetType::HashIp,
        SetType::HashIpMac,
        SetType::HashIpMark,
        SetType::HashIpPort,
        SetType::HashIpPortIp,
        SetType::HashIpPortNet,
        SetType::HashMac,
        SetType::HashNet,
        SetType::HashNetIface,
        SetType::HashNetNet,
        SetType::HashNetPort,
        SetType::HashNetPortNet,
        SetType::ListSet,
    ];

    /// Name as understood by the ipset tool
    pub fn as_str(self) -> &'static str {
        match self {
            SetType::BitmapIp => "bitmap:ip",
            SetType::BitmapIpMac => "bitmap:ip,mac",
            SetType::BitmapPort => "bitmap:port",
            SetType::HashIp => "hash:ip",
            SetType::HashIpMac => "hash:ip,mac",
            SetType::HashIpMark => "hash:ip,mark",
            SetType::HashIpPort => "hash:ip,port",
            SetType::HashIpPortIp => "hash:ip,port,ip",
            SetType::HashIpPortNet => "hash:ip,port,net",
            SetType::HashMac => "hash:mac",
            SetType::HashNet => "hash:net",
            SetType::HashNetIface => "hash:net,iface",
            SetType::HashNetNet => "hash:net,net",
            SetType::HashNetPort => "hash:net,port",
            SetType::HashNetPortNet => "hash:net,port,net",
            SetType::ListSet => "list:set",
        }
    }

    /// Features that may be enabled when creating a set of this type
    pub fn features(self) -> &'static [Feature] {
        match self {
            SetType::BitmapIp | SetType::BitmapIpMac | SetType::BitmapPort => EXTENSIONS,
            SetType::ListSet => EXTENSIONS,
            SetType::HashIp | SetType::HashIpPort | SetType::HashIpPortIp => HASH_BASIC,
            SetType::HashIpMac | SetType::HashMac => HASH_MAC_LIKE,
            SetType::HashIpMark | SetType::HashNetNet | SetType::HashNetPortNet => HASH_PLAIN,
            SetType::HashIpPortNet | SetType::HashNet | SetType::HashNetPort => HASH_NET,
            SetType::HashNetIface => HASH_NET_IFACE,
        }
    }

    pub fn supports(self, feature: Feature) -> bool {
        self.features().contains(&feature)
    }

    pub fn is_hash(self) -> bool {
        self.as_str().starts_with("hash:")
    }

    pub fn is_bitmap(self) -> bool {
        self.as_str().starts_with("bitmap:")
    }

    /// hash:mac stores no addresses, so it has no family
    pub fn accepts_family(self) -> bool {
        self.is_hash() && self != SetType::HashMac
    }
}

impl fmt::Display for SetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetType {
    type Err = IpsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = SetType::ALL.iter().map(|t| t.as_str()).collect();
                IpsetError::validation(format!(
                    "Invalid set type ({}). Valid values are: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

impl TryFrom<String> for SetType {
    type Error = IpsetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SetType> for String {
    fn from(value: SetType) -> Self {
        value.as_str().to_string()
    }
}

/// Protocol family of a hash set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[default]
    Inet,
    Inet6,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Inet => "inet",
            Family::Inet6 => "inet6",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = IpsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inet" => Ok(Family::Inet),
            "inet6" => Ok(Family::Inet6),
            other => Err(IpsetError::validation(format!(
                "Invalid family ({}). Valid family values are 'inet' or 'inet6'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for set_type in SetType::ALL {
            assert_eq!(set_type.as_str().parse::<SetType>().unwrap(), set_type);
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = "hash:foo".parse::<SetType>().unwrap_err();
        assert!(matches!(err, IpsetError::Validation(_)));
        assert!(err.to_string().contains("hash:net,port,net"));
    }

    #[test]
    fn test_nomatch_only_on_net_types() {
        let with_nomatch: Vec<SetType> = SetType::ALL
            .into_iter()
            .filter(|t| t.supports(Feature::Nomatch))
            .collect();

        assert_eq!(
            with_nomatch,
            vec![
                SetType::HashIpPortNet,
                SetType::HashNet,
                SetType::HashNetIface,
                SetType::HashNetPort,
            ]
        );
    }

    #[test]
    fn test_wildcard_only_on_net_iface() {
        for set_type in SetType::ALL {
            assert_eq!(
                set_type.supports(Feature::Wildcard),
                set_type == SetType::HashNetIface
            );
        }
    }

    #[test]
    fn test_family() {
        assert_eq!("inet6".parse::<Family>().unwrap(), Family::Inet6);
        assert!("ipv4".parse::<Family>().is_err());
        assert!(SetType::HashNet.accepts_family());
        assert!(!SetType::HashMac.accepts_family());
        assert!(!SetType::BitmapIp.accepts_family());
    }
}
