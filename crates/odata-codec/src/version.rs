//! Protocol dialects and JSON metadata verbosity.

use std::fmt;
use std::str::FromStr;

/// OData protocol versions understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ODataVersion {
    V2,
    V3,
    V4,
    V401,
}

impl ODataVersion {
    /// All dialects, oldest first.
    pub const ALL: [ODataVersion; 4] = [
        ODataVersion::V2,
        ODataVersion::V3,
        ODataVersion::V4,
        ODataVersion::V401,
    ];

    /// Returns the `OData-Version` header spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            ODataVersion::V2 => "2.0",
            ODataVersion::V3 => "3.0",
            ODataVersion::V4 => "4.0",
            ODataVersion::V401 => "4.01",
        }
    }

    /// True for 4.0 and 4.01.
    pub fn is_v4(&self) -> bool {
        *self >= ODataVersion::V4
    }
}

impl fmt::Display for ODataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ODataVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2.0" | "2" => Ok(ODataVersion::V2),
            "3.0" | "3" => Ok(ODataVersion::V3),
            "4.0" | "4" => Ok(ODataVersion::V4),
            "4.01" => Ok(ODataVersion::V401),
            other => Err(format!("unknown OData version: {other}")),
        }
    }
}

/// How much control information accompanies data in JSON payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MetadataLevel {
    None,
    #[default]
    Minimal,
    Full,
}

impl MetadataLevel {
    /// Returns the `odata.metadata` content-type parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataLevel::None => "none",
            MetadataLevel::Minimal => "minimal",
            MetadataLevel::Full => "full",
        }
    }
}

impl fmt::Display for MetadataLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "nometadata" => Ok(MetadataLevel::None),
            "minimal" | "minimalmetadata" => Ok(MetadataLevel::Minimal),
            "full" | "fullmetadata" => Ok(MetadataLevel::Full),
            other => Err(format!("unknown metadata level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(ODataVersion::V2 < ODataVersion::V3);
        assert!(ODataVersion::V4.is_v4());
        assert!(ODataVersion::V401.is_v4());
        assert!(!ODataVersion::V3.is_v4());
    }

    #[test]
    fn test_parse_header_spellings() {
        for version in ODataVersion::ALL {
            assert_eq!(version.as_str().parse::<ODataVersion>().unwrap(), version);
        }
        assert_eq!("FullMetadata".parse::<MetadataLevel>().unwrap(), MetadataLevel::Full);
        assert!("5.0".parse::<ODataVersion>().is_err());
    }

    #[test]
    fn test_metadata_levels_are_ordered() {
        assert!(MetadataLevel::None < MetadataLevel::Minimal);
        assert!(MetadataLevel::Minimal < MetadataLevel::Full);
    }
}
