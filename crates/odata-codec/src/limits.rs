//! Hard limits applied while encoding and decoding.
//!
//! Payloads come from untrusted peers; recursion over nested complex
//! values, inline expansions and geospatial collections is bounded here.

/// Maximum nesting of objects/elements accepted by the deserializers.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Maximum expansion depth for `$levels=max` when entities carry no id
/// and the visited-set guard cannot recognize a revisit.
pub const MAX_EXPAND_DEPTH: usize = 32;

/// Default SRID for geography values (WGS 84).
pub const DEFAULT_GEOGRAPHY_SRID: u32 = 4326;

/// Default SRID for geometry values.
pub const DEFAULT_GEOMETRY_SRID: u32 = 0;
