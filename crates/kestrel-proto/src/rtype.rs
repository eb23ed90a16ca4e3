//! DNS record types.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record types this library knows by name.
///
/// The codec only interprets PTR and OPT bodies; everything else moves
/// through as opaque RDATA. Knowing the type still matters for display,
/// for the RFC 1035 compression rules, and for locating the signature
/// pseudo-records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum RecordType {
    /// IPv4 address - RFC 1035
    A = 1,

    /// Authoritative name server - RFC 1035
    NS = 2,

    /// Canonical name - RFC 1035
    CNAME = 5,

    /// Start of authority - RFC 1035
    SOA = 6,

    /// Null record - RFC 1035
    NULL = 10,

    /// Domain name pointer - RFC 1035
    PTR = 12,

    /// Host information - RFC 1035
    HINFO = 13,

    /// Mail exchange - RFC 1035
    MX = 15,

    /// Text strings - RFC 1035
    TXT = 16,

    /// Signature - RFC 2535, used by SIG(0) per RFC 2931
    SIG = 24,

    /// Public key - RFC 2535, used by SIG(0) per RFC 2931
    KEY = 25,

    /// IPv6 address - RFC 3596
    AAAA = 28,

    /// Server selection - RFC 2782
    SRV = 33,

    /// EDNS(0) pseudo-record - RFC 6891
    OPT = 41,

    /// Transaction key - RFC 2930
    TKEY = 249,

    /// Transaction signature - RFC 2845
    TSIG = 250,

    /// Incremental zone transfer - RFC 1995
    IXFR = 251,

    /// Full zone transfer - RFC 5936
    AXFR = 252,

    /// Any record type - RFC 1035
    ANY = 255,
}

impl RecordType {
    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Creates a record type from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true for the RFC 1035 types whose RDATA names may be
    /// compressed against the message.
    ///
    /// Names in types defined after RFC 1035 must go out uncompressed
    /// (RFC 3597 Section 4).
    #[inline]
    pub const fn is_compressible(self) -> bool {
        matches!(
            self,
            Self::CNAME | Self::MX | Self::NS | Self::PTR | Self::SOA
        )
    }

    /// Returns true for pseudo-record types that never enter a zone.
    #[inline]
    pub const fn is_pseudo_record(self) -> bool {
        matches!(self, Self::OPT | Self::TSIG | Self::TKEY)
    }

    /// Returns the registry name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::NULL => "NULL",
            Self::PTR => "PTR",
            Self::HINFO => "HINFO",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::SIG => "SIG",
            Self::KEY => "KEY",
            Self::AAAA => "AAAA",
            Self::SRV => "SRV",
            Self::OPT => "OPT",
            Self::TKEY => "TKEY",
            Self::TSIG => "TSIG",
            Self::IXFR => "IXFR",
            Self::AXFR => "AXFR",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for RecordType {
    fn default() -> Self {
        Self::A
    }
}

/// A type field value, known or not.
///
/// Unknown values round-trip unchanged and render in the RFC 3597
/// `TYPE####` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rtype {
    /// A type from the known registry.
    Known(RecordType),
    /// Any other value.
    Unknown(u16),
}

impl Rtype {
    /// Creates a type from a u16 wire value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordType::from_u16(value)
            .map(Self::Known)
            .unwrap_or(Self::Unknown(value))
    }

    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(t) => t.to_u16(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the registry type if known.
    #[inline]
    pub const fn as_known(self) -> Option<RecordType> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown(_) => None,
        }
    }

    /// Returns true if this is the given known type.
    #[inline]
    pub fn is(self, rtype: RecordType) -> bool {
        matches!(self, Self::Known(t) if t as u16 == rtype as u16)
    }
}

impl From<RecordType> for Rtype {
    fn from(t: RecordType) -> Self {
        Self::Known(t)
    }
}

impl From<u16> for Rtype {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(t) => write!(f, "{t}"),
            Self::Unknown(v) => write!(f, "TYPE{v}"),
        }
    }
}

impl Default for Rtype {
    fn default() -> Self {
        Self::Known(RecordType::A)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtype_values() {
        assert_eq!(RecordType::A.to_u16(), 1);
        assert_eq!(RecordType::PTR.to_u16(), 12);
        assert_eq!(RecordType::OPT.to_u16(), 41);
        assert_eq!(RecordType::TSIG.to_u16(), 250);
    }

    #[test]
    fn test_compressible_set() {
        for t in [
            RecordType::CNAME,
            RecordType::MX,
            RecordType::NS,
            RecordType::PTR,
            RecordType::SOA,
        ] {
            assert!(t.is_compressible());
        }
        assert!(!RecordType::AAAA.is_compressible());
        assert!(!RecordType::SRV.is_compressible());
    }

    #[test]
    fn test_unknown_roundtrip() {
        let t = Rtype::from_u16(64);
        assert_eq!(t.as_known(), None);
        assert_eq!(t.to_u16(), 64);
        assert_eq!(t.to_string(), "TYPE64");

        let t = Rtype::from_u16(12);
        assert!(t.is(RecordType::PTR));
        assert_eq!(t.to_string(), "PTR");
    }
}
