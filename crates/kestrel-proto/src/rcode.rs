//! DNS response codes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// DNS response code.
///
/// The header carries only the low four bits; codes above 15 need an
/// OPT record, which contributes bits 4..11 (RFC 6891). The TSIG error
/// codes of RFC 2845 live in the extended range as well.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum Rcode {
    /// No error condition - RFC 1035
    NoError = 0,

    /// The server was unable to interpret the query - RFC 1035
    FormErr = 1,

    /// The server failed while processing - RFC 1035
    ServFail = 2,

    /// The queried name does not exist - RFC 1035
    NXDomain = 3,

    /// The requested kind of query is not supported - RFC 1035
    NotImp = 4,

    /// The server refuses for policy reasons - RFC 1035
    Refused = 5,

    /// A name exists that should not (dynamic update) - RFC 2136
    YXDomain = 6,

    /// An RRset exists that should not (dynamic update) - RFC 2136
    YXRRSet = 7,

    /// An RRset that should exist does not (dynamic update) - RFC 2136
    NXRRSet = 8,

    /// Server not authoritative, or request not authorized - RFC 2136, RFC 2845
    NotAuth = 9,

    /// A name is not within the zone - RFC 2136
    NotZone = 10,

    /// Bad OPT version, or TSIG signature failure - RFC 6891, RFC 2845
    ///
    /// The two meanings share code 16 and are distinguished by context.
    BadVers = 16,

    /// TSIG key not recognized - RFC 2845
    BadKey = 17,

    /// TSIG signature outside the time window - RFC 2845
    BadTime = 18,

    /// Bad TKEY mode - RFC 2930
    BadMode = 19,

    /// Duplicate key name - RFC 2930
    BadName = 20,

    /// Algorithm not supported - RFC 2930
    BadAlg = 21,

    /// TSIG MAC too short - RFC 4635
    BadTrunc = 22,
}

impl Rcode {
    /// TSIG signature failure (RFC 2845). Shares code 16 with BadVers.
    pub const BADSIG: Self = Self::BadVers;

    /// Returns the full 12-bit numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Returns the low four bits carried in the header.
    #[inline]
    pub const fn header_bits(self) -> u8 {
        (self as u16 & 0x0F) as u8
    }

    /// Returns the high eight bits carried in the OPT record.
    #[inline]
    pub const fn extended_bits(self) -> u8 {
        ((self as u16) >> 4) as u8
    }

    /// Recombines the header bits with the OPT extended bits.
    #[inline]
    pub fn from_parts(header_bits: u8, extended_bits: u8) -> Option<Self> {
        Self::try_from(u16::from(extended_bits) << 4 | u16::from(header_bits & 0x0F)).ok()
    }

    /// Creates a response code from its four header bits alone.
    #[inline]
    pub fn from_header(value: u8) -> Option<Self> {
        Self::try_from(u16::from(value & 0x0F)).ok()
    }

    /// Returns true for codes that only fit with an OPT record present.
    #[inline]
    pub const fn is_extended(self) -> bool {
        (self as u16) > 15
    }

    /// Returns the registry name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NXDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YXDomain => "YXDOMAIN",
            Self::YXRRSet => "YXRRSET",
            Self::NXRRSet => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
            Self::BadVers => "BADVERS",
            Self::BadKey => "BADKEY",
            Self::BadTime => "BADTIME",
            Self::BadMode => "BADMODE",
            Self::BadName => "BADNAME",
            Self::BadAlg => "BADALG",
            Self::BadTrunc => "BADTRUNC",
        }
    }
}

impl std::fmt::Display for Rcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for Rcode {
    fn default() -> Self {
        Self::NoError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rcode_values() {
        assert_eq!(Rcode::NoError.to_u16(), 0);
        assert_eq!(Rcode::NXDomain.to_u16(), 3);
        assert_eq!(Rcode::BadVers.to_u16(), 16);
        assert_eq!(Rcode::BADSIG.to_u16(), 16);
        assert_eq!(Rcode::BadTrunc.to_u16(), 22);
    }

    #[test]
    fn test_split_and_recombine() {
        assert_eq!(Rcode::BadKey.header_bits(), 1);
        assert_eq!(Rcode::BadKey.extended_bits(), 1);
        assert_eq!(Rcode::from_parts(1, 1), Some(Rcode::BadKey));
        assert_eq!(Rcode::from_parts(3, 0), Some(Rcode::NXDomain));

        assert!(Rcode::BadTime.is_extended());
        assert!(!Rcode::Refused.is_extended());
    }

    #[test]
    fn test_from_header_masks_high_bits() {
        assert_eq!(Rcode::from_header(0x13), Some(Rcode::NXDomain));
        assert_eq!(Rcode::from_header(12), None);
    }
}
