//! DNS record classes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record class (RFC 1035 Section 3.2.4).
///
/// Aside from IN, the classes that still matter on the wire are the
/// RFC 2136 query classes NONE and ANY, which dynamic update and the
/// TSIG pseudo-record lean on.
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
pub enum RecordClass {
    /// Internet - RFC 1035
    IN = 1,

    /// CHAOS - RFC 1035
    CH = 3,

    /// Hesiod - RFC 1035
    HS = 4,

    /// Query class NONE - RFC 2136
    NONE = 254,

    /// Query class ANY - RFC 1035
    ANY = 255,
}

impl RecordClass {
    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Creates a class from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true for the classes only valid in queries and updates.
    #[inline]
    pub const fn is_query_class(self) -> bool {
        matches!(self, Self::NONE | Self::ANY)
    }

    /// Returns the registry name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IN => "IN",
            Self::CH => "CH",
            Self::HS => "HS",
            Self::NONE => "NONE",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for RecordClass {
    fn default() -> Self {
        Self::IN
    }
}

/// A class field value, known or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rclass {
    /// A class from the known registry.
    Known(RecordClass),
    /// Any other value.
    Unknown(u16),
}

impl Rclass {
    /// Creates a class from a u16 wire value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordClass::from_u16(value)
            .map(Self::Known)
            .unwrap_or(Self::Unknown(value))
    }

    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(c) => c.to_u16(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the registry class if known.
    #[inline]
    pub const fn as_known(self) -> Option<RecordClass> {
        match self {
            Self::Known(c) => Some(c),
            Self::Unknown(_) => None,
        }
    }

    /// Returns true if this is the given known class.
    #[inline]
    pub fn is(self, rclass: RecordClass) -> bool {
        matches!(self, Self::Known(c) if c as u16 == rclass as u16)
    }
}

impl From<RecordClass> for Rclass {
    fn from(c: RecordClass) -> Self {
        Self::Known(c)
    }
}

impl From<u16> for Rclass {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl fmt::Display for Rclass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(c) => write!(f, "{c}"),
            Self::Unknown(v) => write!(f, "CLASS{v}"),
        }
    }
}

impl Default for Rclass {
    fn default() -> Self {
        Self::Known(RecordClass::IN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_values() {
        assert_eq!(RecordClass::IN.to_u16(), 1);
        assert_eq!(RecordClass::CH.to_u16(), 3);
        assert_eq!(RecordClass::NONE.to_u16(), 254);
        assert_eq!(RecordClass::ANY.to_u16(), 255);
    }

    #[test]
    fn test_query_classes() {
        assert!(RecordClass::ANY.is_query_class());
        assert!(RecordClass::NONE.is_query_class());
        assert!(!RecordClass::IN.is_query_class());
    }

    #[test]
    fn test_unknown_roundtrip() {
        let c = Rclass::from_u16(2);
        assert_eq!(c.as_known(), None);
        assert_eq!(c.to_string(), "CLASS2");

        let c = Rclass::from_u16(3);
        assert!(c.is(RecordClass::CH));
        assert_eq!(c.to_string(), "CH");
    }
}
