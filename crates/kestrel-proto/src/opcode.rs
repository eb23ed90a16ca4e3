//! DNS operation codes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// DNS operation code (RFC 1035 Section 4.1.1 and the IANA registry).
///
/// The opcode selects how the four message sections are interpreted;
/// UPDATE in particular repurposes them per RFC 2136.
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
#[repr(u8)]
pub enum Opcode {
    /// Standard query - RFC 1035
    Query = 0,

    /// Inverse query - RFC 1035, obsoleted by RFC 3425
    IQuery = 1,

    /// Server status request - RFC 1035
    Status = 2,

    /// Zone change notification - RFC 1996
    Notify = 4,

    /// Dynamic update - RFC 2136
    Update = 5,
}

impl Opcode {
    /// Returns the numeric value.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Creates an opcode from its numeric value.
    ///
    /// Returns `None` for reserved values.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns the registry name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::IQuery => "IQUERY",
            Self::Status => "STATUS",
            Self::Notify => "NOTIFY",
            Self::Update => "UPDATE",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for Opcode {
    fn default() -> Self {
        Self::Query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::Query.to_u8(), 0);
        assert_eq!(Opcode::IQuery.to_u8(), 1);
        assert_eq!(Opcode::Status.to_u8(), 2);
        assert_eq!(Opcode::Notify.to_u8(), 4);
        assert_eq!(Opcode::Update.to_u8(), 5);
    }

    #[test]
    fn test_opcode_from_u8() {
        assert_eq!(Opcode::from_u8(5), Some(Opcode::Update));
        assert_eq!(Opcode::from_u8(3), None);
        assert_eq!(Opcode::from_u8(15), None);
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(Opcode::Query.to_string(), "QUERY");
        assert_eq!(Opcode::Update.to_string(), "UPDATE");
    }
}
