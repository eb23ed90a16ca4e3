//! Error types for wire format encoding and decoding.
//!
//! Decoding never panics on hostile input: every structural problem maps
//! to one of the variants here, and [`crate::Message::parse_lenient`]
//! additionally hands back whatever was decoded before the failure.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// DNS wire format errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer ended before the 12-octet header was complete.
    #[error("truncated header: got {actual} of 12 octets")]
    TruncatedHeader {
        /// Number of octets actually available.
        actual: usize,
    },

    /// Buffer ended inside a domain name.
    #[error("truncated name at offset {offset}")]
    TruncatedName {
        /// Offset at which the read ran out of data.
        offset: usize,
    },

    /// RDLENGTH extends beyond the end of the buffer.
    #[error("truncated rdata at offset {offset}: {rdlength} octets declared")]
    TruncatedRData {
        /// Offset of the RDATA payload.
        offset: usize,
        /// The declared RDLENGTH.
        rdlength: usize,
    },

    /// Buffer ended inside the fixed fields of a question or record.
    #[error("truncated section at offset {offset}: needed {needed} more octets")]
    TruncatedSection {
        /// Offset at which the read ran out of data.
        offset: usize,
        /// Octets still required.
        needed: usize,
    },

    /// A length octet used the reserved `01`/`10` label types.
    #[error("malformed name at offset {offset}: reserved label type 0x{label_type:02X}")]
    MalformedName {
        /// Offset of the offending length octet.
        offset: usize,
        /// The raw length octet.
        label_type: u8,
    },

    /// A compression pointer chain revisited an offset.
    #[error("unbounded name expansion: pointer loop through offset {offset}")]
    UnboundedNameExpansion {
        /// The offset that was visited twice.
        offset: usize,
    },

    /// Label exceeds the 63-octet maximum.
    #[error("label too long: {length} octets exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// Name exceeds the 255-octet encoded maximum.
    #[error("name too long: {length} octets exceeds maximum of 255")]
    NameTooLong {
        /// Actual encoded length.
        length: usize,
    },

    /// An unterminated or out-of-range escape in a presentation name.
    #[error("invalid escape sequence at position {position}")]
    InvalidEscape {
        /// Byte position in the input string.
        position: usize,
    },

    /// `reply()` called on a message that is already a response.
    #[error("cannot reply to a message with QR set")]
    ErroneousQr,

    /// A section key that no alias resolves.
    #[error("unknown section: {name:?}")]
    UnknownSection {
        /// The key as given.
        name: String,
    },

    /// Opcode value outside the assigned registry.
    #[error("invalid opcode: {value}")]
    InvalidOpcode {
        /// The raw opcode value.
        value: u8,
    },

    /// Response code value outside the assigned registry.
    #[error("invalid response code: {value}")]
    InvalidRcode {
        /// The raw rcode value.
        value: u16,
    },

    /// More than one OPT record in a message.
    #[error("multiple OPT records in message (only one allowed)")]
    MultipleOptRecords,

    /// OPT record with an EDNS version other than 0.
    #[error("unsupported EDNS version {version}")]
    UnsupportedEdnsVersion {
        /// The advertised version.
        version: u8,
    },
}

impl Error {
    /// Creates a `TruncatedSection` error.
    #[inline]
    pub fn truncated_section(offset: usize, needed: usize) -> Self {
        Self::TruncatedSection { offset, needed }
    }

    /// Returns true if the buffer ended inside a structural field.
    ///
    /// These are the errors surfaced alongside partial data by
    /// [`crate::Message::parse_lenient`].
    #[inline]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader { .. }
                | Self::TruncatedName { .. }
                | Self::TruncatedRData { .. }
                | Self::TruncatedSection { .. }
        )
    }

    /// Returns true for input that no conforming sender produces.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedName { .. }
                | Self::UnboundedNameExpansion { .. }
                | Self::LabelTooLong { .. }
                | Self::NameTooLong { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TruncatedHeader { actual: 7 };
        assert_eq!(err.to_string(), "truncated header: got 7 of 12 octets");

        let err = Error::MalformedName {
            offset: 14,
            label_type: 0x40,
        };
        assert_eq!(
            err.to_string(),
            "malformed name at offset 14: reserved label type 0x40"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::TruncatedName { offset: 3 }.is_truncation());
        assert!(Error::truncated_section(20, 4).is_truncation());
        assert!(!Error::ErroneousQr.is_truncation());

        assert!(Error::UnboundedNameExpansion { offset: 12 }.is_malformed());
        assert!(Error::LabelTooLong { length: 64 }.is_malformed());
        assert!(!Error::TruncatedHeader { actual: 0 }.is_malformed());
    }
}
