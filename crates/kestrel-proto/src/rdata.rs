//! Record data.
//!
//! The codec interprets exactly one RDATA body itself: PTR, whose
//! single name participates in message compression. OPT bodies are
//! handled by the EDNS layer, and every other type is carried as
//! opaque octets that round-trip unchanged (RFC 3597).

use crate::error::{Error, Result};
use crate::name::{expand_name, Name};
use crate::rtype::{RecordType, Rtype};
use crate::wire::MessageWriter;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed record data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RData {
    /// PTR: the pointed-to domain name (RFC 1035).
    Ptr(Name),

    /// Any other type, preserved as raw octets.
    Opaque(Opaque),
}

impl RData {
    /// Creates opaque RDATA from raw octets.
    #[inline]
    pub fn opaque(data: impl Into<Vec<u8>>) -> Self {
        Self::Opaque(Opaque::new(data))
    }

    /// Parses RDATA of the given type.
    ///
    /// `message` is the complete message buffer: compressible bodies
    /// contain pointers that may reference anything before them.
    /// `offset..offset + rdlength` has already been bounds-checked by
    /// the record parser.
    pub fn parse(rtype: Rtype, message: &[u8], offset: usize, rdlength: usize) -> Result<Self> {
        match rtype.as_known() {
            Some(RecordType::PTR) => {
                let (name, consumed) = expand_name(message, offset)?;
                if consumed > rdlength {
                    return Err(Error::TruncatedRData { offset, rdlength });
                }
                Ok(Self::Ptr(name))
            }
            _ => Ok(Self::opaque(&message[offset..offset + rdlength])),
        }
    }

    /// Returns the pointed-to name for PTR data.
    #[inline]
    pub fn as_ptr(&self) -> Option<&Name> {
        match self {
            Self::Ptr(name) => Some(name),
            Self::Opaque(_) => None,
        }
    }

    /// Returns the raw octets for opaque data.
    #[inline]
    pub fn as_opaque(&self) -> Option<&[u8]> {
        match self {
            Self::Ptr(_) => None,
            Self::Opaque(o) => Some(o.data()),
        }
    }

    /// Upper bound on the encoded length (compression only shrinks it).
    pub fn wire_len(&self) -> usize {
        match self {
            Self::Ptr(name) => name.wire_len(),
            Self::Opaque(o) => o.data().len(),
        }
    }

    /// Writes the RDATA, compressing names where the type allows it.
    pub fn write_to(&self, writer: &mut MessageWriter) {
        match self {
            Self::Ptr(name) => writer.write_name(name),
            Self::Opaque(o) => writer.write_bytes(o.data()),
        }
    }

    /// Compares RDATA in canonical form: names case-insensitively,
    /// octets exactly. Used by deduplication.
    pub fn canonical_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ptr(a), Self::Ptr(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a.data() == b.data(),
            _ => false,
        }
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ptr(name) => write!(f, "{name}"),
            Self::Opaque(o) => write!(f, "{o}"),
        }
    }
}

/// Raw RDATA octets for types without a dedicated decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opaque {
    data: Vec<u8>,
}

impl Opaque {
    /// Wraps raw octets.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the octets.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the length in octets.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if there are no octets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Opaque {
    /// RFC 3597 generic form: `\# <length> <hex>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\# {} {}", self.data.len(), HEXLOWER.encode(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ptr_parse_with_compression() {
        // Name at 0, PTR rdata at 13 pointing back into it.
        let message = [
            9, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0, //
            0xFF, 0xFF, // filler
            0xC0, 0x00,
        ];

        let rdata = RData::parse(Rtype::Known(RecordType::PTR), &message, 13, 2).unwrap();
        assert_eq!(rdata.as_ptr().unwrap().to_string(), "localhost.");
    }

    #[test]
    fn test_ptr_rdlength_mismatch() {
        let message = [9, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0];
        assert!(matches!(
            RData::parse(Rtype::Known(RecordType::PTR), &message, 0, 4),
            Err(Error::TruncatedRData { .. })
        ));
    }

    #[test]
    fn test_unknown_type_stays_opaque() {
        let message = [1, 2, 3, 4];
        let rdata = RData::parse(Rtype::Unknown(64000), &message, 0, 4).unwrap();
        assert_eq!(rdata.as_opaque(), Some(&[1, 2, 3, 4][..]));
        assert_eq!(rdata.to_string(), "\\# 4 01020304");
    }

    #[test]
    fn test_canonical_eq_ignores_name_case() {
        let a = RData::Ptr(Name::from_str("Host.Example.").unwrap());
        let b = RData::Ptr(Name::from_str("host.example.").unwrap());
        assert!(a.canonical_eq(&b));

        let c = RData::opaque(vec![1, 2]);
        assert!(!a.canonical_eq(&c));
    }
}
