//! EDNS(0) support (RFC 6891).
//!
//! The OPT pseudo-record overloads its fixed RR fields: the owner is
//! the root, CLASS carries the requester's UDP payload size, and TTL is
//! repurposed as extended-rcode (8) | version (8) | flags (16) with the
//! DO bit at the top of the flags. The RDATA is a concatenation of
//! `(option-code u16, option-length u16, option-data)` triples.
//!
//! A message holds at most one OPT. The codec strips it out of the
//! additional section into an [`Edns`] view on decode, and splices it
//! back at the head of the section on encode.

use crate::error::{Error, Result};
use crate::rdata::RData;
use crate::record::ResourceRecord;
use crate::rtype::RecordType;
use crate::wire::MessageWriter;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// The EDNS view of a message's OPT record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edns {
    /// EDNS version; only 0 exists.
    version: u8,
    /// Advertised UDP payload size.
    udp_size: u16,
    /// Upper eight bits of the 12-bit response code.
    extended_rcode: u8,
    /// DNSSEC OK flag.
    dnssec_ok: bool,
    /// Options in wire order.
    options: SmallVec<[EdnsOption; 2]>,
}

/// One EDNS option, carried as an opaque `(code, data)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdnsOption {
    /// The option code.
    pub code: u16,
    /// The option payload.
    pub data: Vec<u8>,
}

impl Edns {
    /// Default advertised UDP payload size.
    pub const DEFAULT_UDP_SIZE: u16 = 4096;

    /// Creates an EDNS view with default settings.
    pub fn new() -> Self {
        Self::with_udp_size(Self::DEFAULT_UDP_SIZE)
    }

    /// Creates an EDNS view advertising the given payload size.
    pub fn with_udp_size(udp_size: u16) -> Self {
        Self {
            version: 0,
            udp_size,
            extended_rcode: 0,
            dnssec_ok: false,
            options: SmallVec::new(),
        }
    }

    /// Returns the EDNS version.
    #[inline]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Returns the advertised UDP payload size.
    #[inline]
    pub const fn udp_size(&self) -> u16 {
        self.udp_size
    }

    /// Sets the advertised UDP payload size.
    #[inline]
    pub fn set_udp_size(&mut self, size: u16) {
        self.udp_size = size;
    }

    /// Returns the upper eight rcode bits.
    #[inline]
    pub const fn extended_rcode(&self) -> u8 {
        self.extended_rcode
    }

    /// Sets the upper eight rcode bits.
    #[inline]
    pub fn set_extended_rcode(&mut self, bits: u8) {
        self.extended_rcode = bits;
    }

    /// Returns the DO flag.
    #[inline]
    pub const fn dnssec_ok(&self) -> bool {
        self.dnssec_ok
    }

    /// Sets the DO flag.
    #[inline]
    pub fn set_dnssec_ok(&mut self, ok: bool) {
        self.dnssec_ok = ok;
    }

    /// Returns the options in wire order.
    #[inline]
    pub fn options(&self) -> &[EdnsOption] {
        &self.options
    }

    /// Appends an option.
    pub fn add_option(&mut self, code: u16, data: impl Into<Vec<u8>>) {
        self.options.push(EdnsOption {
            code,
            data: data.into(),
        });
    }

    /// Returns the payload of the first option with the given code.
    pub fn option(&self, code: u16) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.data.as_slice())
    }

    /// Builds the view from an OPT record's overloaded fields.
    pub fn parse(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self> {
        let extended_rcode = (ttl >> 24) as u8;
        let version = ((ttl >> 16) & 0xFF) as u8;
        let dnssec_ok = ttl & 0x8000 != 0;

        if version != 0 {
            return Err(Error::UnsupportedEdnsVersion { version });
        }

        let mut options = SmallVec::new();
        let mut offset = 0;
        while offset < rdata.len() {
            if offset + 4 > rdata.len() {
                return Err(Error::truncated_section(offset, offset + 4 - rdata.len()));
            }
            let code = u16::from_be_bytes([rdata[offset], rdata[offset + 1]]);
            let length = u16::from_be_bytes([rdata[offset + 2], rdata[offset + 3]]) as usize;
            if offset + 4 + length > rdata.len() {
                return Err(Error::truncated_section(
                    offset + 4,
                    offset + 4 + length - rdata.len(),
                ));
            }
            options.push(EdnsOption {
                code,
                data: rdata[offset + 4..offset + 4 + length].to_vec(),
            });
            offset += 4 + length;
        }

        Ok(Self {
            version,
            udp_size: class,
            extended_rcode,
            dnssec_ok,
            options,
        })
    }

    /// Builds the view from a decoded OPT resource record.
    pub fn from_record(record: &ResourceRecord) -> Result<Self> {
        debug_assert!(record.rtype().is(RecordType::OPT));
        let rdata = match record.rdata() {
            RData::Opaque(o) => o.data(),
            RData::Ptr(_) => &[],
        };
        Self::parse(record.rclass().to_u16(), record.ttl(), rdata)
    }

    /// Length of the OPT RDATA alone.
    pub fn rdata_len(&self) -> usize {
        self.options.iter().map(|o| 4 + o.data.len()).sum()
    }

    /// Length of the whole pseudo-record on the wire.
    pub fn wire_len(&self) -> usize {
        // root (1) + TYPE (2) + CLASS (2) + TTL (4) + RDLENGTH (2)
        11 + self.rdata_len()
    }

    /// Writes the OPT pseudo-record.
    pub fn write_to(&self, writer: &mut MessageWriter) {
        writer.write_u8(0); // root owner
        writer.write_u16(RecordType::OPT.to_u16());
        writer.write_u16(self.udp_size);

        let flags: u32 = if self.dnssec_ok { 0x8000 } else { 0 };
        let ttl = u32::from(self.extended_rcode) << 24 | u32::from(self.version) << 16 | flags;
        writer.write_u32(ttl);

        writer.write_u16(self.rdata_len() as u16);
        for option in &self.options {
            writer.write_u16(option.code);
            writer.write_u16(option.data.len() as u16);
            writer.write_bytes(&option.data);
        }
    }
}

impl Default for Edns {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Edns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EDNS: version: {}, flags:{}; udp: {}",
            self.version,
            if self.dnssec_ok { " do" } else { "" },
            self.udp_size
        )?;
        for option in &self.options {
            write!(f, "; OPT={}: {} octets", option.code, option.data.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let edns = Edns::new();
        assert_eq!(edns.version(), 0);
        assert_eq!(edns.udp_size(), 4096);
        assert!(!edns.dnssec_ok());
        assert_eq!(edns.rdata_len(), 0);
    }

    #[test]
    fn test_wire_shape() {
        let mut edns = Edns::with_udp_size(1232);
        edns.set_dnssec_ok(true);

        let mut w = MessageWriter::with_capacity(16);
        edns.write_to(&mut w);

        assert_eq!(
            w.as_bytes(),
            &[
                0, // root
                0x00, 0x29, // OPT
                0x04, 0xD0, // udp size 1232
                0x00, 0x00, 0x80, 0x00, // ttl: DO set
                0x00, 0x00, // rdlength
            ]
        );
        assert_eq!(w.len(), edns.wire_len());
    }

    #[test]
    fn test_roundtrip_with_options() {
        let mut edns = Edns::new();
        edns.set_extended_rcode(1);
        edns.add_option(10, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let mut w = MessageWriter::with_capacity(32);
        edns.write_to(&mut w);
        let wire = w.finish();

        let class = u16::from_be_bytes([wire[3], wire[4]]);
        let ttl = u32::from_be_bytes([wire[5], wire[6], wire[7], wire[8]]);
        let rdlength = u16::from_be_bytes([wire[9], wire[10]]) as usize;
        let parsed = Edns::parse(class, ttl, &wire[11..11 + rdlength]).unwrap();

        assert_eq!(parsed, edns);
        assert_eq!(parsed.option(10), Some(&[1, 2, 3, 4, 5, 6, 7, 8][..]));
        assert_eq!(parsed.option(3), None);
    }

    #[test]
    fn test_nonzero_version_rejected() {
        assert!(matches!(
            Edns::parse(512, 1 << 16, &[]),
            Err(Error::UnsupportedEdnsVersion { version: 1 })
        ));
    }

    #[test]
    fn test_truncated_option() {
        // Option header declares 4 octets but only 2 follow.
        let rdata = [0x00, 0x0A, 0x00, 0x04, 0xAA, 0xBB];
        assert!(matches!(
            Edns::parse(512, 0, &rdata),
            Err(Error::TruncatedSection { .. })
        ));
    }
}
