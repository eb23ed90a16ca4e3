//! Resource records: the generic RR envelope.
//!
//! ```text
//!                                 1  1  1  1  1  1
//!   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! /                      NAME                     /
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      TYPE                     |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                     CLASS                     |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      TTL                      |
//! |                                               |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                   RDLENGTH                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! /                     RDATA                     /
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rclass::{Rclass, RecordClass};
use crate::rdata::RData;
use crate::rtype::{RecordType, Rtype};
use crate::wire::MessageWriter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// The owner name.
    name: Name,
    /// The record type.
    rtype: Rtype,
    /// The record class.
    rclass: Rclass,
    /// Time to live in seconds.
    ttl: u32,
    /// The record data.
    rdata: RData,
}

impl ResourceRecord {
    /// Creates a record from its parts.
    pub fn new(name: Name, rtype: Rtype, rclass: Rclass, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    /// Creates a PTR/IN record.
    pub fn ptr(name: Name, ttl: u32, target: Name) -> Self {
        Self::new(
            name,
            Rtype::Known(RecordType::PTR),
            Rclass::Known(RecordClass::IN),
            ttl,
            RData::Ptr(target),
        )
    }

    /// Creates an A/IN record; the address travels as opaque RDATA.
    pub fn a(name: Name, ttl: u32, addr: std::net::Ipv4Addr) -> Self {
        Self::new(
            name,
            Rtype::Known(RecordType::A),
            Rclass::Known(RecordClass::IN),
            ttl,
            RData::opaque(addr.octets().to_vec()),
        )
    }

    /// Creates a record of any type with opaque RDATA.
    pub fn opaque(name: Name, rtype: Rtype, rclass: Rclass, ttl: u32, data: Vec<u8>) -> Self {
        Self::new(name, rtype, rclass, ttl, RData::opaque(data))
    }

    /// Returns the owner name.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the record type.
    #[inline]
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    /// Returns the record class.
    #[inline]
    pub fn rclass(&self) -> Rclass {
        self.rclass
    }

    /// Replaces the record class.
    ///
    /// UPDATE messages coerce pushed records to the zone class; see
    /// [`crate::Message::push`].
    #[inline]
    pub fn set_rclass(&mut self, rclass: Rclass) {
        self.rclass = rclass;
    }

    /// Returns the TTL in seconds.
    #[inline]
    pub const fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns the record data.
    #[inline]
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    /// Returns true if both records belong to the same RRset:
    /// same owner (case-insensitive), type, and class.
    ///
    /// RFC 2181 Section 5 makes RRsets the unit of truncation.
    pub fn same_rrset(&self, other: &Self) -> bool {
        self.rtype == other.rtype && self.rclass == other.rclass && self.name == other.name
    }

    /// Returns true if the records are duplicates under the canonical
    /// key: owner lowercased, type, class, TTL normalised to zero, and
    /// canonical RDATA.
    pub fn canonical_eq(&self, other: &Self) -> bool {
        self.same_rrset(other) && self.rdata.canonical_eq(&other.rdata)
    }

    /// Parses a record at `offset`, returning it and the octets consumed.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, name_len) = NameParser::new(data).parse_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 10 > data.len() {
            return Err(Error::truncated_section(fixed, fixed + 10 - data.len()));
        }

        let rtype = Rtype::from_u16(u16::from_be_bytes([data[fixed], data[fixed + 1]]));
        let rclass = Rclass::from_u16(u16::from_be_bytes([data[fixed + 2], data[fixed + 3]]));
        let ttl = u32::from_be_bytes([
            data[fixed + 4],
            data[fixed + 5],
            data[fixed + 6],
            data[fixed + 7],
        ]);
        let rdlength = u16::from_be_bytes([data[fixed + 8], data[fixed + 9]]) as usize;

        let rdata_start = fixed + 10;
        if rdata_start + rdlength > data.len() {
            return Err(Error::TruncatedRData {
                offset: rdata_start,
                rdlength,
            });
        }

        let rdata = RData::parse(rtype, data, rdata_start, rdlength)?;

        Ok((
            Self {
                name,
                rtype,
                rclass,
                ttl,
                rdata,
            },
            name_len + 10 + rdlength,
        ))
    }

    /// Skips a record in raw wire form, returning the octets consumed.
    ///
    /// Used when the surrounding bytes must be preserved verbatim, as
    /// in signature computations.
    pub fn skip(data: &[u8], offset: usize) -> Result<usize> {
        let name_len = NameParser::new(data).skip_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 10 > data.len() {
            return Err(Error::truncated_section(fixed, fixed + 10 - data.len()));
        }

        let rdlength = u16::from_be_bytes([data[fixed + 8], data[fixed + 9]]) as usize;
        if fixed + 10 + rdlength > data.len() {
            return Err(Error::TruncatedRData {
                offset: fixed + 10,
                rdlength,
            });
        }

        Ok(name_len + 10 + rdlength)
    }

    /// Upper bound on the encoded length (compression only shrinks it).
    pub fn wire_len(&self) -> usize {
        self.name.wire_len() + 10 + self.rdata.wire_len()
    }

    /// Writes the record, compressing the owner name and, for the
    /// RFC 1035 compressible types, names inside the RDATA.
    ///
    /// RDLENGTH is reserved before the RDATA writer runs and
    /// back-patched afterwards, since compression changes the length.
    pub fn write_to(&self, writer: &mut MessageWriter) {
        writer.write_name(&self.name);
        writer.write_u16(self.rtype.to_u16());
        writer.write_u16(self.rclass.to_u16());
        writer.write_u32(self.ttl);

        let rdlength_at = writer.reserve_u16();
        self.rdata.write_to(writer);
        let rdlength = writer.len() - rdlength_at - 2;
        writer.patch_u16(rdlength_at, rdlength as u16);
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.rclass, self.rtype, self.rdata
        )
    }
}

/// Sequential parser for a record section.
///
/// Never allocates beyond the declared count before reading, so a
/// hostile count cannot balloon memory.
#[derive(Debug)]
pub struct RecordParser<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> RecordParser<'a> {
    /// Creates a parser for `count` records starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Returns the offset just past the last parsed record.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parses the next record, or `None` when the count is exhausted.
    pub fn next(&mut self) -> Result<Option<ResourceRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let (record, consumed) = ResourceRecord::parse(self.data, self.offset)?;
        self.offset += consumed;
        self.remaining -= 1;
        Ok(Some(record))
    }
}
