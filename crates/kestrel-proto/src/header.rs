//! The fixed 12-octet message header.

use crate::error::{Error, Result};
use crate::opcode::Opcode;
use crate::rcode::Rcode;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the header in octets.
pub const HEADER_SIZE: usize = 12;

bitflags! {
    /// The eight one-bit header flags.
    ///
    /// Opcode and rcode share the same 16-bit word on the wire but are
    /// kept as separate fields; the mask here covers only the true
    /// single-bit flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HeaderFlags: u16 {
        /// Query (0) or response (1).
        const QR = 0x8000;

        /// Authoritative answer.
        const AA = 0x0400;

        /// Truncation: the receiver should retry over TCP.
        const TC = 0x0200;

        /// Recursion desired.
        const RD = 0x0100;

        /// Recursion available.
        const RA = 0x0080;

        /// Reserved, must be zero.
        const Z = 0x0040;

        /// Authentic data (DNSSEC).
        const AD = 0x0020;

        /// Checking disabled (DNSSEC).
        const CD = 0x0010;
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// The DNS message header.
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// The counts are authoritative only on the wire. After a decode they
/// hold what the sender declared (which may exceed what was actually
/// parsed from a damaged message); during encode they are re-derived
/// from the section vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Message identifier matching requests to responses.
    pub id: u16,

    /// The one-bit flags.
    pub flags: HeaderFlags,

    /// Operation code.
    pub opcode: Opcode,

    /// Response code; the part above four bits travels in the OPT record.
    pub rcode: Rcode,

    /// Number of questions.
    pub qd_count: u16,

    /// Number of answer records.
    pub an_count: u16,

    /// Number of authority records.
    pub ns_count: u16,

    /// Number of additional records.
    pub ar_count: u16,
}

impl Header {
    /// Creates a header with the given id and everything else zeroed.
    #[inline]
    pub const fn new(id: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::empty(),
            opcode: Opcode::Query,
            rcode: Rcode::NoError,
            qd_count: 0,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Creates a query header with a random id and RD set.
    pub fn query() -> Self {
        Self {
            id: rand::random(),
            flags: HeaderFlags::RD,
            opcode: Opcode::Query,
            rcode: Rcode::NoError,
            qd_count: 0,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Returns true if this is a query.
    #[inline]
    pub fn is_query(&self) -> bool {
        !self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if the TC flag is set.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags.contains(HeaderFlags::TC)
    }

    /// Returns true if recursion was requested.
    #[inline]
    pub fn recursion_desired(&self) -> bool {
        self.flags.contains(HeaderFlags::RD)
    }

    /// Returns true if checking is disabled.
    #[inline]
    pub fn checking_disabled(&self) -> bool {
        self.flags.contains(HeaderFlags::CD)
    }

    /// Sets or clears the QR flag.
    #[inline]
    pub fn set_response(&mut self, response: bool) {
        self.flags.set(HeaderFlags::QR, response);
    }

    /// Sets or clears the TC flag.
    #[inline]
    pub fn set_truncated(&mut self, tc: bool) {
        self.flags.set(HeaderFlags::TC, tc);
    }

    /// Sets or clears the RD flag.
    #[inline]
    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.flags.set(HeaderFlags::RD, rd);
    }

    /// Sets or clears the RA flag.
    #[inline]
    pub fn set_recursion_available(&mut self, ra: bool) {
        self.flags.set(HeaderFlags::RA, ra);
    }

    /// Sets or clears the CD flag.
    #[inline]
    pub fn set_checking_disabled(&mut self, cd: bool) {
        self.flags.set(HeaderFlags::CD, cd);
    }

    /// Total declared record count across the three RR sections.
    #[inline]
    pub fn record_count(&self) -> usize {
        self.an_count as usize + self.ns_count as usize + self.ar_count as usize
    }

    /// Parses a header from the start of a buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader { actual: data.len() });
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let word = u16::from_be_bytes([data[2], data[3]]);

        let opcode_bits = ((word >> 11) & 0x0F) as u8;
        let opcode = Opcode::from_u8(opcode_bits).ok_or(Error::InvalidOpcode {
            value: opcode_bits,
        })?;

        let rcode_bits = (word & 0x0F) as u8;
        let rcode = Rcode::from_header(rcode_bits).ok_or(Error::InvalidRcode {
            value: u16::from(rcode_bits),
        })?;

        let flags = HeaderFlags::from_bits_truncate(word);

        Ok(Self {
            id,
            flags,
            opcode,
            rcode,
            qd_count: u16::from_be_bytes([data[4], data[5]]),
            an_count: u16::from_be_bytes([data[6], data[7]]),
            ns_count: u16::from_be_bytes([data[8], data[9]]),
            ar_count: u16::from_be_bytes([data[10], data[11]]),
        })
    }

    /// Serializes the header to its 12-octet wire form.
    pub fn to_wire(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        let word = self.flags.bits()
            | u16::from(self.opcode.to_u8()) << 11
            | u16::from(self.rcode.header_bits());

        buf[0..2].copy_from_slice(&self.id.to_be_bytes());
        buf[2..4].copy_from_slice(&word.to_be_bytes());
        buf[4..6].copy_from_slice(&self.qd_count.to_be_bytes());
        buf[6..8].copy_from_slice(&self.an_count.to_be_bytes());
        buf[8..10].copy_from_slice(&self.ns_count.to_be_bytes());
        buf[10..12].copy_from_slice(&self.ar_count.to_be_bytes());

        buf
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "opcode: {}, status: {}, id: {}",
            self.opcode, self.rcode, self.id
        )?;

        write!(f, "\n;; flags:")?;
        for (flag, label) in [
            (HeaderFlags::QR, "qr"),
            (HeaderFlags::AA, "aa"),
            (HeaderFlags::TC, "tc"),
            (HeaderFlags::RD, "rd"),
            (HeaderFlags::RA, "ra"),
            (HeaderFlags::AD, "ad"),
            (HeaderFlags::CD, "cd"),
        ] {
            if self.flags.contains(flag) {
                write!(f, " {label}")?;
            }
        }

        write!(
            f,
            "; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.qd_count, self.an_count, self.ns_count, self.ar_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut header = Header::new(0x1234);
        header.opcode = Opcode::Update;
        header.rcode = Rcode::Refused;
        header.set_response(true);
        header.set_recursion_desired(true);
        header.qd_count = 1;
        header.an_count = 2;

        let wire = header.to_wire();
        let parsed = Header::parse(&wire).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_flag_bit_positions() {
        let mut header = Header::new(0);
        header.set_response(true);
        header.set_truncated(true);
        header.set_recursion_desired(true);

        let wire = header.to_wire();
        assert_eq!(wire[2], 0x83); // QR | TC | RD high bits
        assert_eq!(wire[3], 0x00);
    }

    #[test]
    fn test_extended_rcode_keeps_low_bits_in_header() {
        let mut header = Header::new(0);
        header.rcode = Rcode::BadTime; // 18 = 0b1_0010

        let wire = header.to_wire();
        assert_eq!(wire[3] & 0x0F, 2);
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            Header::parse(&[0; 11]),
            Err(Error::TruncatedHeader { actual: 11 })
        ));
    }

    #[test]
    fn test_parse_bad_opcode() {
        let mut wire = Header::new(1).to_wire();
        wire[2] |= 3 << 3; // opcode 3 is unassigned
        assert!(matches!(
            Header::parse(&wire),
            Err(Error::InvalidOpcode { value: 3 })
        ));
    }

    #[test]
    fn test_display_summary() {
        let mut header = Header::new(0xABCD);
        header.set_response(true);
        header.set_recursion_desired(true);

        let text = header.to_string();
        assert!(text.contains("QUERY"));
        assert!(text.contains("NOERROR"));
        assert!(text.contains("qr rd"));
    }
}
