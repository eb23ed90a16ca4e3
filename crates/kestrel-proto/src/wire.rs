//! Wire format output with per-message name compression.
//!
//! A [`MessageWriter`] owns the output buffer for exactly one message
//! encode. The compression table it carries maps the canonical
//! (ASCII-lowercased) wire form of every name suffix already emitted to
//! the offset where that suffix starts, so later names can be replaced
//! by two-octet pointers (RFC 1035 Section 4.1.4).

use crate::name::Name;
use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;

/// Highest offset a 14-bit compression pointer can reference.
pub const MAX_POINTER_OFFSET: usize = 0x4000;

/// Writer for a single DNS message.
///
/// The compression table lives only as long as the writer; it is never
/// shared between messages.
#[derive(Debug)]
pub struct MessageWriter {
    /// The output buffer.
    buf: BytesMut,
    /// Canonical suffix wire form to the offset where it was emitted.
    names: hashbrown::HashMap<SmallVec<[u8; 32]>, u16>,
}

impl MessageWriter {
    /// Creates a writer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            names: hashbrown::HashMap::new(),
        }
    }

    /// Returns the number of octets written so far.
    ///
    /// This is also the offset the next write will land at.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single octet.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Writes a big-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    /// Writes a big-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Writes a slice of octets.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Reserves two octets for a length field, returning its offset.
    ///
    /// Used for RDLENGTH, which is only known after the RDATA writer
    /// has run. Fill it in with [`patch_u16`](Self::patch_u16).
    #[inline]
    pub fn reserve_u16(&mut self) -> usize {
        let at = self.buf.len();
        self.buf.put_u16(0);
        at
    }

    /// Back-patches a previously reserved u16.
    #[inline]
    pub fn patch_u16(&mut self, at: usize, value: u16) {
        self.buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Writes a name, compressing against everything already emitted.
    ///
    /// For each suffix of the name: if its canonical form is in the
    /// table at an offset below [`MAX_POINTER_OFFSET`], a pointer is
    /// emitted and the name is done. Otherwise the label goes out
    /// verbatim and the suffix offset is recorded (offsets at or above
    /// the pointer limit are never recorded).
    pub fn write_name(&mut self, name: &Name) {
        let wire = name.as_wire();
        let mut pos = 0;

        while pos < wire.len() && wire[pos] != 0 {
            let key = canonical_suffix(&wire[pos..]);
            if let Some(&offset) = self.names.get(&key) {
                self.buf.put_u16(0xC000 | offset);
                return;
            }

            let here = self.buf.len();
            if here < MAX_POINTER_OFFSET {
                self.names.insert(key, here as u16);
            }

            let len = wire[pos] as usize;
            self.buf.extend_from_slice(&wire[pos..pos + 1 + len]);
            pos += 1 + len;
        }

        // Root label terminates the name.
        self.buf.put_u8(0);
    }

    /// Writes a name without compression and without recording it.
    ///
    /// Required for names inside RDATA of types that postdate RFC 1035,
    /// which must not be compressed (RFC 3597).
    pub fn write_name_uncompressed(&mut self, name: &Name) {
        let wire = name.as_wire();
        if wire.is_empty() {
            self.buf.put_u8(0);
        } else {
            self.buf.extend_from_slice(wire);
        }
    }

    /// Consumes the writer and returns the finished message.
    #[inline]
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Returns the octets written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Lowercases a name suffix for use as a compression table key.
fn canonical_suffix(suffix: &[u8]) -> SmallVec<[u8; 32]> {
    suffix.iter().map(|b| b.to_ascii_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_primitive_writes() {
        let mut w = MessageWriter::with_capacity(16);
        w.write_u8(0x12);
        w.write_u16(0x3456);
        w.write_u32(0x789A_BCDE);
        assert_eq!(w.len(), 7);
        assert_eq!(w.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE]);
    }

    #[test]
    fn test_reserve_and_patch() {
        let mut w = MessageWriter::with_capacity(8);
        w.write_u16(0xAAAA);
        let at = w.reserve_u16();
        w.write_bytes(&[1, 2, 3]);
        w.patch_u16(at, 3);
        assert_eq!(w.as_bytes(), &[0xAA, 0xAA, 0x00, 0x03, 1, 2, 3]);
    }

    #[test]
    fn test_name_compression_emits_pointer() {
        let mut w = MessageWriter::with_capacity(64);
        let name = Name::from_str("example.com").unwrap();

        w.write_name(&name);
        let first_len = w.len();
        w.write_name(&name);

        // Second occurrence is a pointer to offset 0.
        assert_eq!(first_len, 13);
        assert_eq!(&w.as_bytes()[13..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_suffix_compression() {
        let mut w = MessageWriter::with_capacity(64);
        w.write_name(&Name::from_str("example.com").unwrap());
        w.write_name(&Name::from_str("www.example.com").unwrap());

        // "www" label verbatim, then a pointer back to "example.com".
        assert_eq!(
            &w.as_bytes()[13..],
            &[3, b'w', b'w', b'w', 0xC0, 0x00]
        );
    }

    #[test]
    fn test_compression_is_case_insensitive() {
        let mut w = MessageWriter::with_capacity(64);
        w.write_name(&Name::from_str("EXAMPLE.COM").unwrap());
        w.write_name(&Name::from_str("example.com").unwrap());

        assert_eq!(&w.as_bytes()[13..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_uncompressed_never_records() {
        let mut w = MessageWriter::with_capacity(64);
        let name = Name::from_str("example.com").unwrap();

        w.write_name_uncompressed(&name);
        w.write_name(&name);

        // No pointer: the first write left no table entry.
        assert_eq!(w.len(), 26);
    }

    #[test]
    fn test_root_name() {
        let mut w = MessageWriter::with_capacity(4);
        w.write_name(&Name::root());
        assert_eq!(w.as_bytes(), &[0]);
    }
}
