//! Name decompression: parsing names out of a message buffer.
//!
//! Compressed names reference earlier parts of the message through
//! 14-bit pointers, so parsing a name needs the whole message, not just
//! the octets at the call site. The parser expands pointers eagerly and
//! returns a flat [`Name`]; the pointer structure is not preserved.

use super::{Name, NameStorage};
use crate::error::{Error, Result};
use crate::MAX_NAME_LENGTH;
use smallvec::SmallVec;

/// Parses domain names from a message buffer.
///
/// Holds a reference to the complete message so compression pointers
/// can be resolved from any offset.
#[derive(Debug, Clone, Copy)]
pub struct NameParser<'a> {
    /// The complete message.
    message: &'a [u8],
}

impl<'a> NameParser<'a> {
    /// Creates a parser over the given message buffer.
    #[inline]
    pub const fn new(message: &'a [u8]) -> Self {
        Self { message }
    }

    /// Parses a name starting at `offset`.
    ///
    /// Returns the expanded name and the number of octets consumed at
    /// the call site (pointers count as two octets; the labels behind
    /// them do not).
    ///
    /// Each offset at which a label or pointer is read goes into a
    /// visited set; revisiting any of them means the pointer graph has
    /// a cycle and parsing fails with [`Error::UnboundedNameExpansion`].
    /// The set is bounded by the buffer size, so hostile input cannot
    /// cause unbounded work.
    pub fn parse_name(&self, offset: usize) -> Result<(Name, usize)> {
        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut visited = hashbrown::HashSet::new();
        let mut pos = offset;
        let mut consumed = 0;
        let mut followed_pointer = false;
        let mut label_count = 0u8;

        loop {
            if pos >= self.message.len() {
                return Err(Error::TruncatedName { offset: pos });
            }
            if !visited.insert(pos) {
                return Err(Error::UnboundedNameExpansion { offset: pos });
            }

            let octet = self.message[pos];
            match octet & 0xC0 {
                // Pointer: low 14 bits are an absolute offset.
                0xC0 => {
                    if pos + 1 >= self.message.len() {
                        return Err(Error::TruncatedName { offset: pos + 1 });
                    }
                    if !followed_pointer {
                        consumed = pos - offset + 2;
                        followed_pointer = true;
                    }
                    pos = usize::from(u16::from_be_bytes([
                        octet & 0x3F,
                        self.message[pos + 1],
                    ]));
                }

                // Reserved label types.
                0x40 | 0x80 => {
                    return Err(Error::MalformedName {
                        offset: pos,
                        label_type: octet,
                    });
                }

                // Literal label, or the terminating root.
                _ => {
                    let len = octet as usize;

                    if len == 0 {
                        wire.push(0);
                        label_count = label_count.saturating_add(1);
                        if !followed_pointer {
                            consumed = pos - offset + 1;
                        }
                        break;
                    }

                    if pos + 1 + len > self.message.len() {
                        return Err(Error::TruncatedName {
                            offset: pos + 1 + len,
                        });
                    }
                    if wire.len() + 1 + len + 1 > MAX_NAME_LENGTH {
                        return Err(Error::NameTooLong {
                            length: wire.len() + 1 + len + 1,
                        });
                    }

                    wire.push(octet);
                    wire.extend_from_slice(&self.message[pos + 1..pos + 1 + len]);
                    label_count = label_count.saturating_add(1);
                    pos += 1 + len;
                }
            }
        }

        Ok((
            Name {
                wire: NameStorage::Inline(wire),
                label_count,
            },
            consumed,
        ))
    }

    /// Skips over a name, returning the octets consumed at the call site.
    ///
    /// Cheaper than parsing when only the position after the name is
    /// needed; pointers terminate the name without being followed.
    pub fn skip_name(&self, offset: usize) -> Result<usize> {
        let mut pos = offset;

        loop {
            if pos >= self.message.len() {
                return Err(Error::TruncatedName { offset: pos });
            }

            let octet = self.message[pos];
            match octet & 0xC0 {
                0xC0 => {
                    if pos + 1 >= self.message.len() {
                        return Err(Error::TruncatedName { offset: pos + 1 });
                    }
                    return Ok(pos - offset + 2);
                }
                0x40 | 0x80 => {
                    return Err(Error::MalformedName {
                        offset: pos,
                        label_type: octet,
                    });
                }
                _ => {
                    let len = octet as usize;
                    if len == 0 {
                        return Ok(pos - offset + 1);
                    }
                    pos += 1 + len;
                }
            }
        }
    }
}

/// Expands a possibly compressed name at `offset` in `message`.
///
/// Free-function form of [`NameParser::parse_name`] for RDATA decoders
/// that need pointer resolution against the whole message.
#[inline]
pub fn expand_name(message: &[u8], offset: usize) -> Result<(Name, usize)> {
    NameParser::new(message).parse_name(offset)
}
