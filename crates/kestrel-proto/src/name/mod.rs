//! Domain names and their wire format.
//!
//! A name is a sequence of labels stored in uncompressed wire form.
//! Small names (the overwhelming majority) live inline without heap
//! allocation; names sliced out of a received message can share the
//! message buffer. Compression is not part of the stored form: it is
//! applied while writing (see [`crate::wire::MessageWriter`]) and
//! undone while parsing (see [`NameParser`]).
//!
//! Comparison, hashing, and ordering are case-insensitive for ASCII
//! per RFC 1035, with the RFC 4034 canonical order for `Ord`.

mod label;
mod parse;

pub use label::{Label, LabelIter};
pub use parse::{expand_name, NameParser};

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use bytes::Bytes;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A DNS domain name.
///
/// Invariants enforced at construction: no label longer than 63 octets,
/// encoded form (including length octets and the terminating zero) no
/// longer than 255 octets. Because the invariants hold for every
/// existing `Name`, encoding can never fail.
///
/// # Presentation form
///
/// `Display` renders the dotted form, escaping `.` and `\` with a
/// backslash and non-printing octets as `\DDD`. `FromStr` parses the
/// same escapes back, and skips empty labels between dots, so any name
/// round-trips through its presentation form.
#[derive(Clone)]
pub struct Name {
    /// Uncompressed wire form (no pointers).
    wire: NameStorage,
    /// Number of labels, including the root.
    label_count: u8,
}

/// Backing storage for the wire octets.
#[derive(Clone)]
enum NameStorage {
    /// Inline storage; most names fit without allocating.
    Inline(SmallVec<[u8; 64]>),
    /// Shared slice of a received message buffer.
    Shared(Bytes),
}

impl Name {
    /// The root name.
    pub const ROOT: Self = Self {
        wire: NameStorage::Inline(SmallVec::new_const()),
        label_count: 1,
    };

    /// Creates the root name.
    #[inline]
    pub const fn root() -> Self {
        Self::ROOT
    }

    /// Creates a name from uncompressed wire octets, sharing the buffer.
    pub fn from_wire(wire: impl Into<Bytes>) -> Result<Self> {
        let bytes = wire.into();
        let label_count = Self::validate_wire(&bytes)?;
        Ok(Self {
            wire: NameStorage::Shared(bytes),
            label_count,
        })
    }

    /// Creates a name from uncompressed wire octets, copying them.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let label_count = Self::validate_wire(slice)?;
        Ok(Self {
            wire: NameStorage::Inline(SmallVec::from_slice(slice)),
            label_count,
        })
    }

    /// Builds a name from label octets, shortest-lived allocation first.
    pub fn from_labels<I, L>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut label_count = 1u8; // root

        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                continue;
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong {
                    length: label.len(),
                });
            }
            wire.push(label.len() as u8);
            wire.extend_from_slice(label);
            label_count = label_count.saturating_add(1);
        }

        wire.push(0);
        if wire.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length: wire.len() });
        }

        Ok(Self {
            wire: NameStorage::Inline(wire),
            label_count,
        })
    }

    /// Checks wire form invariants and counts labels.
    ///
    /// Stored wire must be the complete uncompressed form: either empty
    /// (the root) or ending in the zero-length root label.
    fn validate_wire(bytes: &[u8]) -> Result<u8> {
        if bytes.is_empty() {
            return Ok(1);
        }

        let mut pos = 0;
        let mut labels = 0u8;

        loop {
            if pos >= bytes.len() {
                return Err(Error::TruncatedName { offset: pos });
            }

            let len = bytes[pos] as usize;
            if len == 0 {
                labels = labels.saturating_add(1);
                return Ok(labels);
            }
            if len > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: len });
            }

            pos += 1 + len;
            if pos > bytes.len() {
                return Err(Error::TruncatedName { offset: pos });
            }
            if pos + 1 > MAX_NAME_LENGTH {
                return Err(Error::NameTooLong { length: pos + 1 });
            }
            labels = labels.saturating_add(1);
        }
    }

    /// Returns the uncompressed wire octets.
    #[inline]
    pub fn as_wire(&self) -> &[u8] {
        match &self.wire {
            NameStorage::Inline(v) => v.as_slice(),
            NameStorage::Shared(b) => b.as_ref(),
        }
    }

    /// Returns the encoded length, including the terminating zero.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.as_wire().len().max(1)
    }

    /// Returns the number of labels, including the root.
    #[inline]
    pub const fn label_count(&self) -> usize {
        self.label_count as usize
    }

    /// Returns true for the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        let wire = self.as_wire();
        wire.is_empty() || wire == [0]
    }

    /// Returns an iterator over the labels.
    #[inline]
    pub fn labels(&self) -> LabelIter<'_> {
        LabelIter::new(self.as_wire())
    }

    /// Returns a copy with all ASCII letters lowercased.
    ///
    /// This is the canonical form used in signature computations and
    /// deduplication keys.
    #[must_use]
    pub fn lowercased(&self) -> Self {
        let lower: SmallVec<[u8; 64]> = self
            .as_wire()
            .iter()
            .map(|b| b.to_ascii_lowercase())
            .collect();
        Self {
            wire: NameStorage::Inline(lower),
            label_count: self.label_count,
        }
    }

    /// Returns the dotted presentation form.
    pub fn to_presentation(&self) -> CompactString {
        wire_to_presentation(self.as_wire())
    }
}

/// Renders an uncompressed wire-format name as a presentation string.
///
/// Octets outside the printable ASCII range are escaped as `\DDD`;
/// literal dots and backslashes inside labels are backslash-escaped.
pub fn wire_to_presentation(wire: &[u8]) -> CompactString {
    use fmt::Write;

    let mut out = CompactString::const_new("");
    for label in LabelIter::new(wire) {
        if !label.is_root() {
            // Label's Display implements the escaping rules.
            let _ = write!(out, "{label}.");
        }
    }

    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Splits a presentation-form name into raw label octets.
///
/// Handles `\DDD` and single-character backslash escapes; empty labels
/// between dots are dropped. The root (`""` or `"."`) yields no labels.
pub fn name_to_labels(s: &str) -> Result<Vec<Vec<u8>>> {
    let bytes = s.as_bytes();
    let mut labels = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let next = *bytes
                    .get(i + 1)
                    .ok_or(Error::InvalidEscape { position: i })?;
                if next.is_ascii_digit() {
                    if i + 3 >= bytes.len()
                        || !bytes[i + 2].is_ascii_digit()
                        || !bytes[i + 3].is_ascii_digit()
                    {
                        return Err(Error::InvalidEscape { position: i });
                    }
                    let value = (next - b'0') as u16 * 100
                        + (bytes[i + 2] - b'0') as u16 * 10
                        + (bytes[i + 3] - b'0') as u16;
                    if value > 255 {
                        return Err(Error::InvalidEscape { position: i });
                    }
                    current.push(value as u8);
                    i += 4;
                } else {
                    current.push(next);
                    i += 2;
                }
            }
            b'.' => {
                if !current.is_empty() {
                    labels.push(std::mem::take(&mut current));
                }
                i += 1;
            }
            b => {
                current.push(b);
                i += 1;
            }
        }
    }

    if !current.is_empty() {
        labels.push(current);
    }
    Ok(labels)
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }
        Self::from_labels(name_to_labels(s)?)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_presentation())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.label_count == other.label_count
            && self
                .labels()
                .zip(other.labels())
                .all(|(a, b)| a.eq_ignore_ascii_case(&b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in self.labels() {
            state.write_usize(label.len());
            for &b in label.as_bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Canonical DNS ordering per RFC 4034: labels compared right to left.
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs: SmallVec<[Label<'_>; 8]> = self.labels().collect();
        let rhs: SmallVec<[Label<'_>; 8]> = other.labels().collect();

        for (a, b) in lhs.iter().rev().zip(rhs.iter().rev()) {
            match a.cmp_canonical(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        lhs.len().cmp(&rhs.len())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_presentation())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.label_count(), 1);
        assert_eq!(root.to_string(), ".");
        assert_eq!(Name::from_str(".").unwrap(), root);
    }

    #[test]
    fn test_parse_and_display() {
        let name = Name::from_str("www.example.com.").unwrap();
        assert_eq!(name.label_count(), 4);
        assert_eq!(name.to_string(), "www.example.com.");

        // Trailing dot is optional on input.
        assert_eq!(Name::from_str("www.example.com").unwrap(), name);
    }

    #[test]
    fn test_case_insensitive_eq_and_hash() {
        use std::collections::hash_map::DefaultHasher;

        let lower = Name::from_str("www.example.com").unwrap();
        let upper = Name::from_str("WWW.EXAMPLE.COM").unwrap();
        assert_eq!(lower, upper);

        let hash = |n: &Name| {
            let mut h = DefaultHasher::new();
            n.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&lower), hash(&upper));
    }

    #[test]
    fn test_empty_labels_skipped() {
        let name = Name::from_str("a..b").unwrap();
        assert_eq!(name.to_string(), "a.b.");
    }

    #[test]
    fn test_escape_roundtrip() {
        let name = Name::from_labels([&b"a.b"[..], &b"c\\d"[..], &[0x07][..]]).unwrap();
        let presentation = name.to_string();
        assert_eq!(presentation, "a\\.b.c\\\\d.\\007.");

        let parsed = Name::from_str(&presentation).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_bad_escapes() {
        assert!(matches!(
            Name::from_str("a\\"),
            Err(Error::InvalidEscape { .. })
        ));
        assert!(matches!(
            Name::from_str("a\\999"),
            Err(Error::InvalidEscape { .. })
        ));
    }

    #[test]
    fn test_label_too_long() {
        let long = "a".repeat(64);
        assert!(matches!(
            Name::from_str(&long),
            Err(Error::LabelTooLong { length: 64 })
        ));
    }

    #[test]
    fn test_name_too_long() {
        // Four 63-octet labels: 4 * 64 + 1 = 257 octets encoded.
        let label = "a".repeat(63);
        let long = [label.as_str(); 4].join(".");
        assert!(matches!(
            Name::from_str(&long),
            Err(Error::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_wire_roundtrip() {
        let name = Name::from_str("mail.example.org").unwrap();
        let copy = Name::from_slice(name.as_wire()).unwrap();
        assert_eq!(copy, name);
        assert_eq!(copy.label_count(), name.label_count());
    }

    #[test]
    fn test_lowercased() {
        let name = Name::from_str("MiXeD.Example.COM").unwrap();
        assert_eq!(name.lowercased().as_wire(), {
            Name::from_str("mixed.example.com").unwrap().as_wire()
        });
    }

    #[test]
    fn test_canonical_ordering() {
        let mut names: Vec<Name> = ["z.example", "a.example", "example", "*.z.example"]
            .iter()
            .map(|s| Name::from_str(s).unwrap())
            .collect();
        names.sort();

        let sorted: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            sorted,
            vec!["example.", "a.example.", "z.example.", "*.z.example."]
        );
    }
}
