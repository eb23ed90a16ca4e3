//! The question section.

use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rclass::{Rclass, RecordClass};
use crate::rtype::{RecordType, Rtype};
use crate::wire::MessageWriter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single question entry: name, type, class.
///
/// In an UPDATE message the same wire slot carries the zone entry; the
/// data model does not fork, only the printed section label changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    /// The name being queried.
    pub qname: Name,

    /// The requested type.
    pub qtype: Rtype,

    /// The requested class, usually IN.
    pub qclass: Rclass,
}

impl Question {
    /// Creates a question with known type and class.
    #[inline]
    pub fn new(qname: Name, qtype: RecordType, qclass: RecordClass) -> Self {
        Self {
            qname,
            qtype: Rtype::Known(qtype),
            qclass: Rclass::Known(qclass),
        }
    }

    /// Creates an A/IN question.
    #[inline]
    pub fn a(qname: Name) -> Self {
        Self::new(qname, RecordType::A, RecordClass::IN)
    }

    /// Creates a PTR/IN question.
    #[inline]
    pub fn ptr(qname: Name) -> Self {
        Self::new(qname, RecordType::PTR, RecordClass::IN)
    }

    /// Creates an ANY/IN question.
    #[inline]
    pub fn any(qname: Name) -> Self {
        Self::new(qname, RecordType::ANY, RecordClass::IN)
    }

    /// Parses a question at `offset`, returning it and the octets consumed.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (qname, name_len) = NameParser::new(data).parse_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 4 > data.len() {
            return Err(Error::truncated_section(fixed, fixed + 4 - data.len()));
        }

        Ok((
            Self {
                qname,
                qtype: Rtype::from_u16(u16::from_be_bytes([data[fixed], data[fixed + 1]])),
                qclass: Rclass::from_u16(u16::from_be_bytes([data[fixed + 2], data[fixed + 3]])),
            },
            name_len + 4,
        ))
    }

    /// Upper bound on the encoded length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.qname.wire_len() + 4
    }

    /// Writes the question, compressing the name.
    pub fn write_to(&self, writer: &mut MessageWriter) {
        writer.write_name(&self.qname);
        writer.write_u16(self.qtype.to_u16());
        writer.write_u16(self.qclass.to_u16());
    }

    /// Returns true if the other question asks the same thing
    /// (name compared case-insensitively).
    pub fn matches(&self, other: &Question) -> bool {
        self.qname == other.qname && self.qtype == other.qtype && self.qclass == other.qclass
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.qname, self.qclass, self.qtype)
    }
}

/// Sequential parser for the question section.
#[derive(Debug)]
pub struct QuestionParser<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> QuestionParser<'a> {
    /// Creates a parser for `count` questions starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Returns the offset just past the last parsed question.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parses the next question, or `None` when the count is exhausted.
    pub fn next(&mut self) -> Result<Option<Question>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let (question, consumed) = Question::parse(self.data, self.offset)?;
        self.offset += consumed;
        self.remaining -= 1;
        Ok(Some(question))
    }
}
