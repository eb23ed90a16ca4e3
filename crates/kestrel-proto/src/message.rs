//! Complete DNS messages.
//!
//! A message is the header plus four sections. Section counts are only
//! authoritative on the wire: encode derives them from the vectors,
//! decode records what the sender declared and then treats the parsed
//! vectors as the truth.
//!
//! UPDATE messages (RFC 2136) reuse the same four sections with
//! different meanings. The data model does not fork for them; the
//! opcode drives class coercion on push and the printed section labels.

use crate::edns::Edns;
use crate::error::{Error, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::opcode::Opcode;
use crate::question::{Question, QuestionParser};
use crate::rclass::RecordClass;
use crate::rcode::Rcode;
use crate::record::{RecordParser, ResourceRecord};
use crate::rtype::RecordType;
use crate::wire::MessageWriter;
use crate::MAX_UDP_MESSAGE_SIZE;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// The three resource record sections.
///
/// String keys accept the full names, their three-letter prefixes, and
/// the RFC 2136 update aliases: `ans`/`pre` for answer, `aut`/`upd`/
/// `update` for authority, `add` for additional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    /// The answer section; prerequisites in an UPDATE.
    Answer,
    /// The authority section; the update set in an UPDATE.
    Authority,
    /// The additional section.
    Additional,
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "answer" | "ans" | "pre" | "prerequisite" => Ok(Self::Answer),
            "authority" | "aut" | "upd" | "update" => Ok(Self::Authority),
            "additional" | "add" => Ok(Self::Additional),
            _ => Err(Error::UnknownSection { name: s.into() }),
        }
    }
}

/// A DNS message.
///
/// Messages are single-owner values: built by one producer, encoded
/// once, then dropped. The name compression table exists only inside
/// [`to_wire`](Self::to_wire) and is discarded with the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The header. Counts reflect the last decode or mutation.
    header: Header,
    /// The question section (the zone entry for UPDATE).
    questions: Vec<Question>,
    /// The answer section.
    answers: Vec<ResourceRecord>,
    /// The authority section.
    authority: Vec<ResourceRecord>,
    /// The additional section, excluding the OPT pseudo-record.
    additional: Vec<ResourceRecord>,
    /// The EDNS view of the OPT record, if any.
    edns: Option<Edns>,
    /// Transport metadata: where the message came from.
    answer_from: Option<SocketAddr>,
    /// Transport metadata: received wire size.
    answer_size: Option<usize>,
}

impl Message {
    /// Creates an empty query message with a fresh id and RD set.
    pub fn new() -> Self {
        Self::from_header(Header::query())
    }

    /// Creates a message with the given header and empty sections.
    pub fn from_header(header: Header) -> Self {
        Self {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: None,
            answer_from: None,
            answer_size: None,
        }
    }

    /// Creates a query carrying a single question.
    pub fn query(question: Question) -> Self {
        let mut msg = Self::new();
        msg.add_question(question);
        msg
    }

    // =========================================================================
    // Header access
    // =========================================================================

    /// Returns the header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns a mutable reference to the header.
    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Returns the message id.
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Sets the message id.
    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.header.id = id;
    }

    /// Returns the opcode.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.header.opcode
    }

    /// Sets the opcode.
    #[inline]
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.header.opcode = opcode;
    }

    /// Returns the response code.
    #[inline]
    pub fn rcode(&self) -> Rcode {
        self.header.rcode
    }

    /// Sets the response code.
    ///
    /// A code above 15 cannot travel in the header alone; its upper
    /// bits are reflected into the OPT record, which is created if the
    /// message has none.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.header.rcode = rcode;
        if rcode.is_extended() {
            self.ensure_edns().set_extended_rcode(rcode.extended_bits());
        } else if let Some(edns) = &mut self.edns {
            edns.set_extended_rcode(0);
        }
    }

    /// Returns true if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    /// Returns true if the TC flag is set.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.header.is_truncated()
    }

    // =========================================================================
    // Section access
    // =========================================================================

    /// Returns the question section.
    #[inline]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the first question, if any.
    #[inline]
    pub fn question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Returns the answer section.
    #[inline]
    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    /// Returns the authority section.
    #[inline]
    pub fn authority(&self) -> &[ResourceRecord] {
        &self.authority
    }

    /// Returns the additional section (the OPT record is not in it).
    #[inline]
    pub fn additional(&self) -> &[ResourceRecord] {
        &self.additional
    }

    /// Returns the named section.
    #[inline]
    pub fn section(&self, section: Section) -> &[ResourceRecord] {
        match section {
            Section::Answer => &self.answers,
            Section::Authority => &self.authority,
            Section::Additional => &self.additional,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<ResourceRecord> {
        match section {
            Section::Answer => &mut self.answers,
            Section::Authority => &mut self.authority,
            Section::Additional => &mut self.additional,
        }
    }

    /// Returns the EDNS view, if the message carries an OPT record.
    #[inline]
    pub fn edns(&self) -> Option<&Edns> {
        self.edns.as_ref()
    }

    /// Returns a mutable EDNS view.
    #[inline]
    pub fn edns_mut(&mut self) -> Option<&mut Edns> {
        self.edns.as_mut()
    }

    /// Replaces the EDNS view.
    #[inline]
    pub fn set_edns(&mut self, edns: Option<Edns>) {
        self.edns = edns;
        self.refresh_counts();
    }

    /// Returns the EDNS view, creating a default one if absent.
    pub fn ensure_edns(&mut self) -> &mut Edns {
        if self.edns.is_none() {
            self.edns = Some(Edns::new());
            self.refresh_counts();
        }
        self.edns.as_mut().unwrap()
    }

    /// Returns where the message was received from, if recorded.
    #[inline]
    pub fn answer_from(&self) -> Option<SocketAddr> {
        self.answer_from
    }

    /// Records where the message was received from.
    #[inline]
    pub fn set_answer_from(&mut self, from: SocketAddr) {
        self.answer_from = Some(from);
    }

    /// Returns the received wire size, set by [`parse`](Self::parse).
    #[inline]
    pub fn answer_size(&self) -> Option<usize> {
        self.answer_size
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Appends a question and returns the new section length.
    pub fn add_question(&mut self, question: Question) -> usize {
        self.questions.push(question);
        self.refresh_counts();
        self.questions.len()
    }

    /// Appends a record to a section, returning the new section length.
    ///
    /// An OPT record becomes the message's EDNS view instead of
    /// entering the section (a second OPT is dropped: a message holds
    /// at most one). In an UPDATE, records pushed to answer or
    /// authority inherit the zone's class unless theirs is ANY or NONE.
    pub fn push(&mut self, section: Section, mut record: ResourceRecord) -> usize {
        if record.rtype().is(RecordType::OPT) {
            if self.edns.is_none() {
                self.edns = Edns::from_record(&record).ok();
                self.refresh_counts();
            }
            return self.section(section).len();
        }

        self.coerce_update_class(section, &mut record);
        let list = self.section_mut(section);
        list.push(record);
        let len = list.len();
        self.refresh_counts();
        len
    }

    /// Appends a record unless the section already holds a duplicate,
    /// in which case the duplicate is replaced (last write wins).
    ///
    /// The duplicate key is the canonical record form: owner compared
    /// case-insensitively, type, class, TTL normalised away, canonical
    /// RDATA. Returns the new section length.
    pub fn unique_push(&mut self, section: Section, mut record: ResourceRecord) -> usize {
        if record.rtype().is(RecordType::OPT) {
            return self.push(section, record);
        }

        self.coerce_update_class(section, &mut record);
        let list = self.section_mut(section);
        if let Some(existing) = list.iter_mut().find(|r| r.canonical_eq(&record)) {
            *existing = record;
        } else {
            list.push(record);
        }
        let len = list.len();
        self.refresh_counts();
        len
    }

    /// Removes and returns the last record of a section.
    pub fn pop(&mut self, section: Section) -> Option<ResourceRecord> {
        let record = self.section_mut(section).pop();
        self.refresh_counts();
        record
    }

    /// Applies the RFC 2136 class inheritance rule.
    fn coerce_update_class(&self, section: Section, record: &mut ResourceRecord) {
        if self.header.opcode != Opcode::Update {
            return;
        }
        if !matches!(section, Section::Answer | Section::Authority) {
            return;
        }
        let Some(zone) = self.questions.first() else {
            return;
        };
        let class = record.rclass();
        if !class.is(RecordClass::ANY) && !class.is(RecordClass::NONE) {
            record.set_rclass(zone.qclass);
        }
    }

    /// Re-derives the header counts from the section vectors.
    fn refresh_counts(&mut self) {
        self.header.qd_count = self.questions.len() as u16;
        self.header.an_count = self.answers.len() as u16;
        self.header.ns_count = self.authority.len() as u16;
        self.header.ar_count = self.additional.len() as u16 + u16::from(self.edns.is_some());
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    /// Parses a message, rejecting any damage.
    pub fn parse(data: &[u8]) -> Result<Self> {
        match Self::parse_lenient(data)? {
            (message, None) => Ok(message),
            (_, Some(err)) => Err(err),
        }
    }

    /// Parses a message, keeping whatever decoded before a failure.
    ///
    /// Fails outright only when the header itself is unusable. On a
    /// mid-section failure the partial message is returned together
    /// with the error; the header keeps the counts the sender declared,
    /// which then differ from the parsed vector lengths.
    pub fn parse_lenient(data: &[u8]) -> Result<(Self, Option<Error>)> {
        let header = Header::parse(data)?;
        let mut message = Self::from_header(header);
        message.answer_size = Some(data.len());

        let err = message.parse_body(data).err();

        // Extended rcode bits arrive in the OPT record.
        if let Some(edns) = &message.edns {
            if let Some(full) =
                Rcode::from_parts(message.header.rcode.header_bits(), edns.extended_rcode())
            {
                message.header.rcode = full;
            }
        }

        Ok((message, err))
    }

    /// Parses the sections after the header, pushing into `self` so an
    /// early return keeps everything decoded so far.
    fn parse_body(&mut self, data: &[u8]) -> Result<()> {
        let mut questions = QuestionParser::new(data, HEADER_SIZE, self.header.qd_count);
        while let Some(q) = questions.next()? {
            self.questions.push(q);
        }

        let mut answers = RecordParser::new(data, questions.offset(), self.header.an_count);
        while let Some(r) = answers.next()? {
            self.answers.push(r);
        }

        let mut authority = RecordParser::new(data, answers.offset(), self.header.ns_count);
        while let Some(r) = authority.next()? {
            self.authority.push(r);
        }

        let mut additional = RecordParser::new(data, authority.offset(), self.header.ar_count);
        while let Some(r) = additional.next()? {
            if r.rtype().is(RecordType::OPT) {
                if self.edns.is_some() {
                    return Err(Error::MultipleOptRecords);
                }
                self.edns = Some(Edns::from_record(&r)?);
            } else {
                self.additional.push(r);
            }
        }

        Ok(())
    }

    /// Upper bound on the encoded length; compression only shrinks it.
    pub fn wire_len(&self) -> usize {
        let mut len = HEADER_SIZE;
        len += self.questions.iter().map(Question::wire_len).sum::<usize>();
        len += self.answers.iter().map(ResourceRecord::wire_len).sum::<usize>();
        len += self.authority.iter().map(ResourceRecord::wire_len).sum::<usize>();
        len += self.additional.iter().map(ResourceRecord::wire_len).sum::<usize>();
        if let Some(edns) = &self.edns {
            len += edns.wire_len();
        }
        len
    }

    /// Encodes the message.
    ///
    /// A fresh compression table is created for the call and dropped
    /// with it. Counts are derived from the section vectors; the OPT
    /// record goes at the head of the additional section, so a TSIG
    /// appended as the last additional record stays last on the wire.
    pub fn to_wire(&self) -> Bytes {
        let mut writer = MessageWriter::with_capacity(self.wire_len());

        let mut header = self.header.clone();
        header.qd_count = self.questions.len() as u16;
        header.an_count = self.answers.len() as u16;
        header.ns_count = self.authority.len() as u16;
        header.ar_count = self.additional.len() as u16 + u16::from(self.edns.is_some());
        writer.write_bytes(&header.to_wire());

        for q in &self.questions {
            q.write_to(&mut writer);
        }
        for r in &self.answers {
            r.write_to(&mut writer);
        }
        for r in &self.authority {
            r.write_to(&mut writer);
        }
        if let Some(edns) = &self.edns {
            edns.write_to(&mut writer);
        }
        for r in &self.additional {
            r.write_to(&mut writer);
        }

        writer.finish()
    }

    // =========================================================================
    // Truncation and replies
    // =========================================================================

    /// Shrinks the message to fit `limit` octets (clamped to at least
    /// 512), per RFC 2181 Section 9.
    ///
    /// The first pass drops whole RRsets from the tail of the
    /// additional section without signalling anything: that data was
    /// optional. Only when required records from authority, answer, or
    /// question must go does the TC flag get set, telling the receiver
    /// to retry over TCP.
    pub fn truncate(&mut self, limit: usize) {
        let limit = limit.max(MAX_UDP_MESSAGE_SIZE);

        while self.wire_len() > limit {
            let Some(last) = self.additional.last() else {
                break;
            };
            let name = last.name().clone();
            let rtype = last.rtype();
            let rclass = last.rclass();
            self.additional
                .retain(|r| !(r.rtype() == rtype && r.rclass() == rclass && *r.name() == name));
        }

        let mut popped = false;
        while self.wire_len() > limit {
            if self.authority.pop().is_some() {
                popped = true;
            } else if self.answers.pop().is_some() {
                popped = true;
            } else if self.questions.pop().is_some() {
                popped = true;
            } else {
                break;
            }
        }

        if popped {
            self.header.set_truncated(true);
        }
        self.refresh_counts();
    }

    /// Builds the skeleton of a response to this query.
    ///
    /// Fails with [`Error::ErroneousQr`] if this message is itself a
    /// response. The reply keeps id, opcode, RD, and CD, copies the
    /// question section verbatim, and starts out as FORMERR for the
    /// caller to override. If the query advertised EDNS, the reply
    /// advertises `max_udp` back.
    pub fn reply(&self, max_udp: u16) -> Result<Self> {
        if self.header.is_response() {
            return Err(Error::ErroneousQr);
        }

        let mut header = Header::new(self.header.id);
        header.opcode = self.header.opcode;
        header.rcode = Rcode::FormErr;
        header.set_response(true);
        header.set_recursion_desired(self.header.recursion_desired());
        header.set_checking_disabled(self.header.checking_disabled());

        let mut reply = Self::from_header(header);
        reply.questions = self.questions.clone();
        reply.edns = self.edns.as_ref().map(|_| Edns::with_udp_size(max_udp));
        reply.refresh_counts();
        Ok(reply)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Message {
    /// Structural equality; transport metadata does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.questions == other.questions
            && self.answers == other.answers
            && self.authority == other.authority
            && self.additional == other.additional
            && self.edns == other.edns
    }
}

impl Eq for Message {}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let update = self.header.opcode == Opcode::Update;

        writeln!(f, ";; ->>HEADER<<- {}", self.header)?;

        if let Some(edns) = &self.edns {
            writeln!(f, ";; OPT PSEUDOSECTION:")?;
            writeln!(f, "; {edns}")?;
        }

        writeln!(
            f,
            "\n;; {} SECTION:",
            if update { "ZONE" } else { "QUESTION" }
        )?;
        for q in &self.questions {
            writeln!(f, ";{q}")?;
        }

        let sections: [(&str, &[ResourceRecord]); 3] = [
            (
                if update { "PREREQUISITE" } else { "ANSWER" },
                &self.answers,
            ),
            (
                if update { "UPDATE" } else { "AUTHORITY" },
                &self.authority,
            ),
            ("ADDITIONAL", &self.additional),
        ];
        for (label, records) in sections {
            if !records.is_empty() {
                writeln!(f, "\n;; {label} SECTION:")?;
                for r in records {
                    writeln!(f, "{r}")?;
                }
            }
        }

        Ok(())
    }
}
