//! # Kestrel DNS wire format
//!
//! Encoding, decoding, truncation, and pretty-printing of DNS messages
//! per RFC 1035 and the extensions that matter on the wire:
//!
//! - **Name compression** (RFC 1035 §4.1.4): suffix pointers emitted
//!   against a per-message table, expanded eagerly on parse with cycle
//!   detection that survives hostile input.
//! - **Four-section framing** with the RFC 2136 UPDATE overloads kept
//!   as behavior, not as a forked data model.
//! - **EDNS(0)** (RFC 6891): the OPT pseudo-record spliced to and from
//!   a structured view.
//! - **Truncation** (RFC 2181 §9): optional data first and silently,
//!   required data only with TC raised.
//!
//! Transaction signatures live in the companion `kestrel-tsig` crate.
//!
//! ## Example
//!
//! ```rust
//! use kestrel_proto::{Message, Name, Question};
//! use std::str::FromStr;
//!
//! let query = Message::query(Question::a(Name::from_str("example.com")?));
//! let wire = query.to_wire();
//!
//! let parsed = Message::parse(&wire)?;
//! assert_eq!(parsed, query);
//! # Ok::<(), kestrel_proto::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod edns;
pub mod error;
pub mod header;
pub mod message;
pub mod name;
pub mod opcode;
pub mod question;
pub mod rclass;
pub mod rcode;
pub mod rdata;
pub mod record;
pub mod rtype;
pub mod wire;

// Re-exports for convenience
pub use edns::{Edns, EdnsOption};
pub use error::{Error, Result};
pub use header::{Header, HeaderFlags, HEADER_SIZE};
pub use message::{Message, Section};
pub use name::{Name, NameParser};
pub use opcode::Opcode;
pub use question::Question;
pub use rclass::{Rclass, RecordClass};
pub use rcode::Rcode;
pub use rdata::{Opaque, RData};
pub use record::ResourceRecord;
pub use rtype::{RecordType, Rtype};

/// Maximum length of a label (RFC 1035).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum encoded length of a name, length octets and root included
/// (RFC 1035).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum UDP message size without EDNS(0) (RFC 1035); also the floor
/// for any truncation limit.
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;
