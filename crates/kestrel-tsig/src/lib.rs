//! # Kestrel transaction signatures
//!
//! TSIG (RFC 2845) signing and verification for DNS messages,
//! including the multi-message chains used by zone transfers, plus
//! SIG(0) (RFC 2931) verification against caller-supplied public key
//! primitives.
//!
//! The signature record is always the last record of the additional
//! section. Its MAC covers the wire image of the message *before* the
//! signature record itself is appended; for responses and chained
//! messages, the previous MAC is fed into the digest input first,
//! length-prefixed. The opaque handle for that chaining is
//! [`TsigState`]: signing returns one, verification returns the next.
//!
//! ```rust,ignore
//! use kestrel_tsig::{sign, verify, TsigAlgorithm, TsigKey};
//!
//! let key = TsigKey::from_base64("tsig-key.example.", TsigAlgorithm::HmacSha256, "c2VjcmV0")?;
//!
//! // Request
//! let state = sign(&mut request, &key, now, None, true)?;
//!
//! // Response, keyed by the request's MAC
//! let state = verify(&response_wire, &key, now, Some(&state), true)?;
//! ```
//!
//! HMAC computation uses `hmac` + `sha2`; tag comparison is constant
//! time. Asymmetric SIG(0) algorithms stay behind the [`Sig0Verifier`]
//! trait so this crate carries no public key cryptography itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::str::FromStr;

use data_encoding::BASE64;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use thiserror::Error;
use tracing::{debug, warn};

use kestrel_proto::name::expand_name;
use kestrel_proto::{
    Header, Message, Name, NameParser, Rclass, RecordClass, RecordType, ResourceRecord, Rtype,
    HEADER_SIZE,
};

/// Default allowance for clock skew, in seconds (RFC 2845 suggests 300).
pub const DEFAULT_FUDGE: u16 = 300;

// ============================================================================
// Errors
// ============================================================================

/// Signature processing errors.
///
/// The `Bad*` variants mirror the RFC 2845 extended rcodes a server
/// would put in its response.
#[derive(Debug, Error)]
pub enum TsigError {
    /// Verification was requested but the message carries no trailing
    /// signature record.
    #[error("message is not signed")]
    SigNotPresent,

    /// The MAC or signature did not verify.
    #[error("signature verification failed")]
    BadSig,

    /// The key name or algorithm does not match the verification key.
    #[error("key {name} not recognized")]
    BadKey {
        /// The offered key name.
        name: Name,
    },

    /// The signing time is outside the fudge window.
    #[error("signature time {signed} outside window of {fudge}s around {now}")]
    BadTime {
        /// The time the message claims to be signed at.
        signed: u64,
        /// The verifier's clock.
        now: u64,
        /// The allowed skew.
        fudge: u16,
    },

    /// The MAC length does not match the algorithm output.
    #[error("MAC of {actual} octets, algorithm produces {expected}")]
    BadTrunc {
        /// Octets in the received MAC.
        actual: usize,
        /// Octets the algorithm produces.
        expected: usize,
    },

    /// The TSIG algorithm name is not one this crate computes.
    #[error("unsupported TSIG algorithm {name}")]
    UnsupportedAlgorithm {
        /// The algorithm name from the record.
        name: Name,
    },

    /// The signature RDATA does not follow its wire layout.
    #[error("malformed signature rdata")]
    MalformedRdata,

    /// Base64 key material failed to decode.
    #[error("invalid key material: {0}")]
    KeyMaterial(#[from] data_encoding::DecodeError),

    /// The message around the signature failed to decode.
    #[error(transparent)]
    Proto(#[from] kestrel_proto::Error),
}

impl TsigError {
    /// The RFC 2845 response code a server reports for this failure.
    pub fn rcode(&self) -> kestrel_proto::Rcode {
        use kestrel_proto::Rcode;
        match self {
            Self::BadKey { .. } | Self::UnsupportedAlgorithm { .. } => Rcode::BadKey,
            Self::BadTime { .. } => Rcode::BadTime,
            Self::BadTrunc { .. } => Rcode::BadTrunc,
            _ => Rcode::BADSIG,
        }
    }
}

/// Result type alias for signature operations.
pub type Result<T> = std::result::Result<T, TsigError>;

// ============================================================================
// Algorithms and keys
// ============================================================================

/// The HMAC algorithms this crate computes (RFC 2845, RFC 4635).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TsigAlgorithm {
    /// hmac-sha256
    HmacSha256,
    /// hmac-sha384
    HmacSha384,
    /// hmac-sha512
    HmacSha512,
}

impl TsigAlgorithm {
    /// Returns the algorithm's DNS name.
    pub fn name(self) -> Name {
        let s = match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        };
        Name::from_str(s).expect("static algorithm names are valid")
    }

    /// Looks an algorithm up by its DNS name, case-insensitively.
    pub fn from_name(name: &Name) -> Option<Self> {
        let presentation = name.to_presentation().to_ascii_lowercase();
        match presentation.trim_end_matches('.') {
            "hmac-sha256" => Some(Self::HmacSha256),
            "hmac-sha384" => Some(Self::HmacSha384),
            "hmac-sha512" => Some(Self::HmacSha512),
            _ => None,
        }
    }

    /// Octets of MAC the algorithm produces.
    pub const fn output_len(self) -> usize {
        match self {
            Self::HmacSha256 => 32,
            Self::HmacSha384 => 48,
            Self::HmacSha512 => 64,
        }
    }

    /// Computes the MAC over `data`.
    pub fn mac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Self::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Self::HmacSha384 => {
                let mut mac = Hmac::<Sha384>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Self::HmacSha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Verifies a MAC in constant time.
    pub fn verify(self, key: &[u8], data: &[u8], tag: &[u8]) -> bool {
        match self {
            Self::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.verify_slice(tag).is_ok()
            }
            Self::HmacSha384 => {
                let mut mac = Hmac::<Sha384>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.verify_slice(tag).is_ok()
            }
            Self::HmacSha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.verify_slice(tag).is_ok()
            }
        }
    }
}

/// A shared TSIG key: name, algorithm, and secret.
#[derive(Clone)]
pub struct TsigKey {
    name: Name,
    algorithm: TsigAlgorithm,
    secret: Vec<u8>,
}

impl TsigKey {
    /// Creates a key from raw secret octets.
    pub fn new(name: Name, algorithm: TsigAlgorithm, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            algorithm,
            secret: secret.into(),
        }
    }

    /// Creates a key from base64 secret material, the form key files
    /// and provisioning systems carry.
    pub fn from_base64(name: &str, algorithm: TsigAlgorithm, secret: &str) -> Result<Self> {
        let name = Name::from_str(name)?;
        let secret = BASE64.decode(secret.as_bytes())?;
        Ok(Self::new(name, algorithm, secret))
    }

    /// Returns the key name.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the algorithm.
    #[inline]
    pub fn algorithm(&self) -> TsigAlgorithm {
        self.algorithm
    }
}

impl std::fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret stays out of debug output.
        f.debug_struct("TsigKey")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TSIG RDATA
// ============================================================================

/// The TSIG RDATA layout (RFC 2845 Section 2.3).
///
/// ```text
/// Algorithm Name  (uncompressed domain name)
/// Time Signed     (48-bit seconds since the epoch)
/// Fudge           (u16)
/// MAC Size, MAC
/// Original ID     (u16)
/// Error           (u16)
/// Other Len, Other Data
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tsig {
    /// Algorithm name; never compressed on the wire.
    pub algorithm: Name,
    /// Signing time, 48-bit seconds since the Unix epoch.
    pub time: u64,
    /// Allowed clock skew in seconds.
    pub fudge: u16,
    /// The message authentication code.
    pub mac: Vec<u8>,
    /// The id of the original request, surviving forwarder rewrites.
    pub original_id: u16,
    /// Extended rcode for TSIG processing; zero in requests.
    pub error: u16,
    /// BADTIME responses carry the server clock here.
    pub other: Vec<u8>,
}

impl Tsig {
    /// Parses TSIG RDATA.
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        let (algorithm, consumed) = expand_name(rdata, 0)?;

        let read_u16 = |at: usize| -> Result<u16> {
            rdata
                .get(at..at + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .ok_or(TsigError::MalformedRdata)
        };

        let mut at = consumed;
        let time_high = read_u16(at)?;
        let time_low = rdata
            .get(at + 2..at + 6)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or(TsigError::MalformedRdata)?;
        let fudge = read_u16(at + 6)?;
        let mac_size = read_u16(at + 8)? as usize;
        at += 10;

        let mac = rdata
            .get(at..at + mac_size)
            .ok_or(TsigError::MalformedRdata)?
            .to_vec();
        at += mac_size;

        let original_id = read_u16(at)?;
        let error = read_u16(at + 2)?;
        let other_len = read_u16(at + 4)? as usize;
        at += 6;

        let other = rdata
            .get(at..at + other_len)
            .ok_or(TsigError::MalformedRdata)?
            .to_vec();

        Ok(Self {
            algorithm,
            time: u64::from(time_high) << 32 | u64::from(time_low),
            fudge,
            mac,
            original_id,
            error,
            other,
        })
    }

    /// Emits the RDATA in wire form.
    pub fn emit(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.algorithm.wire_len() + 16 + self.mac.len());
        emit_name_uncompressed(&mut buf, &self.algorithm);
        self.emit_timers(&mut buf);
        buf.extend_from_slice(&(self.mac.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.mac);
        buf.extend_from_slice(&self.original_id.to_be_bytes());
        buf.extend_from_slice(&self.error.to_be_bytes());
        buf.extend_from_slice(&(self.other.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.other);
        buf
    }

    /// Emits the TSIG variables that enter the MAC computation
    /// (RFC 2845 Section 3.4.2): key name, class, TTL, algorithm,
    /// timers, error, other data. Names go in canonical lowercase,
    /// uncompressed. The MAC itself is never part of its own input.
    pub fn emit_for_mac(&self, buf: &mut Vec<u8>, key_name: &Name) {
        emit_name_uncompressed(buf, &key_name.lowercased());
        buf.extend_from_slice(&RecordClass::ANY.to_u16().to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes()); // TTL
        emit_name_uncompressed(buf, &self.algorithm.lowercased());
        self.emit_timers(buf);
        buf.extend_from_slice(&self.error.to_be_bytes());
        buf.extend_from_slice(&(self.other.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.other);
    }

    /// Emits only time and fudge, the digest input for the second and
    /// later messages of a chain (RFC 2845 Section 4.4).
    pub fn emit_timers(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&((self.time >> 32) as u16).to_be_bytes());
        buf.extend_from_slice(&(self.time as u32).to_be_bytes());
        buf.extend_from_slice(&self.fudge.to_be_bytes());
    }
}

fn emit_name_uncompressed(buf: &mut Vec<u8>, name: &Name) {
    let wire = name.as_wire();
    if wire.is_empty() {
        buf.push(0);
    } else {
        buf.extend_from_slice(wire);
    }
}

// ============================================================================
// Signing and verification
// ============================================================================

/// The chaining handle: the last MAC used on a connection.
///
/// Signing a message returns one; verifying a message returns the
/// next. Pass it along to tie a response to its request (RFC 2845
/// Section 4.1) or each message of a transfer to its predecessor
/// (Section 4.4). The state is an explicit value, not hidden transport
/// state, so a chain can be resumed or inspected anywhere.
#[derive(Debug, Clone)]
pub struct TsigState {
    key_name: Name,
    mac: Vec<u8>,
    time: u64,
}

impl TsigState {
    /// Returns the key name the chain is running under.
    #[inline]
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Returns the MAC of the last message.
    #[inline]
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// Returns the signing time of the last message.
    #[inline]
    pub const fn time(&self) -> u64 {
        self.time
    }
}

/// Signs a message, appending a TSIG record to its additional section.
///
/// The MAC covers `[prev.mac length-prefixed ||] message || TSIG
/// variables`, where the message is its wire image before the TSIG is
/// appended. `prev` is `None` for an initial request, the request's
/// state when signing a response, or the preceding message's state in
/// a chain. `first` selects the full TSIG variables; pass `false` for
/// the second and later messages of a chain, which digest only the
/// timers.
///
/// Returns the state for the next message.
pub fn sign(
    message: &mut Message,
    key: &TsigKey,
    now: u64,
    prev: Option<&TsigState>,
    first: bool,
) -> Result<TsigState> {
    let mut tsig = Tsig {
        algorithm: key.algorithm.name(),
        time: now & 0x0000_FFFF_FFFF_FFFF,
        fudge: DEFAULT_FUDGE,
        mac: Vec::new(),
        original_id: message.id(),
        error: 0,
        other: Vec::new(),
    };

    let mut input = Vec::with_capacity(message.wire_len() + 96);
    if let Some(prev) = prev {
        input.extend_from_slice(&(prev.mac.len() as u16).to_be_bytes());
        input.extend_from_slice(&prev.mac);
    }
    input.extend_from_slice(&message.to_wire());
    if first {
        tsig.emit_for_mac(&mut input, &key.name);
    } else {
        tsig.emit_timers(&mut input);
    }

    tsig.mac = key.algorithm.mac(&key.secret, &input);
    debug!(key = %key.name, id = message.id(), "signed message");

    let state = TsigState {
        key_name: key.name.clone(),
        mac: tsig.mac.clone(),
        time: tsig.time,
    };

    let record = ResourceRecord::opaque(
        key.name.clone(),
        Rtype::Known(RecordType::TSIG),
        Rclass::Known(RecordClass::ANY),
        0,
        tsig.emit(),
    );
    message.push(kestrel_proto::Section::Additional, record);

    Ok(state)
}

/// Verifies the TSIG on a received message.
///
/// The signature record must be the last record of the additional
/// section. The signed image is rebuilt from the raw bytes: the header
/// with the record count decremented and the original id restored,
/// every other record copied verbatim (no decompression), then the
/// TSIG variables (only the timers for the non-first messages of a
/// chain).
///
/// On success returns the state to verify the next message against.
/// Failures are values; nothing here panics on hostile input.
pub fn verify(
    wire: &[u8],
    key: &TsigKey,
    now: u64,
    prev: Option<&TsigState>,
    first: bool,
) -> Result<TsigState> {
    let (sig, tsig_start, header) = locate_signature(wire)?;

    if !sig.rtype().is(RecordType::TSIG) {
        return Err(TsigError::SigNotPresent);
    }
    let rdata = sig.rdata().as_opaque().ok_or(TsigError::MalformedRdata)?;
    let tsig = Tsig::parse(rdata)?;

    if *sig.name() != key.name {
        warn!(offered = %sig.name(), expected = %key.name, "TSIG key name mismatch");
        return Err(TsigError::BadKey {
            name: sig.name().clone(),
        });
    }
    match TsigAlgorithm::from_name(&tsig.algorithm) {
        Some(algorithm) if algorithm == key.algorithm => {}
        Some(_) => {
            return Err(TsigError::BadKey {
                name: sig.name().clone(),
            })
        }
        None => {
            return Err(TsigError::UnsupportedAlgorithm {
                name: tsig.algorithm.clone(),
            })
        }
    }
    if tsig.mac.len() != key.algorithm.output_len() {
        return Err(TsigError::BadTrunc {
            actual: tsig.mac.len(),
            expected: key.algorithm.output_len(),
        });
    }

    let mut input = Vec::with_capacity(wire.len() + 96);
    if let Some(prev) = prev {
        input.extend_from_slice(&(prev.mac.len() as u16).to_be_bytes());
        input.extend_from_slice(&prev.mac);
    }

    let mut stripped = header.clone();
    stripped.ar_count -= 1;
    stripped.id = tsig.original_id;
    input.extend_from_slice(&stripped.to_wire());
    input.extend_from_slice(&wire[HEADER_SIZE..tsig_start]);
    if first {
        tsig.emit_for_mac(&mut input, sig.name());
    } else {
        tsig.emit_timers(&mut input);
    }

    if !key.algorithm.verify(&key.secret, &input, &tsig.mac) {
        warn!(key = %key.name, "TSIG MAC verification failed");
        return Err(TsigError::BadSig);
    }

    if now.abs_diff(tsig.time) > u64::from(tsig.fudge) {
        return Err(TsigError::BadTime {
            signed: tsig.time,
            now,
            fudge: tsig.fudge,
        });
    }

    debug!(key = %key.name, "TSIG verified");
    Ok(TsigState {
        key_name: sig.name().clone(),
        mac: tsig.mac,
        time: tsig.time,
    })
}

/// Walks the raw message to its last additional record.
///
/// Returns the parsed record, the offset it starts at, and the header.
/// Everything before that offset must be preserved verbatim for the
/// digest, so only names are skipped, never re-encoded.
fn locate_signature(wire: &[u8]) -> Result<(ResourceRecord, usize, Header)> {
    let header = Header::parse(wire)?;
    if header.ar_count == 0 {
        return Err(TsigError::SigNotPresent);
    }

    let parser = NameParser::new(wire);
    let mut offset = HEADER_SIZE;

    for _ in 0..header.qd_count {
        let name_len = parser.skip_name(offset)?;
        offset += name_len + 4;
        if offset > wire.len() {
            return Err(kestrel_proto::Error::truncated_section(offset, 4).into());
        }
    }

    for _ in 0..header.record_count() - 1 {
        offset += ResourceRecord::skip(wire, offset)?;
    }

    let (record, _) = ResourceRecord::parse(wire, offset)?;
    Ok((record, offset, header))
}

// ============================================================================
// SIG(0)
// ============================================================================

/// Public key signature verification, supplied by the caller.
///
/// SIG(0) algorithms are asymmetric; this crate prepares the signed
/// data and leaves the cryptography to the implementation behind this
/// trait.
pub trait Sig0Verifier {
    /// Returns true if `signature` over `signed` verifies under the
    /// KEY record's RDATA for the given algorithm number.
    fn verify(&self, algorithm: u8, key_rdata: &[u8], signed: &[u8], signature: &[u8]) -> bool;
}

/// The SIG RDATA layout as used by SIG(0) (RFC 2931, RFC 2535).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sig0 {
    /// Must be zero for SIG(0).
    pub type_covered: u16,
    /// Signature algorithm number.
    pub algorithm: u8,
    /// Label count; unused by SIG(0).
    pub labels: u8,
    /// Original TTL; unused by SIG(0).
    pub original_ttl: u32,
    /// Expiration time, seconds since the epoch.
    pub expiration: u32,
    /// Inception time, seconds since the epoch.
    pub inception: u32,
    /// Key tag of the signing key.
    pub key_tag: u16,
    /// Name of the signing key.
    pub signer: Name,
    /// The signature octets.
    pub signature: Vec<u8>,
}

impl Sig0 {
    /// Parses SIG RDATA.
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 18 {
            return Err(TsigError::MalformedRdata);
        }

        let (signer, consumed) = expand_name(rdata, 18)?;
        let signature = rdata
            .get(18 + consumed..)
            .ok_or(TsigError::MalformedRdata)?
            .to_vec();

        Ok(Self {
            type_covered: u16::from_be_bytes([rdata[0], rdata[1]]),
            algorithm: rdata[2],
            labels: rdata[3],
            original_ttl: u32::from_be_bytes([rdata[4], rdata[5], rdata[6], rdata[7]]),
            expiration: u32::from_be_bytes([rdata[8], rdata[9], rdata[10], rdata[11]]),
            inception: u32::from_be_bytes([rdata[12], rdata[13], rdata[14], rdata[15]]),
            key_tag: u16::from_be_bytes([rdata[16], rdata[17]]),
            signer,
            signature,
        })
    }

    /// Emits the RDATA with the signature appended.
    pub fn emit(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(18 + self.signer.wire_len() + self.signature.len());
        self.emit_fixed(&mut buf);
        emit_name_uncompressed(&mut buf, &self.signer);
        buf.extend_from_slice(&self.signature);
        buf
    }

    /// Emits the RDATA without the signature: the leading part of the
    /// data to be signed (RFC 2931 Section 4). The signer name goes in
    /// canonical lowercase here, while [`emit`](Self::emit) transmits
    /// it as given.
    pub fn emit_partial(&self, buf: &mut Vec<u8>) {
        self.emit_fixed(buf);
        emit_name_uncompressed(buf, &self.signer.lowercased());
    }

    fn emit_fixed(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.type_covered.to_be_bytes());
        buf.push(self.algorithm);
        buf.push(self.labels);
        buf.extend_from_slice(&self.original_ttl.to_be_bytes());
        buf.extend_from_slice(&self.expiration.to_be_bytes());
        buf.extend_from_slice(&self.inception.to_be_bytes());
        buf.extend_from_slice(&self.key_tag.to_be_bytes());
    }
}

/// Verifies a SIG(0) signature against a set of KEY records.
///
/// The trailing SIG record is stripped, the signed data rebuilt as
/// `SIG-rdata-sans-signature || message-sans-SIG`, and each offered
/// KEY tried in turn; any single success verifies the message.
pub fn verify_sig0(
    wire: &[u8],
    keys: &[ResourceRecord],
    verifier: &dyn Sig0Verifier,
) -> Result<()> {
    let (sig, sig_start, header) = locate_signature(wire)?;

    if !sig.rtype().is(RecordType::SIG) {
        return Err(TsigError::SigNotPresent);
    }
    let rdata = sig.rdata().as_opaque().ok_or(TsigError::MalformedRdata)?;
    let sig0 = Sig0::parse(rdata)?;
    if sig0.type_covered != 0 {
        return Err(TsigError::MalformedRdata);
    }

    let mut signed = Vec::with_capacity(wire.len() + 64);
    sig0.emit_partial(&mut signed);

    let mut stripped = header.clone();
    stripped.ar_count -= 1;
    signed.extend_from_slice(&stripped.to_wire());
    signed.extend_from_slice(&wire[HEADER_SIZE..sig_start]);

    for key in keys {
        if !key.rtype().is(RecordType::KEY) {
            continue;
        }
        let Some(key_rdata) = key.rdata().as_opaque() else {
            continue;
        };
        if verifier.verify(sig0.algorithm, key_rdata, &signed, &sig0.signature) {
            debug!(signer = %sig0.signer, "SIG(0) verified");
            return Ok(());
        }
    }

    warn!(signer = %sig0.signer, "SIG(0) verification failed for all keys");
    Err(TsigError::BadSig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_proto::{Question, Section};
    use sha2::Digest;

    const NOW: u64 = 1_700_000_000;

    fn test_key() -> TsigKey {
        TsigKey::new(
            Name::from_str("tsig-key.example.").unwrap(),
            TsigAlgorithm::HmacSha256,
            b"a very secret key".to_vec(),
        )
    }

    fn query(name: &str) -> Message {
        let mut msg = Message::query(Question::a(Name::from_str(name).unwrap()));
        msg.set_id(0x4242);
        msg
    }

    #[test]
    fn test_tsig_rdata_roundtrip() {
        let tsig = Tsig {
            algorithm: Name::from_str("hmac-sha256").unwrap(),
            time: 0x0000_1234_5678_9ABC,
            fudge: 300,
            mac: vec![0xAB; 32],
            original_id: 0x4242,
            error: 0,
            other: vec![1, 2, 3],
        };

        let parsed = Tsig::parse(&tsig.emit()).unwrap();
        assert_eq!(parsed, tsig);
    }

    #[test]
    fn test_algorithm_names() {
        for alg in [
            TsigAlgorithm::HmacSha256,
            TsigAlgorithm::HmacSha384,
            TsigAlgorithm::HmacSha512,
        ] {
            assert_eq!(TsigAlgorithm::from_name(&alg.name()), Some(alg));
        }
        assert_eq!(
            TsigAlgorithm::from_name(&Name::from_str("HMAC-SHA256.").unwrap()),
            Some(TsigAlgorithm::HmacSha256)
        );
        assert_eq!(
            TsigAlgorithm::from_name(&Name::from_str("gss-tsig").unwrap()),
            None
        );
    }

    #[test]
    fn test_key_from_base64() {
        let key = TsigKey::from_base64("k.example.", TsigAlgorithm::HmacSha256, "c2VjcmV0")
            .unwrap();
        assert_eq!(key.name().to_string(), "k.example.");

        assert!(matches!(
            TsigKey::from_base64("k.example.", TsigAlgorithm::HmacSha256, "!!!"),
            Err(TsigError::KeyMaterial(_))
        ));
    }

    #[test]
    fn test_sign_appends_trailing_tsig() {
        let key = test_key();
        let mut msg = query("example.com");
        sign(&mut msg, &key, NOW, None, true).unwrap();

        let last = msg.additional().last().unwrap();
        assert!(last.rtype().is(RecordType::TSIG));
        assert!(last.rclass().is(RecordClass::ANY));
        assert_eq!(last.ttl(), 0);
        assert_eq!(last.name(), key.name());
    }

    #[test]
    fn test_sign_verify_single_message() {
        let key = test_key();
        let mut msg = query("example.com");
        let state = sign(&mut msg, &key, NOW, None, true).unwrap();

        let wire = msg.to_wire();
        let verified = verify(&wire, &key, NOW + 10, None, true).unwrap();

        assert_eq!(verified.mac(), state.mac());
        assert_eq!(verified.time(), NOW);
    }

    #[test]
    fn test_verify_survives_id_rewrite() {
        // Forwarders may rewrite the message id; the MAC covers the
        // original id carried inside the TSIG rdata.
        let key = test_key();
        let mut msg = query("example.com");
        sign(&mut msg, &key, NOW, None, true).unwrap();

        let mut wire = msg.to_wire().to_vec();
        wire[0] = 0xDE;
        wire[1] = 0xAD;

        verify(&wire, &key, NOW, None, true).unwrap();
    }

    #[test]
    fn test_reply_signed_with_request_mac() {
        let key = test_key();

        let mut request = query("example.com");
        let request_state = sign(&mut request, &key, NOW, None, true).unwrap();
        let request_wire = request.to_wire();

        // Server side: verify the request, build a reply, sign it with
        // the request's MAC in the digest input.
        let server_state = verify(&request_wire, &key, NOW, None, true).unwrap();
        let mut response = request.reply(512).unwrap();
        response.set_rcode(kestrel_proto::Rcode::NoError);
        sign(&mut response, &key, NOW + 1, Some(&server_state), true).unwrap();

        // Client side: the response must verify against the MAC of the
        // request it holds.
        let response_wire = response.to_wire();
        verify(&response_wire, &key, NOW + 1, Some(&request_state), true).unwrap();

        // Without the request MAC the digest input is wrong.
        assert!(matches!(
            verify(&response_wire, &key, NOW + 1, None, true),
            Err(TsigError::BadSig)
        ));
    }

    #[test]
    fn test_three_message_chain() {
        let key = test_key();
        let mut wires = Vec::new();
        let mut state: Option<TsigState> = None;

        for i in 0..3u8 {
            let mut msg = query(&format!("m{i}.example.com"));
            let next = sign(&mut msg, &key, NOW + u64::from(i), state.as_ref(), i == 0).unwrap();
            wires.push(msg.to_wire());
            state = Some(next);
        }

        let mut state: Option<TsigState> = None;
        for (i, wire) in wires.iter().enumerate() {
            let next = verify(wire, &key, NOW + 5, state.as_ref(), i == 0).unwrap();
            state = Some(next);
        }
    }

    #[test]
    fn test_chain_tamper_detected() {
        let key = test_key();
        let mut wires = Vec::new();
        let mut state: Option<TsigState> = None;

        for i in 0..3u8 {
            let mut msg = query(&format!("m{i}.example.com"));
            let next = sign(&mut msg, &key, NOW, state.as_ref(), i == 0).unwrap();
            wires.push(msg.to_wire().to_vec());
            state = Some(next);
        }

        // Flip one octet of the middle message's MAC.
        let len = wires[1].len();
        wires[1][len - 20] ^= 0xFF;

        let first = verify(&wires[0], &key, NOW, None, true).unwrap();
        let broken = verify(&wires[1], &key, NOW, Some(&first), false);
        assert!(matches!(broken, Err(TsigError::BadSig)));
        assert_eq!(broken.unwrap_err().rcode(), kestrel_proto::Rcode::BADSIG);
    }

    #[test]
    fn test_unsigned_message_rejected() {
        let key = test_key();
        let msg = query("example.com");
        assert!(matches!(
            verify(&msg.to_wire(), &key, NOW, None, true),
            Err(TsigError::SigNotPresent)
        ));
    }

    #[test]
    fn test_wrong_key_name() {
        let key = test_key();
        let other = TsigKey::new(
            Name::from_str("other-key.example.").unwrap(),
            TsigAlgorithm::HmacSha256,
            b"a very secret key".to_vec(),
        );

        let mut msg = query("example.com");
        sign(&mut msg, &key, NOW, None, true).unwrap();

        let err = verify(&msg.to_wire(), &other, NOW, None, true).unwrap_err();
        assert!(matches!(err, TsigError::BadKey { .. }));
        assert_eq!(err.rcode(), kestrel_proto::Rcode::BadKey);
    }

    #[test]
    fn test_time_outside_fudge() {
        let key = test_key();
        let mut msg = query("example.com");
        sign(&mut msg, &key, NOW, None, true).unwrap();

        let err = verify(
            &msg.to_wire(),
            &key,
            NOW + u64::from(DEFAULT_FUDGE) + 1,
            None,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, TsigError::BadTime { .. }));
        assert_eq!(err.rcode(), kestrel_proto::Rcode::BadTime);
    }

    #[test]
    fn test_truncated_mac_rejected() {
        let key = test_key();
        let mut msg = query("example.com");
        let state = sign(&mut msg, &key, NOW, None, true).unwrap();

        // Rebuild the TSIG with a halved MAC.
        let tsig_rr = msg.pop(Section::Additional).unwrap();
        let mut tsig = Tsig::parse(tsig_rr.rdata().as_opaque().unwrap()).unwrap();
        tsig.mac.truncate(16);
        msg.push(
            Section::Additional,
            ResourceRecord::opaque(
                key.name().clone(),
                Rtype::Known(RecordType::TSIG),
                Rclass::Known(RecordClass::ANY),
                0,
                tsig.emit(),
            ),
        );

        let err = verify(&msg.to_wire(), &key, NOW, None, true).unwrap_err();
        assert!(matches!(
            err,
            TsigError::BadTrunc {
                actual: 16,
                expected: 32,
            }
        ));
        drop(state);
    }

    // A toy SIG(0) scheme for tests: signature = SHA-256(key || data).
    struct StubVerifier;

    impl Sig0Verifier for StubVerifier {
        fn verify(&self, algorithm: u8, key_rdata: &[u8], signed: &[u8], signature: &[u8]) -> bool {
            algorithm == 253 && stub_sign(key_rdata, signed) == signature
        }
    }

    fn stub_sign(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut hasher = sha2::Sha256::new();
        hasher.update(key);
        hasher.update(data);
        hasher.finalize().to_vec()
    }

    fn key_record(name: &str, material: &[u8]) -> ResourceRecord {
        ResourceRecord::opaque(
            Name::from_str(name).unwrap(),
            Rtype::Known(RecordType::KEY),
            Rclass::Known(RecordClass::IN),
            0,
            material.to_vec(),
        )
    }

    #[test]
    fn test_sig0_verify() {
        let key_material = b"public key bits";
        let mut msg = query("update.example.com");

        // Build the signature over SIG-rdata-sans-signature + message.
        let mut sig0 = Sig0 {
            type_covered: 0,
            algorithm: 253,
            labels: 0,
            original_ttl: 0,
            expiration: (NOW + 300) as u32,
            inception: NOW as u32,
            key_tag: 7,
            signer: Name::from_str("signer.example.").unwrap(),
            signature: Vec::new(),
        };

        let mut signed = Vec::new();
        sig0.emit_partial(&mut signed);
        signed.extend_from_slice(&msg.to_wire());
        sig0.signature = stub_sign(key_material, &signed);

        msg.push(
            Section::Additional,
            ResourceRecord::opaque(
                sig0.signer.clone(),
                Rtype::Known(RecordType::SIG),
                Rclass::Known(RecordClass::ANY),
                0,
                sig0.emit(),
            ),
        );
        let wire = msg.to_wire();

        // Any one matching key suffices.
        let keys = [
            key_record("wrong.example.", b"not the key"),
            key_record("signer.example.", key_material),
        ];
        verify_sig0(&wire, &keys, &StubVerifier).unwrap();

        // No matching key: BADSIG.
        let bad_keys = [key_record("wrong.example.", b"not the key")];
        assert!(matches!(
            verify_sig0(&wire, &bad_keys, &StubVerifier),
            Err(TsigError::BadSig)
        ));

        // A tampered message breaks the signature.
        let mut tampered = wire.to_vec();
        tampered[HEADER_SIZE + 1] ^= 0x20;
        assert!(matches!(
            verify_sig0(&tampered, &keys, &StubVerifier),
            Err(TsigError::BadSig)
        ));
    }
}
