//! Codec contract, stable algorithm identities and the shared error type.
//!
//! # Identity rules
//! Every algorithm is identified on disk by a single [`AlgorithmId`] byte.
//! These values are permanent: an id is never renumbered or reused, because
//! it is persisted in every container ever written.  The lowercase name
//! returned by [`Codec::name`] is the registry key and the CLI spelling.
//!
//! # Statelessness
//! Codec values carry no state between calls.  The parallel engine relies on
//! this to instantiate one fresh codec per block without any locking.
//!
//! # Endianness
//! Every multi-byte length or index inside a codec frame is little-endian.

use std::io;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Serialize, Serializer};
use thiserror::Error;

pub mod bits;
pub mod bwt;
pub mod delta;
pub mod huffman;
pub mod lz77;
pub mod lzss;
pub mod lzw;
pub mod rle;

pub use bwt::BwtCodec;
pub use delta::DeltaCodec;
pub use huffman::HuffmanCodec;
pub use lz77::Lz77Codec;
pub use lzss::LzssCodec;
pub use lzw::LzwCodec;
pub use rle::RleCodec;

// ── Frozen algorithm ids ─────────────────────────────────────────────────────

/// On-disk algorithm discriminant.  Written as one byte into every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AlgorithmId {
    Rle     = 1,
    Lz77    = 2,
    Huffman = 3,
    Lzw     = 4,
    Lzss    = 5,
    Delta   = 6,
    Bwt     = 7,
}

impl AlgorithmId {
    /// Every id known to this build, in registry listing order.
    pub const ALL: [AlgorithmId; 7] = [
        AlgorithmId::Rle,
        AlgorithmId::Lz77,
        AlgorithmId::Huffman,
        AlgorithmId::Lzw,
        AlgorithmId::Lzss,
        AlgorithmId::Delta,
        AlgorithmId::Bwt,
    ];

    /// The byte persisted in containers.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Resolve a persisted byte.  Returns `None` for ids unknown to this build.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(AlgorithmId::Rle),
            2 => Some(AlgorithmId::Lz77),
            3 => Some(AlgorithmId::Huffman),
            4 => Some(AlgorithmId::Lzw),
            5 => Some(AlgorithmId::Lzss),
            6 => Some(AlgorithmId::Delta),
            7 => Some(AlgorithmId::Bwt),
            _ => None,
        }
    }

    /// Stable lowercase name (registry key).
    pub fn name(self) -> &'static str {
        match self {
            AlgorithmId::Rle     => "rle",
            AlgorithmId::Lz77    => "lz77",
            AlgorithmId::Huffman => "huffman",
            AlgorithmId::Lzw     => "lzw",
            AlgorithmId::Lzss    => "lzss",
            AlgorithmId::Delta   => "delta",
            AlgorithmId::Bwt     => "bwt",
        }
    }

    /// Parse from a CLI string.  Matching is case-insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rle"     => Some(AlgorithmId::Rle),
            "lz77"    => Some(AlgorithmId::Lz77),
            "huffman" => Some(AlgorithmId::Huffman),
            "lzw"     => Some(AlgorithmId::Lzw),
            "lzss"    => Some(AlgorithmId::Lzss),
            "delta"   => Some(AlgorithmId::Delta),
            "bwt"     => Some(AlgorithmId::Bwt),
            _         => None,
        }
    }
}

impl TryFrom<u8> for AlgorithmId {
    type Error = CodecError;

    fn try_from(b: u8) -> Result<Self> {
        AlgorithmId::from_byte(b).ok_or_else(|| CodecError::UnknownAlgorithm(format!("id 0x{b:02x}")))
    }
}

impl std::fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// Serialized as the on-disk byte so JSON listings show the persisted value.
impl Serialize for AlgorithmId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_byte())
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    /// Envelope framing is wrong: bad magic, unsupported version, or a header
    /// shorter than its fixed size.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    /// A structural violation inside a codec payload.  Decoding never
    /// continues past one of these.
    #[error("Corrupt {codec} payload: {reason}")]
    CorruptPayload { codec: &'static str, reason: String },
    #[error("Size mismatch: expected {expected} bytes, decoded {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("Thread pool is shut down; task rejected")]
    PoolShutdown,
    /// The task panicked before producing a result.
    #[error("Worker task aborted before producing a result")]
    TaskAborted,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Shorthand for building a [`CodecError::CorruptPayload`].
pub(crate) fn corrupt(codec: &'static str, reason: impl Into<String>) -> CodecError {
    CodecError::CorruptPayload { codec, reason: reason.into() }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

/// A lossless byte-stream transform.
///
/// `compress` must accept every input, returning an empty vector for empty
/// input.  `decompress(compress(x)) == x` must hold for every `x`, and
/// malformed input must produce an error rather than silently wrong bytes.
pub trait Codec: Send + Sync {
    fn name(&self) -> &str;
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;
}

// ── Frame helpers ────────────────────────────────────────────────────────────

/// Byte width of the little-endian original-length prefix most codecs carry.
pub(crate) const LEN_PREFIX: usize = 8;

/// Split `input` into its 8-byte original-length prefix and the rest.
pub(crate) fn split_len_prefix<'a>(codec: &'static str, input: &'a [u8]) -> Result<(u64, &'a [u8])> {
    if input.len() < LEN_PREFIX {
        return Err(corrupt(codec, format!(
            "frame is {} bytes, shorter than the {LEN_PREFIX}-byte length prefix",
            input.len()
        )));
    }
    let (head, rest) = input.split_at(LEN_PREFIX);
    Ok((LittleEndian::read_u64(head), rest))
}

/// Append `value` as 8 little-endian bytes.
pub(crate) fn push_u64(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Append `value` as 4 little-endian bytes.
pub(crate) fn push_u32(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Capacity to reserve for an output whose length was read from untrusted
/// input.  Never trusts the declared length beyond a bounded expansion of
/// the bytes actually present.
pub(crate) fn capacity_hint(declared: u64, available: usize) -> usize {
    let bound = available.saturating_mul(64).max(4096) as u64;
    declared.min(bound) as usize
}
