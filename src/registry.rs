//! Algorithm registry: name/id resolution, codec construction and metadata.
//!
//! Every lookup builds a fresh, stateless codec.  The table below is the
//! single source of listing order, descriptions and categories.

use serde::Serialize;

use crate::codec::{
    AlgorithmId, BwtCodec, Codec, CodecError, DeltaCodec, HuffmanCodec, Lz77Codec, LzssCodec,
    LzwCodec, Result, RleCodec,
};

/// Broad family an algorithm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmCategory {
    Entropy,
    Dictionary,
    Transform,
    Hybrid,
}

impl AlgorithmCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmCategory::Entropy    => "entropy",
            AlgorithmCategory::Dictionary => "dictionary",
            AlgorithmCategory::Transform  => "transform",
            AlgorithmCategory::Hybrid     => "hybrid",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "entropy"    => Some(AlgorithmCategory::Entropy),
            "dictionary" => Some(AlgorithmCategory::Dictionary),
            "transform"  => Some(AlgorithmCategory::Transform),
            "hybrid"     => Some(AlgorithmCategory::Hybrid),
            _            => None,
        }
    }
}

impl std::fmt::Display for AlgorithmCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Introspection record for one registered algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlgorithmInfo {
    pub name:        &'static str,
    pub description: &'static str,
    pub category:    AlgorithmCategory,
    pub id:          AlgorithmId,
}

const ALGORITHMS: [AlgorithmInfo; 7] = [
    AlgorithmInfo {
        name:        "rle",
        description: "Run-length encoding of (count, byte) pairs",
        category:    AlgorithmCategory::Dictionary,
        id:          AlgorithmId::Rle,
    },
    AlgorithmInfo {
        name:        "lz77",
        description: "LZ77 sliding window (1 KiB window, matches up to 32 bytes)",
        category:    AlgorithmCategory::Dictionary,
        id:          AlgorithmId::Lz77,
    },
    AlgorithmInfo {
        name:        "huffman",
        description: "Static Huffman coding with an embedded code tree",
        category:    AlgorithmCategory::Entropy,
        id:          AlgorithmId::Huffman,
    },
    AlgorithmInfo {
        name:        "lzw",
        description: "LZW with fixed 12-bit codes and a 4096-entry dictionary",
        category:    AlgorithmCategory::Dictionary,
        id:          AlgorithmId::Lzw,
    },
    AlgorithmInfo {
        name:        "lzss",
        description: "LZSS (4 KiB window, 18-byte look-ahead, flag bit per token)",
        category:    AlgorithmCategory::Dictionary,
        id:          AlgorithmId::Lzss,
    },
    AlgorithmInfo {
        name:        "delta",
        description: "Byte-wise delta encoding with wrapping differences",
        category:    AlgorithmCategory::Transform,
        id:          AlgorithmId::Delta,
    },
    AlgorithmInfo {
        name:        "bwt",
        description: "Burrows-Wheeler transform followed by move-to-front",
        category:    AlgorithmCategory::Transform,
        id:          AlgorithmId::Bwt,
    },
];

// ── Factories ────────────────────────────────────────────────────────────────

/// Construct a fresh codec for `id`.
pub fn create_by_id(id: AlgorithmId) -> Box<dyn Codec> {
    match id {
        AlgorithmId::Rle     => Box::new(RleCodec),
        AlgorithmId::Lz77    => Box::new(Lz77Codec),
        AlgorithmId::Huffman => Box::new(HuffmanCodec),
        AlgorithmId::Lzw     => Box::new(LzwCodec),
        AlgorithmId::Lzss    => Box::new(LzssCodec),
        AlgorithmId::Delta   => Box::new(DeltaCodec),
        AlgorithmId::Bwt     => Box::new(BwtCodec),
    }
}

pub fn create_by_name(name: &str) -> Result<Box<dyn Codec>> {
    id_from_name(name).map(create_by_id)
}

/// Construct a codec from either a name (`"lzss"`) or a decimal id (`"5"`).
pub fn create(name_or_id: &str) -> Result<Box<dyn Codec>> {
    resolve(name_or_id).map(create_by_id)
}

/// Resolve a name or decimal id string to an [`AlgorithmId`].
pub fn resolve(name_or_id: &str) -> Result<AlgorithmId> {
    match name_or_id.trim().parse::<u8>() {
        Ok(b) => AlgorithmId::try_from(b),
        Err(_) => id_from_name(name_or_id),
    }
}

// ── Lookups ──────────────────────────────────────────────────────────────────

pub fn id_from_name(name: &str) -> Result<AlgorithmId> {
    AlgorithmId::from_name(name.trim())
        .ok_or_else(|| CodecError::UnknownAlgorithm(name.to_string()))
}

pub fn name_from_id(b: u8) -> Result<&'static str> {
    AlgorithmId::try_from(b).map(AlgorithmId::name)
}

pub fn info(id: AlgorithmId) -> &'static AlgorithmInfo {
    // ALGORITHMS is indexed in id order starting at 1.
    &ALGORITHMS[id.as_byte() as usize - 1]
}

/// Registered names in listing order.
pub fn list() -> Vec<&'static str> {
    ALGORITHMS.iter().map(|a| a.name).collect()
}

pub fn list_with_metadata() -> &'static [AlgorithmInfo] {
    &ALGORITHMS
}

pub fn algorithms_by_category(category: AlgorithmCategory) -> Vec<&'static str> {
    ALGORITHMS
        .iter()
        .filter(|a| a.category == category)
        .map(|a| a.name)
        .collect()
}
