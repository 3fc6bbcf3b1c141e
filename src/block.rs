//! Parallel envelope: a stream header followed by one header per block.
//!
//! ```text
//! [magic: 0xC4][version: 0x01][total_original_size: u64 LE][block_count: u32 LE]
//! { [original_size: u64 LE][compressed_size: u64 LE][payload ..] } * block_count
//! ```
//! The envelope does not record which codec produced the payloads.

use std::io::{self, Read};
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::codec::{CodecError, Result};

pub const PARALLEL_MAGIC:    u8    = 0xC4;
pub const VERSION:           u8    = 0x01;
pub const STREAM_HEADER_SIZE: usize = 1 + 1 + 8 + 4;
pub const BLOCK_HEADER_SIZE:  usize = 8 + 8;

fn malformed(msg: impl Into<String>) -> CodecError {
    CodecError::MalformedContainer(msg.into())
}

// ── Headers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub total_original_size: u64,
    pub block_count:         u32,
}

impl StreamHeader {
    pub fn to_bytes(&self) -> [u8; STREAM_HEADER_SIZE] {
        let mut buf = [0u8; STREAM_HEADER_SIZE];
        buf[0] = PARALLEL_MAGIC;
        buf[1] = VERSION;
        LittleEndian::write_u64(&mut buf[2..10], self.total_original_size);
        LittleEndian::write_u32(&mut buf[10..14], self.block_count);
        buf
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let magic = reader.read_u8()?;
        if magic != PARALLEL_MAGIC {
            return Err(malformed(format!(
                "bad magic 0x{magic:02x}, expected 0x{PARALLEL_MAGIC:02x}"
            )));
        }
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(malformed(format!("unsupported parallel version {version}")));
        }
        Ok(Self {
            total_original_size: reader.read_u64::<LittleEndian>()?,
            block_count:         reader.read_u32::<LittleEndian>()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub original_size:   u64,
    pub compressed_size: u64,
}

impl BlockHeader {
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        LittleEndian::write_u64(&mut buf[..8], self.original_size);
        LittleEndian::write_u64(&mut buf[8..], self.compressed_size);
        buf
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            original_size:   reader.read_u64::<LittleEndian>()?,
            compressed_size: reader.read_u64::<LittleEndian>()?,
        })
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// One block of a parsed envelope; `payload` indexes the envelope bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub header:  BlockHeader,
    pub payload: Range<usize>,
}

/// Stream header plus the block table of an envelope, without payload copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelLayout {
    pub header: StreamHeader,
    pub blocks: Vec<BlockEntry>,
}

impl ParallelLayout {
    /// Walk the block table.  Every byte of `data` must belong to the stream
    /// header, a block header or a block payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < STREAM_HEADER_SIZE {
            return Err(malformed(format!(
                "parallel envelope is {} bytes, header needs {STREAM_HEADER_SIZE}",
                data.len()
            )));
        }
        let header = StreamHeader::read(&data[..STREAM_HEADER_SIZE])?;

        // Each block needs at least its header, so the count is bounded by the data.
        let max_blocks = (data.len() - STREAM_HEADER_SIZE) / BLOCK_HEADER_SIZE;
        let mut blocks = Vec::with_capacity((header.block_count as usize).min(max_blocks));
        let mut pos = STREAM_HEADER_SIZE;
        let mut sum = 0u64;

        for i in 0..header.block_count {
            let head = data.get(pos..pos + BLOCK_HEADER_SIZE)
                .ok_or_else(|| malformed(format!("block {i} header truncated at offset {pos}")))?;
            let block = BlockHeader::read(head)?;
            pos += BLOCK_HEADER_SIZE;

            let end = usize::try_from(block.compressed_size)
                .ok()
                .and_then(|n| pos.checked_add(n))
                .filter(|&end| end <= data.len())
                .ok_or_else(|| malformed(format!(
                    "block {i} payload of {} bytes runs past the end",
                    block.compressed_size
                )))?;

            sum = sum.saturating_add(block.original_size);
            blocks.push(BlockEntry { header: block, payload: pos..end });
            pos = end;
        }

        if pos != data.len() {
            return Err(malformed(format!(
                "{} trailing bytes after the last block",
                data.len() - pos
            )));
        }
        if sum != header.total_original_size {
            return Err(CodecError::SizeMismatch {
                expected: header.total_original_size,
                actual:   sum,
            });
        }
        Ok(Self { header, blocks })
    }
}

/// Serialize an envelope from `(original_size, payload)` pairs in block order.
pub fn write_envelope(total_original_size: u64, blocks: &[(u64, Vec<u8>)]) -> Vec<u8> {
    let body: usize = blocks.iter().map(|(_, p)| BLOCK_HEADER_SIZE + p.len()).sum();
    let mut out = Vec::with_capacity(STREAM_HEADER_SIZE + body);

    let stream = StreamHeader { total_original_size, block_count: blocks.len() as u32 };
    out.extend_from_slice(&stream.to_bytes());
    for (original_size, payload) in blocks {
        let header = BlockHeader {
            original_size:   *original_size,
            compressed_size: payload.len() as u64,
        };
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(payload);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        write_envelope(7, &[(4, b"ab".to_vec()), (3, b"cde".to_vec())])
    }

    #[test]
    fn wire_layout() {
        let env = sample();
        assert_eq!(env[0], 0xC4);
        assert_eq!(env[1], 0x01);
        assert_eq!(&env[2..10], &7u64.to_le_bytes());
        assert_eq!(&env[10..14], &2u32.to_le_bytes());
        assert_eq!(&env[14..22], &4u64.to_le_bytes());
        assert_eq!(&env[22..30], &2u64.to_le_bytes());
        assert_eq!(&env[30..32], b"ab");
        assert_eq!(env.len(), STREAM_HEADER_SIZE + 2 * BLOCK_HEADER_SIZE + 5);
    }

    #[test]
    fn header_bytes_read_back() {
        let stream = StreamHeader { total_original_size: u64::MAX, block_count: 0x0102_0304 };
        let bytes = stream.to_bytes();
        assert_eq!(bytes[..2], [PARALLEL_MAGIC, VERSION]);
        assert_eq!(StreamHeader::read(&bytes[..]).unwrap(), stream);

        let block = BlockHeader { original_size: 9, compressed_size: 1 << 40 };
        assert_eq!(BlockHeader::read(&block.to_bytes()[..]).unwrap(), block);
        let empty = StreamHeader { total_original_size: 0, block_count: 0 };
        assert_eq!(write_envelope(0, &[]), empty.to_bytes().to_vec());
    }

    #[test]
    fn parse_yields_payload_ranges() {
        let env = sample();
        let layout = ParallelLayout::parse(&env).unwrap();
        assert_eq!(layout.header, StreamHeader { total_original_size: 7, block_count: 2 });
        assert_eq!(&env[layout.blocks[0].payload.clone()], b"ab");
        assert_eq!(&env[layout.blocks[1].payload.clone()], b"cde");
        assert_eq!(layout.blocks[1].header.original_size, 3);
    }

    #[test]
    fn header_errors_are_malformed() {
        let env = sample();
        assert!(matches!(ParallelLayout::parse(&env[..10]), Err(CodecError::MalformedContainer(_))));

        let mut bad = env.clone();
        bad[0] = 0xC3;
        assert!(matches!(ParallelLayout::parse(&bad), Err(CodecError::MalformedContainer(_))));

        let mut bad = env.clone();
        bad[1] = 2;
        assert!(matches!(ParallelLayout::parse(&bad), Err(CodecError::MalformedContainer(_))));
    }

    #[test]
    fn truncated_or_trailing_blocks_are_malformed() {
        let env = sample();
        // second block header cut in half
        assert!(matches!(ParallelLayout::parse(&env[..40]), Err(CodecError::MalformedContainer(_))));
        // last payload cut short
        assert!(matches!(
            ParallelLayout::parse(&env[..env.len() - 1]),
            Err(CodecError::MalformedContainer(_))
        ));
        // trailing garbage
        let mut bad = env.clone();
        bad.push(0);
        assert!(matches!(ParallelLayout::parse(&bad), Err(CodecError::MalformedContainer(_))));
        // absurd compressed size
        let mut bad = env.clone();
        bad[22..30].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(ParallelLayout::parse(&bad), Err(CodecError::MalformedContainer(_))));
    }

    #[test]
    fn block_sizes_must_sum_to_total() {
        let env = write_envelope(8, &[(4, b"ab".to_vec()), (3, b"cde".to_vec())]);
        assert!(matches!(
            ParallelLayout::parse(&env),
            Err(CodecError::SizeMismatch { expected: 8, actual: 7 })
        ));
    }

    #[test]
    fn empty_block_table() {
        let env = write_envelope(0, &[]);
        let layout = ParallelLayout::parse(&env).unwrap();
        assert!(layout.blocks.is_empty());
    }
}
