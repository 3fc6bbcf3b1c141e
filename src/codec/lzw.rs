//! LZW with fixed 12-bit codes.
//!
//! Frame: `[original_len: u64 LE][12-bit codes, MSB first, zero-padded]`.
//!
//! The dictionary starts with the 256 single-byte strings and grows by one
//! entry per emitted code until it holds [`MAX_DICT_SIZE`] entries.  After
//! that it is frozen: existing entries keep matching, nothing is added.

use std::collections::HashMap;

use super::bits::{BitReader, BitWriter};
use super::{capacity_hint, corrupt, push_u64, split_len_prefix, Codec, CodecError, Result};

pub const CODE_BITS:         u32   = 12;
pub const INITIAL_DICT_SIZE: usize = 256;
pub const MAX_DICT_SIZE:     usize = 1 << CODE_BITS;

/// Marks a root entry (single byte, no prefix) in the decoder table.
const NO_PREFIX: u16 = u16::MAX;

#[derive(Debug, Default, Clone, Copy)]
pub struct LzwCodec;

/// Decoder-side dictionary.  Entry `c` is `expand(prefix[c]) ++ [suffix[c]]`.
struct DecodeTable {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
}

impl DecodeTable {
    fn new() -> Self {
        let mut prefix = Vec::with_capacity(MAX_DICT_SIZE);
        let mut suffix = Vec::with_capacity(MAX_DICT_SIZE);
        for b in 0..INITIAL_DICT_SIZE {
            prefix.push(NO_PREFIX);
            suffix.push(b as u8);
        }
        Self { prefix, suffix }
    }

    fn len(&self) -> usize {
        self.suffix.len()
    }

    fn is_full(&self) -> bool {
        self.len() >= MAX_DICT_SIZE
    }

    fn push(&mut self, prefix: u16, byte: u8) {
        self.prefix.push(prefix);
        self.suffix.push(byte);
    }

    /// Write the string for `code` into `buf` (replacing its contents).
    fn expand(&self, code: u16, buf: &mut Vec<u8>) {
        buf.clear();
        let mut c = code;
        loop {
            buf.push(self.suffix[c as usize]);
            match self.prefix[c as usize] {
                NO_PREFIX => break,
                p => c = p,
            }
        }
        buf.reverse();
    }
}

impl Codec for LzwCodec {
    fn name(&self) -> &str {
        "lzw"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let Some((&first, rest)) = input.split_first() else {
            return Ok(Vec::new());
        };

        // (prefix code, next byte) -> code; single bytes are implicit.
        let mut dict: HashMap<(u16, u8), u16> = HashMap::with_capacity(MAX_DICT_SIZE);
        let mut next_code = INITIAL_DICT_SIZE as u16;
        let mut writer = BitWriter::with_capacity(input.len());
        let mut current = u16::from(first);

        for &b in rest {
            if let Some(&code) = dict.get(&(current, b)) {
                current = code;
                continue;
            }
            writer.write_bits(u32::from(current), CODE_BITS);
            if usize::from(next_code) < MAX_DICT_SIZE {
                dict.insert((current, b), next_code);
                next_code += 1;
            }
            current = u16::from(b);
        }
        writer.write_bits(u32::from(current), CODE_BITS);

        let packed = writer.finish();
        let mut out = Vec::with_capacity(8 + packed.len());
        push_u64(&mut out, input.len() as u64);
        out.extend_from_slice(&packed);
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let (orig_len, body) = split_len_prefix("lzw", input)?;
        if orig_len == 0 {
            return Ok(Vec::new());
        }

        let mut reader = BitReader::new(body);
        let mut table  = DecodeTable::new();
        let mut out: Vec<u8> = Vec::with_capacity(capacity_hint(orig_len, input.len()));
        let mut entry  = Vec::new();
        let mut scratch = Vec::new();

        let first = reader.read_bits(CODE_BITS)
            .ok_or_else(|| corrupt("lzw", "no codes present"))? as u16;
        if usize::from(first) >= INITIAL_DICT_SIZE {
            return Err(corrupt("lzw", format!("first code {first} is not a single byte")));
        }
        table.expand(first, &mut entry);
        out.extend_from_slice(&entry);
        let mut prev = first;

        while (out.len() as u64) < orig_len {
            // Running out of whole codes is trailing padding, not an error.
            let Some(code) = reader.read_bits(CODE_BITS) else { break };
            let code = code as u16;

            if usize::from(code) < table.len() {
                table.expand(code, &mut entry);
            } else if usize::from(code) == table.len() && !table.is_full() {
                table.expand(prev, &mut scratch);
                entry.clear();
                entry.extend_from_slice(&scratch);
                entry.push(scratch[0]);
            } else {
                return Err(corrupt("lzw", format!(
                    "code {code} beyond dictionary of {} entries",
                    table.len()
                )));
            }

            out.extend_from_slice(&entry);
            if !table.is_full() {
                table.push(prev, entry[0]);
            }
            prev = code;
        }

        out.truncate(orig_len as usize);
        if out.len() as u64 != orig_len {
            return Err(CodecError::SizeMismatch { expected: orig_len, actual: out.len() as u64 });
        }
        Ok(out)
    }
}
