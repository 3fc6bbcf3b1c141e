//! LZ77 with a 1 KiB sliding window and byte-aligned tokens.
//!
//! Token stream, no header:
//! ```text
//! literal: 0x80 <byte>
//! match:   <length 3..=32, high bit clear> <offset hi> <offset lo>
//! ```
//! The offset field is 16 bits wide but the encoder never looks further back
//! than [`WINDOW_SIZE`], so real offsets stay at or below 1024.

use super::{corrupt, Codec, Result};

pub const WINDOW_SIZE: usize = 1024;
pub const MAX_MATCH:   usize = 32;
pub const MIN_MATCH:   usize = 3;
/// First byte of a literal token.  Any token byte with this bit set is a literal.
pub const LITERAL_FLAG: u8 = 0x80;

#[derive(Debug, Default, Clone, Copy)]
pub struct Lz77Codec;

/// Longest match for `input[pos..]` starting inside the window.
///
/// Candidates are scanned from the oldest position forward and only a
/// strictly longer match replaces the current best.  Matches may run past
/// `pos` (overlapping copy).
fn find_longest_match(input: &[u8], pos: usize) -> (usize, usize) {
    let window_start = pos.saturating_sub(WINDOW_SIZE);
    let max_len = MAX_MATCH.min(input.len() - pos);
    let mut best_len = 0usize;
    let mut best_offset = 0usize;

    for candidate in window_start..pos {
        let len = (0..max_len)
            .take_while(|&k| input[candidate + k] == input[pos + k])
            .count();
        if len > best_len && len >= MIN_MATCH {
            best_len = len;
            best_offset = pos - candidate;
            if best_len == MAX_MATCH {
                break;
            }
        }
    }
    (best_offset, best_len)
}

impl Codec for Lz77Codec {
    fn name(&self) -> &str {
        "lz77"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        let mut pos = 0usize;
        while pos < input.len() {
            let (offset, len) = find_longest_match(input, pos);
            if len >= MIN_MATCH && offset > 0 && offset <= 0xFFFF {
                out.push(len as u8);
                out.push((offset >> 8) as u8);
                out.push(offset as u8);
                pos += len;
            } else {
                out.push(LITERAL_FLAG);
                out.push(input[pos]);
                pos += 1;
            }
        }
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out: Vec<u8> = Vec::with_capacity(input.len() * 2);
        let mut pos = 0usize;

        while pos < input.len() {
            let token = input[pos];
            pos += 1;

            if token & LITERAL_FLAG != 0 {
                let &byte = input.get(pos)
                    .ok_or_else(|| corrupt("lz77", "literal token missing its byte"))?;
                out.push(byte);
                pos += 1;
                continue;
            }

            let len = token as usize;
            if !(MIN_MATCH..=MAX_MATCH).contains(&len) {
                return Err(corrupt("lz77", format!("match length {len} outside {MIN_MATCH}..={MAX_MATCH}")));
            }
            if pos + 2 > input.len() {
                return Err(corrupt("lz77", "match token missing offset bytes"));
            }
            let offset = (usize::from(input[pos]) << 8) | usize::from(input[pos + 1]);
            pos += 2;
            if offset == 0 || offset > out.len() {
                return Err(corrupt("lz77", format!(
                    "back-reference offset {offset} with {} bytes decoded",
                    out.len()
                )));
            }
            let start = out.len() - offset;
            for k in 0..len {
                let b = out[start + k];
                out.push(b);
            }
        }
        Ok(out)
    }
}
