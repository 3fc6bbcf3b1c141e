//! LZSS with a 4 KiB window and a separate flag stream.
//!
//! Frame:
//! ```text
//! [original_len: u64 LE][flag_count: u32 LE][flags ..][data ..]
//! ```
//! Each token owns one flag bit, least-significant bit first within a flag
//! byte: `1` is a match, `0` a literal.  A match occupies two data bytes,
//! `(offset - 1) << 4 | (length - MIN_MATCH)` big-endian; a literal one byte.

use super::{capacity_hint, corrupt, push_u32, push_u64, split_len_prefix, Codec, Result};
use byteorder::{ByteOrder, LittleEndian};

pub const WINDOW_SIZE:    usize = 4096;
pub const LOOKAHEAD_SIZE: usize = 18;
pub const MIN_MATCH:      usize = 3;

const HEADER_SIZE: usize = 8 + 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct LzssCodec;

/// Longest match for `input[pos..]`, at most [`LOOKAHEAD_SIZE`] bytes.
/// Overlapping matches are allowed; the decoder copies byte by byte.
fn find_longest_match(input: &[u8], pos: usize) -> (usize, usize) {
    let search_start = pos.saturating_sub(WINDOW_SIZE);
    let max_len = LOOKAHEAD_SIZE.min(input.len() - pos);
    let mut best = (0usize, 0usize);

    for candidate in search_start..pos {
        let len = (0..max_len)
            .take_while(|&k| input[candidate + k] == input[pos + k])
            .count();
        if len > best.1 {
            best = (pos - candidate, len);
            if len == max_len {
                break;
            }
        }
    }
    best
}

impl Codec for LzssCodec {
    fn name(&self) -> &str {
        "lzss"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let mut flags = Vec::with_capacity(input.len() / 8 + 1);
        let mut data  = Vec::with_capacity(input.len());
        let mut flag_byte = 0u8;
        let mut flag_bit  = 0u32;
        let mut pos = 0usize;

        while pos < input.len() {
            let (offset, len) = find_longest_match(input, pos);
            if len >= MIN_MATCH {
                flag_byte |= 1 << flag_bit;
                let code = (((offset - 1) as u16) << 4) | (len - MIN_MATCH) as u16;
                data.extend_from_slice(&code.to_be_bytes());
                pos += len;
            } else {
                data.push(input[pos]);
                pos += 1;
            }

            flag_bit += 1;
            if flag_bit == 8 {
                flags.push(flag_byte);
                flag_byte = 0;
                flag_bit  = 0;
            }
        }
        if flag_bit > 0 {
            flags.push(flag_byte);
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + flags.len() + data.len());
        push_u64(&mut out, input.len() as u64);
        push_u32(&mut out, flags.len() as u32);
        out.extend_from_slice(&flags);
        out.extend_from_slice(&data);
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        if input.len() < HEADER_SIZE {
            return Err(corrupt("lzss", format!("frame is {} bytes, header needs {HEADER_SIZE}", input.len())));
        }
        let (orig_len, rest) = split_len_prefix("lzss", input)?;
        let flag_count = LittleEndian::read_u32(&rest[..4]) as usize;
        let rest = &rest[4..];
        if flag_count > rest.len() {
            return Err(corrupt("lzss", format!(
                "flag count {flag_count} exceeds the {} bytes remaining",
                rest.len()
            )));
        }
        let (flags, data) = rest.split_at(flag_count);

        let mut out: Vec<u8> = Vec::with_capacity(capacity_hint(orig_len, input.len()));
        let mut token = 0usize;
        let mut dpos  = 0usize;

        while (out.len() as u64) < orig_len {
            let flag = *flags.get(token / 8)
                .ok_or_else(|| corrupt("lzss", "ran out of flags before the recorded length"))?;
            let is_match = (flag >> (token % 8)) & 1 == 1;
            token += 1;

            if is_match {
                let pair = data.get(dpos..dpos + 2)
                    .ok_or_else(|| corrupt("lzss", "match token truncated"))?;
                dpos += 2;
                let code   = u16::from_be_bytes([pair[0], pair[1]]);
                let offset = usize::from(code >> 4) + 1;
                let len    = usize::from(code & 0x0F) + MIN_MATCH;
                if offset > out.len() {
                    return Err(corrupt("lzss", format!(
                        "back-reference offset {offset} with {} bytes decoded",
                        out.len()
                    )));
                }
                let start = out.len() - offset;
                let remaining = (orig_len - out.len() as u64) as usize;
                for k in 0..len.min(remaining) {
                    let b = out[start + k];
                    out.push(b);
                }
            } else {
                let &byte = data.get(dpos)
                    .ok_or_else(|| corrupt("lzss", "literal token truncated"))?;
                dpos += 1;
                out.push(byte);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;

    /// Size of an LZSS frame holding only literals.
    fn all_literal_size(n: usize) -> usize {
        HEADER_SIZE + n.div_ceil(8) + n
    }

    #[test]
    fn alternating_pattern_beats_literals() {
        let data = b"ABABABABAB";
        let enc = LzssCodec.compress(data).unwrap();
        // A, B, then one match (offset 2, length 8): flags 0b100
        assert_eq!(&enc[8..12], &1u32.to_le_bytes());
        assert_eq!(enc[12], 0b0000_0100);
        assert_eq!(&enc[13..], &[b'A', b'B', 0x00, 0x15]);
        assert!(enc.len() < all_literal_size(data.len()));
        assert_eq!(LzssCodec.decompress(&enc).unwrap(), data);
    }

    #[test]
    fn matches_cap_at_lookahead() {
        let data = vec![0u8; 1000];
        let enc = LzssCodec.compress(&data).unwrap();
        assert!(enc.len() < 200);
        assert_eq!(LzssCodec.decompress(&enc).unwrap(), data);
    }

    #[test]
    fn far_match_uses_full_window() {
        let mut data: Vec<u8> = (0..4090u32).map(|i| (i.wrapping_mul(2654435761) >> 11) as u8).collect();
        let head = data[..20].to_vec();
        data.extend_from_slice(&head);
        assert_eq!(LzssCodec.decompress(&LzssCodec.compress(&data).unwrap()).unwrap(), data);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(LzssCodec.compress(&[]).unwrap().is_empty());
        assert!(LzssCodec.decompress(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncation_and_bad_offsets_are_rejected() {
        let enc = LzssCodec.compress(b"the quick brown fox, the quick brown fox").unwrap();
        for cut in [5, HEADER_SIZE, enc.len() - 1] {
            assert!(matches!(
                LzssCodec.decompress(&enc[..cut]),
                Err(CodecError::CorruptPayload { codec: "lzss", .. })
            ), "cut at {cut}");
        }

        // one match token referring back 16 bytes into an empty output
        let mut bad = Vec::new();
        push_u64(&mut bad, 3);
        push_u32(&mut bad, 1);
        bad.push(0b1);
        bad.extend_from_slice(&[0x00, 0xF0]);
        assert!(matches!(
            LzssCodec.decompress(&bad),
            Err(CodecError::CorruptPayload { codec: "lzss", .. })
        ));
    }
}
