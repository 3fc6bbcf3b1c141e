//! Delta encoding: first byte verbatim, then wrapped byte-to-byte differences.
//!
//! Frame: `[original_len: u64 LE][first byte][delta_1] .. [delta_{n-1}]`.

use super::{corrupt, push_u64, split_len_prefix, Codec, Result, LEN_PREFIX};

#[derive(Debug, Default, Clone, Copy)]
pub struct DeltaCodec;

impl Codec for DeltaCodec {
    fn name(&self) -> &str {
        "delta"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let Some((&first, rest)) = input.split_first() else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(LEN_PREFIX + input.len());
        push_u64(&mut out, input.len() as u64);
        out.push(first);
        let mut prev = first;
        for &cur in rest {
            out.push(cur.wrapping_sub(prev));
            prev = cur;
        }
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let (orig_len, body) = split_len_prefix("delta", input)?;
        if orig_len == 0 {
            return Ok(Vec::new());
        }
        if (body.len() as u64) < orig_len {
            return Err(corrupt("delta", format!(
                "frame declares {orig_len} bytes but carries {}",
                body.len()
            )));
        }
        let mut out = Vec::with_capacity(orig_len as usize);
        let mut acc = 0u8;
        for (i, &d) in body[..orig_len as usize].iter().enumerate() {
            acc = if i == 0 { d } else { acc.wrapping_add(d) };
            out.push(acc);
        }
        Ok(out)
    }
}
