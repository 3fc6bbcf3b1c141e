//! Run-length encoding.
//!
//! The frame is a flat sequence of `(run_length, byte)` pairs with
//! `1 <= run_length <= 255`.  Runs longer than 255 are split across pairs.

use super::{corrupt, Codec, Result};

/// Longest run one pair can describe.
pub const MAX_RUN: usize = 255;

#[derive(Debug, Default, Clone, Copy)]
pub struct RleCodec;

impl Codec for RleCodec {
    fn name(&self) -> &str {
        "rle"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len().min(1 << 20));
        let mut i = 0usize;
        while i < input.len() {
            let byte = input[i];
            let run = input[i..]
                .iter()
                .take(MAX_RUN)
                .take_while(|&&b| b == byte)
                .count();
            out.push(run as u8);
            out.push(byte);
            i += run;
        }
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.len() % 2 != 0 {
            return Err(corrupt("rle", format!("frame length {} is odd", input.len())));
        }
        let mut out = Vec::with_capacity(input.len());
        for pair in input.chunks_exact(2) {
            out.extend(std::iter::repeat(pair[1]).take(pair[0] as usize));
        }
        Ok(out)
    }
}
