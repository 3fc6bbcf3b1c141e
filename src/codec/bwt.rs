//! Burrows–Wheeler transform followed by move-to-front recoding.
//!
//! Frame:
//! ```text
//! [original_len: u64 LE] { [primary_index: u64 LE][chunk_len: u64 LE][MTF bytes ..] }*
//! ```
//! Inputs are cut into independent chunks of at most [`MAX_BLOCK_SIZE`]
//! bytes; each chunk carries its own primary index.

use byteorder::{ByteOrder, LittleEndian};

use super::{capacity_hint, corrupt, push_u64, split_len_prefix, Codec, CodecError, Result};

/// Largest chunk transformed as one unit.
pub const MAX_BLOCK_SIZE: usize = 100_000;

const CHUNK_HEADER: usize = 8 + 8;

#[derive(Debug, Default, Clone, Copy)]
pub struct BwtCodec;

// ── Forward transform ────────────────────────────────────────────────────────

/// Sort the start positions of every cyclic rotation of `block`.
///
/// Prefix doubling: after the round with step `k` the ranks order rotations
/// by their first `2k` bytes, so once `2k >= n` the order is total up to
/// rotations that are byte-for-byte equal.
fn sort_rotations(block: &[u8]) -> Vec<usize> {
    let n = block.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rank: Vec<usize> = block.iter().map(|&b| b as usize).collect();
    let mut next = vec![0usize; n];
    let mut k = 1usize;

    loop {
        let key = |i: usize| (rank[i], rank[(i + k) % n]);
        order.sort_unstable_by_key(|&i| key(i));

        next[order[0]] = 0;
        for w in 1..n {
            let bump = usize::from(key(order[w]) != key(order[w - 1]));
            next[order[w]] = next[order[w - 1]] + bump;
        }
        std::mem::swap(&mut rank, &mut next);

        if rank[order[n - 1]] == n - 1 || 2 * k >= n {
            break;
        }
        k *= 2;
    }
    order
}

/// Returns the last column of the sorted rotation matrix and the row holding
/// the unrotated input.
pub fn forward(block: &[u8]) -> (Vec<u8>, usize) {
    if block.is_empty() {
        return (Vec::new(), 0);
    }
    let n = block.len();
    let mut last = Vec::with_capacity(n);
    let mut primary = 0usize;
    for (row, &start) in sort_rotations(block).iter().enumerate() {
        if start == 0 {
            primary = row;
            last.push(block[n - 1]);
        } else {
            last.push(block[start - 1]);
        }
    }
    (last, primary)
}

// ── Inverse transform ────────────────────────────────────────────────────────

/// Invert [`forward`] in O(n) with an LF mapping built by counting sort.
pub fn inverse(last: &[u8], primary: usize) -> Result<Vec<u8>> {
    let n = last.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if primary >= n {
        return Err(corrupt("bwt", format!("primary index {primary} out of range for chunk of {n}")));
    }

    let mut count = [0usize; 256];
    for &b in last {
        count[b as usize] += 1;
    }
    let mut start = [0usize; 256];
    let mut sum = 0usize;
    for (c, &cnt) in count.iter().enumerate() {
        start[c] = sum;
        sum += cnt;
    }

    let mut seen = [0usize; 256];
    let lf: Vec<usize> = last
        .iter()
        .map(|&b| {
            let pos = start[b as usize] + seen[b as usize];
            seen[b as usize] += 1;
            pos
        })
        .collect();

    let mut out = vec![0u8; n];
    let mut idx = primary;
    for slot in out.iter_mut().rev() {
        *slot = last[idx];
        idx = lf[idx];
    }
    Ok(out)
}

// ── Move-to-front ────────────────────────────────────────────────────────────

fn identity_alphabet() -> [u8; 256] {
    let mut alphabet = [0u8; 256];
    for (i, slot) in alphabet.iter_mut().enumerate() {
        *slot = i as u8;
    }
    alphabet
}

pub fn mtf_encode(input: &[u8]) -> Vec<u8> {
    let mut alphabet = identity_alphabet();
    input
        .iter()
        .map(|&b| {
            let pos = alphabet.iter().position(|&c| c == b).unwrap_or(0);
            alphabet.copy_within(0..pos, 1);
            alphabet[0] = b;
            pos as u8
        })
        .collect()
}

pub fn mtf_decode(input: &[u8]) -> Vec<u8> {
    let mut alphabet = identity_alphabet();
    input
        .iter()
        .map(|&rank| {
            let pos = rank as usize;
            let b = alphabet[pos];
            alphabet.copy_within(0..pos, 1);
            alphabet[0] = b;
            b
        })
        .collect()
}

// ── Codec ────────────────────────────────────────────────────────────────────

impl Codec for BwtCodec {
    fn name(&self) -> &str {
        "bwt"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let chunks = input.len().div_ceil(MAX_BLOCK_SIZE);
        let mut out = Vec::with_capacity(8 + chunks * CHUNK_HEADER + input.len());
        push_u64(&mut out, input.len() as u64);

        for chunk in input.chunks(MAX_BLOCK_SIZE) {
            let (last, primary) = forward(chunk);
            push_u64(&mut out, primary as u64);
            push_u64(&mut out, chunk.len() as u64);
            out.extend_from_slice(&mtf_encode(&last));
        }
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let (orig_len, mut rest) = split_len_prefix("bwt", input)?;
        let mut out: Vec<u8> = Vec::with_capacity(capacity_hint(orig_len, input.len()));

        while (out.len() as u64) < orig_len && rest.len() >= CHUNK_HEADER {
            let primary   = LittleEndian::read_u64(&rest[..8]);
            let chunk_len = LittleEndian::read_u64(&rest[8..16]);
            rest = &rest[CHUNK_HEADER..];

            if chunk_len == 0 || chunk_len > MAX_BLOCK_SIZE as u64 {
                return Err(corrupt("bwt", format!(
                    "chunk length {chunk_len} outside 1..={MAX_BLOCK_SIZE}"
                )));
            }
            if chunk_len > rest.len() as u64 {
                return Err(corrupt("bwt", format!(
                    "chunk length {chunk_len} exceeds the {} bytes remaining",
                    rest.len()
                )));
            }
            let (body, tail) = rest.split_at(chunk_len as usize);
            rest = tail;

            let primary = usize::try_from(primary).unwrap_or(usize::MAX);
            out.extend_from_slice(&inverse(&mtf_decode(body), primary)?);
        }

        if out.len() as u64 != orig_len {
            return Err(CodecError::SizeMismatch { expected: orig_len, actual: out.len() as u64 });
        }
        Ok(out)
    }
}
