//! Block-parallel compression over any registered codec.
//!
//! # Block model
//!
//! The input is cut into contiguous blocks of `block_size` bytes (the last
//! one may be shorter).  Each block is compressed on its own by a fresh codec
//! instance, so blocks share no state and can run on any worker in any
//! order.  Results are collected through one [`TaskHandle`] per block in
//! submission order, which makes the output independent of scheduling and
//! of the thread count.
//!
//! # Pools
//!
//! Every call builds its own [`ThreadPool`] and shuts it down before
//! returning.  On an error the remaining tasks still run to completion; their
//! results are discarded when the pool drains.
//!
//! # Progress
//!
//! The optional callback receives `(bytes_processed, total_bytes)`.  Workers
//! bump a shared atomic counter and call it directly, so calls may arrive on
//! any thread and not necessarily in increasing order.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};

use crate::block::{write_envelope, ParallelLayout};
use crate::codec::{capacity_hint, AlgorithmId, Codec, CodecError, Result};
use crate::pool::{TaskHandle, ThreadPool};
use crate::registry;

pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

pub type ProgressFn = dyn Fn(u64, u64) + Send + Sync;

// ── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelOptions {
    /// Uncompressed bytes per block.  `0` is treated as `1`.
    pub block_size: usize,
    /// Worker count.  `0` means one per available core.
    pub threads:    usize,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            threads:    num_cpus::get().max(1),
        }
    }
}

impl ParallelOptions {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

// ── Compressor ───────────────────────────────────────────────────────────────

pub struct ParallelCompressor {
    base:    AlgorithmId,
    options: ParallelOptions,
    name:    String,
}

impl ParallelCompressor {
    pub fn new(base: AlgorithmId, options: ParallelOptions) -> Self {
        Self {
            base,
            options: ParallelOptions { block_size: options.block_size.max(1), ..options },
            name:    format!("parallel_{}", base.name()),
        }
    }

    pub fn with_defaults(base: AlgorithmId) -> Self {
        Self::new(base, ParallelOptions::default())
    }

    pub fn options(&self) -> ParallelOptions {
        self.options
    }

    pub fn compress_with_progress(
        &self,
        input:    &[u8],
        progress: Option<Arc<ProgressFn>>,
    ) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let total = input.len() as u64;
        let block_size = self.options.block_size;

        if input.len() <= block_size {
            debug!("{}: {} bytes fit one block, compressing inline", self.name, input.len());
            let payload = registry::create_by_id(self.base).compress(input)?;
            if let Some(cb) = &progress {
                cb(total, total);
            }
            return Ok(write_envelope(total, &[(total, payload)]));
        }

        let ranges: Vec<Range<usize>> = (0..input.len())
            .step_by(block_size)
            .map(|start| start..(start + block_size).min(input.len()))
            .collect();
        debug!(
            "{}: splitting {} bytes into {} blocks of {} bytes",
            self.name, total, ranges.len(), block_size
        );

        let jobs = ranges.into_iter().map(|r| (r.len() as u64, r)).collect();
        let shared: Arc<[u8]> = Arc::from(input);
        let blocks = self.run_blocks(jobs, progress, total, move |codec, range: Range<usize>| {
            let block = &shared[range];
            codec.compress(block).map(|payload| (block.len() as u64, payload))
        })?;

        let out = write_envelope(total, &blocks);
        debug!("{}: {} -> {} bytes", self.name, total, out.len());
        Ok(out)
    }

    pub fn decompress_with_progress(
        &self,
        input:    &[u8],
        progress: Option<Arc<ProgressFn>>,
    ) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        // Block boundaries are only known by walking the table, so parse first.
        let layout = ParallelLayout::parse(input)?;
        let total  = layout.header.total_original_size;
        debug!("{}: decoding {} blocks, {} bytes", self.name, layout.blocks.len(), total);

        let parts: Vec<Vec<u8>> = if layout.blocks.len() <= 1 {
            let codec = registry::create_by_id(self.base);
            let mut parts = Vec::with_capacity(layout.blocks.len());
            for entry in &layout.blocks {
                parts.push(decode_block(codec.as_ref(), &input[entry.payload.clone()], entry.header.original_size)?);
            }
            if let Some(cb) = &progress {
                cb(total, total);
            }
            parts
        } else {
            let jobs = layout
                .blocks
                .iter()
                .map(|entry| (entry.header.original_size, (entry.payload.clone(), entry.header.original_size)))
                .collect();
            let shared: Arc<[u8]> = Arc::from(input);
            self.run_blocks(jobs, progress, total, move |codec, (range, expected): (Range<usize>, u64)| {
                decode_block(codec, &shared[range], expected)
            })?
        };

        let mut out: Vec<u8> = Vec::with_capacity(capacity_hint(total, input.len()));
        for part in parts {
            out.extend_from_slice(&part);
        }
        if out.len() as u64 != total {
            warn!("{}: decoded {} bytes, envelope records {}", self.name, out.len(), total);
            return Err(CodecError::SizeMismatch { expected: total, actual: out.len() as u64 });
        }
        Ok(out)
    }

    /// Run `work` once per job on a fresh pool, each call with its own
    /// codec, and return the results in job order.  Each job carries the
    /// number of original bytes it accounts for in progress reports.
    fn run_blocks<J, T, F>(
        &self,
        jobs:     Vec<(u64, J)>,
        progress: Option<Arc<ProgressFn>>,
        total:    u64,
        work:     F,
    ) -> Result<Vec<T>>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(&dyn Codec, J) -> Result<T> + Send + Sync + 'static,
    {
        let pool = ThreadPool::new(self.options.threads)?;
        let work = Arc::new(work);
        let done = Arc::new(AtomicU64::new(0));

        let mut handles: Vec<TaskHandle<Result<T>>> = Vec::with_capacity(jobs.len());
        for (len, job) in jobs {
            let codec    = registry::create_by_id(self.base);
            let work     = Arc::clone(&work);
            let done     = Arc::clone(&done);
            let progress = progress.clone();
            handles.push(pool.submit(move || {
                let result = work(codec.as_ref(), job);
                let processed = done.fetch_add(len, Ordering::SeqCst) + len;
                if let Some(cb) = &progress {
                    cb(processed.min(total), total);
                }
                result
            })?);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.wait()??);
        }
        pool.shutdown();
        Ok(results)
    }
}

fn decode_block(codec: &dyn Codec, payload: &[u8], expected: u64) -> Result<Vec<u8>> {
    let decoded = codec.decompress(payload)?;
    if decoded.len() as u64 != expected {
        warn!("{}: block decoded to {} bytes, header records {}", codec.name(), decoded.len(), expected);
        return Err(CodecError::SizeMismatch { expected, actual: decoded.len() as u64 });
    }
    Ok(decoded)
}

impl Codec for ParallelCompressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.compress_with_progress(input, None)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.decompress_with_progress(input, None)
    }
}

// ── Convenience ──────────────────────────────────────────────────────────────

/// Compress `input` with the algorithm named by `algorithm` (name or decimal id).
pub fn parallel_compress(input: &[u8], algorithm: &str, block_size: usize, threads: usize) -> Result<Vec<u8>> {
    let options = ParallelOptions { block_size, threads };
    ParallelCompressor::new(registry::resolve(algorithm)?, options).compress(input)
}

pub fn parallel_decompress(input: &[u8], algorithm: &str, threads: usize) -> Result<Vec<u8>> {
    let options = ParallelOptions::default().with_threads(threads);
    ParallelCompressor::new(registry::resolve(algorithm)?, options).decompress(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BLOCK_HEADER_SIZE, STREAM_HEADER_SIZE};
    use std::sync::Mutex;

    fn sample(len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| b"the quick brown fox jumps over the lazy dog "[i % 44] ^ ((i / 997) as u8))
            .collect()
    }

    fn block_count(envelope: &[u8]) -> u32 {
        u32::from_le_bytes(envelope[10..14].try_into().unwrap())
    }

    #[test]
    fn single_block_path_is_still_framed() {
        let data = sample(500);
        let pc = ParallelCompressor::new(AlgorithmId::Lzss, ParallelOptions::default());
        let enc = pc.compress(&data).unwrap();
        assert_eq!(enc[0], 0xC4);
        assert_eq!(block_count(&enc), 1);
        assert_eq!(pc.decompress(&enc).unwrap(), data);
    }

    #[test]
    fn multi_block_roundtrip_for_every_codec() {
        let data = sample(10_000);
        for id in AlgorithmId::ALL {
            let pc = ParallelCompressor::new(id, ParallelOptions { block_size: 1000, threads: 3 });
            let enc = pc.compress(&data).unwrap();
            assert_eq!(block_count(&enc), 10, "{id}");
            assert_eq!(pc.decompress(&enc).unwrap(), data, "{id}");
        }
    }

    #[test]
    fn output_is_independent_of_thread_count() {
        let data = sample(20_000);
        let one  = parallel_compress(&data, "huffman", 3000, 1).unwrap();
        let many = parallel_compress(&data, "huffman", 3000, 6).unwrap();
        assert_eq!(one, many);
        assert_eq!(parallel_decompress(&many, "huffman", 2).unwrap(), data);
    }

    #[test]
    fn zero_block_size_is_clamped() {
        let pc = ParallelCompressor::new(AlgorithmId::Rle, ParallelOptions { block_size: 0, threads: 2 });
        assert_eq!(pc.options().block_size, 1);
        let enc = pc.compress(b"abcde").unwrap();
        assert_eq!(block_count(&enc), 5);
        assert_eq!(pc.decompress(&enc).unwrap(), b"abcde");
    }

    #[test]
    fn empty_in_empty_out() {
        let pc = ParallelCompressor::with_defaults(AlgorithmId::Bwt);
        assert!(pc.compress(&[]).unwrap().is_empty());
        assert!(pc.decompress(&[]).unwrap().is_empty());
    }

    #[test]
    fn name_wraps_base() {
        assert_eq!(ParallelCompressor::with_defaults(AlgorithmId::Huffman).name(), "parallel_huffman");
    }

    #[test]
    fn progress_reaches_total() {
        let data = sample(8192);
        let calls: Arc<Mutex<Vec<(u64, u64)>>> = Arc::default();
        let sink = Arc::clone(&calls);
        let cb: Arc<ProgressFn> = Arc::new(move |done: u64, total: u64| sink.lock().unwrap().push((done, total)));

        let pc = ParallelCompressor::new(AlgorithmId::Delta, ParallelOptions { block_size: 1024, threads: 4 });
        let enc = pc.compress_with_progress(&data, Some(Arc::clone(&cb))).unwrap();
        {
            let calls = calls.lock().unwrap();
            assert_eq!(calls.len(), 8);
            assert!(calls.iter().all(|&(_, total)| total == 8192));
            assert_eq!(calls.iter().map(|&(done, _)| done).max(), Some(8192));
        }

        calls.lock().unwrap().clear();
        assert_eq!(pc.decompress_with_progress(&enc, Some(cb)).unwrap(), data);
        assert_eq!(calls.lock().unwrap().iter().map(|&(done, _)| done).max(), Some(8192));
    }

    #[test]
    fn block_length_disagreement_is_a_size_mismatch() {
        // second block records 4 bytes but decodes to 3
        let env = write_envelope(8, &[(4, vec![4, b'a']), (4, vec![3, b'b'])]);
        let pc = ParallelCompressor::new(AlgorithmId::Rle, ParallelOptions { block_size: 4, threads: 2 });
        assert!(matches!(
            pc.decompress(&env),
            Err(CodecError::SizeMismatch { expected: 4, actual: 3 })
        ));

        let env = write_envelope(4, &[(4, vec![3, b'a'])]);
        assert!(matches!(pc.decompress(&env), Err(CodecError::SizeMismatch { .. })));
    }

    #[test]
    fn corrupt_block_fails_the_whole_stream() {
        let data = sample(4000);
        let pc = ParallelCompressor::new(AlgorithmId::Rle, ParallelOptions { block_size: 1000, threads: 2 });
        let enc = pc.compress(&data).unwrap();
        // Grow block 0's payload by one byte so its length turns odd, and keep
        // the envelope consistent by rebuilding it.
        let layout = ParallelLayout::parse(&enc).unwrap();
        let mut blocks: Vec<(u64, Vec<u8>)> = layout
            .blocks
            .iter()
            .map(|b| (b.header.original_size, enc[b.payload.clone()].to_vec()))
            .collect();
        blocks[0].1.push(0xFF);
        let bad = write_envelope(4000, &blocks);
        assert!(matches!(
            pc.decompress(&bad),
            Err(CodecError::CorruptPayload { codec: "rle", .. })
        ));
    }

    #[test]
    fn malformed_envelope_is_rejected_before_dispatch() {
        let pc = ParallelCompressor::with_defaults(AlgorithmId::Lz77);
        assert!(matches!(pc.decompress(&[0xC3, 1, 2]), Err(CodecError::MalformedContainer(_))));

        let payload = crate::codec::Lz77Codec.compress(b"some bytes").unwrap();
        let enc = pc.compress(b"some bytes").unwrap();
        assert_eq!(enc.len(), STREAM_HEADER_SIZE + BLOCK_HEADER_SIZE + payload.len());
        let mut bad = enc.clone();
        bad.push(0);
        assert!(matches!(pc.decompress(&bad), Err(CodecError::MalformedContainer(_))));
    }
}
