//! Byte- and file-level entry points that tie the registry, the codecs and
//! the two envelope formats together.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::block::PARALLEL_MAGIC;
use crate::codec::{AlgorithmId, CodecError, Result};
use crate::container::{self, MAGIC};
use crate::parallel::{ParallelCompressor, ParallelOptions};
use crate::registry;

/// Which envelope a byte stream starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Single,
    Parallel,
}

impl Envelope {
    /// Classify by first byte.  Empty input has no envelope.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data.first() {
            Some(&MAGIC)          => Some(Envelope::Single),
            Some(&PARALLEL_MAGIC) => Some(Envelope::Parallel),
            _                     => None,
        }
    }
}

// ── Bytes ────────────────────────────────────────────────────────────────────

/// Compress `data` and wrap it in a single-block container.
pub fn compress_bytes(algorithm: AlgorithmId, data: &[u8]) -> Result<Vec<u8>> {
    let payload = registry::create_by_id(algorithm).compress(data)?;
    debug!("{algorithm}: {} -> {} bytes", data.len(), payload.len());
    Ok(container::pack(algorithm, data.len() as u64, &payload))
}

/// Unwrap a single-block container and decompress it with the codec it names.
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let (header, payload) = container::peek_header(data)?;
    let out = registry::create_by_id(header.algorithm).decompress(payload)?;
    if out.len() as u64 != header.original_size {
        warn!(
            "{}: decoded {} bytes, container records {}",
            header.algorithm, out.len(), header.original_size
        );
        return Err(CodecError::SizeMismatch {
            expected: header.original_size,
            actual:   out.len() as u64,
        });
    }
    Ok(out)
}

/// Decompress either envelope, chosen by the first byte.  A parallel
/// envelope needs `algorithm`; empty input decodes to empty output.
pub fn decompress_auto(data: &[u8], algorithm: Option<AlgorithmId>, threads: usize) -> Result<Vec<u8>> {
    match Envelope::detect(data) {
        Some(Envelope::Single) => decompress_bytes(data),
        Some(Envelope::Parallel) => {
            let algorithm = algorithm.ok_or_else(|| CodecError::UnknownAlgorithm(
                "parallel envelope does not record its algorithm; pass --algo".to_string(),
            ))?;
            let options = ParallelOptions::default().with_threads(threads);
            ParallelCompressor::new(algorithm, options).decompress_with_progress(data, None)
        }
        None if data.is_empty() => Ok(Vec::new()),
        None => Err(CodecError::MalformedContainer(format!(
            "unrecognised magic 0x{:02x}",
            data[0]
        ))),
    }
}

// ── Files ────────────────────────────────────────────────────────────────────

pub fn compress_file(input: &Path, output: &Path, algorithm: AlgorithmId) -> Result<()> {
    let data = fs::read(input)?;
    fs::write(output, compress_bytes(algorithm, &data)?)?;
    Ok(())
}

pub fn decompress_file(input: &Path, output: &Path) -> Result<()> {
    let data = fs::read(input)?;
    fs::write(output, decompress_bytes(&data)?)?;
    Ok(())
}

pub fn compress_file_parallel(
    input:     &Path,
    output:    &Path,
    algorithm: AlgorithmId,
    options:   ParallelOptions,
) -> Result<()> {
    let data = fs::read(input)?;
    let out = ParallelCompressor::new(algorithm, options).compress_with_progress(&data, None)?;
    fs::write(output, out)?;
    Ok(())
}

/// The parallel envelope carries no algorithm id, so the caller names it.
pub fn decompress_file_parallel(
    input:     &Path,
    output:    &Path,
    algorithm: AlgorithmId,
    threads:   usize,
) -> Result<()> {
    let data = fs::read(input)?;
    let options = ParallelOptions::default().with_threads(threads);
    let out = ParallelCompressor::new(algorithm, options).decompress_with_progress(&data, None)?;
    fs::write(output, out)?;
    Ok(())
}
