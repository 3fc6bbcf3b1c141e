//! Single-block container: one codec payload plus the metadata needed to
//! decode it.
//!
//! ```text
//! [magic: 0xC3][algorithm_id: u8][original_size: u64 LE][payload ..]
//! ```
//! Pure framing.  No compression happens here.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::codec::{AlgorithmId, CodecError, Result};

pub const MAGIC: u8 = 0xC3;
pub const HEADER_SIZE: usize = 1 + 1 + 8;

/// Fixed-size prefix of every single-block container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub algorithm:     AlgorithmId,
    pub original_size: u64,
}

impl ContainerHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = MAGIC;
        buf[1] = self.algorithm.as_byte();
        LittleEndian::write_u64(&mut buf[2..10], self.original_size);
        buf
    }

    /// Read and validate a header.  The reader must hold at least
    /// [`HEADER_SIZE`] bytes.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let magic = reader.read_u8()?;
        if magic != MAGIC {
            return Err(CodecError::MalformedContainer(format!(
                "bad magic 0x{magic:02x}, expected 0x{MAGIC:02x}"
            )));
        }
        let algorithm = AlgorithmId::try_from(reader.read_u8()?)?;
        let original_size = reader.read_u64::<LittleEndian>()?;
        Ok(Self { algorithm, original_size })
    }
}

/// A decoded container.  Owns its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub algorithm:     AlgorithmId,
    pub original_size: u64,
    pub payload:       Vec<u8>,
}

/// Frame `payload` behind a container header.
pub fn pack(algorithm: AlgorithmId, original_size: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&ContainerHeader { algorithm, original_size }.to_bytes());
    out.extend_from_slice(payload);
    out
}

/// Validate the header and return it together with a borrowed payload.
pub fn peek_header(data: &[u8]) -> Result<(ContainerHeader, &[u8])> {
    if data.len() < HEADER_SIZE {
        return Err(CodecError::MalformedContainer(format!(
            "container is {} bytes, header needs {HEADER_SIZE}",
            data.len()
        )));
    }
    let (head, payload) = data.split_at(HEADER_SIZE);
    let header = ContainerHeader::read(head)?;
    Ok((header, payload))
}

pub fn unpack(data: &[u8]) -> Result<Container> {
    let (header, payload) = peek_header(data)?;
    Ok(Container {
        algorithm:     header.algorithm,
        original_size: header.original_size,
        payload:       payload.to_vec(),
    })
}
