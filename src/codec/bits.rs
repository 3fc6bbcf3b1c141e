//! Most-significant-bit-first bit packing shared by the LZW and Huffman codecs.
//!
//! The writer zero-pads the final partial byte; readers that care about the
//! exact bit length must carry it out of band (Huffman) or tolerate trailing
//! padding (LZW).

use bitvec::prelude::*;

/// Accumulates variable-width values into bytes, MSB first.
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn with_capacity(bytes: usize) -> Self {
        Self { bits: BitVec::with_capacity(bytes.saturating_mul(8)) }
    }

    /// Append the low `width` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, width: u32) {
        debug_assert!(width <= 32);
        let width = width as usize;
        self.bits.extend_from_bitslice(&value.view_bits::<Msb0>()[32 - width..]);
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    pub fn bit_len(&self) -> u64 {
        self.bits.len() as u64
    }

    pub fn finish(mut self) -> Vec<u8> {
        let padded = self.bits.len().div_ceil(8) * 8;
        self.bits.resize(padded, false);
        self.bits.into_vec()
    }
}

/// Reads fixed- or variable-width values back out of a packed buffer.
#[derive(Debug)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos:  usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { bits: data.view_bits::<Msb0>(), pos: 0 }
    }

    /// `None` once fewer than `width` bits remain; nothing is consumed then.
    pub fn read_bits(&mut self, width: u32) -> Option<u32> {
        debug_assert!(width <= 32);
        let end = self.pos + width as usize;
        let field = self.bits.get(self.pos..end)?;
        self.pos = end;
        Some(field.iter().by_vals().fold(0u32, |acc, bit| (acc << 1) | u32::from(bit)))
    }

    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        let bit = *self.bits.get(self.pos)?;
        self.pos += 1;
        Some(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_bit_codes_pack_msb_first() {
        let mut w = BitWriter::default();
        w.write_bits(0xABC, 12);
        w.write_bits(0x123, 12);
        assert_eq!(w.bit_len(), 24);
        assert_eq!(w.finish(), vec![0xAB, 0xC1, 0x23]);
    }

    #[test]
    fn partial_byte_is_zero_padded() {
        let mut w = BitWriter::default();
        w.write_bit(true);
        w.write_bit(false);
        w.write_bit(true);
        assert_eq!(w.bit_len(), 3);
        assert_eq!(w.finish(), vec![0b1010_0000]);
    }

    #[test]
    fn high_bits_above_width_are_ignored() {
        let mut w = BitWriter::default();
        w.write_bits(0xFFFF_F005, 4);
        assert_eq!(w.finish(), vec![0b0101_0000]);
    }

    #[test]
    fn reader_mirrors_writer() {
        let mut w = BitWriter::default();
        for code in [0u32, 4095, 256, 17, 1000] {
            w.write_bits(code, 12);
        }
        w.write_bit(true);
        let bytes = w.finish();
        assert_eq!(bytes.len(), 8);

        let mut r = BitReader::new(&bytes);
        for code in [0u32, 4095, 256, 17, 1000] {
            assert_eq!(r.read_bits(12), Some(code));
        }
        assert_eq!(r.read_bit(), Some(true));
        // three padding bits left: not enough for another code
        assert_eq!(r.read_bits(12), None);
        assert_eq!(r.read_bits(3), Some(0));
        assert_eq!(r.read_bit(), None);
    }
}
