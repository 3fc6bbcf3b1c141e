//! Static Huffman coding with the tree stored in the frame.
//!
//! Frame:
//! ```text
//! [original_len: u64 LE][tree_len: u32 LE][tree ..][bit_count: u64 LE][bits ..]
//! ```
//! The tree is serialized pre-order with one-byte tags: `0` internal node
//! (followed by left then right subtree), `1` leaf (followed by its byte),
//! `2` absent child.  Codes are `0` for left, `1` for right, packed MSB
//! first with the last byte zero-padded.
//!
//! Nodes live in a flat arena addressed by index; every walk uses an
//! explicit stack, so hostile tree data cannot exhaust the call stack.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use byteorder::{ByteOrder, LittleEndian};

use super::bits::{BitReader, BitWriter};
use super::{capacity_hint, corrupt, push_u32, push_u64, split_len_prefix, Codec, CodecError, Result};

const TAG_INTERNAL: u8 = 0;
const TAG_LEAF:     u8 = 1;
const TAG_NULL:     u8 = 2;

/// `original_len + tree_len + bit_count`
const MIN_FRAME: usize = 8 + 4 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Leaf(u8),
    Internal { left: Option<usize>, right: Option<usize> },
}

#[derive(Debug, Default)]
struct HuffmanTree {
    nodes: Vec<Node>,
    root:  Option<usize>,
}

impl HuffmanTree {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Merge the two lowest-frequency subtrees until one remains.  Equal
    /// frequencies are ordered by creation sequence.
    fn from_frequencies(freq: &[u64; 256]) -> Self {
        let mut tree = HuffmanTree::default();
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        for (byte, &f) in freq.iter().enumerate() {
            if f > 0 {
                let idx = tree.push(Node::Leaf(byte as u8));
                heap.push(Reverse((f, seq, idx)));
                seq += 1;
            }
        }

        if heap.len() == 1 {
            // One distinct symbol: give it the code `0` via a one-child root.
            if let Some(Reverse((_, _, only))) = heap.pop() {
                tree.root = Some(tree.push(Node::Internal { left: Some(only), right: None }));
            }
            return tree;
        }

        while heap.len() > 1 {
            let (Some(Reverse((fa, _, a))), Some(Reverse((fb, _, b)))) = (heap.pop(), heap.pop()) else {
                break;
            };
            let parent = tree.push(Node::Internal { left: Some(a), right: Some(b) });
            heap.push(Reverse((fa + fb, seq, parent)));
            seq += 1;
        }
        tree.root = heap.pop().map(|Reverse((_, _, idx))| idx);
        tree
    }

    /// Bit code per byte value; `None` for bytes absent from the tree.
    fn codes(&self) -> Vec<Option<Vec<bool>>> {
        let mut codes = vec![None; 256];
        let Some(root) = self.root else { return codes };
        let mut stack = vec![(root, Vec::new())];

        while let Some((idx, path)) = stack.pop() {
            match self.nodes[idx] {
                Node::Leaf(b) => {
                    codes[b as usize] = Some(if path.is_empty() { vec![false] } else { path });
                }
                Node::Internal { left, right } => {
                    if let Some(r) = right {
                        let mut p = path.clone();
                        p.push(true);
                        stack.push((r, p));
                    }
                    if let Some(l) = left {
                        let mut p = path;
                        p.push(false);
                        stack.push((l, p));
                    }
                }
            }
        }
        codes
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        let mut stack = vec![self.root];
        while let Some(slot) = stack.pop() {
            match slot.map(|i| self.nodes[i]) {
                None => out.push(TAG_NULL),
                Some(Node::Leaf(b)) => {
                    out.push(TAG_LEAF);
                    out.push(b);
                }
                Some(Node::Internal { left, right }) => {
                    out.push(TAG_INTERNAL);
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        #[derive(Clone, Copy)]
        enum Slot { Root, Left(usize), Right(usize) }

        let mut tree = HuffmanTree::default();
        let mut stack = vec![Slot::Root];
        let mut pos = 0usize;

        while let Some(slot) = stack.pop() {
            let &tag = data.get(pos)
                .ok_or_else(|| corrupt("huffman", "tree data ends inside a subtree"))?;
            pos += 1;

            let node = match tag {
                TAG_NULL => None,
                TAG_LEAF => {
                    let &b = data.get(pos)
                        .ok_or_else(|| corrupt("huffman", "leaf tag without its byte"))?;
                    pos += 1;
                    Some(tree.push(Node::Leaf(b)))
                }
                TAG_INTERNAL => {
                    let idx = tree.push(Node::Internal { left: None, right: None });
                    stack.push(Slot::Right(idx));
                    stack.push(Slot::Left(idx));
                    Some(idx)
                }
                other => return Err(corrupt("huffman", format!("unknown tree tag {other}"))),
            };

            match slot {
                Slot::Root => tree.root = node,
                Slot::Left(parent) => {
                    if let Node::Internal { left, .. } = &mut tree.nodes[parent] {
                        *left = node;
                    }
                }
                Slot::Right(parent) => {
                    if let Node::Internal { right, .. } = &mut tree.nodes[parent] {
                        *right = node;
                    }
                }
            }
        }
        Ok(tree)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HuffmanCodec;

impl Codec for HuffmanCodec {
    fn name(&self) -> &str {
        "huffman"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let mut freq = [0u64; 256];
        for &b in input {
            freq[b as usize] += 1;
        }
        let tree  = HuffmanTree::from_frequencies(&freq);
        let codes = tree.codes();

        let mut tree_bytes = Vec::new();
        tree.serialize(&mut tree_bytes);

        let mut writer = BitWriter::with_capacity(input.len());
        for &b in input {
            // Every input byte has a leaf, so the code is always present.
            for &bit in codes[b as usize].as_deref().unwrap_or(&[]) {
                writer.write_bit(bit);
            }
        }
        let bit_count = writer.bit_len();
        let packed = writer.finish();

        let mut out = Vec::with_capacity(MIN_FRAME + tree_bytes.len() + packed.len());
        push_u64(&mut out, input.len() as u64);
        push_u32(&mut out, tree_bytes.len() as u32);
        out.extend_from_slice(&tree_bytes);
        push_u64(&mut out, bit_count);
        out.extend_from_slice(&packed);
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        if input.len() < MIN_FRAME {
            return Err(corrupt("huffman", format!("frame is {} bytes, minimum is {MIN_FRAME}", input.len())));
        }
        let (orig_len, rest) = split_len_prefix("huffman", input)?;
        let tree_len = LittleEndian::read_u32(&rest[..4]) as usize;
        let rest = &rest[4..];
        if tree_len.saturating_add(8) > rest.len() {
            return Err(corrupt("huffman", format!("tree length {tree_len} runs past the frame")));
        }
        let tree = HuffmanTree::deserialize(&rest[..tree_len])?;
        let rest = &rest[tree_len..];
        let bit_count = LittleEndian::read_u64(&rest[..8]);
        let mut reader = BitReader::new(&rest[8..]);

        let mut out: Vec<u8> = Vec::with_capacity(capacity_hint(orig_len, input.len()));
        if orig_len > 0 {
            let root = tree.root.ok_or_else(|| corrupt("huffman", "empty tree"))?;
            let mut current = root;
            let mut bits_read = 0u64;

            while (out.len() as u64) < orig_len && bits_read < bit_count {
                let Some(bit) = reader.read_bit() else { break };
                bits_read += 1;

                let next = match tree.nodes[current] {
                    Node::Internal { left, right } => if bit { right } else { left },
                    Node::Leaf(_) => None,
                };
                let next = next.ok_or_else(|| corrupt("huffman", format!(
                    "bit {} walks off the tree",
                    bits_read - 1
                )))?;

                if let Node::Leaf(b) = tree.nodes[next] {
                    out.push(b);
                    current = root;
                } else {
                    current = next;
                }
            }
        }

        if out.len() as u64 != orig_len {
            return Err(CodecError::SizeMismatch { expected: orig_len, actual: out.len() as u64 });
        }
        Ok(out)
    }
}
