//! Per-byte Huffman coding for archive string tables.
//!
//! The encoder learns byte frequencies across the whole corpus, builds the
//! code tree from a priority queue of leaves (lowest frequency first, ties
//! broken by symbol value so the table is deterministic), and serializes
//! one table entry per live symbol. Strings are encoded as their
//! concatenated codes in cursor bit mode, LSB-first within each byte.
//!
//! An empty corpus falls back to an all-equal frequency table so that a
//! decoder always exists.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::mem::MemFile;

/// Marker byte introducing one serialized code-table entry.
pub const HUFFMAN_DIC_ENTRY_MARKER: u8 = b'h';

// ------------------------------------------------------------------------------------------------
// Code table
// ------------------------------------------------------------------------------------------------

/// The bit code assigned to one byte symbol. Bits are stored LSB-first in
/// `bits`, `num_bits` of them in total.
#[derive(Debug, Clone, Default)]
struct Code {
    num_bits: u8,
    bits: Vec<u8>,
}

impl Code {
    fn bit(&self, i: usize) -> bool {
        (self.bits[i / 8] >> (i % 8)) & 1 == 1
    }
}

// ------------------------------------------------------------------------------------------------
// Decode tree
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DecodeNode {
    children: [Option<u32>; 2],
    symbol: Option<u8>,
}

impl DecodeNode {
    fn empty() -> Self {
        Self {
            children: [None, None],
            symbol: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children[0].is_none() && self.children[1].is_none()
    }
}

#[derive(Debug, Clone)]
struct DecodeTree {
    /// Node 0 is the root.
    nodes: Vec<DecodeNode>,
}

impl DecodeTree {
    fn from_codes(codes: &[Option<Code>; 256]) -> Result<Self> {
        let mut nodes = vec![DecodeNode::empty()];
        for (symbol, code) in codes.iter().enumerate() {
            let Some(code) = code else { continue };
            let mut node = 0usize;
            for i in 0..code.num_bits as usize {
                let branch = usize::from(code.bit(i));
                let next = match nodes[node].children[branch] {
                    Some(n) => n as usize,
                    None => {
                        nodes.push(DecodeNode::empty());
                        let n = nodes.len() - 1;
                        nodes[node].children[branch] = Some(n as u32);
                        n
                    }
                };
                node = next;
            }
            if nodes[node].symbol.is_some() {
                return Err(Error::corrupted("huffman code table is not prefix-free"));
            }
            nodes[node].symbol = Some(symbol as u8);
        }
        Ok(Self { nodes })
    }
}

// ------------------------------------------------------------------------------------------------
// HuffmanPacker
// ------------------------------------------------------------------------------------------------

/// Huffman string packer. See the module docs for the wire layout.
#[derive(Debug, Clone, Default)]
pub struct HuffmanPacker {
    codes: Option<Box<[Option<Code>; 256]>>,
    decoder: Option<DecodeTree>,
}

impl HuffmanPacker {
    /// Learns frequencies from `strings`, bakes the code table, serializes
    /// it to `dst`, and leaves the packer ready to encode and decode.
    /// Returns the number of bytes written.
    pub fn write_extra(&mut self, dst: &mut MemFile<'_>, strings: &[&str]) -> Result<usize> {
        let mut frequencies = [0u64; 256];
        for s in strings {
            for &b in s.as_bytes() {
                frequencies[b as usize] += 1;
            }
        }
        if frequencies.iter().all(|&f| f == 0) {
            // Degenerate corpus: give every symbol equal weight so a decode
            // tree always exists.
            frequencies = [1u64; 256];
        }
        let codes = bake_codes(&frequencies);

        let start = dst.tell();
        for (symbol, code) in codes.iter().enumerate() {
            let Some(code) = code else { continue };
            dst.write_u8(HUFFMAN_DIC_ENTRY_MARKER)?;
            dst.write_u8(symbol as u8)?;
            dst.write_u8(code.num_bits)?;
            dst.write(&code.bits[..(code.num_bits as usize).div_ceil(8)])?;
        }
        let written = dst.tell() - start;

        self.decoder = Some(DecodeTree::from_codes(&codes)?);
        self.codes = Some(codes);
        Ok(written)
    }

    /// Restores the code table from `nbytes` of serialized entries.
    pub fn read_extra(&mut self, src: &mut MemFile<'_>, nbytes: usize) -> Result<()> {
        let end = src.tell() + nbytes;
        let mut codes: Box<[Option<Code>; 256]> = Box::new([const { None }; 256]);
        while src.tell() < end {
            let marker = src.read_u8()?;
            if marker != HUFFMAN_DIC_ENTRY_MARKER {
                return Err(Error::marker_mapping(marker));
            }
            let symbol = src.read_u8()?;
            let num_bits = src.read_u8()?;
            let nbytes = (num_bits as usize).div_ceil(8);
            let bits = src.read(nbytes)?.to_vec();
            codes[symbol as usize] = Some(Code { num_bits, bits });
        }
        if src.tell() != end {
            return Err(Error::corrupted("huffman extra overruns its declared size"));
        }
        self.decoder = Some(DecodeTree::from_codes(&codes)?);
        self.codes = Some(codes);
        Ok(())
    }

    /// Encodes `s` as concatenated codes in bit mode.
    pub fn encode_string(&self, dst: &mut MemFile<'_>, s: &str) -> Result<()> {
        let Some(codes) = self.codes.as_ref() else {
            return Err(Error::illegal_state("huffman packer has no code table"));
        };
        dst.begin_bit_mode()?;
        for &b in s.as_bytes() {
            let Some(code) = codes[b as usize].as_ref() else {
                dst.end_bit_mode()?;
                return Err(Error::illegal_arg(format!(
                    "byte 0x{b:02X} has no huffman code"
                )));
            };
            for i in 0..code.num_bits as usize {
                dst.write_bit(code.bit(i))?;
            }
        }
        dst.end_bit_mode()?;
        Ok(())
    }

    /// Decodes `strlen` symbols by walking the decode tree bit by bit.
    pub fn decode_string(&self, src: &mut MemFile<'_>, strlen: usize) -> Result<String> {
        let Some(tree) = self.decoder.as_ref() else {
            return Err(Error::illegal_state("huffman packer has no decode tree"));
        };
        let mut out = Vec::with_capacity(strlen);
        src.begin_bit_mode()?;
        for _ in 0..strlen {
            let mut node = &tree.nodes[0];
            while !node.is_leaf() {
                let bit = match src.read_bit() {
                    Ok(bit) => bit,
                    Err(e) => {
                        src.end_bit_mode()?;
                        return Err(e);
                    }
                };
                let Some(next) = node.children[usize::from(bit)] else {
                    src.end_bit_mode()?;
                    return Err(Error::corrupted("huffman bit stream leaves the tree"));
                };
                node = &tree.nodes[next as usize];
            }
            match node.symbol {
                Some(symbol) => out.push(symbol),
                None => {
                    src.end_bit_mode()?;
                    return Err(Error::corrupted("huffman leaf without symbol"));
                }
            }
        }
        src.end_bit_mode()?;
        String::from_utf8(out).map_err(|_| Error::corrupted("huffman output is not valid UTF-8"))
    }

    /// Renders the code table for diagnostics.
    pub fn print_extra(&self, out: &mut String) {
        let Some(codes) = self.codes.as_ref() else {
            out.push_str("huffman: no code table\n");
            return;
        };
        for (symbol, code) in codes.iter().enumerate() {
            let Some(code) = code else { continue };
            let _ = write!(out, "huffman: symbol 0x{symbol:02X} bits={} code=", code.num_bits);
            for i in 0..code.num_bits as usize {
                out.push(if code.bit(i) { '1' } else { '0' });
            }
            out.push('\n');
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Tree construction
// ------------------------------------------------------------------------------------------------

struct TreeNode {
    left: Option<usize>,
    right: Option<usize>,
    symbol: u8,
}

/// Builds the code table from a frequency histogram.
///
/// The priority queue pops the lowest-frequency node first; ties are broken
/// by creation order (leaves in symbol order, then merge order), which makes
/// the resulting table deterministic across runs.
fn bake_codes(frequencies: &[u64; 256]) -> Box<[Option<Code>; 256]> {
    let mut arena: Vec<TreeNode> = Vec::new();
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();

    for (symbol, &freq) in frequencies.iter().enumerate() {
        if freq > 0 {
            arena.push(TreeNode {
                left: None,
                right: None,
                symbol: symbol as u8,
            });
            heap.push(Reverse((freq, arena.len() - 1)));
        }
    }

    while heap.len() > 1 {
        let Some(Reverse((freq_a, a))) = heap.pop() else {
            break;
        };
        let Some(Reverse((freq_b, b))) = heap.pop() else {
            break;
        };
        arena.push(TreeNode {
            left: Some(a),
            right: Some(b),
            symbol: 0,
        });
        heap.push(Reverse((freq_a + freq_b, arena.len() - 1)));
    }

    let mut codes: Box<[Option<Code>; 256]> = Box::new([const { None }; 256]);
    if let Some(Reverse((_, root))) = heap.pop() {
        let mut path: Vec<bool> = Vec::new();
        assign_codes(&arena, root, &mut path, &mut codes);
    }
    codes
}

fn assign_codes(
    arena: &[TreeNode],
    node: usize,
    path: &mut Vec<bool>,
    codes: &mut [Option<Code>; 256],
) {
    let n = &arena[node];
    match (n.left, n.right) {
        (Some(left), Some(right)) => {
            path.push(false);
            assign_codes(arena, left, path, codes);
            path.pop();
            path.push(true);
            assign_codes(arena, right, path, codes);
            path.pop();
        }
        _ => {
            let mut bits = vec![0u8; path.len().div_ceil(8).max(1)];
            for (i, &bit) in path.iter().enumerate() {
                if bit {
                    bits[i / 8] |= 1 << (i % 8);
                }
            }
            codes[n.symbol as usize] = Some(Code {
                num_bits: path.len() as u8,
                bits,
            });
        }
    }
}
