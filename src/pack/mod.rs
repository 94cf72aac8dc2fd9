//! Packer Framework Module
//!
//! A *packer* is the strategy an archive uses to encode the strings of its
//! embedded string table. Every packer can serialize shared coding state
//! (its "extra" — e.g. a Huffman code table) ahead of the string entries,
//! and encode/decode individual strings against that state.
//!
//! Three strategies exist, discriminated in the string-table header by a
//! one-hot flag byte:
//!
//! | Variant | Flag bit | Extra |
//! |---------|----------|-------|
//! | [`Packer::Identity`] | `0x01` | none |
//! | [`Packer::Huffman`]  | `0x02` | canonical code table |
//! | [`Packer::Prefix`]   | `0x04` | shared prefix table |
//!
//! For every variant, `read_extra(write_extra(state))` restores an
//! equivalent coder: decoding the encoding of any corpus string yields the
//! original bytes.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod huffman;
pub mod prefix;

#[cfg(test)]
mod tests;

pub use huffman::HuffmanPacker;
pub use prefix::PrefixPacker;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use crate::error::{Error, Result};
use crate::mem::MemFile;

// ------------------------------------------------------------------------------------------------
// Kind and flag mapping
// ------------------------------------------------------------------------------------------------

/// Packer strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerKind {
    /// Raw bytes, no shared state.
    Identity,
    /// Per-byte Huffman codes with a serialized code table.
    Huffman,
    /// Shared prefix table; strings store a 16-bit prefix id plus suffix.
    Prefix,
}

impl PackerKind {
    /// One-hot flag byte stored in the string-table header.
    pub fn flags(self) -> u8 {
        match self {
            PackerKind::Identity => 0x01,
            PackerKind::Huffman => 0x02,
            PackerKind::Prefix => 0x04,
        }
    }

    /// Inverse of [`flags`](Self::flags).
    pub fn from_flags(flags: u8) -> Result<Self> {
        match flags {
            0x01 => Ok(PackerKind::Identity),
            0x02 => Ok(PackerKind::Huffman),
            0x04 => Ok(PackerKind::Prefix),
            other => Err(Error::corrupted(format!(
                "unknown packer flag byte 0x{other:02X}"
            ))),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Packer
// ------------------------------------------------------------------------------------------------

/// A string packer, dispatched over the sealed variant set.
#[derive(Debug, Clone)]
pub enum Packer {
    /// Stores strings verbatim.
    Identity,
    /// Huffman-coded strings.
    Huffman(HuffmanPacker),
    /// Prefix-table-coded strings.
    Prefix(PrefixPacker),
}

impl Packer {
    /// Creates an empty packer of the given kind. Coding state is built by
    /// [`write_extra`](Self::write_extra) or restored by
    /// [`read_extra`](Self::read_extra).
    pub fn new(kind: PackerKind) -> Self {
        match kind {
            PackerKind::Identity => Packer::Identity,
            PackerKind::Huffman => Packer::Huffman(HuffmanPacker::default()),
            PackerKind::Prefix => Packer::Prefix(PrefixPacker::default()),
        }
    }

    /// Creates a packer from a string-table header flag byte.
    pub fn from_flags(flags: u8) -> Result<Self> {
        Ok(Self::new(PackerKind::from_flags(flags)?))
    }

    /// The strategy of this packer.
    pub fn kind(&self) -> PackerKind {
        match self {
            Packer::Identity => PackerKind::Identity,
            Packer::Huffman(_) => PackerKind::Huffman,
            Packer::Prefix(_) => PackerKind::Prefix,
        }
    }

    /// Flag byte for the string-table header.
    pub fn flags(&self) -> u8 {
        self.kind().flags()
    }

    /// Learns coding state from the corpus and serializes it to `dst`.
    /// Returns the number of bytes written.
    pub fn write_extra(&mut self, dst: &mut MemFile<'_>, strings: &[&str]) -> Result<usize> {
        match self {
            Packer::Identity => Ok(0),
            Packer::Huffman(p) => p.write_extra(dst, strings),
            Packer::Prefix(p) => p.write_extra(dst, strings),
        }
    }

    /// Restores coding state from `nbytes` of serialized extra at `src`.
    pub fn read_extra(&mut self, src: &mut MemFile<'_>, nbytes: usize) -> Result<()> {
        match self {
            Packer::Identity => {
                if nbytes != 0 {
                    return Err(Error::corrupted(
                        "identity packer declared non-empty extra",
                    ));
                }
                Ok(())
            }
            Packer::Huffman(p) => p.read_extra(src, nbytes),
            Packer::Prefix(p) => p.read_extra(src, nbytes),
        }
    }

    /// Encodes one string at the cursor of `dst`.
    pub fn encode_string(&self, dst: &mut MemFile<'_>, s: &str) -> Result<()> {
        match self {
            Packer::Identity => dst.write(s.as_bytes()),
            Packer::Huffman(p) => p.encode_string(dst, s),
            Packer::Prefix(p) => p.encode_string(dst, s),
        }
    }

    /// Decodes one string of `strlen` *decoded* bytes at the cursor of `src`.
    pub fn decode_string(&self, src: &mut MemFile<'_>, strlen: usize) -> Result<String> {
        match self {
            Packer::Identity => {
                let bytes = src.read(strlen)?.to_vec();
                String::from_utf8(bytes)
                    .map_err(|_| Error::corrupted("packed string is not valid UTF-8"))
            }
            Packer::Huffman(p) => p.decode_string(src, strlen),
            Packer::Prefix(p) => p.decode_string(src, strlen),
        }
    }

    /// Human-readable rendering of the coding state, for diagnostics.
    pub fn print_extra(&self, out: &mut String) {
        match self {
            Packer::Identity => out.push_str("identity: no extra\n"),
            Packer::Huffman(p) => p.print_extra(out),
            Packer::Prefix(p) => p.print_extra(out),
        }
    }

    /// Decodes the encoded string at the cursor and renders it for
    /// diagnostics, advancing `src` past the encoded bytes.
    pub fn print_encoded(
        &self,
        out: &mut String,
        src: &mut MemFile<'_>,
        strlen: usize,
    ) -> Result<()> {
        let decoded = self.decode_string(src, strlen)?;
        out.push_str(&format!("[{} chars] {decoded:?}\n", decoded.chars().count()));
        Ok(())
    }
}
