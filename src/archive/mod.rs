//! Archive Module
//!
//! A packed, read-only, columnar on-disk form of a record. Objects are
//! stored as **type-grouped property tables**: all `u8` properties of an
//! object sit in one group, all string properties in another, and a
//! 32-bit flag word plus a dense per-group offset array lets a reader
//! jump straight to the group it wants. Strings live once, in an embedded
//! dictionary table compressed by a pluggable [`Packer`].
//!
//! # On-disk layout
//!
//! ```text
//! [ARCHIVE_HEADER]            magic "carbon\0\0\0", version, root off, string index off
//! [STRING_TABLE]              's' header, packer extra, 'e' entries (id, len, packed bytes)
//! [RECORD_HEADER]             'r', flags{is_sorted}, record size
//! [ROOT_OBJECT]               '{' oid flags, offset array, property groups, '}'
//! [STRING_ID_INDEX]           (id, entry offset) pairs
//! ```
//!
//! Property group shapes (see [`PropType`] for the canonical order):
//!
//! - **Null** — header + keys only.
//! - **Fixed** — header, keys, packed scalar values (string values are ids).
//! - **Object** — header, keys, offsets to nested serialized objects.
//! - **Array** — header, keys, per-key lengths, concatenated payloads.
//! - **Object-array** — table of column groups; each column holds one
//!   property across all embedded objects (columnar transposition).
//!
//! # Concurrency model
//!
//! Archives are immutable once written. The reader memory-maps the file;
//! multiple threads may share one [`Archive`] without synchronization.
//!
//! [`Packer`]: crate::pack::Packer

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod reader;
pub mod visitor;
pub(crate) mod wire;
pub mod writer;

#[cfg(test)]
mod tests;

pub use reader::{Archive, ArchiveScalar, GroupPayload, ObjectCursor, PropGroup};
pub use visitor::{ArchiveVisitor, VisitPolicy};
pub use writer::ArchiveWriter;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use crate::error::{Error, Result};

/// Magic bytes at offset 0 of every archive.
pub const ARCHIVE_MAGIC: [u8; 9] = *b"carbon\0\0\0";

/// Archive format version written and accepted by this build.
pub const ARCHIVE_VERSION: u8 = 1;

// Structural marker symbols.
pub(crate) const MARKER_OBJECT_BEGIN: u8 = b'{';
pub(crate) const MARKER_OBJECT_END: u8 = b'}';
pub(crate) const MARKER_RECORD_HEADER: u8 = b'r';
pub(crate) const MARKER_STRING_TABLE: u8 = b's';
pub(crate) const MARKER_STRING_ENTRY: u8 = b'e';
pub(crate) const MARKER_COLUMN_GROUP: u8 = b'X';
pub(crate) const MARKER_COLUMN: u8 = b'x';

// ------------------------------------------------------------------------------------------------
// Property types
// ------------------------------------------------------------------------------------------------

/// The 26 per-type property groups an object may carry, in canonical
/// order. The flag bit of each group is its index in this order, and the
/// dense offset array lists present groups in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropType {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Float,
    String,
    Object,
    NullArray,
    BoolArray,
    I8Array,
    I16Array,
    I32Array,
    I64Array,
    U8Array,
    U16Array,
    U32Array,
    U64Array,
    FloatArray,
    StringArray,
    ObjectArray,
}

/// Canonical group order; index equals flag bit.
pub const CANONICAL_PROP_ORDER: [PropType; 26] = [
    PropType::Null,
    PropType::Bool,
    PropType::I8,
    PropType::I16,
    PropType::I32,
    PropType::I64,
    PropType::U8,
    PropType::U16,
    PropType::U32,
    PropType::U64,
    PropType::Float,
    PropType::String,
    PropType::Object,
    PropType::NullArray,
    PropType::BoolArray,
    PropType::I8Array,
    PropType::I16Array,
    PropType::I32Array,
    PropType::I64Array,
    PropType::U8Array,
    PropType::U16Array,
    PropType::U32Array,
    PropType::U64Array,
    PropType::FloatArray,
    PropType::StringArray,
    PropType::ObjectArray,
];

impl PropType {
    /// Flag bit position of this group in the object header flag word.
    pub fn flag_bit(self) -> u32 {
        CANONICAL_PROP_ORDER
            .iter()
            .position(|&p| p == self)
            .unwrap_or(0) as u32
    }

    /// Marker symbol written in the group's `prop_header`.
    pub fn marker(self) -> u8 {
        match self {
            PropType::Null => b'n',
            PropType::Bool => b'z',
            PropType::I8 => b'C',
            PropType::I16 => b'D',
            PropType::I32 => b'I',
            PropType::I64 => b'L',
            PropType::U8 => b'c',
            PropType::U16 => b'd',
            PropType::U32 => b'i',
            PropType::U64 => b'l',
            PropType::Float => b'f',
            PropType::String => b't',
            PropType::Object => b'o',
            PropType::NullArray => b'N',
            PropType::BoolArray => b'Z',
            PropType::I8Array => b'G',
            PropType::I16Array => b'H',
            PropType::I32Array => b'J',
            PropType::I64Array => b'K',
            PropType::U8Array => b'g',
            PropType::U16Array => b'j',
            PropType::U32Array => b'k',
            PropType::U64Array => b'm',
            PropType::FloatArray => b'F',
            PropType::StringArray => b'T',
            PropType::ObjectArray => b'O',
        }
    }

    /// Inverse of [`marker`](Self::marker).
    pub fn from_marker(byte: u8) -> Result<Self> {
        for pt in CANONICAL_PROP_ORDER {
            if pt.marker() == byte {
                return Ok(pt);
            }
        }
        Err(Error::marker_mapping(byte))
    }

    /// The array group that holds values of this base type; `None` for
    /// groups that are already arrays.
    pub fn array_counterpart(self) -> Option<PropType> {
        Some(match self {
            PropType::Null => PropType::NullArray,
            PropType::Bool => PropType::BoolArray,
            PropType::I8 => PropType::I8Array,
            PropType::I16 => PropType::I16Array,
            PropType::I32 => PropType::I32Array,
            PropType::I64 => PropType::I64Array,
            PropType::U8 => PropType::U8Array,
            PropType::U16 => PropType::U16Array,
            PropType::U32 => PropType::U32Array,
            PropType::U64 => PropType::U64Array,
            PropType::Float => PropType::FloatArray,
            PropType::String => PropType::StringArray,
            PropType::Object => PropType::ObjectArray,
            _ => return None,
        })
    }

    /// Whether this group stores per-key arrays.
    pub fn is_array(self) -> bool {
        self.flag_bit() >= PropType::NullArray.flag_bit()
    }

    /// Byte width of one packed scalar value; `None` for null, object,
    /// and array groups.
    pub(crate) fn scalar_size(self) -> Option<usize> {
        match self {
            PropType::Bool | PropType::U8 | PropType::I8 => Some(1),
            PropType::U16 | PropType::I16 => Some(2),
            PropType::U32 | PropType::I32 | PropType::Float => Some(4),
            PropType::U64 | PropType::I64 | PropType::String => Some(8),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Object flags
// ------------------------------------------------------------------------------------------------

/// 32-bit flag word of an object header; bit *i* signals that the group
/// `CANONICAL_PROP_ORDER[i]` is present. Bits 26..32 are reserved zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFlags(pub u32);

impl ObjectFlags {
    pub fn set(&mut self, pt: PropType) {
        self.0 |= 1 << pt.flag_bit();
    }

    pub fn contains(self, pt: PropType) -> bool {
        self.0 & (1 << pt.flag_bit()) != 0
    }

    /// Number of present groups (length of the offset array).
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Present groups in canonical order.
    pub fn iter_present(self) -> impl Iterator<Item = PropType> {
        CANONICAL_PROP_ORDER
            .into_iter()
            .filter(move |pt| self.contains(*pt))
    }

    /// Index of `pt`'s slot within the dense offset array.
    pub fn offset_index(self, pt: PropType) -> Option<usize> {
        if !self.contains(pt) {
            return None;
        }
        Some(
            CANONICAL_PROP_ORDER
                .iter()
                .take(pt.flag_bit() as usize)
                .filter(|p| self.contains(**p))
                .count(),
        )
    }

    pub fn validate(self) -> Result<()> {
        if self.0 >> 26 != 0 {
            return Err(Error::corrupted("reserved object flag bits set"));
        }
        Ok(())
    }
}

/// Bit mask selecting every property group, for visitor calls.
pub const VISIT_ALL: u32 = (1 << 26) - 1;
