//! Marker bytes and type tables for the binary record format.
//!
//! Every structural element of a record is introduced by a single ASCII
//! marker byte. Containers use a *derived* marker that encodes both the
//! container shape and its abstract-type annotation (sorted/unsorted ×
//! set/multiset), so the annotation is part of the byte stream rather than
//! out-of-band metadata.
//!
//! Unknown marker bytes map to `MarkerMapping` errors instead of panics;
//! the tables below are the single source of truth for the byte mapping.

use crate::error::{Error, Result};

/// Zero byte marking an empty (reserved) slot inside a container.
pub const EMPTY_SLOT: u8 = 0;

/// End marker of arrays.
pub const ARRAY_END: u8 = b']';

/// End marker of objects.
pub const OBJECT_END: u8 = b'}';

// Primitive field markers.
pub(crate) const MARKER_NULL: u8 = b'n';
pub(crate) const MARKER_TRUE: u8 = b't';
pub(crate) const MARKER_FALSE: u8 = b'f';
pub(crate) const MARKER_STRING: u8 = b's';
pub(crate) const MARKER_U8: u8 = b'c';
pub(crate) const MARKER_U16: u8 = b'd';
pub(crate) const MARKER_U32: u8 = b'i';
pub(crate) const MARKER_U64: u8 = b'l';
pub(crate) const MARKER_I8: u8 = b'C';
pub(crate) const MARKER_I16: u8 = b'D';
pub(crate) const MARKER_I32: u8 = b'I';
pub(crate) const MARKER_I64: u8 = b'L';
pub(crate) const MARKER_FLOAT: u8 = b'r';
pub(crate) const MARKER_BINARY: u8 = b'b';
pub(crate) const MARKER_CUSTOM_BINARY: u8 = b'x';

// ------------------------------------------------------------------------------------------------
// Key kinds
// ------------------------------------------------------------------------------------------------

/// The five record key kinds, each tagged by its own marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// No key and no commit hash.
    NoKey,
    /// Auto-generated unsigned 64-bit key.
    AutoKey,
    /// User-provided unsigned 64-bit key.
    UKey,
    /// User-provided signed 64-bit key.
    IKey,
    /// User-provided string key.
    SKey,
}

impl KeyKind {
    /// Marker byte stored at record offset 0.
    pub fn marker(self) -> u8 {
        match self {
            KeyKind::NoKey => b'?',
            KeyKind::AutoKey => b'*',
            KeyKind::UKey => b'+',
            KeyKind::IKey => b'-',
            KeyKind::SKey => b'!',
        }
    }

    /// Inverse of [`marker`](Self::marker).
    pub fn from_marker(byte: u8) -> Result<Self> {
        match byte {
            b'?' => Ok(KeyKind::NoKey),
            b'*' => Ok(KeyKind::AutoKey),
            b'+' => Ok(KeyKind::UKey),
            b'-' => Ok(KeyKind::IKey),
            b'!' => Ok(KeyKind::SKey),
            other => Err(Error::marker_mapping(other)),
        }
    }

    /// Whether records of this kind carry a commit hash.
    pub fn has_hash(self) -> bool {
        !matches!(self, KeyKind::NoKey)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, KeyKind::AutoKey | KeyKind::UKey)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, KeyKind::IKey)
    }

    pub fn is_string(self) -> bool {
        matches!(self, KeyKind::SKey)
    }
}

// ------------------------------------------------------------------------------------------------
// Abstract container types
// ------------------------------------------------------------------------------------------------

/// Container shapes that carry an abstract-type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    Array,
    Object,
    Column,
}

/// Abstract-type annotation of a container. Recorded in the marker byte;
/// never enforced by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractType {
    /// Duplicates allowed, no ordering — the JSON-compatible default.
    UnsortedMultiset,
    /// Duplicates allowed, ordered.
    SortedMultiset,
    /// No duplicates, no ordering.
    UnsortedSet,
    /// No duplicates, ordered.
    SortedSet,
}

impl AbstractType {
    pub fn is_multiset(self) -> bool {
        matches!(self, AbstractType::UnsortedMultiset | AbstractType::SortedMultiset)
    }

    pub fn is_sorted(self) -> bool {
        matches!(self, AbstractType::SortedMultiset | AbstractType::SortedSet)
    }

    /// Derived marker byte for a container of the given shape.
    pub fn marker(self, shape: ContainerShape) -> u8 {
        use AbstractType::*;
        match (shape, self) {
            (ContainerShape::Array, UnsortedMultiset) => b'[',
            (ContainerShape::Array, SortedMultiset) => b'a',
            (ContainerShape::Array, UnsortedSet) => b'A',
            (ContainerShape::Array, SortedSet) => b'y',
            (ContainerShape::Object, UnsortedMultiset) => b'{',
            (ContainerShape::Object, SortedMultiset) => b'o',
            (ContainerShape::Object, UnsortedSet) => b'O',
            (ContainerShape::Object, SortedSet) => b'w',
            (ContainerShape::Column, UnsortedMultiset) => b'0',
            (ContainerShape::Column, SortedMultiset) => b'9',
            (ContainerShape::Column, UnsortedSet) => b'k',
            (ContainerShape::Column, SortedSet) => b'K',
        }
    }

    /// Classifies a derived marker byte into `(shape, annotation)`.
    pub fn classify(byte: u8) -> Option<(ContainerShape, AbstractType)> {
        use AbstractType::*;
        use ContainerShape::*;
        match byte {
            b'[' => Some((Array, UnsortedMultiset)),
            b'a' => Some((Array, SortedMultiset)),
            b'A' => Some((Array, UnsortedSet)),
            b'y' => Some((Array, SortedSet)),
            b'{' => Some((Object, UnsortedMultiset)),
            b'o' => Some((Object, SortedMultiset)),
            b'O' => Some((Object, UnsortedSet)),
            b'w' => Some((Object, SortedSet)),
            b'0' => Some((Column, UnsortedMultiset)),
            b'9' => Some((Column, SortedMultiset)),
            b'k' => Some((Column, UnsortedSet)),
            b'K' => Some((Column, SortedSet)),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Field types
// ------------------------------------------------------------------------------------------------

/// Logical type of a field, as classified from its marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Null,
    True,
    False,
    String,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    Binary,
    CustomBinary,
    Object,
    Array,
    Column,
}

impl FieldType {
    /// Classifies a marker byte. Container markers of any annotation map to
    /// their shape's field type.
    pub fn from_marker(byte: u8) -> Result<Self> {
        if let Some((shape, _)) = AbstractType::classify(byte) {
            return Ok(match shape {
                ContainerShape::Array => FieldType::Array,
                ContainerShape::Object => FieldType::Object,
                ContainerShape::Column => FieldType::Column,
            });
        }
        match byte {
            MARKER_NULL => Ok(FieldType::Null),
            MARKER_TRUE => Ok(FieldType::True),
            MARKER_FALSE => Ok(FieldType::False),
            MARKER_STRING => Ok(FieldType::String),
            MARKER_U8 => Ok(FieldType::U8),
            MARKER_U16 => Ok(FieldType::U16),
            MARKER_U32 => Ok(FieldType::U32),
            MARKER_U64 => Ok(FieldType::U64),
            MARKER_I8 => Ok(FieldType::I8),
            MARKER_I16 => Ok(FieldType::I16),
            MARKER_I32 => Ok(FieldType::I32),
            MARKER_I64 => Ok(FieldType::I64),
            MARKER_FLOAT => Ok(FieldType::Float),
            MARKER_BINARY => Ok(FieldType::Binary),
            MARKER_CUSTOM_BINARY => Ok(FieldType::CustomBinary),
            other => Err(Error::marker_mapping(other)),
        }
    }

    /// Payload size of fixed-width fields (marker byte excluded); `None`
    /// for variable-length and container fields.
    pub(crate) fn fixed_payload_size(self) -> Option<usize> {
        match self {
            FieldType::Null | FieldType::True | FieldType::False => Some(0),
            FieldType::U8 | FieldType::I8 => Some(1),
            FieldType::U16 | FieldType::I16 => Some(2),
            FieldType::U32 | FieldType::I32 | FieldType::Float => Some(4),
            FieldType::U64 | FieldType::I64 => Some(8),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Column element types
// ------------------------------------------------------------------------------------------------

/// Element type of a column container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    Boolean,
}

/// Three-valued boolean byte stored in boolean columns.
pub const COLUMN_BOOL_FALSE: u8 = 0;
pub const COLUMN_BOOL_TRUE: u8 = 1;
pub const COLUMN_BOOL_NULL: u8 = 2;

impl ColumnType {
    /// Element-type marker byte, written right after the column's derived
    /// container marker.
    pub fn marker(self) -> u8 {
        match self {
            ColumnType::U8 => b'1',
            ColumnType::U16 => b'2',
            ColumnType::U32 => b'3',
            ColumnType::U64 => b'4',
            ColumnType::I8 => b'5',
            ColumnType::I16 => b'6',
            ColumnType::I32 => b'7',
            ColumnType::I64 => b'8',
            ColumnType::Float => b'R',
            ColumnType::Boolean => b'B',
        }
    }

    /// Inverse of [`marker`](Self::marker).
    pub fn from_marker(byte: u8) -> Result<Self> {
        match byte {
            b'1' => Ok(ColumnType::U8),
            b'2' => Ok(ColumnType::U16),
            b'3' => Ok(ColumnType::U32),
            b'4' => Ok(ColumnType::U64),
            b'5' => Ok(ColumnType::I8),
            b'6' => Ok(ColumnType::I16),
            b'7' => Ok(ColumnType::I32),
            b'8' => Ok(ColumnType::I64),
            b'R' => Ok(ColumnType::Float),
            b'B' => Ok(ColumnType::Boolean),
            other => Err(Error::marker_mapping(other)),
        }
    }

    /// Byte width of one element.
    pub fn element_size(self) -> usize {
        match self {
            ColumnType::U8 | ColumnType::I8 | ColumnType::Boolean => 1,
            ColumnType::U16 | ColumnType::I16 => 2,
            ColumnType::U32 | ColumnType::I32 | ColumnType::Float => 4,
            ColumnType::U64 | ColumnType::I64 => 8,
        }
    }

    /// The null sentinel for this element type, LE-encoded into `buf`.
    /// Returns the element size.
    pub(crate) fn write_null_sentinel(self, buf: &mut [u8; 8]) -> usize {
        match self {
            ColumnType::U8 => {
                buf[0] = u8::MAX;
                1
            }
            ColumnType::U16 => {
                buf[..2].copy_from_slice(&u16::MAX.to_le_bytes());
                2
            }
            ColumnType::U32 => {
                buf[..4].copy_from_slice(&u32::MAX.to_le_bytes());
                4
            }
            ColumnType::U64 => {
                buf[..8].copy_from_slice(&u64::MAX.to_le_bytes());
                8
            }
            ColumnType::I8 => {
                buf[0] = i8::MIN as u8;
                1
            }
            ColumnType::I16 => {
                buf[..2].copy_from_slice(&i16::MIN.to_le_bytes());
                2
            }
            ColumnType::I32 => {
                buf[..4].copy_from_slice(&i32::MIN.to_le_bytes());
                4
            }
            ColumnType::I64 => {
                buf[..8].copy_from_slice(&i64::MIN.to_le_bytes());
                8
            }
            ColumnType::Float => {
                buf[..4].copy_from_slice(&f32::NAN.to_le_bytes());
                4
            }
            ColumnType::Boolean => {
                buf[0] = COLUMN_BOOL_NULL;
                1
            }
        }
    }

    /// The [`FieldType`] an element of this column reads back as.
    pub fn field_type(self) -> FieldType {
        match self {
            ColumnType::U8 => FieldType::U8,
            ColumnType::U16 => FieldType::U16,
            ColumnType::U32 => FieldType::U32,
            ColumnType::U64 => FieldType::U64,
            ColumnType::I8 => FieldType::I8,
            ColumnType::I16 => FieldType::I16,
            ColumnType::I32 => FieldType::I32,
            ColumnType::I64 => FieldType::I64,
            ColumnType::Float => FieldType::Float,
            ColumnType::Boolean => FieldType::True,
        }
    }
}
