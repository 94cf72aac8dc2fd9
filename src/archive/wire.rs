//! Read/write implementations for the archive's on-disk structures.
//!
//! These are split into a separate file for readability — the format
//! constants and marker tables live in `super`. All structures go through
//! a [`MemFile`] cursor so short reads surface as errors instead of
//! panics.

use crate::archive::{
    ARCHIVE_MAGIC, ARCHIVE_VERSION, MARKER_COLUMN, MARKER_COLUMN_GROUP, MARKER_OBJECT_BEGIN,
    MARKER_RECORD_HEADER, MARKER_STRING_ENTRY, MARKER_STRING_TABLE, ObjectFlags,
};
use crate::error::{Error, Result};
use crate::mem::MemFile;

fn expect_marker(file: &mut MemFile<'_>, expected: u8) -> Result<()> {
    let found = file.read_u8()?;
    if found != expected {
        return Err(Error::corrupted(format!(
            "expected marker {:?}, found 0x{found:02X}",
            expected as char
        )));
    }
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Archive header
// ------------------------------------------------------------------------------------------------

/// Fixed-size header at offset 0.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ArchiveHeader {
    pub root_object_off: u64,
    pub string_index_off: u64,
}

impl ArchiveHeader {
    /// Serialized size: magic, version, two offsets.
    pub const SIZE: usize = 9 + 1 + 8 + 8;

    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write(&ARCHIVE_MAGIC)?;
        file.write_u8(ARCHIVE_VERSION)?;
        file.write_u64(self.root_object_off)?;
        file.write_u64(self.string_index_off)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        let magic = file.read(9)?;
        if magic != ARCHIVE_MAGIC {
            return Err(Error::corrupted("bad archive magic"));
        }
        let version = file.read_u8()?;
        if version != ARCHIVE_VERSION {
            return Err(Error::unsupported_version(version, ARCHIVE_VERSION));
        }
        Ok(Self {
            root_object_off: file.read_u64()?,
            string_index_off: file.read_u64()?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Record header
// ------------------------------------------------------------------------------------------------

/// Flag bit: the record's outer container was annotated sorted.
pub(crate) const RECORD_FLAG_IS_SORTED: u8 = 0x01;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RecordHeader {
    pub flags: u8,
    pub record_size: u64,
}

impl RecordHeader {
    pub const SIZE: usize = 1 + 1 + 8;

    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(MARKER_RECORD_HEADER)?;
        file.write_u8(self.flags)?;
        file.write_u64(self.record_size)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        expect_marker(file, MARKER_RECORD_HEADER)?;
        Ok(Self {
            flags: file.read_u8()?,
            record_size: file.read_u64()?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Object header
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectHeader {
    pub oid: u64,
    pub flags: ObjectFlags,
}

impl ObjectHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(MARKER_OBJECT_BEGIN)?;
        file.write_u64(self.oid)?;
        file.write_u32(self.flags.0)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        expect_marker(file, MARKER_OBJECT_BEGIN)?;
        let oid = file.read_u64()?;
        let flags = ObjectFlags(file.read_u32()?);
        flags.validate()?;
        Ok(Self { oid, flags })
    }
}

// ------------------------------------------------------------------------------------------------
// Property group header
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct PropHeader {
    pub marker: u8,
    pub num_entries: u32,
}

impl PropHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(self.marker)?;
        file.write_u32(self.num_entries)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        Ok(Self {
            marker: file.read_u8()?,
            num_entries: file.read_u32()?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// String table
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StringTableHeader {
    pub num_entries: u32,
    pub packer_flags: u8,
    pub first_entry_off: u64,
    pub extra_size: u64,
}

impl StringTableHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(MARKER_STRING_TABLE)?;
        file.write_u32(self.num_entries)?;
        file.write_u8(self.packer_flags)?;
        file.write_u64(self.first_entry_off)?;
        file.write_u64(self.extra_size)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        expect_marker(file, MARKER_STRING_TABLE)?;
        Ok(Self {
            num_entries: file.read_u32()?,
            packer_flags: file.read_u8()?,
            first_entry_off: file.read_u64()?,
            extra_size: file.read_u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StringEntryHeader {
    /// Absolute offset of the next entry; 0 on the last entry.
    pub next_entry_off: u64,
    pub string_id: u64,
    /// Decoded (unpacked) string length.
    pub string_len: u32,
}

impl StringEntryHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(MARKER_STRING_ENTRY)?;
        file.write_u64(self.next_entry_off)?;
        file.write_u64(self.string_id)?;
        file.write_u32(self.string_len)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        expect_marker(file, MARKER_STRING_ENTRY)?;
        Ok(Self {
            next_entry_off: file.read_u64()?,
            string_id: file.read_u64()?,
            string_len: file.read_u32()?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Object arrays: table, column group, column
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectArrayHeader {
    pub num_entries: u8,
}

impl ObjectArrayHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>, marker: u8) -> Result<()> {
        file.write_u8(marker)?;
        file.write_u8(self.num_entries)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>, marker: u8) -> Result<Self> {
        expect_marker(file, marker)?;
        Ok(Self {
            num_entries: file.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnGroupHeader {
    pub num_columns: u32,
    pub num_objects: u32,
}

impl ColumnGroupHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(MARKER_COLUMN_GROUP)?;
        file.write_u32(self.num_columns)?;
        file.write_u32(self.num_objects)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        expect_marker(file, MARKER_COLUMN_GROUP)?;
        Ok(Self {
            num_columns: file.read_u32()?,
            num_objects: file.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnHeader {
    /// String id of the property this column holds.
    pub column_name: u64,
    /// Base-type marker of the entries (a scalar `PropType` marker).
    pub value_type: u8,
    pub num_entries: u32,
}

impl ColumnHeader {
    pub fn write_to(&self, file: &mut MemFile<'_>) -> Result<()> {
        file.write_u8(MARKER_COLUMN)?;
        file.write_u64(self.column_name)?;
        file.write_u8(self.value_type)?;
        file.write_u32(self.num_entries)?;
        Ok(())
    }

    pub fn read_from(file: &mut MemFile<'_>) -> Result<Self> {
        expect_marker(file, MARKER_COLUMN)?;
        Ok(Self {
            column_name: file.read_u64()?,
            value_type: file.read_u8()?,
            num_entries: file.read_u32()?,
        })
    }
}
