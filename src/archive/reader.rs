//! Archive reader.
//!
//! Opens an archive from a memory-mapped file (or an in-memory block),
//! verifies the header, restores the string packer from the embedded
//! table, and offers random access: string lookup by id through the
//! id-to-offset index, and per-object property groups through the flag
//! word and dense offset array — a reader never scans groups it does not
//! want.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::info;

use crate::archive::wire::{
    ArchiveHeader, ColumnGroupHeader, ColumnHeader, ObjectArrayHeader, ObjectHeader, PropHeader,
    RECORD_FLAG_IS_SORTED, RecordHeader, StringEntryHeader, StringTableHeader,
};
use crate::archive::{MARKER_OBJECT_END, ObjectFlags, PropType};
use crate::error::{Error, Result};
use crate::mem::{MemBlock, MemFile};
use crate::pack::Packer;

// ------------------------------------------------------------------------------------------------
// Backing buffer
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
enum ArchiveBuf {
    Mapped(Mmap),
    Owned(MemBlock),
}

impl ArchiveBuf {
    fn bytes(&self) -> &[u8] {
        match self {
            ArchiveBuf::Mapped(m) => m,
            ArchiveBuf::Owned(b) => b.raw_data(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Decoded values
// ------------------------------------------------------------------------------------------------

/// One packed scalar value read from a property group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArchiveScalar {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
    /// A string value, referenced by dictionary id.
    StringId(u64),
}

/// One decoded property group of an object.
#[derive(Debug, Clone)]
pub struct PropGroup {
    pub prop_type: PropType,
    /// Property key string ids, group order.
    pub keys: Vec<u64>,
    pub payload: GroupPayload,
}

/// Group payload, shaped by the group's kind.
#[derive(Debug, Clone)]
pub enum GroupPayload {
    /// Null group: keys only.
    Keys,
    /// Fixed-size group: one scalar per key.
    Fixed(Vec<ArchiveScalar>),
    /// Object group: absolute offsets of nested objects.
    Objects(Vec<u64>),
    /// Array groups: one entry per key.
    Arrays(Vec<ArrayEntry>),
    /// Object-array (table) group: absolute offsets of column groups.
    ColumnGroups(Vec<u64>),
}

/// One per-key entry of an array group.
#[derive(Debug, Clone)]
pub struct ArrayEntry {
    pub len: u32,
    /// Decoded elements; empty for null arrays (`len` carries the count).
    pub values: Vec<ArchiveScalar>,
}

/// One column of an object-array column group.
#[derive(Debug, Clone)]
pub struct ColumnData {
    /// String id of the property this column holds.
    pub name: u64,
    /// Base type of the entries.
    pub value_type: PropType,
    /// One entry per embedded object.
    pub entries: Vec<ColumnEntry>,
}

/// Values one embedded object contributes to a column.
#[derive(Debug, Clone)]
pub enum ColumnEntry {
    /// `len` nulls.
    Nulls(u32),
    Scalars(Vec<ArchiveScalar>),
    /// Absolute offsets of serialized nested objects.
    Objects(Vec<u64>),
}

// ------------------------------------------------------------------------------------------------
// Archive
// ------------------------------------------------------------------------------------------------

/// A read-only, randomly accessible archive.
#[derive(Debug)]
pub struct Archive {
    buf: ArchiveBuf,
    root_object_off: u64,
    record_flags: u8,
    record_size: u64,
    packer: Packer,
    /// String id → entry offset in the string table.
    string_index: HashMap<u64, u64>,
    num_strings: u32,
}

impl Archive {
    /// Opens and memory-maps an archive file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(Error::fread)?;
        // SAFETY: the mapping is read-only and archives are written once,
        // so the underlying file is never mutated while mapped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(Error::fread)?;
        let archive = Self::from_buf(ArchiveBuf::Mapped(mmap))?;
        info!(
            path = %path.as_ref().display(),
            strings = archive.num_strings,
            record_bytes = archive.record_size,
            "archive opened"
        );
        Ok(archive)
    }

    /// Adopts an archive already held in memory.
    pub fn from_block(block: MemBlock) -> Result<Self> {
        Self::from_buf(ArchiveBuf::Owned(block))
    }

    fn from_buf(buf: ArchiveBuf) -> Result<Self> {
        let (header, table, packer, record, string_index) = {
            let mut file = MemFile::open_slice(buf.bytes());
            let header = ArchiveHeader::read_from(&mut file)?;

            let table = StringTableHeader::read_from(&mut file)?;
            let mut packer = Packer::from_flags(table.packer_flags)?;
            packer.read_extra(&mut file, table.extra_size as usize)?;

            if (header.root_object_off as usize) < RecordHeader::SIZE {
                return Err(Error::corrupted("root object offset underflows"));
            }
            file.seek(header.root_object_off as usize - RecordHeader::SIZE)?;
            let record = RecordHeader::read_from(&mut file)?;

            file.seek(header.string_index_off as usize)?;
            let n = file.read_u32()?;
            let mut string_index = HashMap::with_capacity(n as usize);
            for _ in 0..n {
                let id = file.read_u64()?;
                let off = file.read_u64()?;
                string_index.insert(id, off);
            }
            (header, table, packer, record, string_index)
        };
        Ok(Self {
            buf,
            root_object_off: header.root_object_off,
            record_flags: record.flags,
            record_size: record.record_size,
            packer,
            string_index,
            num_strings: table.num_entries,
        })
    }

    pub(crate) fn file(&self) -> MemFile<'_> {
        MemFile::open_slice(self.buf.bytes())
    }

    /// Number of strings in the embedded table.
    pub fn num_strings(&self) -> u32 {
        self.num_strings
    }

    /// Whether the archived record's outer container was annotated sorted.
    pub fn is_sorted(&self) -> bool {
        self.record_flags & RECORD_FLAG_IS_SORTED != 0
    }

    /// Size in bytes of the record region.
    pub fn record_size(&self) -> u64 {
        self.record_size
    }

    /// All live string ids, ascending.
    pub fn string_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.string_index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Offset of a string's table entry, from the id index.
    pub fn string_entry_offset(&self, id: u64) -> Option<u64> {
        self.string_index.get(&id).copied()
    }

    /// Decodes the string stored under `id`.
    pub fn string(&self, id: u64) -> Result<String> {
        let off = self
            .string_index
            .get(&id)
            .copied()
            .ok_or_else(|| Error::illegal_arg(format!("string id {id} not in archive")))?;
        let mut file = self.file();
        file.seek(off as usize)?;
        let entry = StringEntryHeader::read_from(&mut file)?;
        if entry.string_id != id {
            return Err(Error::corrupted(format!(
                "string index points id {id} at entry for id {}",
                entry.string_id
            )));
        }
        self.packer.decode_string(&mut file, entry.string_len as usize)
    }

    /// Finds the id of `s` by scanning the string table.
    pub fn lookup_string(&self, s: &str) -> Result<Option<u64>> {
        for id in self.string_ids() {
            if self.string(id)? == s {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Cursor over the root object.
    pub fn root(&self) -> Result<ObjectCursor<'_>> {
        ObjectCursor::read_at(self, self.root_object_off as usize)
    }

    /// Cursor over the object serialized at `off`.
    pub fn object_at(&self, off: u64) -> Result<ObjectCursor<'_>> {
        ObjectCursor::read_at(self, off as usize)
    }

    /// Decodes the column group at `off` (from an object-array group).
    pub fn column_group_at(&self, off: u64) -> Result<(u32, Vec<ColumnData>)> {
        let mut file = self.file();
        file.seek(off as usize)?;
        let hdr = ColumnGroupHeader::read_from(&mut file)?;
        let mut col_offs = Vec::with_capacity(hdr.num_columns as usize);
        for _ in 0..hdr.num_columns {
            col_offs.push(file.read_u64()?);
        }
        let mut columns = Vec::with_capacity(col_offs.len());
        for col_off in col_offs {
            columns.push(self.read_column(col_off as usize)?);
        }
        Ok((hdr.num_objects, columns))
    }

    fn read_column(&self, off: usize) -> Result<ColumnData> {
        let mut file = self.file();
        file.seek(off)?;
        let hdr = ColumnHeader::read_from(&mut file)?;
        let value_type = PropType::from_marker(hdr.value_type)?;
        let mut lengths = Vec::with_capacity(hdr.num_entries as usize);
        for _ in 0..hdr.num_entries {
            lengths.push(file.read_u32()?);
        }
        let mut entries = Vec::with_capacity(lengths.len());
        let mut pos = file.tell();
        for len in lengths {
            match value_type {
                PropType::Null => entries.push(ColumnEntry::Nulls(len)),
                PropType::Object => {
                    let mut offs = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        offs.push(pos as u64);
                        pos = self.object_end(pos)?;
                    }
                    entries.push(ColumnEntry::Objects(offs));
                }
                _ => {
                    file.seek(pos)?;
                    let mut values = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        values.push(read_scalar(&mut file, value_type)?);
                    }
                    pos = file.tell();
                    entries.push(ColumnEntry::Scalars(values));
                }
            }
        }
        Ok(ColumnData {
            name: hdr.column_name,
            value_type,
            entries,
        })
    }

    /// Byte offset just past the object serialized at `off`.
    pub(crate) fn object_end(&self, off: usize) -> Result<usize> {
        let cursor = ObjectCursor::read_at(self, off)?;
        let mut pos = cursor.body_off;
        for pt in cursor.flags.iter_present() {
            pos = self.group_end(pt, pos)?;
        }
        let file = self.file();
        if file.slice_at(pos, 1)?[0] != MARKER_OBJECT_END {
            return Err(Error::corrupted("object not terminated"));
        }
        Ok(pos + 1)
    }

    fn group_end(&self, pt: PropType, off: usize) -> Result<usize> {
        let mut file = self.file();
        file.seek(off)?;
        if pt == PropType::ObjectArray {
            let hdr = ObjectArrayHeader::read_from(&mut file, pt.marker())?;
            let n = hdr.num_entries as usize;
            file.skip(n * 8)?; // keys
            file.skip(n * 8)?; // column-group offsets
            let mut pos = file.tell();
            for _ in 0..n {
                pos = self.column_group_end(pos)?;
            }
            return Ok(pos);
        }
        let hdr = PropHeader::read_from(&mut file)?;
        if hdr.marker != pt.marker() {
            return Err(Error::corrupted("group marker does not match flag word"));
        }
        let n = hdr.num_entries as usize;
        file.skip(n * 8)?;
        match pt {
            PropType::Null => Ok(file.tell()),
            PropType::Object => {
                file.skip(n * 8)?;
                let mut pos = file.tell();
                for _ in 0..n {
                    pos = self.object_end(pos)?;
                }
                Ok(pos)
            }
            pt if !pt.is_array() => {
                let size = pt
                    .scalar_size()
                    .ok_or_else(|| Error::internal("scalar group without size"))?;
                file.skip(n * size)?;
                Ok(file.tell())
            }
            _ => {
                let mut total = 0usize;
                for _ in 0..n {
                    total += file.read_u32()? as usize;
                }
                let elem = scalar_size_of_array(pt);
                file.skip(total * elem)?;
                Ok(file.tell())
            }
        }
    }

    fn column_group_end(&self, off: usize) -> Result<usize> {
        let mut file = self.file();
        file.seek(off)?;
        let hdr = ColumnGroupHeader::read_from(&mut file)?;
        let mut pos = file.tell() + hdr.num_columns as usize * 8;
        for _ in 0..hdr.num_columns {
            pos = self.column_end(pos)?;
        }
        Ok(pos)
    }

    fn column_end(&self, off: usize) -> Result<usize> {
        let mut file = self.file();
        file.seek(off)?;
        let hdr = ColumnHeader::read_from(&mut file)?;
        let value_type = PropType::from_marker(hdr.value_type)?;
        let mut total = 0usize;
        for _ in 0..hdr.num_entries {
            total += file.read_u32()? as usize;
        }
        match value_type {
            PropType::Null => Ok(file.tell()),
            PropType::Object => {
                let mut pos = file.tell();
                for _ in 0..total {
                    pos = self.object_end(pos)?;
                }
                Ok(pos)
            }
            _ => {
                let size = value_type
                    .scalar_size()
                    .ok_or_else(|| Error::corrupted("column with non-scalar base type"))?;
                Ok(file.tell() + total * size)
            }
        }
    }
}

/// Element width of an array group's payload values.
fn scalar_size_of_array(pt: PropType) -> usize {
    match pt {
        PropType::NullArray => 0,
        PropType::BoolArray | PropType::U8Array | PropType::I8Array => 1,
        PropType::U16Array | PropType::I16Array => 2,
        PropType::U32Array | PropType::I32Array | PropType::FloatArray => 4,
        _ => 8,
    }
}

fn read_scalar(file: &mut MemFile<'_>, pt: PropType) -> Result<ArchiveScalar> {
    Ok(match pt {
        PropType::Bool | PropType::BoolArray => {
            let b = file.read_u8()?;
            match b {
                0 => ArchiveScalar::Bool(false),
                1 => ArchiveScalar::Bool(true),
                other => {
                    return Err(Error::corrupted(format!(
                        "invalid packed boolean 0x{other:02X}"
                    )));
                }
            }
        }
        PropType::U8 | PropType::U8Array => ArchiveScalar::U8(file.read_u8()?),
        PropType::U16 | PropType::U16Array => ArchiveScalar::U16(file.read_u16()?),
        PropType::U32 | PropType::U32Array => ArchiveScalar::U32(file.read_u32()?),
        PropType::U64 | PropType::U64Array => ArchiveScalar::U64(file.read_u64()?),
        PropType::I8 | PropType::I8Array => ArchiveScalar::I8(file.read_i8()?),
        PropType::I16 | PropType::I16Array => ArchiveScalar::I16(file.read_i16()?),
        PropType::I32 | PropType::I32Array => ArchiveScalar::I32(file.read_i32()?),
        PropType::I64 | PropType::I64Array => ArchiveScalar::I64(file.read_i64()?),
        PropType::Float | PropType::FloatArray => ArchiveScalar::Float(file.read_f32()?),
        PropType::String | PropType::StringArray => ArchiveScalar::StringId(file.read_u64()?),
        other => {
            return Err(Error::internal(format!(
                "{other:?} has no scalar representation"
            )));
        }
    })
}

// ------------------------------------------------------------------------------------------------
// ObjectCursor
// ------------------------------------------------------------------------------------------------

/// Random-access view of one serialized object.
#[derive(Debug)]
pub struct ObjectCursor<'a> {
    archive: &'a Archive,
    oid: u64,
    flags: ObjectFlags,
    /// Dense group offsets, canonical order of present groups.
    group_offs: Vec<u64>,
    /// Offset of the first group (just past the offset array).
    body_off: usize,
}

impl<'a> ObjectCursor<'a> {
    fn read_at(archive: &'a Archive, off: usize) -> Result<Self> {
        let mut file = archive.file();
        file.seek(off)?;
        let header = ObjectHeader::read_from(&mut file)?;
        let mut group_offs = Vec::with_capacity(header.flags.count());
        for _ in 0..header.flags.count() {
            group_offs.push(file.read_u64()?);
        }
        Ok(Self {
            archive,
            oid: header.oid,
            flags: header.flags,
            group_offs,
            body_off: file.tell(),
        })
    }

    pub fn oid(&self) -> u64 {
        self.oid
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    /// Offset of the given group, without touching any other group.
    pub fn group_offset(&self, pt: PropType) -> Option<u64> {
        self.flags.offset_index(pt).map(|i| self.group_offs[i])
    }

    /// Decodes one property group; `Ok(None)` when the flag bit is unset.
    pub fn group(&self, pt: PropType) -> Result<Option<PropGroup>> {
        let Some(off) = self.group_offset(pt) else {
            return Ok(None);
        };
        let mut file = self.archive.file();
        file.seek(off as usize)?;

        if pt == PropType::ObjectArray {
            let hdr = ObjectArrayHeader::read_from(&mut file, pt.marker())?;
            let n = hdr.num_entries as usize;
            let mut keys = Vec::with_capacity(n);
            for _ in 0..n {
                keys.push(file.read_u64()?);
            }
            let mut offs = Vec::with_capacity(n);
            for _ in 0..n {
                offs.push(file.read_u64()?);
            }
            return Ok(Some(PropGroup {
                prop_type: pt,
                keys,
                payload: GroupPayload::ColumnGroups(offs),
            }));
        }

        let hdr = PropHeader::read_from(&mut file)?;
        if hdr.marker != pt.marker() {
            return Err(Error::corrupted("group marker does not match flag word"));
        }
        let n = hdr.num_entries as usize;
        let mut keys = Vec::with_capacity(n);
        for _ in 0..n {
            keys.push(file.read_u64()?);
        }

        let payload = match pt {
            PropType::Null => GroupPayload::Keys,
            PropType::Object => {
                let mut offs = Vec::with_capacity(n);
                for _ in 0..n {
                    offs.push(file.read_u64()?);
                }
                GroupPayload::Objects(offs)
            }
            pt if !pt.is_array() => {
                let mut values = Vec::with_capacity(n);
                for _ in 0..n {
                    values.push(read_scalar(&mut file, pt)?);
                }
                GroupPayload::Fixed(values)
            }
            _ => {
                let mut lengths = Vec::with_capacity(n);
                for _ in 0..n {
                    lengths.push(file.read_u32()?);
                }
                let mut entries = Vec::with_capacity(n);
                for len in lengths {
                    if pt == PropType::NullArray {
                        entries.push(ArrayEntry {
                            len,
                            values: Vec::new(),
                        });
                        continue;
                    }
                    let mut values = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        values.push(read_scalar(&mut file, pt)?);
                    }
                    entries.push(ArrayEntry { len, values });
                }
                GroupPayload::Arrays(entries)
            }
        };
        Ok(Some(PropGroup {
            prop_type: pt,
            keys,
            payload,
        }))
    }

    /// All present groups, canonical order.
    pub fn groups(&self) -> Result<Vec<PropGroup>> {
        let mut out = Vec::with_capacity(self.flags.count());
        for pt in self.flags.iter_present() {
            if let Some(group) = self.group(pt)? {
                out.push(group);
            }
        }
        Ok(out)
    }

    /// Looks up the string-typed property stored under key id `key`.
    pub fn string_prop(&self, key: u64) -> Result<Option<u64>> {
        let Some(group) = self.group(PropType::String)? else {
            return Ok(None);
        };
        let GroupPayload::Fixed(values) = &group.payload else {
            return Err(Error::corrupted("string group with non-fixed payload"));
        };
        for (k, v) in group.keys.iter().zip(values) {
            if *k == key {
                let ArchiveScalar::StringId(sid) = v else {
                    return Err(Error::corrupted("string group holds non-string value"));
                };
                return Ok(Some(*sid));
            }
        }
        Ok(None)
    }
}
