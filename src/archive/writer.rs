//! Columnar archive writer.
//!
//! The writer shreds a finished record into an object tree, interns every
//! string (property keys, string values, string-array elements) in a
//! dictionary, and lays the archive out in one pass with backpatched
//! offsets: header, packed string table, record region, string-id index.
//!
//! Not every record is archivable: the archive's property-table model
//! covers JSON-shaped data (null, bool, fixed-width integers, float,
//! string, object, and homogeneous arrays thereof). Binary fields and
//! heterogeneous arrays are rejected with `IllegalArg`.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::archive::wire::{
    ArchiveHeader, ColumnGroupHeader, ColumnHeader, ObjectArrayHeader, ObjectHeader, PropHeader,
    RECORD_FLAG_IS_SORTED, RecordHeader, StringEntryHeader, StringTableHeader,
};
use crate::archive::{MARKER_OBJECT_END, ObjectFlags, PropType};
use crate::error::{Error, Result};
use crate::mem::{AccessMode, MemBlock, MemFile};
use crate::pack::{Packer, PackerKind};
use crate::record::column_it::ColumnValue;
use crate::record::marker::{ColumnType, FieldType};
use crate::record::{ArrayIt, ObjectIt, Record};
use crate::strdict::StringDict;

// ------------------------------------------------------------------------------------------------
// Intermediate document model
// ------------------------------------------------------------------------------------------------

struct DocObject {
    oid: u64,
    props: Vec<(String, DocValue)>,
}

enum DocValue {
    Null,
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
    Str(String),
    Object(DocObject),
    NullArray(u32),
    /// Three-valued bytes (0 = false, 1 = true, 2 = null).
    BoolArray(Vec<u8>),
    U8Array(Vec<u8>),
    U16Array(Vec<u16>),
    U32Array(Vec<u32>),
    U64Array(Vec<u64>),
    I8Array(Vec<i8>),
    I16Array(Vec<i16>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    FloatArray(Vec<f32>),
    StrArray(Vec<String>),
    ObjectArray(Vec<DocObject>),
}

impl DocValue {
    fn prop_type(&self) -> PropType {
        match self {
            DocValue::Null => PropType::Null,
            DocValue::Bool(_) => PropType::Bool,
            DocValue::U8(_) => PropType::U8,
            DocValue::U16(_) => PropType::U16,
            DocValue::U32(_) => PropType::U32,
            DocValue::U64(_) => PropType::U64,
            DocValue::I8(_) => PropType::I8,
            DocValue::I16(_) => PropType::I16,
            DocValue::I32(_) => PropType::I32,
            DocValue::I64(_) => PropType::I64,
            DocValue::Float(_) => PropType::Float,
            DocValue::Str(_) => PropType::String,
            DocValue::Object(_) => PropType::Object,
            DocValue::NullArray(_) => PropType::NullArray,
            DocValue::BoolArray(_) => PropType::BoolArray,
            DocValue::U8Array(_) => PropType::U8Array,
            DocValue::U16Array(_) => PropType::U16Array,
            DocValue::U32Array(_) => PropType::U32Array,
            DocValue::U64Array(_) => PropType::U64Array,
            DocValue::I8Array(_) => PropType::I8Array,
            DocValue::I16Array(_) => PropType::I16Array,
            DocValue::I32Array(_) => PropType::I32Array,
            DocValue::I64Array(_) => PropType::I64Array,
            DocValue::FloatArray(_) => PropType::FloatArray,
            DocValue::StrArray(_) => PropType::StringArray,
            DocValue::ObjectArray(_) => PropType::ObjectArray,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// ArchiveWriter
// ------------------------------------------------------------------------------------------------

/// Writes records into the packed archive format.
pub struct ArchiveWriter {
    packer_kind: PackerKind,
}

impl ArchiveWriter {
    /// Creates a writer using the given string packer strategy.
    pub fn new(packer_kind: PackerKind) -> Self {
        Self { packer_kind }
    }

    /// Serializes `record` into an archive held in a fresh memory block.
    ///
    /// The record's outer array must hold exactly one object (the root).
    pub fn write_record(&self, record: &Record) -> Result<MemBlock> {
        let mut next_oid = 1u64;
        let doc = build_root(record, &mut next_oid)?;

        let dict = StringDict::with_capacity(64);
        collect_strings(&doc, &dict);
        let contents = dict.contents();
        let sids: HashMap<String, u64> = contents
            .iter()
            .map(|(id, s)| (s.clone(), *id))
            .collect();

        let is_sorted = record.iter()?.is_sorted();

        let mut block = MemBlock::with_capacity(4096);
        {
            let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);

            // 1. Header placeholder; backpatched last.
            ArchiveHeader::default().write_to(&mut file)?;

            // 2. String table.
            let table_off = file.tell();
            StringTableHeader::default().write_to(&mut file)?;
            let mut packer = Packer::new(self.packer_kind);
            let corpus: Vec<&str> = contents.iter().map(|(_, s)| s.as_str()).collect();
            let extra_size = packer.write_extra(&mut file, &corpus)?;
            let first_entry_off = file.tell() as u64;

            let mut entry_offs: Vec<u64> = Vec::with_capacity(contents.len());
            for (id, s) in &contents {
                entry_offs.push(file.tell() as u64);
                StringEntryHeader {
                    next_entry_off: 0,
                    string_id: *id,
                    string_len: s.len() as u32,
                }
                .write_to(&mut file)?;
                packer.encode_string(&mut file, s)?;
            }
            let table_end = file.tell();
            for pair in entry_offs.windows(2) {
                file.seek(pair[0] as usize + 1)?;
                file.write_u64(pair[1])?;
            }
            file.seek(table_off)?;
            StringTableHeader {
                num_entries: contents.len() as u32,
                packer_flags: packer.flags(),
                first_entry_off,
                extra_size: extra_size as u64,
            }
            .write_to(&mut file)?;
            file.seek(table_end)?;

            // 3. Record region.
            let record_hdr_off = file.tell();
            RecordHeader {
                flags: if is_sorted { RECORD_FLAG_IS_SORTED } else { 0 },
                record_size: 0,
            }
            .write_to(&mut file)?;
            let root_off = file.tell() as u64;
            write_object(&mut file, &doc, &sids)?;
            let record_end = file.tell();
            file.seek(record_hdr_off)?;
            RecordHeader {
                flags: if is_sorted { RECORD_FLAG_IS_SORTED } else { 0 },
                record_size: record_end as u64 - root_off,
            }
            .write_to(&mut file)?;
            file.seek(record_end)?;

            // 4. String-id-to-offset index.
            let index_off = file.tell() as u64;
            file.write_u32(contents.len() as u32)?;
            for ((id, _), entry_off) in contents.iter().zip(&entry_offs) {
                file.write_u64(*id)?;
                file.write_u64(*entry_off)?;
            }

            // 5. Backpatch the archive header.
            file.seek(0)?;
            ArchiveHeader {
                root_object_off: root_off,
                string_index_off: index_off,
            }
            .write_to(&mut file)?;

            debug!(
                strings = contents.len(),
                record_bytes = record_end as u64 - root_off,
                "archive serialized"
            );
        }
        Ok(block)
    }

    /// Serializes `record` and writes the archive to `path`.
    pub fn write_record_to_file(&self, record: &Record, path: impl AsRef<Path>) -> Result<()> {
        let block = self.write_record(record)?;
        let mut f = File::create(path.as_ref()).map_err(Error::fwrite)?;
        block.write_to(&mut f)?;
        info!(path = %path.as_ref().display(), bytes = block.size(), "archive written");
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Record → document model
// ------------------------------------------------------------------------------------------------

fn build_root(record: &Record, next_oid: &mut u64) -> Result<DocObject> {
    let mut it = record.iter()?;
    if !it.next()? {
        return Err(Error::illegal_arg("empty record cannot be archived"));
    }
    if it.field_type()? != FieldType::Object {
        return Err(Error::illegal_arg(
            "archive root must be an object (unit-array record)",
        ));
    }
    let mut obj = it.object_value()?;
    let root = build_object(&mut obj, next_oid)?;
    drop(obj);
    if it.next()? {
        return Err(Error::illegal_arg(
            "archive requires exactly one top-level object",
        ));
    }
    Ok(root)
}

fn build_object(it: &mut ObjectIt<'_>, next_oid: &mut u64) -> Result<DocObject> {
    let oid = *next_oid;
    *next_oid += 1;
    let mut props = Vec::new();
    while it.next()? {
        let key = it.prop_name()?.to_owned();
        let value = match it.prop_type()? {
            FieldType::Null => DocValue::Null,
            FieldType::True => DocValue::Bool(true),
            FieldType::False => DocValue::Bool(false),
            FieldType::U8 => DocValue::U8(it.u8_value()?),
            FieldType::U16 => DocValue::U16(it.u16_value()?),
            FieldType::U32 => DocValue::U32(it.u32_value()?),
            FieldType::U64 => DocValue::U64(it.u64_value()?),
            FieldType::I8 => DocValue::I8(it.i8_value()?),
            FieldType::I16 => DocValue::I16(it.i16_value()?),
            FieldType::I32 => DocValue::I32(it.i32_value()?),
            FieldType::I64 => DocValue::I64(it.i64_value()?),
            FieldType::Float => match it.float_value()? {
                Some(v) => DocValue::Float(v),
                None => DocValue::Null,
            },
            FieldType::String => DocValue::Str(it.string_value()?.to_owned()),
            FieldType::Binary | FieldType::CustomBinary => {
                return Err(Error::illegal_arg("binary fields are not archivable"));
            }
            FieldType::Object => {
                let mut sub = it.object_value()?;
                DocValue::Object(build_object(&mut sub, next_oid)?)
            }
            FieldType::Array => {
                let mut sub = it.array_value()?;
                build_array(&mut sub, next_oid)?
            }
            FieldType::Column => {
                let col = it.column_value()?;
                build_column_array(&col)?
            }
        };
        props.push((key, value));
    }
    Ok(DocObject { oid, props })
}

fn build_array(it: &mut ArrayIt<'_>, next_oid: &mut u64) -> Result<DocValue> {
    enum Acc {
        Empty,
        Nulls(u32),
        Bools(Vec<u8>),
        U8s(Vec<u8>),
        U16s(Vec<u16>),
        U32s(Vec<u32>),
        U64s(Vec<u64>),
        I8s(Vec<i8>),
        I16s(Vec<i16>),
        I32s(Vec<i32>),
        I64s(Vec<i64>),
        Floats(Vec<f32>),
        Strs(Vec<String>),
        Objects(Vec<DocObject>),
    }
    let mut acc = Acc::Empty;
    while it.next()? {
        let ty = it.field_type()?;
        acc = match (acc, ty) {
            (Acc::Empty, FieldType::Null) => Acc::Nulls(1),
            (Acc::Nulls(n), FieldType::Null) => Acc::Nulls(n + 1),
            (Acc::Empty, FieldType::True) => Acc::Bools(vec![1]),
            (Acc::Empty, FieldType::False) => Acc::Bools(vec![0]),
            (Acc::Bools(mut v), FieldType::True) => {
                v.push(1);
                Acc::Bools(v)
            }
            (Acc::Bools(mut v), FieldType::False) => {
                v.push(0);
                Acc::Bools(v)
            }
            (Acc::Empty, FieldType::U8) => Acc::U8s(vec![it.u8_value()?]),
            (Acc::U8s(mut v), FieldType::U8) => {
                v.push(it.u8_value()?);
                Acc::U8s(v)
            }
            (Acc::Empty, FieldType::U16) => Acc::U16s(vec![it.u16_value()?]),
            (Acc::U16s(mut v), FieldType::U16) => {
                v.push(it.u16_value()?);
                Acc::U16s(v)
            }
            (Acc::Empty, FieldType::U32) => Acc::U32s(vec![it.u32_value()?]),
            (Acc::U32s(mut v), FieldType::U32) => {
                v.push(it.u32_value()?);
                Acc::U32s(v)
            }
            (Acc::Empty, FieldType::U64) => Acc::U64s(vec![it.u64_value()?]),
            (Acc::U64s(mut v), FieldType::U64) => {
                v.push(it.u64_value()?);
                Acc::U64s(v)
            }
            (Acc::Empty, FieldType::I8) => Acc::I8s(vec![it.i8_value()?]),
            (Acc::I8s(mut v), FieldType::I8) => {
                v.push(it.i8_value()?);
                Acc::I8s(v)
            }
            (Acc::Empty, FieldType::I16) => Acc::I16s(vec![it.i16_value()?]),
            (Acc::I16s(mut v), FieldType::I16) => {
                v.push(it.i16_value()?);
                Acc::I16s(v)
            }
            (Acc::Empty, FieldType::I32) => Acc::I32s(vec![it.i32_value()?]),
            (Acc::I32s(mut v), FieldType::I32) => {
                v.push(it.i32_value()?);
                Acc::I32s(v)
            }
            (Acc::Empty, FieldType::I64) => Acc::I64s(vec![it.i64_value()?]),
            (Acc::I64s(mut v), FieldType::I64) => {
                v.push(it.i64_value()?);
                Acc::I64s(v)
            }
            (Acc::Empty, FieldType::Float) => {
                Acc::Floats(vec![it.float_value()?.unwrap_or(f32::NAN)])
            }
            (Acc::Floats(mut v), FieldType::Float) => {
                v.push(it.float_value()?.unwrap_or(f32::NAN));
                Acc::Floats(v)
            }
            (Acc::Empty, FieldType::String) => Acc::Strs(vec![it.string_value()?.to_owned()]),
            (Acc::Strs(mut v), FieldType::String) => {
                v.push(it.string_value()?.to_owned());
                Acc::Strs(v)
            }
            (Acc::Empty, FieldType::Object) => {
                let mut sub = it.object_value()?;
                Acc::Objects(vec![build_object(&mut sub, next_oid)?])
            }
            (Acc::Objects(mut v), FieldType::Object) => {
                let mut sub = it.object_value()?;
                v.push(build_object(&mut sub, next_oid)?);
                Acc::Objects(v)
            }
            _ => {
                return Err(Error::illegal_arg(
                    "heterogeneous or nested arrays are not archivable",
                ));
            }
        };
    }
    Ok(match acc {
        Acc::Empty => DocValue::NullArray(0),
        Acc::Nulls(n) => DocValue::NullArray(n),
        Acc::Bools(v) => DocValue::BoolArray(v),
        Acc::U8s(v) => DocValue::U8Array(v),
        Acc::U16s(v) => DocValue::U16Array(v),
        Acc::U32s(v) => DocValue::U32Array(v),
        Acc::U64s(v) => DocValue::U64Array(v),
        Acc::I8s(v) => DocValue::I8Array(v),
        Acc::I16s(v) => DocValue::I16Array(v),
        Acc::I32s(v) => DocValue::I32Array(v),
        Acc::I64s(v) => DocValue::I64Array(v),
        Acc::Floats(v) => DocValue::FloatArray(v),
        Acc::Strs(v) => DocValue::StrArray(v),
        Acc::Objects(v) => DocValue::ObjectArray(v),
    })
}

/// Columns carry their null sentinels straight into the archive payload.
fn build_column_array(col: &crate::record::ColumnIt<'_>) -> Result<DocValue> {
    let n = col.length();
    Ok(match col.element_type() {
        ColumnType::U8 => {
            DocValue::U8Array(columns(col, n, |v| match v {
                ColumnValue::Unsigned(Some(x)) => x as u8,
                _ => u8::MAX,
            })?)
        }
        ColumnType::U16 => DocValue::U16Array(columns(col, n, |v| match v {
            ColumnValue::Unsigned(Some(x)) => x as u16,
            _ => u16::MAX,
        })?),
        ColumnType::U32 => DocValue::U32Array(columns(col, n, |v| match v {
            ColumnValue::Unsigned(Some(x)) => x as u32,
            _ => u32::MAX,
        })?),
        ColumnType::U64 => DocValue::U64Array(columns(col, n, |v| match v {
            ColumnValue::Unsigned(Some(x)) => x,
            _ => u64::MAX,
        })?),
        ColumnType::I8 => DocValue::I8Array(columns(col, n, |v| match v {
            ColumnValue::Signed(Some(x)) => x as i8,
            _ => i8::MIN,
        })?),
        ColumnType::I16 => DocValue::I16Array(columns(col, n, |v| match v {
            ColumnValue::Signed(Some(x)) => x as i16,
            _ => i16::MIN,
        })?),
        ColumnType::I32 => DocValue::I32Array(columns(col, n, |v| match v {
            ColumnValue::Signed(Some(x)) => x as i32,
            _ => i32::MIN,
        })?),
        ColumnType::I64 => DocValue::I64Array(columns(col, n, |v| match v {
            ColumnValue::Signed(Some(x)) => x,
            _ => i64::MIN,
        })?),
        ColumnType::Float => DocValue::FloatArray(columns(col, n, |v| match v {
            ColumnValue::Float(Some(x)) => x,
            _ => f32::NAN,
        })?),
        ColumnType::Boolean => {
            // Packed archive booleans are two-valued; numeric columns keep
            // their null sentinels, boolean columns cannot.
            let mut bytes = Vec::with_capacity(n as usize);
            for i in 0..n {
                match col.value_at(i)? {
                    ColumnValue::Boolean(Some(true)) => bytes.push(1),
                    ColumnValue::Boolean(Some(false)) => bytes.push(0),
                    _ => {
                        return Err(Error::illegal_arg(
                            "boolean column nulls are not archivable",
                        ));
                    }
                }
            }
            DocValue::BoolArray(bytes)
        }
    })
}

fn columns<T>(
    col: &crate::record::ColumnIt<'_>,
    n: u64,
    f: impl Fn(ColumnValue) -> T,
) -> Result<Vec<T>> {
    (0..n).map(|i| Ok(f(col.value_at(i)?))).collect()
}

// ------------------------------------------------------------------------------------------------
// String collection
// ------------------------------------------------------------------------------------------------

fn collect_strings(obj: &DocObject, dict: &StringDict) {
    for (key, value) in &obj.props {
        dict.insert(&[key.as_str()]);
        match value {
            DocValue::Str(s) => {
                dict.insert(&[s.as_str()]);
            }
            DocValue::StrArray(ss) => {
                let refs: Vec<&str> = ss.iter().map(String::as_str).collect();
                dict.insert(&refs);
            }
            DocValue::Object(o) => collect_strings(o, dict),
            DocValue::ObjectArray(os) => {
                for o in os {
                    collect_strings(o, dict);
                }
            }
            _ => {}
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Object serialization
// ------------------------------------------------------------------------------------------------

fn sid(sids: &HashMap<String, u64>, key: &str) -> Result<u64> {
    sids.get(key)
        .copied()
        .ok_or_else(|| Error::internal(format!("string {key:?} missing from dictionary")))
}

fn write_object(
    file: &mut MemFile<'_>,
    obj: &DocObject,
    sids: &HashMap<String, u64>,
) -> Result<u64> {
    let start = file.tell() as u64;

    // Group properties by type, canonical order, insertion order inside.
    let mut flags = ObjectFlags::default();
    for (_, value) in &obj.props {
        flags.set(value.prop_type());
    }

    ObjectHeader {
        oid: obj.oid,
        flags,
    }
    .write_to(file)?;

    let offs_pos = file.tell();
    file.write_zero(flags.count() * 8)?;

    let mut group_offs: Vec<u64> = Vec::with_capacity(flags.count());
    for pt in flags.iter_present() {
        group_offs.push(file.tell() as u64);
        let props: Vec<&(String, DocValue)> = obj
            .props
            .iter()
            .filter(|(_, v)| v.prop_type() == pt)
            .collect();
        write_group(file, pt, &props, sids)?;
    }

    file.write_u8(MARKER_OBJECT_END)?;
    let end = file.tell();

    for (slot, off) in group_offs.iter().enumerate() {
        file.seek(offs_pos + slot * 8)?;
        file.write_u64(*off)?;
    }
    file.seek(end)?;
    Ok(start)
}

fn write_group(
    file: &mut MemFile<'_>,
    pt: PropType,
    props: &[&(String, DocValue)],
    sids: &HashMap<String, u64>,
) -> Result<()> {
    let n = props.len() as u32;

    if pt == PropType::ObjectArray {
        // Table group: one column group per object-array property.
        ObjectArrayHeader {
            num_entries: props.len() as u8,
        }
        .write_to(file, pt.marker())?;
        for (key, _) in props.iter().map(|p| &**p) {
            file.write_u64(sid(sids, key)?)?;
        }
        let offs_pos = file.tell();
        file.write_zero(props.len() * 8)?;
        let mut offs = Vec::with_capacity(props.len());
        for (_, value) in props.iter().map(|p| &**p) {
            let DocValue::ObjectArray(objects) = value else {
                return Err(Error::internal("object-array group holds non-array value"));
            };
            offs.push(file.tell() as u64);
            write_column_group(file, objects, sids)?;
        }
        let end = file.tell();
        for (slot, off) in offs.iter().enumerate() {
            file.seek(offs_pos + slot * 8)?;
            file.write_u64(*off)?;
        }
        file.seek(end)?;
        return Ok(());
    }

    PropHeader {
        marker: pt.marker(),
        num_entries: n,
    }
    .write_to(file)?;
    for (key, _) in props.iter().map(|p| &**p) {
        file.write_u64(sid(sids, key)?)?;
    }

    match pt {
        PropType::Null => {}
        PropType::Object => {
            let offs_pos = file.tell();
            file.write_zero(props.len() * 8)?;
            let mut offs = Vec::with_capacity(props.len());
            for (_, value) in props.iter().map(|p| &**p) {
                let DocValue::Object(o) = value else {
                    return Err(Error::internal("object group holds non-object value"));
                };
                offs.push(write_object(file, o, sids)?);
            }
            let end = file.tell();
            for (slot, off) in offs.iter().enumerate() {
                file.seek(offs_pos + slot * 8)?;
                file.write_u64(*off)?;
            }
            file.seek(end)?;
        }
        pt if !pt.is_array() => {
            for (_, value) in props.iter().map(|p| &**p) {
                write_scalar(file, value, sids)?;
            }
        }
        _ => {
            // Array groups: lengths, then concatenated payloads.
            for (_, value) in props.iter().map(|p| &**p) {
                file.write_u32(array_len(value))?;
            }
            for (_, value) in props.iter().map(|p| &**p) {
                write_array_payload(file, value, sids)?;
            }
        }
    }
    Ok(())
}

fn write_scalar(
    file: &mut MemFile<'_>,
    value: &DocValue,
    sids: &HashMap<String, u64>,
) -> Result<()> {
    match value {
        DocValue::Bool(v) => file.write_u8(u8::from(*v)),
        DocValue::U8(v) => file.write_u8(*v),
        DocValue::U16(v) => file.write_u16(*v),
        DocValue::U32(v) => file.write_u32(*v),
        DocValue::U64(v) => file.write_u64(*v),
        DocValue::I8(v) => file.write_i8(*v),
        DocValue::I16(v) => file.write_i16(*v),
        DocValue::I32(v) => file.write_i32(*v),
        DocValue::I64(v) => file.write_i64(*v),
        DocValue::Float(v) => file.write_f32(*v),
        DocValue::Str(s) => file.write_u64(sid(sids, s)?),
        _ => Err(Error::internal("non-scalar value in fixed group")),
    }
}

fn array_len(value: &DocValue) -> u32 {
    match value {
        DocValue::NullArray(n) => *n,
        DocValue::BoolArray(v) => v.len() as u32,
        DocValue::U8Array(v) => v.len() as u32,
        DocValue::U16Array(v) => v.len() as u32,
        DocValue::U32Array(v) => v.len() as u32,
        DocValue::U64Array(v) => v.len() as u32,
        DocValue::I8Array(v) => v.len() as u32,
        DocValue::I16Array(v) => v.len() as u32,
        DocValue::I32Array(v) => v.len() as u32,
        DocValue::I64Array(v) => v.len() as u32,
        DocValue::FloatArray(v) => v.len() as u32,
        DocValue::StrArray(v) => v.len() as u32,
        DocValue::ObjectArray(v) => v.len() as u32,
        _ => 0,
    }
}

fn write_array_payload(
    file: &mut MemFile<'_>,
    value: &DocValue,
    sids: &HashMap<String, u64>,
) -> Result<()> {
    match value {
        DocValue::NullArray(_) => Ok(()),
        DocValue::BoolArray(v) => file.write(v),
        DocValue::U8Array(v) => file.write(v),
        DocValue::U16Array(v) => {
            for x in v {
                file.write_u16(*x)?;
            }
            Ok(())
        }
        DocValue::U32Array(v) => {
            for x in v {
                file.write_u32(*x)?;
            }
            Ok(())
        }
        DocValue::U64Array(v) => {
            for x in v {
                file.write_u64(*x)?;
            }
            Ok(())
        }
        DocValue::I8Array(v) => {
            for x in v {
                file.write_i8(*x)?;
            }
            Ok(())
        }
        DocValue::I16Array(v) => {
            for x in v {
                file.write_i16(*x)?;
            }
            Ok(())
        }
        DocValue::I32Array(v) => {
            for x in v {
                file.write_i32(*x)?;
            }
            Ok(())
        }
        DocValue::I64Array(v) => {
            for x in v {
                file.write_i64(*x)?;
            }
            Ok(())
        }
        DocValue::FloatArray(v) => {
            for x in v {
                file.write_f32(*x)?;
            }
            Ok(())
        }
        DocValue::StrArray(v) => {
            for s in v {
                file.write_u64(sid(sids, s)?)?;
            }
            Ok(())
        }
        _ => Err(Error::internal("unsupported array payload")),
    }
}

// ------------------------------------------------------------------------------------------------
// Column groups (object-valued arrays)
// ------------------------------------------------------------------------------------------------

fn write_column_group(
    file: &mut MemFile<'_>,
    objects: &[DocObject],
    sids: &HashMap<String, u64>,
) -> Result<()> {
    // Distinct keys across all embedded objects, first-appearance order.
    let mut keys: Vec<&str> = Vec::new();
    for obj in objects {
        for (key, _) in &obj.props {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    ColumnGroupHeader {
        num_columns: keys.len() as u32,
        num_objects: objects.len() as u32,
    }
    .write_to(file)?;

    let offs_pos = file.tell();
    file.write_zero(keys.len() * 8)?;
    let mut offs = Vec::with_capacity(keys.len());
    for key in &keys {
        offs.push(file.tell() as u64);
        write_column(file, key, objects, sids)?;
    }
    let end = file.tell();
    for (slot, off) in offs.iter().enumerate() {
        file.seek(offs_pos + slot * 8)?;
        file.write_u64(*off)?;
    }
    file.seek(end)?;
    Ok(())
}

fn write_column(
    file: &mut MemFile<'_>,
    key: &str,
    objects: &[DocObject],
    sids: &HashMap<String, u64>,
) -> Result<()> {
    // Unify the base type of this property across the embedded objects.
    let mut base: Option<PropType> = None;
    for obj in objects {
        if let Some((_, value)) = obj.props.iter().find(|(k, _)| k == key) {
            let pt = value.prop_type();
            let scalar_pt = scalar_base(pt);
            match base {
                None => base = Some(scalar_pt),
                Some(b) if b == scalar_pt => {}
                Some(_) => {
                    return Err(Error::illegal_arg(format!(
                        "object-array property {key:?} mixes value types"
                    )));
                }
            }
        }
    }
    let base = base.unwrap_or(PropType::Null);

    ColumnHeader {
        column_name: sid(sids, key)?,
        value_type: base.marker(),
        num_entries: objects.len() as u32,
    }
    .write_to(file)?;

    for obj in objects {
        let len = match obj.props.iter().find(|(k, _)| k == key) {
            None => 0,
            Some((_, DocValue::Object(_))) => 1,
            Some((_, DocValue::Null)) => 1,
            Some((_, value)) if value.prop_type().is_array() => array_len(value),
            Some(_) => 1,
        };
        file.write_u32(len)?;
    }

    for obj in objects {
        let Some((_, value)) = obj.props.iter().find(|(k, _)| k == key) else {
            continue;
        };
        match value {
            DocValue::Null | DocValue::NullArray(_) => {}
            DocValue::Object(o) => {
                write_object(file, o, sids)?;
            }
            DocValue::ObjectArray(os) => {
                for o in os {
                    write_object(file, o, sids)?;
                }
            }
            v if v.prop_type().is_array() => write_array_payload(file, v, sids)?,
            v => write_scalar(file, v, sids)?,
        }
    }
    Ok(())
}

/// Collapses array prop types to their base scalar type for column typing.
fn scalar_base(pt: PropType) -> PropType {
    match pt {
        PropType::NullArray => PropType::Null,
        PropType::BoolArray => PropType::Bool,
        PropType::I8Array => PropType::I8,
        PropType::I16Array => PropType::I16,
        PropType::I32Array => PropType::I32,
        PropType::I64Array => PropType::I64,
        PropType::U8Array => PropType::U8,
        PropType::U16Array => PropType::U16,
        PropType::U32Array => PropType::U32,
        PropType::U64Array => PropType::U64,
        PropType::FloatArray => PropType::Float,
        PropType::StringArray => PropType::String,
        PropType::ObjectArray => PropType::Object,
        other => other,
    }
}
