//! Dot-path evaluation over records.
//!
//! `find` resolves a [`DotPath`] against a record's outer container and
//! hands back a typed handle. Keys address object properties; indexes
//! address array or column elements. An outer array holding exactly one
//! object is transparent to key lookups (the "unit array" rule), matching
//! how single-document records print.

use crate::error::{Error, Result};
use crate::mem::{AccessMode, MemFile};
use crate::record::array_it::ArrayIt;
use crate::record::column_it::{ColumnIt, ColumnValue};
use crate::record::dot::{DotNode, DotPath};
use crate::record::field::{FieldView, string_body, varuint_at};
use crate::record::marker::{AbstractType, ContainerShape, FieldType};
use crate::record::object_it::ObjectIt;
use crate::record::{BinaryValue, Record};

#[derive(Debug, Clone, Copy)]
enum FindTarget {
    Field(FieldView),
    ColumnElem { col_off: usize, index: u64 },
}

/// Handle to a path-resolved value.
pub struct Find<'a> {
    record: &'a Record,
    target: FindTarget,
}

impl Record {
    /// Parses and evaluates a dot path. `Ok(None)` means the path is
    /// well-formed but resolves to nothing.
    pub fn find(&self, path: &str) -> Result<Option<Find<'_>>> {
        self.find_path(&DotPath::parse(path)?)
    }

    /// Evaluates an already-parsed dot path.
    pub fn find_path(&self, path: &DotPath) -> Result<Option<Find<'_>>> {
        let header = self.header()?;
        let mut target = FindTarget::Field(FieldView {
            off: header.payload_off,
            ty: FieldType::Array,
        });
        for node in path.nodes() {
            match step(self, target, node)? {
                Some(next) => target = next,
                None => return Ok(None),
            }
        }
        Ok(Some(Find {
            record: self,
            target,
        }))
    }
}

fn step(rec: &Record, target: FindTarget, node: &DotNode) -> Result<Option<FindTarget>> {
    let FindTarget::Field(view) = target else {
        // Column elements are primitives; nothing nests below them.
        return Ok(None);
    };
    match (view.ty, node) {
        (FieldType::Array, DotNode::Index(i)) => nth_array_element(rec, view.off, *i),
        (FieldType::Array, DotNode::Key(key)) => match sole_object(rec, view.off)? {
            Some(obj) => object_prop(rec, obj.off, key),
            None => Ok(None),
        },
        (FieldType::Object, DotNode::Key(key)) => object_prop(rec, view.off, key),
        (FieldType::Column, DotNode::Index(i)) => {
            let col = ColumnIt::open_at(rec.read_file(), view.off)?;
            Ok((*i < col.length()).then_some(FindTarget::ColumnElem {
                col_off: view.off,
                index: *i,
            }))
        }
        _ => Ok(None),
    }
}

fn nth_array_element(rec: &Record, off: usize, index: u64) -> Result<Option<FindTarget>> {
    let mut it = ArrayIt::open_at(rec.read_file(), off)?;
    for _ in 0..=index {
        if !it.next()? {
            return Ok(None);
        }
    }
    Ok(it.cur_view().map(FindTarget::Field))
}

/// The unit-array rule: an array with exactly one element, that element
/// being an object, is transparent to key lookups.
fn sole_object(rec: &Record, off: usize) -> Result<Option<FieldView>> {
    let mut it = ArrayIt::open_at(rec.read_file(), off)?;
    if !it.next()? {
        return Ok(None);
    }
    let Some(first) = it.cur_view() else {
        return Ok(None);
    };
    if it.next()? {
        return Ok(None);
    }
    Ok((first.ty == FieldType::Object).then_some(first))
}

fn object_prop(rec: &Record, off: usize, key: &str) -> Result<Option<FindTarget>> {
    let mut it = ObjectIt::open_at(rec.read_file(), off)?;
    while it.next()? {
        if it.prop_name()? == key {
            return Ok(it.cur_value_view().map(FindTarget::Field));
        }
    }
    Ok(None)
}

// ------------------------------------------------------------------------------------------------
// Result accessors
// ------------------------------------------------------------------------------------------------

impl<'a> Find<'a> {
    fn field(&self) -> Result<FieldView> {
        match self.target {
            FindTarget::Field(view) => Ok(view),
            FindTarget::ColumnElem { .. } => Err(Error::type_mismatch(
                "path resolves to a column element, not a field",
            )),
        }
    }

    /// Type of the resolved value. Column elements report their decoded
    /// type (`Null` for sentinel slots, `True`/`False` for booleans).
    pub fn result_type(&self) -> Result<FieldType> {
        match self.target {
            FindTarget::Field(view) => Ok(view.ty),
            FindTarget::ColumnElem { col_off, index } => {
                let col = ColumnIt::open_at(self.record.read_file(), col_off)?;
                Ok(match col.value_at(index)? {
                    ColumnValue::Boolean(Some(true)) => FieldType::True,
                    ColumnValue::Boolean(Some(false)) => FieldType::False,
                    ColumnValue::Unsigned(None)
                    | ColumnValue::Signed(None)
                    | ColumnValue::Float(None)
                    | ColumnValue::Boolean(None) => FieldType::Null,
                    _ => col.element_type().field_type(),
                })
            }
        }
    }

    pub fn result_u8(&self) -> Result<u8> {
        self.field()?.u8_value(&self.record.read_file())
    }

    pub fn result_u16(&self) -> Result<u16> {
        self.field()?.u16_value(&self.record.read_file())
    }

    pub fn result_u32(&self) -> Result<u32> {
        self.field()?.u32_value(&self.record.read_file())
    }

    pub fn result_u64(&self) -> Result<u64> {
        self.field()?.u64_value(&self.record.read_file())
    }

    pub fn result_i8(&self) -> Result<i8> {
        self.field()?.i8_value(&self.record.read_file())
    }

    pub fn result_i16(&self) -> Result<i16> {
        self.field()?.i16_value(&self.record.read_file())
    }

    pub fn result_i32(&self) -> Result<i32> {
        self.field()?.i32_value(&self.record.read_file())
    }

    pub fn result_i64(&self) -> Result<i64> {
        self.field()?.i64_value(&self.record.read_file())
    }

    pub fn result_float(&self) -> Result<Option<f32>> {
        self.field()?.float_value(&self.record.read_file())
    }

    pub fn result_string(&self) -> Result<&'a str> {
        let view = self.field()?;
        if view.ty != FieldType::String {
            return Err(Error::type_mismatch(format!(
                "path resolves to {:?}, accessed as String",
                view.ty
            )));
        }
        let (payload, len) = string_body(&self.record.read_file(), view.off)?;
        let bytes = &self.record.raw_data()[payload..payload + len];
        std::str::from_utf8(bytes).map_err(|_| Error::corrupted("string field is not valid UTF-8"))
    }

    pub fn result_binary(&self) -> Result<BinaryValue<'a>> {
        let view = self.field()?;
        let is_custom = match view.ty {
            FieldType::Binary => false,
            FieldType::CustomBinary => true,
            other => {
                return Err(Error::type_mismatch(format!(
                    "path resolves to {other:?}, accessed as Binary"
                )));
            }
        };
        let file = self.record.read_file();
        let mut off = view.off + 1;
        let (type_len, n) = varuint_at(&file, off)?;
        off += n;
        let type_range = off..off + type_len as usize;
        off += type_len as usize;
        let (blob_len, n) = varuint_at(&file, off)?;
        off += n;
        let blob_range = off..off + blob_len as usize;
        drop(file);
        let bytes = self.record.raw_data();
        let content_type = std::str::from_utf8(&bytes[type_range])
            .map_err(|_| Error::corrupted("binary content type is not valid UTF-8"))?;
        Ok(BinaryValue {
            content_type,
            blob: &bytes[blob_range],
            is_custom,
        })
    }

    /// Sub-iterator when the path resolves to an array.
    pub fn result_array(&self) -> Result<ArrayIt<'a>> {
        let view = self.field()?;
        if view.ty != FieldType::Array {
            return Err(Error::type_mismatch(format!(
                "path resolves to {:?}, accessed as Array",
                view.ty
            )));
        }
        ArrayIt::open_at(self.record.read_file(), view.off)
    }

    /// Sub-iterator when the path resolves to an object.
    pub fn result_object(&self) -> Result<ObjectIt<'a>> {
        let view = self.field()?;
        if view.ty != FieldType::Object {
            return Err(Error::type_mismatch(format!(
                "path resolves to {:?}, accessed as Object",
                view.ty
            )));
        }
        ObjectIt::open_at(self.record.read_file(), view.off)
    }

    /// Sub-iterator when the path resolves to a column.
    pub fn result_column(&self) -> Result<ColumnIt<'a>> {
        let view = self.field()?;
        if view.ty != FieldType::Column {
            return Err(Error::type_mismatch(format!(
                "path resolves to {:?}, accessed as Column",
                view.ty
            )));
        }
        ColumnIt::open_at(self.record.read_file(), view.off)
    }

    /// Decoded value when the path resolves to a column element.
    pub fn result_column_value(&self) -> Result<ColumnValue> {
        match self.target {
            FindTarget::ColumnElem { col_off, index } => {
                ColumnIt::open_at(self.record.read_file(), col_off)?.value_at(index)
            }
            FindTarget::Field(_) => Err(Error::type_mismatch(
                "path resolves to a field, not a column element",
            )),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// In-place annotation updates (revise / patch contexts)
// ------------------------------------------------------------------------------------------------

pub(crate) fn update_abstract_type(
    record: &mut Record,
    path: &str,
    shape: ContainerShape,
    annotation: AbstractType,
) -> Result<()> {
    let parsed = DotPath::parse(path)?;
    let expected = match shape {
        ContainerShape::Array => FieldType::Array,
        ContainerShape::Object => FieldType::Object,
        ContainerShape::Column => FieldType::Column,
    };
    let off = {
        let found = record
            .find_path(&parsed)?
            .ok_or_else(|| Error::illegal_arg(format!("path {path:?} does not resolve")))?;
        let view = found.field()?;
        if view.ty != expected {
            return Err(Error::type_mismatch(format!(
                "path {path:?} resolves to {:?}, expected {expected:?}",
                view.ty
            )));
        }
        view.off
    };
    let mut file = MemFile::open(&mut record.block, AccessMode::ReadWrite);
    file.seek(off)?;
    file.write(&[annotation.marker(shape)])?;
    Ok(())
}
