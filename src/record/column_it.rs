//! Column container iterator.
//!
//! Columns are length-delimited, capacity-bounded runs of one fixed-width
//! element type. Slots past `length` hold the element type's null sentinel.
//! Appends within capacity rewrite only the length varuint; growth beyond
//! capacity shifts the record tail right and rewrites the header.

use crate::error::{Error, Result};
use crate::mem::{AccessMode, MemFile};
use crate::record::field::{container_annotation, varuint_at};
use crate::record::marker::{
    AbstractType, COLUMN_BOOL_FALSE, COLUMN_BOOL_NULL, COLUMN_BOOL_TRUE, ColumnType,
    ContainerShape,
};

/// One decoded column element, with nulls mapped out of the sentinel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue {
    Unsigned(Option<u64>),
    Signed(Option<i64>),
    Float(Option<f32>),
    Boolean(Option<bool>),
}

/// Iterator over one column container.
pub struct ColumnIt<'a> {
    pub(crate) file: MemFile<'a>,
    container_off: usize,
    annotation: AbstractType,
    elem: ColumnType,
    capacity: u64,
    length: u64,
    values_off: usize,
}

impl<'a> ColumnIt<'a> {
    pub(crate) fn open_at(file: MemFile<'a>, off: usize) -> Result<Self> {
        let annotation = container_annotation(&file, off, ContainerShape::Column)?;
        let elem = ColumnType::from_marker(file.slice_at(off + 1, 1)?[0])?;
        let (capacity, cap_w) = varuint_at(&file, off + 2)?;
        let (length, len_w) = varuint_at(&file, off + 2 + cap_w)?;
        if length > capacity {
            return Err(Error::corrupted(format!(
                "column length {length} exceeds capacity {capacity}"
            )));
        }
        Ok(Self {
            file,
            container_off: off,
            annotation,
            elem,
            capacity,
            length,
            values_off: off + 2 + cap_w + len_w,
        })
    }

    // --------------------------------------------------------------------------------------------
    // Header accessors
    // --------------------------------------------------------------------------------------------

    pub fn element_type(&self) -> ColumnType {
        self.elem
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn abstract_type(&self) -> AbstractType {
        self.annotation
    }

    pub fn is_multiset(&self) -> bool {
        self.annotation.is_multiset()
    }

    pub fn is_sorted(&self) -> bool {
        self.annotation.is_sorted()
    }

    /// Rewrites the column's abstract-type marker in place.
    pub fn update_type(&mut self, annotation: AbstractType) -> Result<()> {
        if self.file.mode() == AccessMode::ReadOnly {
            return Err(Error::illegal_op("update_type on a read-only iterator"));
        }
        let pos = self.file.tell();
        self.file.seek(self.container_off)?;
        self.file.write(&[annotation.marker(ContainerShape::Column)])?;
        self.file.seek(pos)?;
        self.annotation = annotation;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Element access
    // --------------------------------------------------------------------------------------------

    fn slot(&self, index: u64) -> Result<&[u8]> {
        if index >= self.length {
            return Err(Error::out_of_bounds(format!(
                "column index {index} beyond length {}",
                self.length
            )));
        }
        let esz = self.elem.element_size();
        self.file.slice_at(self.values_off + index as usize * esz, esz)
    }

    /// Decodes the element at `index`, resolving null sentinels.
    pub fn value_at(&self, index: u64) -> Result<ColumnValue> {
        let b = self.slot(index)?;
        Ok(match self.elem {
            ColumnType::U8 => {
                let v = b[0];
                ColumnValue::Unsigned((v != u8::MAX).then_some(v as u64))
            }
            ColumnType::U16 => {
                let v = u16::from_le_bytes([b[0], b[1]]);
                ColumnValue::Unsigned((v != u16::MAX).then_some(v as u64))
            }
            ColumnType::U32 => {
                let v = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                ColumnValue::Unsigned((v != u32::MAX).then_some(v as u64))
            }
            ColumnType::U64 => {
                let v = u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
                ColumnValue::Unsigned((v != u64::MAX).then_some(v))
            }
            ColumnType::I8 => {
                let v = b[0] as i8;
                ColumnValue::Signed((v != i8::MIN).then_some(v as i64))
            }
            ColumnType::I16 => {
                let v = i16::from_le_bytes([b[0], b[1]]);
                ColumnValue::Signed((v != i16::MIN).then_some(v as i64))
            }
            ColumnType::I32 => {
                let v = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                ColumnValue::Signed((v != i32::MIN).then_some(v as i64))
            }
            ColumnType::I64 => {
                let v = i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
                ColumnValue::Signed((v != i64::MIN).then_some(v))
            }
            ColumnType::Float => {
                let v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                ColumnValue::Float((!v.is_nan()).then_some(v))
            }
            ColumnType::Boolean => ColumnValue::Boolean(match b[0] {
                COLUMN_BOOL_FALSE => Some(false),
                COLUMN_BOOL_TRUE => Some(true),
                COLUMN_BOOL_NULL => None,
                other => {
                    return Err(Error::corrupted(format!(
                        "invalid boolean column byte 0x{other:02X}"
                    )));
                }
            }),
        })
    }

    /// Whether the element at `index` is the null sentinel.
    pub fn is_null_at(&self, index: u64) -> Result<bool> {
        Ok(matches!(
            self.value_at(index)?,
            ColumnValue::Unsigned(None)
                | ColumnValue::Signed(None)
                | ColumnValue::Float(None)
                | ColumnValue::Boolean(None)
        ))
    }

    /// Bulk-decodes all live elements.
    pub fn values(&self) -> Result<Vec<ColumnValue>> {
        (0..self.length).map(|i| self.value_at(i)).collect()
    }

    /// Borrow of the raw `u8` elements; only valid for `u8` columns.
    pub fn u8_values(&self) -> Result<&[u8]> {
        if self.elem != ColumnType::U8 {
            return Err(Error::type_mismatch(format!(
                "column is {:?}, accessed as U8",
                self.elem
            )));
        }
        self.file.slice_at(self.values_off, self.length as usize)
    }

    // --------------------------------------------------------------------------------------------
    // Appends (read-write contexts only)
    // --------------------------------------------------------------------------------------------

    pub fn push_u8(&mut self, v: u8) -> Result<()> {
        self.push_raw(ColumnType::U8, &[v])
    }

    pub fn push_u16(&mut self, v: u16) -> Result<()> {
        self.push_raw(ColumnType::U16, &v.to_le_bytes())
    }

    pub fn push_u32(&mut self, v: u32) -> Result<()> {
        self.push_raw(ColumnType::U32, &v.to_le_bytes())
    }

    pub fn push_u64(&mut self, v: u64) -> Result<()> {
        self.push_raw(ColumnType::U64, &v.to_le_bytes())
    }

    pub fn push_i8(&mut self, v: i8) -> Result<()> {
        self.push_raw(ColumnType::I8, &v.to_le_bytes())
    }

    pub fn push_i16(&mut self, v: i16) -> Result<()> {
        self.push_raw(ColumnType::I16, &v.to_le_bytes())
    }

    pub fn push_i32(&mut self, v: i32) -> Result<()> {
        self.push_raw(ColumnType::I32, &v.to_le_bytes())
    }

    pub fn push_i64(&mut self, v: i64) -> Result<()> {
        self.push_raw(ColumnType::I64, &v.to_le_bytes())
    }

    pub fn push_float(&mut self, v: f32) -> Result<()> {
        self.push_raw(ColumnType::Float, &v.to_le_bytes())
    }

    pub fn push_bool(&mut self, v: bool) -> Result<()> {
        let byte = if v { COLUMN_BOOL_TRUE } else { COLUMN_BOOL_FALSE };
        self.push_raw(ColumnType::Boolean, &[byte])
    }

    /// Appends the column's null sentinel.
    pub fn push_null(&mut self) -> Result<()> {
        let mut buf = [0u8; 8];
        let n = self.elem.write_null_sentinel(&mut buf);
        let elem = self.elem;
        self.push_raw(elem, &buf[..n])
    }

    fn push_raw(&mut self, expected: ColumnType, bytes: &[u8]) -> Result<()> {
        if self.elem != expected {
            return Err(Error::type_mismatch(format!(
                "column is {:?}, pushed {expected:?}",
                self.elem
            )));
        }
        self.ensure_capacity(self.length + 1)?;
        // Widen the length varuint first; that may shift the value region.
        self.set_length(self.length + 1)?;
        let esz = self.elem.element_size();
        let slot = self.values_off + (self.length - 1) as usize * esz;
        self.file.seek(slot)?;
        self.file.write(bytes)?;
        Ok(())
    }

    fn set_length(&mut self, new_len: u64) -> Result<()> {
        let (_, cap_w) = varuint_at(&self.file, self.container_off + 2)?;
        let len_off = self.container_off + 2 + cap_w;
        self.file.seek(len_off)?;
        let new_w = self.file.rewrite_varuint(new_len)?;
        self.length = new_len;
        self.values_off = len_off + new_w;
        Ok(())
    }

    /// Grows the slot region so that `needed` elements fit, rewriting the
    /// capacity varuint and sentinel-filling the fresh slots.
    fn ensure_capacity(&mut self, needed: u64) -> Result<()> {
        if needed <= self.capacity {
            return Ok(());
        }
        let new_cap = needed.max(self.capacity * 2).max(4);
        let esz = self.elem.element_size();

        // Rewrite the capacity varuint; a width change shifts everything
        // after it, so recompute the derived offsets.
        self.file.seek(self.container_off + 2)?;
        let cap_w = self.file.rewrite_varuint(new_cap)?;
        let (_, len_w) = varuint_at(&self.file, self.container_off + 2 + cap_w)?;
        self.values_off = self.container_off + 2 + cap_w + len_w;

        // Extend the slot region and sentinel-fill the new slots.
        let old_end = self.values_off + self.capacity as usize * esz;
        self.file.seek(old_end)?;
        self.file.move_right((new_cap - self.capacity) as usize * esz)?;
        let mut sentinel = [0u8; 8];
        let n = self.elem.write_null_sentinel(&mut sentinel);
        for _ in self.capacity..new_cap {
            self.file.write(&sentinel[..n])?;
        }
        self.capacity = new_cap;
        Ok(())
    }
}
