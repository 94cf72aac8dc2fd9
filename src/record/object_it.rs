//! Object container iterator.
//!
//! Mirrors the array iterator but walks (key, value) pairs. The current
//! property's key is exposed as a borrow scoped to the iterator; callers
//! must copy it before mutating the record.

use crate::error::{Error, Result};
use crate::mem::{AccessMode, MemFile};
use crate::record::array_it::ArrayIt;
use crate::record::column_it::ColumnIt;
use crate::record::field::{
    BinaryValue, FieldView, container_annotation, field_span, prop_span, varuint_at,
};
use crate::record::insert::ObjectInserter;
use crate::record::marker::{
    AbstractType, ContainerShape, EMPTY_SLOT, FieldType, OBJECT_END,
};

#[derive(Debug, Clone, Copy)]
struct CurProp {
    key_off: usize,
    key_payload: usize,
    key_len: usize,
    value: FieldView,
}

/// Iterator over the properties of one object container.
pub struct ObjectIt<'a> {
    pub(crate) file: MemFile<'a>,
    container_off: usize,
    payload_start: usize,
    annotation: AbstractType,
    history: Vec<usize>,
    cur: Option<CurProp>,
    end_reached: bool,
    mod_size: i64,
}

impl<'a> ObjectIt<'a> {
    pub(crate) fn open_at(mut file: MemFile<'a>, off: usize) -> Result<Self> {
        let annotation = container_annotation(&file, off, ContainerShape::Object)?;
        file.seek(off + 1)?;
        Ok(Self {
            file,
            container_off: off,
            payload_start: off + 1,
            annotation,
            history: Vec::new(),
            cur: None,
            end_reached: false,
            mod_size: 0,
        })
    }

    // --------------------------------------------------------------------------------------------
    // Abstract type
    // --------------------------------------------------------------------------------------------

    pub fn abstract_type(&self) -> AbstractType {
        self.annotation
    }

    pub fn is_multiset(&self) -> bool {
        self.annotation.is_multiset()
    }

    pub fn is_sorted(&self) -> bool {
        self.annotation.is_sorted()
    }

    /// Rewrites the container's abstract-type marker in place.
    pub fn update_type(&mut self, annotation: AbstractType) -> Result<()> {
        if self.file.mode() == AccessMode::ReadOnly {
            return Err(Error::illegal_op("update_type on a read-only iterator"));
        }
        let pos = self.file.tell();
        self.file.seek(self.container_off)?;
        self.file.write(&[annotation.marker(ContainerShape::Object)])?;
        self.file.seek(pos)?;
        self.annotation = annotation;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Cursor movement
    // --------------------------------------------------------------------------------------------

    pub fn rewind(&mut self) -> Result<()> {
        self.file.seek(self.payload_start)?;
        self.history.clear();
        self.cur = None;
        self.end_reached = false;
        Ok(())
    }

    /// Advances to the next live property.
    pub fn next(&mut self) -> Result<bool> {
        self.cur = None;
        if self.end_reached {
            return Ok(false);
        }
        let slack_start = self.file.tell();
        let mut pos = slack_start;
        loop {
            let byte = self.file.slice_at(pos, 1)?[0];
            if byte == EMPTY_SLOT {
                pos += 1;
                continue;
            }
            if byte == OBJECT_END {
                self.end_reached = true;
                self.file.seek(slack_start)?;
                return Ok(false);
            }
            break;
        }
        let (key_len, n) = varuint_at(&self.file, pos)?;
        let value_off = pos + n + key_len as usize;
        let value = FieldView::classify(&self.file, value_off)?;
        let span = field_span(&self.file, value_off)?;
        self.file.seek(value_off + span)?;
        self.history.push(pos);
        self.cur = Some(CurProp {
            key_off: pos,
            key_payload: pos + n,
            key_len: key_len as usize,
            value,
        });
        Ok(true)
    }

    pub fn has_next(&self) -> Result<bool> {
        if self.end_reached {
            return Ok(false);
        }
        let mut pos = self.file.tell();
        loop {
            let byte = self.file.slice_at(pos, 1)?[0];
            if byte == EMPTY_SLOT {
                pos += 1;
                continue;
            }
            return Ok(byte != OBJECT_END);
        }
    }

    pub fn prev(&mut self) -> Result<bool> {
        if self.history.len() < 2 {
            return Ok(false);
        }
        self.history.pop();
        let Some(prev_off) = self.history.pop() else {
            return Ok(false);
        };
        self.end_reached = false;
        self.file.seek(prev_off)?;
        self.next()
    }

    pub fn tell(&self) -> usize {
        self.file.tell()
    }

    pub fn fast_forward(&mut self) -> Result<()> {
        while self.next()? {}
        Ok(())
    }

    pub fn mod_size(&self) -> i64 {
        self.mod_size
    }

    // --------------------------------------------------------------------------------------------
    // Property access
    // --------------------------------------------------------------------------------------------

    pub(crate) fn cur_value_view(&self) -> Option<FieldView> {
        self.cur.map(|c| c.value)
    }

    fn require_cur(&self) -> Result<CurProp> {
        self.cur
            .ok_or_else(|| Error::illegal_state("no property focused; call next first"))
    }

    /// Name of the focused property, borrowed from the record.
    pub fn prop_name(&self) -> Result<&str> {
        let cur = self.require_cur()?;
        let bytes = self.file.slice_at(cur.key_payload, cur.key_len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::corrupted("property key is not valid UTF-8"))
    }

    /// Type of the focused property's value.
    pub fn prop_type(&self) -> Result<FieldType> {
        Ok(self.require_cur()?.value.ty)
    }

    pub fn u8_value(&self) -> Result<u8> {
        self.require_cur()?.value.u8_value(&self.file)
    }

    pub fn u16_value(&self) -> Result<u16> {
        self.require_cur()?.value.u16_value(&self.file)
    }

    pub fn u32_value(&self) -> Result<u32> {
        self.require_cur()?.value.u32_value(&self.file)
    }

    pub fn u64_value(&self) -> Result<u64> {
        self.require_cur()?.value.u64_value(&self.file)
    }

    pub fn i8_value(&self) -> Result<i8> {
        self.require_cur()?.value.i8_value(&self.file)
    }

    pub fn i16_value(&self) -> Result<i16> {
        self.require_cur()?.value.i16_value(&self.file)
    }

    pub fn i32_value(&self) -> Result<i32> {
        self.require_cur()?.value.i32_value(&self.file)
    }

    pub fn i64_value(&self) -> Result<i64> {
        self.require_cur()?.value.i64_value(&self.file)
    }

    pub fn float_value(&self) -> Result<Option<f32>> {
        self.require_cur()?.value.float_value(&self.file)
    }

    pub fn bool_value(&self) -> Result<bool> {
        match self.require_cur()?.value.ty {
            FieldType::True => Ok(true),
            FieldType::False => Ok(false),
            other => Err(Error::type_mismatch(format!(
                "property is {other:?}, accessed as boolean"
            ))),
        }
    }

    pub fn string_value(&self) -> Result<&str> {
        self.require_cur()?.value.string_value(&self.file)
    }

    pub fn binary_value(&self) -> Result<BinaryValue<'_>> {
        self.require_cur()?.value.binary_value(&self.file)
    }

    pub fn array_value(&mut self) -> Result<ArrayIt<'_>> {
        let cur = self.require_cur()?;
        if cur.value.ty != FieldType::Array {
            return Err(Error::type_mismatch(format!(
                "property is {:?}, accessed as Array",
                cur.value.ty
            )));
        }
        ArrayIt::open_at(self.file.reborrow(), cur.value.off)
    }

    pub fn object_value(&mut self) -> Result<ObjectIt<'_>> {
        let cur = self.require_cur()?;
        if cur.value.ty != FieldType::Object {
            return Err(Error::type_mismatch(format!(
                "property is {:?}, accessed as Object",
                cur.value.ty
            )));
        }
        ObjectIt::open_at(self.file.reborrow(), cur.value.off)
    }

    pub fn column_value(&mut self) -> Result<ColumnIt<'_>> {
        let cur = self.require_cur()?;
        if cur.value.ty != FieldType::Column {
            return Err(Error::type_mismatch(format!(
                "property is {:?}, accessed as Column",
                cur.value.ty
            )));
        }
        ColumnIt::open_at(self.file.reborrow(), cur.value.off)
    }

    // --------------------------------------------------------------------------------------------
    // Mutation
    // --------------------------------------------------------------------------------------------

    /// Removes the focused property, shifting the container tail left.
    /// The focus cache is invalidated; the cursor rests where the next
    /// property now begins.
    pub fn remove(&mut self) -> Result<()> {
        let Some(cur) = self.cur.take() else {
            return Err(Error::illegal_state("no property focused; call next first"));
        };
        let span = prop_span(&self.file, cur.key_off)?;
        self.file.seek(cur.key_off)?;
        self.file.move_left(span)?;
        self.mod_size -= span as i64;
        self.history.pop();
        Ok(())
    }

    /// Runs `f` with a property inserter positioned at the current cursor
    /// offset. Requires a read-write cursor.
    pub fn insert_with<R>(
        &mut self,
        f: impl FnOnce(&mut ObjectInserter<'_>) -> Result<R>,
    ) -> Result<R> {
        let size_before = self.file.size() as i64;
        let mut ins = ObjectInserter::at(self.file.reborrow());
        let result = f(&mut ins)?;
        let end = ins.position();
        drop(ins);
        self.mod_size += self.file.size() as i64 - size_before;
        self.file.seek(end)?;
        self.cur = None;
        Ok(result)
    }
}
