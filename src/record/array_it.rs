//! Array container iterator.
//!
//! The iterator borrows a cursor scoped to one array container. `next`
//! skips empty (zero) slots and focuses one field at a time; value
//! accessors read the focused field, and container accessors hand out
//! sub-iterators that reborrow the cursor for their lifetime.
//!
//! `prev` is O(1): the iterator keeps a history of visited field offsets
//! instead of re-scanning from the container start.

use crate::error::{Error, Result};
use crate::mem::{AccessMode, MemFile};
use crate::record::field::{BinaryValue, FieldView, container_annotation, field_span};
use crate::record::insert::Inserter;
use crate::record::marker::{
    ARRAY_END, AbstractType, ContainerShape, EMPTY_SLOT, FieldType,
};
use crate::record::column_it::ColumnIt;
use crate::record::object_it::ObjectIt;

/// Iterator over the fields of one array container.
pub struct ArrayIt<'a> {
    pub(crate) file: MemFile<'a>,
    container_off: usize,
    payload_start: usize,
    annotation: AbstractType,
    history: Vec<usize>,
    cur: Option<FieldView>,
    end_reached: bool,
    mod_size: i64,
}

impl<'a> ArrayIt<'a> {
    /// Opens an iterator over the array container whose derived marker sits
    /// at `off`.
    pub(crate) fn open_at(mut file: MemFile<'a>, off: usize) -> Result<Self> {
        let annotation = container_annotation(&file, off, ContainerShape::Array)?;
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

    /// The container's abstract-type annotation.
    pub fn abstract_type(&self) -> AbstractType {
        self.annotation
    }

    pub fn is_multiset(&self) -> bool {
        self.annotation.is_multiset()
    }

    pub fn is_sorted(&self) -> bool {
        self.annotation.is_sorted()
    }

    /// Rewrites the container's abstract-type marker in place. Requires a
    /// read-write cursor (i.e. a revise or patch context).
    pub fn update_type(&mut self, annotation: AbstractType) -> Result<()> {
        if self.file.mode() == AccessMode::ReadOnly {
            return Err(Error::illegal_op("update_type on a read-only iterator"));
        }
        let pos = self.file.tell();
        self.file.seek(self.container_off)?;
        self.file.write(&[annotation.marker(ContainerShape::Array)])?;
        self.file.seek(pos)?;
        self.annotation = annotation;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Cursor movement
    // --------------------------------------------------------------------------------------------

    /// Moves the focus back to before the first field.
    pub fn rewind(&mut self) -> Result<()> {
        self.file.seek(self.payload_start)?;
        self.history.clear();
        self.cur = None;
        self.end_reached = false;
        Ok(())
    }

    /// Advances to the next live field. Returns `false` at the container
    /// end; the cursor then rests on the first byte past the last live
    /// slot (or on the end marker when no slack precedes it).
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
            if byte == ARRAY_END {
                self.end_reached = true;
                self.file.seek(slack_start)?;
                return Ok(false);
            }
            break;
        }
        let view = FieldView::classify(&self.file, pos)?;
        let span = field_span(&self.file, pos)?;
        self.file.seek(pos + span)?;
        self.history.push(pos);
        self.cur = Some(view);
        Ok(true)
    }

    /// Whether a further `next` would succeed, without advancing.
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
            return Ok(byte != ARRAY_END);
        }
    }

    /// Steps back to the previously focused field. Returns `false` (without
    /// erroring) at the start of the container.
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

    /// Current cursor offset within the record.
    pub fn tell(&self) -> usize {
        self.file.tell()
    }

    /// Consumes all remaining fields, leaving the cursor at the insertion
    /// point at the container's end.
    pub fn fast_forward(&mut self) -> Result<()> {
        while self.next()? {}
        Ok(())
    }

    /// Byte-size delta accumulated by inserts and removals through this
    /// iterator.
    pub fn mod_size(&self) -> i64 {
        self.mod_size
    }

    // --------------------------------------------------------------------------------------------
    // Field access
    // --------------------------------------------------------------------------------------------

    pub(crate) fn cur_view(&self) -> Option<FieldView> {
        self.cur
    }

    fn require_cur(&self) -> Result<FieldView> {
        self.cur
            .ok_or_else(|| Error::illegal_state("no field focused; call next first"))
    }

    /// Type of the focused field.
    pub fn field_type(&self) -> Result<FieldType> {
        Ok(self.require_cur()?.ty)
    }

    pub fn u8_value(&self) -> Result<u8> {
        self.require_cur()?.u8_value(&self.file)
    }

    pub fn u16_value(&self) -> Result<u16> {
        self.require_cur()?.u16_value(&self.file)
    }

    pub fn u32_value(&self) -> Result<u32> {
        self.require_cur()?.u32_value(&self.file)
    }

    pub fn u64_value(&self) -> Result<u64> {
        self.require_cur()?.u64_value(&self.file)
    }

    pub fn i8_value(&self) -> Result<i8> {
        self.require_cur()?.i8_value(&self.file)
    }

    pub fn i16_value(&self) -> Result<i16> {
        self.require_cur()?.i16_value(&self.file)
    }

    pub fn i32_value(&self) -> Result<i32> {
        self.require_cur()?.i32_value(&self.file)
    }

    pub fn i64_value(&self) -> Result<i64> {
        self.require_cur()?.i64_value(&self.file)
    }

    /// `None` encodes the float null sentinel.
    pub fn float_value(&self) -> Result<Option<f32>> {
        self.require_cur()?.float_value(&self.file)
    }

    /// Whether the focused field is a boolean `true`/`false`, decoded.
    pub fn bool_value(&self) -> Result<bool> {
        match self.require_cur()?.ty {
            FieldType::True => Ok(true),
            FieldType::False => Ok(false),
            other => Err(Error::type_mismatch(format!(
                "field is {other:?}, accessed as boolean"
            ))),
        }
    }

    pub fn string_value(&self) -> Result<&str> {
        self.require_cur()?.string_value(&self.file)
    }

    pub fn binary_value(&self) -> Result<BinaryValue<'_>> {
        self.require_cur()?.binary_value(&self.file)
    }

    /// Sub-iterator over the focused array field. The parent is unusable
    /// while the child is alive.
    pub fn array_value(&mut self) -> Result<ArrayIt<'_>> {
        let cur = self.require_cur()?;
        if cur.ty != FieldType::Array {
            return Err(Error::type_mismatch(format!(
                "field is {:?}, accessed as Array",
                cur.ty
            )));
        }
        ArrayIt::open_at(self.file.reborrow(), cur.off)
    }

    /// Sub-iterator over the focused object field.
    pub fn object_value(&mut self) -> Result<ObjectIt<'_>> {
        let cur = self.require_cur()?;
        if cur.ty != FieldType::Object {
            return Err(Error::type_mismatch(format!(
                "field is {:?}, accessed as Object",
                cur.ty
            )));
        }
        ObjectIt::open_at(self.file.reborrow(), cur.off)
    }

    /// Sub-iterator over the focused column field.
    pub fn column_value(&mut self) -> Result<ColumnIt<'_>> {
        let cur = self.require_cur()?;
        if cur.ty != FieldType::Column {
            return Err(Error::type_mismatch(format!(
                "field is {:?}, accessed as Column",
                cur.ty
            )));
        }
        ColumnIt::open_at(self.file.reborrow(), cur.off)
    }

    // --------------------------------------------------------------------------------------------
    // Insertion
    // --------------------------------------------------------------------------------------------

    /// Runs `f` with an inserter positioned at the current cursor offset.
    /// Requires a read-write cursor. After `f` returns, the iterator's
    /// cursor sits past the last inserted field and the focus cache is
    /// invalidated.
    pub fn insert_with<R>(&mut self, f: impl FnOnce(&mut Inserter<'_>) -> Result<R>) -> Result<R> {
        let size_before = self.file.size() as i64;
        let mut ins = Inserter::for_array(self.file.reborrow());
        let result = f(&mut ins)?;
        let end = ins.position();
        drop(ins);
        self.mod_size += self.file.size() as i64 - size_before;
        self.file.seek(end)?;
        self.cur = None;
        Ok(result)
    }
}
