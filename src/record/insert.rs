//! Field inserters for arrays and objects.
//!
//! An inserter writes typed fields at its cursor position. Inserts first
//! claim any empty (zero) slots at the cursor; only when the reserved
//! capacity is exhausted do they shift the record tail right. Nested
//! containers are built through closure-scoped child inserters, which
//! keeps every byte shift visible to exactly one writer at a time.

use crate::error::{Error, Result};
use crate::mem::MemFile;
use crate::mem::file::varuint_len;
use crate::record::column_it::ColumnIt;
use crate::record::field::field_span;
use crate::record::marker::{
    ARRAY_END, AbstractType, ColumnType, ContainerShape, EMPTY_SLOT, MARKER_BINARY,
    MARKER_CUSTOM_BINARY, MARKER_FALSE, MARKER_FLOAT, MARKER_I8, MARKER_I16, MARKER_I32,
    MARKER_I64, MARKER_NULL, MARKER_STRING, MARKER_TRUE, MARKER_U8, MARKER_U16, MARKER_U32,
    MARKER_U64, OBJECT_END,
};

/// Fallback content type for binary fields without a resolvable mime type.
pub const DEFAULT_MIME: &str = "application/octet-stream";

// ------------------------------------------------------------------------------------------------
// Shared low-level helpers
// ------------------------------------------------------------------------------------------------

/// Ensures `n` writable bytes at the cursor: claims leading empty slots,
/// then opens a gap for whatever is missing.
fn make_room(file: &mut MemFile<'_>, n: usize) -> Result<()> {
    let pos = file.tell();
    let mut zeros = 0usize;
    while zeros < n && pos + zeros < file.size() {
        if file.slice_at(pos + zeros, 1)?[0] == EMPTY_SLOT {
            zeros += 1;
        } else {
            break;
        }
    }
    if zeros < n {
        file.move_right(n - zeros)?;
    }
    Ok(())
}

fn write_key(file: &mut MemFile<'_>, key: &str) -> Result<()> {
    file.write_varuint(key.len() as u64)?;
    file.write(key.as_bytes())
}

fn key_span(key: &str) -> usize {
    varuint_len(key.len() as u64) + key.len()
}

/// Writes an empty container shell (`marker`, `capacity` empty slots, end
/// marker) and returns the shell's start offset. Room must already exist.
fn write_shell(
    file: &mut MemFile<'_>,
    shape: ContainerShape,
    annotation: AbstractType,
    capacity: usize,
) -> Result<usize> {
    let start = file.tell();
    file.write(&[annotation.marker(shape)])?;
    file.write_zero(capacity)?;
    file.write(&[match shape {
        ContainerShape::Array => ARRAY_END,
        ContainerShape::Object => OBJECT_END,
        ContainerShape::Column => {
            return Err(Error::internal("columns have no end marker shell"));
        }
    }])?;
    Ok(start)
}

fn string_field_span(s: &str) -> usize {
    1 + varuint_len(s.len() as u64) + s.len()
}

fn binary_field_span(content_type: &str, blob: &[u8]) -> usize {
    1 + varuint_len(content_type.len() as u64)
        + content_type.len()
        + varuint_len(blob.len() as u64)
        + blob.len()
}

fn write_string_field(file: &mut MemFile<'_>, s: &str) -> Result<()> {
    file.write(&[MARKER_STRING])?;
    file.write_varuint(s.len() as u64)?;
    file.write(s.as_bytes())
}

fn write_binary_field(
    file: &mut MemFile<'_>,
    marker: u8,
    content_type: &str,
    blob: &[u8],
) -> Result<()> {
    file.write(&[marker])?;
    file.write_varuint(content_type.len() as u64)?;
    file.write(content_type.as_bytes())?;
    file.write_varuint(blob.len() as u64)?;
    file.write(blob)
}

/// Resolves the content type of a plain binary field from the explicit
/// mime type, a file extension lookup, or the octet-stream fallback.
fn resolve_mime<'m>(mime_type: Option<&'m str>, file_ext: Option<&str>) -> &'m str {
    if let Some(mime) = mime_type {
        return mime;
    }
    file_ext
        .and_then(mime_for_extension)
        .unwrap_or(DEFAULT_MIME)
}

/// Writes the header and sentinel-filled slots of a column. Room must
/// already exist; returns the start offset.
fn write_column_shell(
    file: &mut MemFile<'_>,
    annotation: AbstractType,
    elem: ColumnType,
    capacity: usize,
) -> Result<usize> {
    let start = file.tell();
    file.write(&[annotation.marker(ContainerShape::Column)])?;
    file.write(&[elem.marker()])?;
    file.write_varuint(capacity as u64)?;
    file.write_varuint(0)?;
    let mut sentinel = [0u8; 8];
    let n = elem.write_null_sentinel(&mut sentinel);
    for _ in 0..capacity {
        file.write(&sentinel[..n])?;
    }
    Ok(start)
}

fn column_shell_span(elem: ColumnType, capacity: usize) -> usize {
    2 + varuint_len(capacity as u64) + 1 + capacity * elem.element_size()
}

// ------------------------------------------------------------------------------------------------
// Inserter (array value positions)
// ------------------------------------------------------------------------------------------------

/// Inserter for value positions inside an array container.
pub struct Inserter<'f> {
    file: MemFile<'f>,
}

impl<'f> Inserter<'f> {
    pub(crate) fn for_array(file: MemFile<'f>) -> Self {
        Self { file }
    }

    pub(crate) fn position(&self) -> usize {
        self.file.tell()
    }

    fn fixed(&mut self, bytes: &[u8]) -> Result<()> {
        make_room(&mut self.file, bytes.len())?;
        self.file.write(bytes)
    }

    pub fn insert_null(&mut self) -> Result<()> {
        self.fixed(&[MARKER_NULL])
    }

    pub fn insert_true(&mut self) -> Result<()> {
        self.fixed(&[MARKER_TRUE])
    }

    pub fn insert_false(&mut self) -> Result<()> {
        self.fixed(&[MARKER_FALSE])
    }

    pub fn insert_bool(&mut self, v: bool) -> Result<()> {
        if v { self.insert_true() } else { self.insert_false() }
    }

    pub fn insert_u8(&mut self, v: u8) -> Result<()> {
        self.fixed(&[MARKER_U8, v])
    }

    pub fn insert_u16(&mut self, v: u16) -> Result<()> {
        let b = v.to_le_bytes();
        self.fixed(&[MARKER_U16, b[0], b[1]])
    }

    pub fn insert_u32(&mut self, v: u32) -> Result<()> {
        let mut buf = [MARKER_U32, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.fixed(&buf)
    }

    pub fn insert_u64(&mut self, v: u64) -> Result<()> {
        let mut buf = [MARKER_U64, 0, 0, 0, 0, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.fixed(&buf)
    }

    pub fn insert_i8(&mut self, v: i8) -> Result<()> {
        self.fixed(&[MARKER_I8, v as u8])
    }

    pub fn insert_i16(&mut self, v: i16) -> Result<()> {
        let b = v.to_le_bytes();
        self.fixed(&[MARKER_I16, b[0], b[1]])
    }

    pub fn insert_i32(&mut self, v: i32) -> Result<()> {
        let mut buf = [MARKER_I32, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.fixed(&buf)
    }

    pub fn insert_i64(&mut self, v: i64) -> Result<()> {
        let mut buf = [MARKER_I64, 0, 0, 0, 0, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.fixed(&buf)
    }

    pub fn insert_float(&mut self, v: f32) -> Result<()> {
        let mut buf = [MARKER_FLOAT, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.fixed(&buf)
    }

    pub fn insert_string(&mut self, s: &str) -> Result<()> {
        make_room(&mut self.file, string_field_span(s))?;
        write_string_field(&mut self.file, s)
    }

    /// Inserts a binary field. A `user_type` produces a custom-binary
    /// field; otherwise the content type comes from `mime_type`, a lookup
    /// of `file_ext`, or the octet-stream fallback.
    pub fn insert_binary(
        &mut self,
        blob: &[u8],
        mime_type: Option<&str>,
        file_ext: Option<&str>,
        user_type: Option<&str>,
    ) -> Result<()> {
        let (marker, content_type) = match user_type {
            Some(ty) => (MARKER_CUSTOM_BINARY, ty),
            None => (MARKER_BINARY, resolve_mime(mime_type, file_ext)),
        };
        make_room(&mut self.file, binary_field_span(content_type, blob))?;
        write_binary_field(&mut self.file, marker, content_type, blob)
    }

    /// Inserts an object with the default (unsorted multiset) annotation.
    pub fn insert_object_with<R>(
        &mut self,
        capacity: usize,
        f: impl FnOnce(&mut ObjectInserter<'_>) -> Result<R>,
    ) -> Result<R> {
        self.insert_object_list_with(AbstractType::UnsortedMultiset, capacity, f)
    }

    /// Inserts an object with an explicit abstract-type annotation.
    pub fn insert_object_list_with<R>(
        &mut self,
        annotation: AbstractType,
        capacity: usize,
        f: impl FnOnce(&mut ObjectInserter<'_>) -> Result<R>,
    ) -> Result<R> {
        make_room(&mut self.file, 1 + capacity + 1)?;
        let start = write_shell(&mut self.file, ContainerShape::Object, annotation, capacity)?;
        let mut child_file = self.file.reborrow();
        child_file.seek(start + 1)?;
        let mut child = ObjectInserter::at(child_file);
        let result = f(&mut child)?;
        drop(child);
        let span = field_span(&self.file, start)?;
        self.file.seek(start + span)?;
        Ok(result)
    }

    /// Inserts an array with the default (unsorted multiset) annotation.
    pub fn insert_array_with<R>(
        &mut self,
        capacity: usize,
        f: impl FnOnce(&mut Inserter<'_>) -> Result<R>,
    ) -> Result<R> {
        self.insert_array_list_with(AbstractType::UnsortedMultiset, capacity, f)
    }

    /// Inserts an array with an explicit abstract-type annotation.
    pub fn insert_array_list_with<R>(
        &mut self,
        annotation: AbstractType,
        capacity: usize,
        f: impl FnOnce(&mut Inserter<'_>) -> Result<R>,
    ) -> Result<R> {
        make_room(&mut self.file, 1 + capacity + 1)?;
        let start = write_shell(&mut self.file, ContainerShape::Array, annotation, capacity)?;
        let mut child_file = self.file.reborrow();
        child_file.seek(start + 1)?;
        let mut child = Inserter::for_array(child_file);
        let result = f(&mut child)?;
        drop(child);
        let span = field_span(&self.file, start)?;
        self.file.seek(start + span)?;
        Ok(result)
    }

    /// Inserts a column with the default (unsorted multiset) annotation.
    pub fn insert_column_with<R>(
        &mut self,
        elem: ColumnType,
        capacity: usize,
        f: impl FnOnce(&mut ColumnIt<'_>) -> Result<R>,
    ) -> Result<R> {
        self.insert_column_list_with(AbstractType::UnsortedMultiset, elem, capacity, f)
    }

    /// Inserts a column with an explicit abstract-type annotation. The
    /// closure receives the open column for bulk pushes.
    pub fn insert_column_list_with<R>(
        &mut self,
        annotation: AbstractType,
        elem: ColumnType,
        capacity: usize,
        f: impl FnOnce(&mut ColumnIt<'_>) -> Result<R>,
    ) -> Result<R> {
        make_room(&mut self.file, column_shell_span(elem, capacity))?;
        let start = write_column_shell(&mut self.file, annotation, elem, capacity)?;
        let mut column = ColumnIt::open_at(self.file.reborrow(), start)?;
        let result = f(&mut column)?;
        drop(column);
        let span = crate::record::field::column_span(&self.file, start)?;
        self.file.seek(start + span)?;
        Ok(result)
    }
}

// ------------------------------------------------------------------------------------------------
// ObjectInserter (key/value positions)
// ------------------------------------------------------------------------------------------------

/// Inserter for (key, value) positions inside an object container.
pub struct ObjectInserter<'f> {
    file: MemFile<'f>,
}

impl<'f> ObjectInserter<'f> {
    pub(crate) fn at(file: MemFile<'f>) -> Self {
        Self { file }
    }

    pub(crate) fn position(&self) -> usize {
        self.file.tell()
    }

    fn keyed_fixed(&mut self, key: &str, value_bytes: &[u8]) -> Result<()> {
        make_room(&mut self.file, key_span(key) + value_bytes.len())?;
        write_key(&mut self.file, key)?;
        self.file.write(value_bytes)
    }

    pub fn prop_null(&mut self, key: &str) -> Result<()> {
        self.keyed_fixed(key, &[MARKER_NULL])
    }

    pub fn prop_true(&mut self, key: &str) -> Result<()> {
        self.keyed_fixed(key, &[MARKER_TRUE])
    }

    pub fn prop_false(&mut self, key: &str) -> Result<()> {
        self.keyed_fixed(key, &[MARKER_FALSE])
    }

    pub fn prop_bool(&mut self, key: &str, v: bool) -> Result<()> {
        if v { self.prop_true(key) } else { self.prop_false(key) }
    }

    pub fn prop_u8(&mut self, key: &str, v: u8) -> Result<()> {
        self.keyed_fixed(key, &[MARKER_U8, v])
    }

    pub fn prop_u16(&mut self, key: &str, v: u16) -> Result<()> {
        let b = v.to_le_bytes();
        self.keyed_fixed(key, &[MARKER_U16, b[0], b[1]])
    }

    pub fn prop_u32(&mut self, key: &str, v: u32) -> Result<()> {
        let mut buf = [MARKER_U32, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.keyed_fixed(key, &buf)
    }

    pub fn prop_u64(&mut self, key: &str, v: u64) -> Result<()> {
        let mut buf = [MARKER_U64, 0, 0, 0, 0, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.keyed_fixed(key, &buf)
    }

    pub fn prop_i8(&mut self, key: &str, v: i8) -> Result<()> {
        self.keyed_fixed(key, &[MARKER_I8, v as u8])
    }

    pub fn prop_i16(&mut self, key: &str, v: i16) -> Result<()> {
        let b = v.to_le_bytes();
        self.keyed_fixed(key, &[MARKER_I16, b[0], b[1]])
    }

    pub fn prop_i32(&mut self, key: &str, v: i32) -> Result<()> {
        let mut buf = [MARKER_I32, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.keyed_fixed(key, &buf)
    }

    pub fn prop_i64(&mut self, key: &str, v: i64) -> Result<()> {
        let mut buf = [MARKER_I64, 0, 0, 0, 0, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.keyed_fixed(key, &buf)
    }

    pub fn prop_float(&mut self, key: &str, v: f32) -> Result<()> {
        let mut buf = [MARKER_FLOAT, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_le_bytes());
        self.keyed_fixed(key, &buf)
    }

    pub fn prop_string(&mut self, key: &str, s: &str) -> Result<()> {
        make_room(&mut self.file, key_span(key) + string_field_span(s))?;
        write_key(&mut self.file, key)?;
        write_string_field(&mut self.file, s)
    }

    pub fn prop_binary(
        &mut self,
        key: &str,
        blob: &[u8],
        mime_type: Option<&str>,
        file_ext: Option<&str>,
        user_type: Option<&str>,
    ) -> Result<()> {
        let (marker, content_type) = match user_type {
            Some(ty) => (MARKER_CUSTOM_BINARY, ty),
            None => (MARKER_BINARY, resolve_mime(mime_type, file_ext)),
        };
        make_room(
            &mut self.file,
            key_span(key) + binary_field_span(content_type, blob),
        )?;
        write_key(&mut self.file, key)?;
        write_binary_field(&mut self.file, marker, content_type, blob)
    }

    pub fn prop_object_with<R>(
        &mut self,
        key: &str,
        capacity: usize,
        f: impl FnOnce(&mut ObjectInserter<'_>) -> Result<R>,
    ) -> Result<R> {
        self.prop_object_list_with(key, AbstractType::UnsortedMultiset, capacity, f)
    }

    pub fn prop_object_list_with<R>(
        &mut self,
        key: &str,
        annotation: AbstractType,
        capacity: usize,
        f: impl FnOnce(&mut ObjectInserter<'_>) -> Result<R>,
    ) -> Result<R> {
        make_room(&mut self.file, key_span(key) + 1 + capacity + 1)?;
        write_key(&mut self.file, key)?;
        let start = write_shell(&mut self.file, ContainerShape::Object, annotation, capacity)?;
        let mut child_file = self.file.reborrow();
        child_file.seek(start + 1)?;
        let mut child = ObjectInserter::at(child_file);
        let result = f(&mut child)?;
        drop(child);
        let span = field_span(&self.file, start)?;
        self.file.seek(start + span)?;
        Ok(result)
    }

    pub fn prop_array_with<R>(
        &mut self,
        key: &str,
        capacity: usize,
        f: impl FnOnce(&mut Inserter<'_>) -> Result<R>,
    ) -> Result<R> {
        self.prop_array_list_with(key, AbstractType::UnsortedMultiset, capacity, f)
    }

    pub fn prop_array_list_with<R>(
        &mut self,
        key: &str,
        annotation: AbstractType,
        capacity: usize,
        f: impl FnOnce(&mut Inserter<'_>) -> Result<R>,
    ) -> Result<R> {
        make_room(&mut self.file, key_span(key) + 1 + capacity + 1)?;
        write_key(&mut self.file, key)?;
        let start = write_shell(&mut self.file, ContainerShape::Array, annotation, capacity)?;
        let mut child_file = self.file.reborrow();
        child_file.seek(start + 1)?;
        let mut child = Inserter::for_array(child_file);
        let result = f(&mut child)?;
        drop(child);
        let span = field_span(&self.file, start)?;
        self.file.seek(start + span)?;
        Ok(result)
    }

    pub fn prop_column_with<R>(
        &mut self,
        key: &str,
        elem: ColumnType,
        capacity: usize,
        f: impl FnOnce(&mut ColumnIt<'_>) -> Result<R>,
    ) -> Result<R> {
        self.prop_column_list_with(key, AbstractType::UnsortedMultiset, elem, capacity, f)
    }

    pub fn prop_column_list_with<R>(
        &mut self,
        key: &str,
        annotation: AbstractType,
        elem: ColumnType,
        capacity: usize,
        f: impl FnOnce(&mut ColumnIt<'_>) -> Result<R>,
    ) -> Result<R> {
        make_room(&mut self.file, key_span(key) + column_shell_span(elem, capacity))?;
        write_key(&mut self.file, key)?;
        let start = write_column_shell(&mut self.file, annotation, elem, capacity)?;
        let mut column = ColumnIt::open_at(self.file.reborrow(), start)?;
        let result = f(&mut column)?;
        drop(column);
        let span = crate::record::field::column_span(&self.file, start)?;
        self.file.seek(start + span)?;
        Ok(result)
    }
}

// ------------------------------------------------------------------------------------------------
// Mime lookup
// ------------------------------------------------------------------------------------------------

/// Maps a lowercase file extension (without dot) to its mime type.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "bin" => "application/octet-stream",
        "bmp" => "image/bmp",
        "css" => "text/css",
        "csv" => "text/csv",
        "gif" => "image/gif",
        "gz" => "application/gzip",
        "htm" | "html" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "js" => "text/javascript",
        "json" => "application/json",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "tar" => "application/x-tar",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "wav" => "audio/wav",
        "webp" => "image/webp",
        "xml" => "application/xml",
        "zip" => "application/zip",
        _ => return None,
    })
}
