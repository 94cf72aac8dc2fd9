//! Field decoding shared by the array, object, and column iterators.
//!
//! A *field* is one marker byte plus its payload. Container fields nest,
//! so computing the byte span of a field walks the stream with an explicit
//! stack rather than recursion; corrupt input can therefore not overflow
//! the call stack regardless of nesting depth.

use crate::error::{Error, Result};
use crate::mem::MemFile;
use crate::mem::file::decode_varuint;
use crate::record::marker::{
    ARRAY_END, AbstractType, ContainerShape, EMPTY_SLOT, FieldType, OBJECT_END,
};

/// A focused field: its marker offset and classified type.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldView {
    pub off: usize,
    pub ty: FieldType,
}

/// A decoded binary field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryValue<'a> {
    /// Mime type (`b` fields) or user-defined type name (`x` fields).
    pub content_type: &'a str,
    /// The blob bytes.
    pub blob: &'a [u8],
    /// Whether this field carried a user-defined type (`x` marker).
    pub is_custom: bool,
}

impl FieldView {
    pub(crate) fn classify(file: &MemFile<'_>, off: usize) -> Result<Self> {
        let marker = file.slice_at(off, 1)?[0];
        Ok(Self {
            off,
            ty: FieldType::from_marker(marker)?,
        })
    }

    fn payload(&self, expected: FieldType) -> Result<usize> {
        if self.ty != expected {
            return Err(Error::type_mismatch(format!(
                "field is {:?}, accessed as {expected:?}",
                self.ty
            )));
        }
        Ok(self.off + 1)
    }

    pub(crate) fn u8_value(&self, file: &MemFile<'_>) -> Result<u8> {
        let off = self.payload(FieldType::U8)?;
        Ok(file.slice_at(off, 1)?[0])
    }

    pub(crate) fn u16_value(&self, file: &MemFile<'_>) -> Result<u16> {
        let off = self.payload(FieldType::U16)?;
        let b = file.slice_at(off, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32_value(&self, file: &MemFile<'_>) -> Result<u32> {
        let off = self.payload(FieldType::U32)?;
        let b = file.slice_at(off, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64_value(&self, file: &MemFile<'_>) -> Result<u64> {
        let off = self.payload(FieldType::U64)?;
        let b = file.slice_at(off, 8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub(crate) fn i8_value(&self, file: &MemFile<'_>) -> Result<i8> {
        let off = self.payload(FieldType::I8)?;
        Ok(file.slice_at(off, 1)?[0] as i8)
    }

    pub(crate) fn i16_value(&self, file: &MemFile<'_>) -> Result<i16> {
        let off = self.payload(FieldType::I16)?;
        let b = file.slice_at(off, 2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn i32_value(&self, file: &MemFile<'_>) -> Result<i32> {
        let off = self.payload(FieldType::I32)?;
        let b = file.slice_at(off, 4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i64_value(&self, file: &MemFile<'_>) -> Result<i64> {
        let off = self.payload(FieldType::I64)?;
        let b = file.slice_at(off, 8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Returns `None` for the float null sentinel (NaN).
    pub(crate) fn float_value(&self, file: &MemFile<'_>) -> Result<Option<f32>> {
        let off = self.payload(FieldType::Float)?;
        let b = file.slice_at(off, 4)?;
        let v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        Ok(if v.is_nan() { None } else { Some(v) })
    }

    pub(crate) fn string_value<'f>(&self, file: &'f MemFile<'_>) -> Result<&'f str> {
        if self.ty != FieldType::String {
            return Err(Error::type_mismatch(format!(
                "field is {:?}, accessed as String",
                self.ty
            )));
        }
        let (payload, len) = string_body(file, self.off)?;
        let bytes = file.slice_at(payload, len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::corrupted("string field is not valid UTF-8"))
    }

    pub(crate) fn binary_value<'f>(&self, file: &'f MemFile<'_>) -> Result<BinaryValue<'f>> {
        let is_custom = match self.ty {
            FieldType::Binary => false,
            FieldType::CustomBinary => true,
            other => {
                return Err(Error::type_mismatch(format!(
                    "field is {other:?}, accessed as Binary"
                )));
            }
        };
        let mut off = self.off + 1;
        let (type_len, n) = varuint_at(file, off)?;
        off += n;
        let type_bytes = file.slice_at(off, type_len as usize)?;
        off += type_len as usize;
        let (blob_len, n) = varuint_at(file, off)?;
        off += n;
        let blob = file.slice_at(off, blob_len as usize)?;
        let content_type = std::str::from_utf8(type_bytes)
            .map_err(|_| Error::corrupted("binary content type is not valid UTF-8"))?;
        Ok(BinaryValue {
            content_type,
            blob,
            is_custom,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Span computation
// ------------------------------------------------------------------------------------------------

/// Decodes the varuint at `off` without moving any cursor.
pub(crate) fn varuint_at(file: &MemFile<'_>, off: usize) -> Result<(u64, usize)> {
    let avail = file.size().saturating_sub(off);
    if avail == 0 {
        return Err(Error::out_of_bounds("varuint at end of stream"));
    }
    decode_varuint(file.slice_at(off, avail.min(crate::mem::VARUINT_MAX_BYTES))?)
}

/// Payload offset and byte length of the string field at `off`.
pub(crate) fn string_body(file: &MemFile<'_>, off: usize) -> Result<(usize, usize)> {
    let (len, n) = varuint_at(file, off + 1)?;
    Ok((off + 1 + n, len as usize))
}

/// Byte span of a length-prefixed blob pair (binary and custom-binary
/// payloads): two varuint-prefixed byte runs.
fn blob_pair_span(file: &MemFile<'_>, off: usize) -> Result<usize> {
    let start = off;
    let (type_len, n) = varuint_at(file, off)?;
    let mut off = off + n + type_len as usize;
    let (blob_len, n) = varuint_at(file, off)?;
    off += n + blob_len as usize;
    Ok(off - start)
}

/// Byte span of the column container at `off` (derived marker included).
pub(crate) fn column_span(file: &MemFile<'_>, off: usize) -> Result<usize> {
    use crate::record::marker::ColumnType;
    let elem = ColumnType::from_marker(file.slice_at(off + 1, 1)?[0])?;
    let (cap, cap_w) = varuint_at(file, off + 2)?;
    let (_len, len_w) = varuint_at(file, off + 2 + cap_w)?;
    Ok(2 + cap_w + len_w + cap as usize * elem.element_size())
}

/// Total byte span of the field whose marker sits at `off`.
///
/// Containers are walked with an explicit stack; the stack tracks which
/// shape encloses the cursor so object keys are skipped where expected.
pub(crate) fn field_span(file: &MemFile<'_>, off: usize) -> Result<usize> {
    let start = off;
    let mut pos = off;
    let mut stack: Vec<ContainerShape> = Vec::new();

    loop {
        // At the top level (`stack` empty) we are looking at exactly one
        // field; inside containers we iterate entries until the end marker.
        if let Some(shape) = stack.last().copied() {
            // Skip empty slots.
            while file.slice_at(pos, 1)?[0] == EMPTY_SLOT {
                pos += 1;
            }
            let byte = file.slice_at(pos, 1)?[0];
            match shape {
                ContainerShape::Array if byte == ARRAY_END => {
                    stack.pop();
                    pos += 1;
                    if stack.is_empty() {
                        return Ok(pos - start);
                    }
                    continue;
                }
                ContainerShape::Object if byte == OBJECT_END => {
                    stack.pop();
                    pos += 1;
                    if stack.is_empty() {
                        return Ok(pos - start);
                    }
                    continue;
                }
                ContainerShape::Object => {
                    // Property key precedes the value.
                    let (key_len, n) = varuint_at(file, pos)?;
                    pos += n + key_len as usize;
                }
                _ => {}
            }
        }

        let marker = file.slice_at(pos, 1)?[0];
        let ty = FieldType::from_marker(marker)?;
        match ty {
            FieldType::Array => {
                stack.push(ContainerShape::Array);
                pos += 1;
            }
            FieldType::Object => {
                stack.push(ContainerShape::Object);
                pos += 1;
            }
            FieldType::Column => {
                pos += column_span(file, pos)?;
                if stack.is_empty() {
                    return Ok(pos - start);
                }
            }
            FieldType::String => {
                let (payload, len) = string_body(file, pos)?;
                pos = payload + len;
                if stack.is_empty() {
                    return Ok(pos - start);
                }
            }
            FieldType::Binary | FieldType::CustomBinary => {
                pos += 1;
                pos += blob_pair_span(file, pos)?;
                if stack.is_empty() {
                    return Ok(pos - start);
                }
            }
            other => {
                let payload = other.fixed_payload_size().ok_or_else(|| {
                    Error::internal(format!("{other:?} has no fixed payload size"))
                })?;
                pos += 1 + payload;
                if stack.is_empty() {
                    return Ok(pos - start);
                }
            }
        }
    }
}

/// Byte span of the object property at `off` (key plus value).
pub(crate) fn prop_span(file: &MemFile<'_>, off: usize) -> Result<usize> {
    let (key_len, n) = varuint_at(file, off)?;
    let value_off = off + n + key_len as usize;
    Ok(n + key_len as usize + field_span(file, value_off)?)
}

/// Classifies the abstract-type annotation of the container marker at
/// `off`, requiring the given shape.
pub(crate) fn container_annotation(
    file: &MemFile<'_>,
    off: usize,
    shape: ContainerShape,
) -> Result<AbstractType> {
    let byte = file.slice_at(off, 1)?[0];
    match AbstractType::classify(byte) {
        Some((s, at)) if s == shape => Ok(at),
        Some((s, _)) => Err(Error::type_mismatch(format!(
            "container is a {s:?}, expected {shape:?}"
        ))),
        None => Err(Error::marker_mapping(byte)),
    }
}
