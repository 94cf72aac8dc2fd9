//! Printer Interface Module
//!
//! Streaming textual emitters for records. The [`Printer`] trait covers
//! every structural event of a record walk; the driver in this module
//! performs the walk and owns no output — all text goes into a
//! caller-provided string builder.
//!
//! Two implementations ship with the crate:
//!
//! - [`JsonCompact`] — plain JSON; a record with a single top-level
//!   element prints as that element (the unit-array rule).
//! - [`JsonExtended`] — wraps the same payload in `{"meta": ..., "doc": ...}`
//!   where `meta` carries the key and commit hash.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod compact;
pub mod extended;

#[cfg(test)]
mod tests;

pub use compact::JsonCompact;
pub use extended::JsonExtended;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use crate::error::Result;
use crate::record::column_it::{ColumnIt, ColumnValue};
use crate::record::BinaryValue;
use crate::record::marker::{FieldType, KeyKind};
use crate::record::{ArrayIt, ObjectIt, Record};

/// Key payload handed to [`Printer::meta_data`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue<'a> {
    None,
    Unsigned(u64),
    Signed(i64),
    Str(&'a str),
}

// ------------------------------------------------------------------------------------------------
// Printer trait
// ------------------------------------------------------------------------------------------------

/// Callback surface of a record printer.
///
/// Implementations must not retain references to their inputs beyond a
/// single callback.
pub trait Printer {
    fn record_begin(&mut self, _out: &mut String) {}
    fn record_end(&mut self, _out: &mut String) {}

    fn meta_begin(&mut self, _out: &mut String) {}
    fn meta_data(&mut self, _out: &mut String, _kind: KeyKind, _key: &KeyValue<'_>, _hash: u64) {}
    fn meta_end(&mut self, _out: &mut String) {}

    fn doc_begin(&mut self, _out: &mut String) {}
    fn doc_end(&mut self, _out: &mut String) {}

    fn empty_record(&mut self, out: &mut String);

    fn array_begin(&mut self, out: &mut String);
    fn array_end(&mut self, out: &mut String);
    fn unit_array_begin(&mut self, _out: &mut String) {}
    fn unit_array_end(&mut self, _out: &mut String) {}

    fn obj_begin(&mut self, out: &mut String);
    fn obj_end(&mut self, out: &mut String);

    fn comma(&mut self, out: &mut String);
    fn prop_name(&mut self, out: &mut String, key: &str);

    fn value_null(&mut self, out: &mut String);
    fn value_true(&mut self, out: &mut String);
    fn value_false(&mut self, out: &mut String);
    fn value_u64(&mut self, out: &mut String, v: u64);
    fn value_i64(&mut self, out: &mut String, v: i64);
    fn value_float(&mut self, out: &mut String, v: Option<f32>);
    fn value_string(&mut self, out: &mut String, s: &str);
    fn value_binary(&mut self, out: &mut String, b: &BinaryValue<'_>);
}

// ------------------------------------------------------------------------------------------------
// Driver
// ------------------------------------------------------------------------------------------------

/// Renders `record` through `printer` into a fresh string.
pub fn to_string(record: &Record, printer: &mut impl Printer) -> Result<String> {
    let mut out = String::new();
    print_record(record, printer, &mut out)?;
    Ok(out)
}

/// Renders `record` through `printer` into `out`.
pub fn print_record(record: &Record, p: &mut impl Printer, out: &mut String) -> Result<()> {
    p.record_begin(out);

    let kind = record.key_kind()?;
    let key = match kind {
        KeyKind::NoKey => KeyValue::None,
        KeyKind::AutoKey | KeyKind::UKey => KeyValue::Unsigned(record.key_unsigned()?),
        KeyKind::IKey => KeyValue::Signed(record.key_signed()?),
        KeyKind::SKey => KeyValue::Str(record.key_string()?),
    };
    p.meta_begin(out);
    p.meta_data(out, kind, &key, record.commit_hash());
    p.meta_end(out);

    p.doc_begin(out);
    let mut counter = record.iter()?;
    let mut count = 0usize;
    while counter.next()? {
        count += 1;
    }
    let mut it = record.iter()?;
    match count {
        0 => p.empty_record(out),
        1 => {
            p.unit_array_begin(out);
            it.next()?;
            print_array_field(&mut it, p, out)?;
            p.unit_array_end(out);
        }
        _ => {
            p.array_begin(out);
            print_array_contents(&mut it, p, out)?;
            p.array_end(out);
        }
    }
    p.doc_end(out);

    p.record_end(out);
    Ok(())
}

fn print_array_contents(it: &mut ArrayIt<'_>, p: &mut impl Printer, out: &mut String) -> Result<()> {
    let mut first = true;
    while it.next()? {
        if !first {
            p.comma(out);
        }
        first = false;
        print_array_field(it, p, out)?;
    }
    Ok(())
}

fn print_array_field(it: &mut ArrayIt<'_>, p: &mut impl Printer, out: &mut String) -> Result<()> {
    match it.field_type()? {
        FieldType::Null => p.value_null(out),
        FieldType::True => p.value_true(out),
        FieldType::False => p.value_false(out),
        FieldType::U8 => p.value_u64(out, it.u8_value()? as u64),
        FieldType::U16 => p.value_u64(out, it.u16_value()? as u64),
        FieldType::U32 => p.value_u64(out, it.u32_value()? as u64),
        FieldType::U64 => p.value_u64(out, it.u64_value()?),
        FieldType::I8 => p.value_i64(out, it.i8_value()? as i64),
        FieldType::I16 => p.value_i64(out, it.i16_value()? as i64),
        FieldType::I32 => p.value_i64(out, it.i32_value()? as i64),
        FieldType::I64 => p.value_i64(out, it.i64_value()?),
        FieldType::Float => p.value_float(out, it.float_value()?),
        FieldType::String => p.value_string(out, it.string_value()?),
        FieldType::Binary | FieldType::CustomBinary => p.value_binary(out, &it.binary_value()?),
        FieldType::Object => {
            let mut obj = it.object_value()?;
            print_object(&mut obj, p, out)?;
        }
        FieldType::Array => {
            let mut sub = it.array_value()?;
            p.array_begin(out);
            print_array_contents(&mut sub, p, out)?;
            p.array_end(out);
        }
        FieldType::Column => {
            let col = it.column_value()?;
            print_column(&col, p, out)?;
        }
    }
    Ok(())
}

fn print_object(it: &mut ObjectIt<'_>, p: &mut impl Printer, out: &mut String) -> Result<()> {
    p.obj_begin(out);
    let mut first = true;
    while it.next()? {
        if !first {
            p.comma(out);
        }
        first = false;
        let key = it.prop_name()?.to_owned();
        p.prop_name(out, &key);
        match it.prop_type()? {
            FieldType::Null => p.value_null(out),
            FieldType::True => p.value_true(out),
            FieldType::False => p.value_false(out),
            FieldType::U8 => p.value_u64(out, it.u8_value()? as u64),
            FieldType::U16 => p.value_u64(out, it.u16_value()? as u64),
            FieldType::U32 => p.value_u64(out, it.u32_value()? as u64),
            FieldType::U64 => p.value_u64(out, it.u64_value()?),
            FieldType::I8 => p.value_i64(out, it.i8_value()? as i64),
            FieldType::I16 => p.value_i64(out, it.i16_value()? as i64),
            FieldType::I32 => p.value_i64(out, it.i32_value()? as i64),
            FieldType::I64 => p.value_i64(out, it.i64_value()?),
            FieldType::Float => p.value_float(out, it.float_value()?),
            FieldType::String => p.value_string(out, it.string_value()?),
            FieldType::Binary | FieldType::CustomBinary => {
                p.value_binary(out, &it.binary_value()?)
            }
            FieldType::Object => {
                let mut sub = it.object_value()?;
                print_object(&mut sub, p, out)?;
            }
            FieldType::Array => {
                let mut sub = it.array_value()?;
                p.array_begin(out);
                print_array_contents(&mut sub, p, out)?;
                p.array_end(out);
            }
            FieldType::Column => {
                let col = it.column_value()?;
                print_column(&col, p, out)?;
            }
        }
    }
    p.obj_end(out);
    Ok(())
}

fn print_column(col: &ColumnIt<'_>, p: &mut impl Printer, out: &mut String) -> Result<()> {
    p.array_begin(out);
    for i in 0..col.length() {
        if i > 0 {
            p.comma(out);
        }
        match col.value_at(i)? {
            ColumnValue::Unsigned(Some(v)) => p.value_u64(out, v),
            ColumnValue::Signed(Some(v)) => p.value_i64(out, v),
            ColumnValue::Float(v @ Some(_)) => p.value_float(out, v),
            ColumnValue::Boolean(Some(true)) => p.value_true(out),
            ColumnValue::Boolean(Some(false)) => p.value_false(out),
            ColumnValue::Unsigned(None)
            | ColumnValue::Signed(None)
            | ColumnValue::Float(None)
            | ColumnValue::Boolean(None) => p.value_null(out),
        }
    }
    p.array_end(out);
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Shared emission helpers
// ------------------------------------------------------------------------------------------------

/// Appends `s` as a JSON string literal (quotes included).
pub(crate) fn escape_json_into(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
