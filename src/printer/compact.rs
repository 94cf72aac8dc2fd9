//! Plain JSON emitter.
//!
//! Output is always a valid JSON value. The record meta (key, commit
//! hash) is not emitted; a record with a single top-level element prints
//! as that element alone.

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::printer::{Printer, escape_json_into};
use crate::record::BinaryValue;

/// JSON-compact printer.
#[derive(Debug, Default)]
pub struct JsonCompact;

impl Printer for JsonCompact {
    fn empty_record(&mut self, out: &mut String) {
        out.push_str("[]");
    }

    fn array_begin(&mut self, out: &mut String) {
        out.push('[');
    }

    fn array_end(&mut self, out: &mut String) {
        out.push(']');
    }

    fn obj_begin(&mut self, out: &mut String) {
        out.push('{');
    }

    fn obj_end(&mut self, out: &mut String) {
        out.push('}');
    }

    fn comma(&mut self, out: &mut String) {
        out.push_str(", ");
    }

    fn prop_name(&mut self, out: &mut String, key: &str) {
        escape_json_into(out, key);
        out.push_str(": ");
    }

    fn value_null(&mut self, out: &mut String) {
        out.push_str("null");
    }

    fn value_true(&mut self, out: &mut String) {
        out.push_str("true");
    }

    fn value_false(&mut self, out: &mut String) {
        out.push_str("false");
    }

    fn value_u64(&mut self, out: &mut String, v: u64) {
        let _ = write!(out, "{v}");
    }

    fn value_i64(&mut self, out: &mut String, v: i64) {
        let _ = write!(out, "{v}");
    }

    fn value_float(&mut self, out: &mut String, v: Option<f32>) {
        match v {
            Some(v) => {
                let _ = write!(out, "{v}");
            }
            None => out.push_str("null"),
        }
    }

    fn value_string(&mut self, out: &mut String, s: &str) {
        escape_json_into(out, s);
    }

    /// Binary prints inline as a base64 string literal.
    fn value_binary(&mut self, out: &mut String, b: &BinaryValue<'_>) {
        out.push('"');
        out.push_str(&BASE64.encode(b.blob));
        out.push('"');
    }
}
