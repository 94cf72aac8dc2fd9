//! JSON emitter with a `meta` header.
//!
//! Output shape:
//!
//! ```json
//! {"meta": {"key": {"type": "ukey", "value": 7}, "commit": 1234}, "doc": ...}
//! ```
//!
//! The `doc` payload is rendered exactly like the compact printer's; binary
//! fields become `{"type", "encoding", "binary-string"}` objects so the
//! content type survives the round trip.

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::printer::{JsonCompact, KeyValue, Printer, escape_json_into};
use crate::record::BinaryValue;
use crate::record::marker::KeyKind;

/// JSON-extended printer.
#[derive(Debug, Default)]
pub struct JsonExtended {
    body: JsonCompact,
}

fn key_type_name(kind: KeyKind) -> &'static str {
    match kind {
        KeyKind::NoKey => "nokey",
        KeyKind::AutoKey => "autokey",
        KeyKind::UKey => "ukey",
        KeyKind::IKey => "ikey",
        KeyKind::SKey => "skey",
    }
}

impl Printer for JsonExtended {
    fn record_begin(&mut self, out: &mut String) {
        out.push('{');
    }

    fn record_end(&mut self, out: &mut String) {
        out.push('}');
    }

    fn meta_begin(&mut self, out: &mut String) {
        out.push_str("\"meta\": {");
    }

    fn meta_data(&mut self, out: &mut String, kind: KeyKind, key: &KeyValue<'_>, hash: u64) {
        out.push_str("\"key\": {\"type\": ");
        escape_json_into(out, key_type_name(kind));
        out.push_str(", \"value\": ");
        match key {
            KeyValue::None => out.push_str("null"),
            KeyValue::Unsigned(v) => {
                let _ = write!(out, "{v}");
            }
            KeyValue::Signed(v) => {
                let _ = write!(out, "{v}");
            }
            KeyValue::Str(s) => escape_json_into(out, s),
        }
        out.push_str("}, \"commit\": ");
        if kind.has_hash() {
            let _ = write!(out, "{hash}");
        } else {
            out.push_str("null");
        }
    }

    fn meta_end(&mut self, out: &mut String) {
        out.push_str("}, ");
    }

    fn doc_begin(&mut self, out: &mut String) {
        out.push_str("\"doc\": ");
    }

    fn empty_record(&mut self, out: &mut String) {
        self.body.empty_record(out);
    }

    fn array_begin(&mut self, out: &mut String) {
        self.body.array_begin(out);
    }

    fn array_end(&mut self, out: &mut String) {
        self.body.array_end(out);
    }

    fn obj_begin(&mut self, out: &mut String) {
        self.body.obj_begin(out);
    }

    fn obj_end(&mut self, out: &mut String) {
        self.body.obj_end(out);
    }

    fn comma(&mut self, out: &mut String) {
        self.body.comma(out);
    }

    fn prop_name(&mut self, out: &mut String, key: &str) {
        self.body.prop_name(out, key);
    }

    fn value_null(&mut self, out: &mut String) {
        self.body.value_null(out);
    }

    fn value_true(&mut self, out: &mut String) {
        self.body.value_true(out);
    }

    fn value_false(&mut self, out: &mut String) {
        self.body.value_false(out);
    }

    fn value_u64(&mut self, out: &mut String, v: u64) {
        self.body.value_u64(out, v);
    }

    fn value_i64(&mut self, out: &mut String, v: i64) {
        self.body.value_i64(out, v);
    }

    fn value_float(&mut self, out: &mut String, v: Option<f32>) {
        self.body.value_float(out, v);
    }

    fn value_string(&mut self, out: &mut String, s: &str) {
        self.body.value_string(out, s);
    }

    /// Binary keeps its content type in an envelope object.
    fn value_binary(&mut self, out: &mut String, b: &BinaryValue<'_>) {
        out.push_str("{\"type\": ");
        escape_json_into(out, b.content_type);
        out.push_str(", \"encoding\": \"base64\", \"binary-string\": \"");
        out.push_str(&BASE64.encode(b.blob));
        out.push_str("\"}");
    }
}
