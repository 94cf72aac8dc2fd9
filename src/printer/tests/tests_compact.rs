#[cfg(test)]
mod tests {
    use crate::record::{ColumnType, CreateOptions, RecordBuilder, RecordKey};

    fn build(f: impl FnOnce(&mut crate::record::Inserter<'_>) -> crate::error::Result<()>) -> String {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder.insert_with(f).unwrap();
        builder.finish().unwrap().to_json_compact().unwrap()
    }

    #[test]
    fn test_empty_record_prints_empty_array() {
        let record =
            crate::record::Record::create_empty(crate::record::AbstractType::UnsortedMultiset, RecordKey::None)
                .unwrap();
        assert_eq!(record.to_json_compact().unwrap(), "[]");
    }

    #[test]
    fn test_multi_element_record_prints_array() {
        assert_eq!(
            build(|ins| {
                ins.insert_u8(3)?;
                ins.insert_u8(1)?;
                ins.insert_u8(2)
            }),
            "[3, 1, 2]"
        );
    }

    #[test]
    fn test_unit_record_prints_bare_element() {
        assert_eq!(
            build(|ins| ins.insert_object_with(0, |obj| obj.prop_u8("a", 1))),
            r#"{"a": 1}"#
        );
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(
            build(|ins| {
                ins.insert_null()?;
                ins.insert_true()?;
                ins.insert_false()?;
                ins.insert_i32(-5)?;
                ins.insert_float(1.5)?;
                ins.insert_string("s")
            }),
            r#"[null, true, false, -5, 1.5, "s"]"#
        );
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(
            build(|ins| ins.insert_string("a\"b\\c\nd")),
            "\"a\\\"b\\\\c\\nd\""
        );
    }

    #[test]
    fn test_float_null_prints_null() {
        assert_eq!(build(|ins| ins.insert_float(f32::NAN)), "null");
    }

    #[test]
    fn test_column_prints_as_array() {
        assert_eq!(
            build(|ins| {
                ins.insert_column_with(ColumnType::I64, 4, |col| {
                    col.push_i64(-1)?;
                    col.push_null()?;
                    col.push_i64(7)
                })
            }),
            "[-1, null, 7]"
        );
    }

    #[test]
    fn test_binary_prints_base64_inline() {
        assert_eq!(
            build(|ins| ins.insert_binary(b"\x00\x01\x02", Some("application/octet-stream"), None, None)),
            "\"AAEC\""
        );
    }

    #[test]
    fn test_nested_structure() {
        assert_eq!(
            build(|ins| {
                ins.insert_object_with(0, |obj| {
                    obj.prop_null("n")?;
                    obj.prop_array_with("xs", 0, |arr| {
                        arr.insert_u8(1)?;
                        arr.insert_object_with(0, |o| o.prop_string("deep", "yes"))
                    })
                })
            }),
            r#"{"n": null, "xs": [1, {"deep": "yes"}]}"#
        );
    }
}
