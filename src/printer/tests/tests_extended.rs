#[cfg(test)]
mod tests {
    use crate::record::{CreateOptions, RecordBuilder, RecordKey};

    #[test]
    fn test_extended_wraps_meta_and_doc() {
        let mut builder =
            RecordBuilder::new(RecordKey::Unsigned(42), CreateOptions::keep()).unwrap();
        builder.insert_with(|ins| ins.insert_u8(7)).unwrap();
        let record = builder.finish().unwrap();

        let json = record.to_json_extended().unwrap();
        let expected = format!(
            "{{\"meta\": {{\"key\": {{\"type\": \"ukey\", \"value\": 42}}, \"commit\": {}}}, \"doc\": 7}}",
            record.commit_hash()
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_extended_nokey_has_null_meta_values() {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder.insert_with(|ins| ins.insert_true()).unwrap();
        let record = builder.finish().unwrap();

        assert_eq!(
            record.to_json_extended().unwrap(),
            "{\"meta\": {\"key\": {\"type\": \"nokey\", \"value\": null}, \"commit\": null}, \"doc\": true}"
        );
    }

    #[test]
    fn test_extended_string_key() {
        let mut builder =
            RecordBuilder::new(RecordKey::Str("k-1"), CreateOptions::keep()).unwrap();
        builder.insert_with(|ins| ins.insert_u8(1)).unwrap();
        let record = builder.finish().unwrap();

        let json = record.to_json_extended().unwrap();
        assert!(json.contains("\"type\": \"skey\""));
        assert!(json.contains("\"value\": \"k-1\""));
    }

    #[test]
    fn test_extended_binary_envelope() {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder
            .insert_with(|ins| ins.insert_binary(b"\x01", Some("image/png"), None, None))
            .unwrap();
        let record = builder.finish().unwrap();

        assert_eq!(
            record.to_json_extended().unwrap(),
            "{\"meta\": {\"key\": {\"type\": \"nokey\", \"value\": null}, \"commit\": null}, \
             \"doc\": {\"type\": \"image/png\", \"encoding\": \"base64\", \"binary-string\": \"AQ==\"}}"
        );
    }

    #[test]
    fn test_extended_doc_matches_compact_body() {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder
            .insert_with(|ins| {
                ins.insert_object_with(0, |obj| {
                    obj.prop_string("a", "b")?;
                    obj.prop_i64("n", -9)
                })
            })
            .unwrap();
        let record = builder.finish().unwrap();

        let compact = record.to_json_compact().unwrap();
        let extended = record.to_json_extended().unwrap();
        assert!(extended.ends_with(&format!("\"doc\": {compact}}}")));
    }
}
