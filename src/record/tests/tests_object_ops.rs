#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::record::{CreateOptions, FieldType, Record, RecordBuilder, RecordKey};

    fn record_with_object() -> Record {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder
            .insert_with(|ins| {
                ins.insert_object_with(0, |obj| {
                    obj.prop_u8("a", 1)?;
                    obj.prop_string("b", "two")?;
                    obj.prop_bool("c", false)
                })
            })
            .unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_object_iteration_yields_keys_and_types() {
        let record = record_with_object();
        let mut it = record.iter().unwrap();
        assert!(it.next().unwrap());
        let mut obj = it.object_value().unwrap();

        assert!(obj.next().unwrap());
        assert_eq!(obj.prop_name().unwrap(), "a");
        assert_eq!(obj.prop_type().unwrap(), FieldType::U8);
        assert_eq!(obj.u8_value().unwrap(), 1);

        assert!(obj.next().unwrap());
        assert_eq!(obj.prop_name().unwrap(), "b");
        assert_eq!(obj.string_value().unwrap(), "two");

        assert!(obj.next().unwrap());
        assert_eq!(obj.prop_name().unwrap(), "c");
        assert!(!obj.bool_value().unwrap());

        assert!(!obj.next().unwrap());
    }

    #[test]
    fn test_remove_middle_property() {
        let mut record = record_with_object();
        {
            let mut patch = record.patch_begin().unwrap();
            let mut it = patch.iterator().unwrap();
            assert!(it.next().unwrap());
            let mut obj = it.object_value().unwrap();
            assert!(obj.next().unwrap());
            assert!(obj.next().unwrap());
            assert_eq!(obj.prop_name().unwrap(), "b");
            obj.remove().unwrap();
            // Iteration resumes with the property that slid into place.
            assert!(obj.next().unwrap());
            assert_eq!(obj.prop_name().unwrap(), "c");
            assert!(!obj.next().unwrap());
        }
        assert_eq!(
            record.to_json_compact().unwrap(),
            r#"{"a": 1, "c": false}"#
        );
    }

    #[test]
    fn test_remove_requires_focus() {
        let mut record = record_with_object();
        let mut patch = record.patch_begin().unwrap();
        let mut it = patch.iterator().unwrap();
        assert!(it.next().unwrap());
        let mut obj = it.object_value().unwrap();
        assert_eq!(obj.remove().unwrap_err().kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn test_remove_invalidates_focus() {
        let mut record = record_with_object();
        let mut patch = record.patch_begin().unwrap();
        let mut it = patch.iterator().unwrap();
        assert!(it.next().unwrap());
        let mut obj = it.object_value().unwrap();
        assert!(obj.next().unwrap());
        obj.remove().unwrap();
        // The focus cache is gone until the next advance.
        assert_eq!(obj.prop_type().unwrap_err().kind(), ErrorKind::IllegalState);
        assert!(obj.next().unwrap());
        assert_eq!(obj.prop_name().unwrap(), "b");
    }

    #[test]
    fn test_remove_tracks_mod_size() {
        let mut record = record_with_object();
        let mut patch = record.patch_begin().unwrap();
        let mut it = patch.iterator().unwrap();
        assert!(it.next().unwrap());
        let mut obj = it.object_value().unwrap();
        assert!(obj.next().unwrap());
        obj.remove().unwrap();
        assert!(obj.mod_size() < 0);
    }

    #[test]
    fn test_insert_into_existing_object() {
        let mut record = record_with_object();
        {
            let mut patch = record.patch_begin().unwrap();
            let mut it = patch.iterator().unwrap();
            assert!(it.next().unwrap());
            let mut obj = it.object_value().unwrap();
            obj.fast_forward().unwrap();
            obj.insert_with(|ins| ins.prop_u16("d", 500)).unwrap();
        }
        assert_eq!(
            record.to_json_compact().unwrap(),
            r#"{"a": 1, "b": "two", "c": false, "d": 500}"#
        );
    }

    #[test]
    fn test_object_update_type_requires_write_cursor() {
        let record = record_with_object();
        let mut it = record.iter().unwrap();
        assert!(it.next().unwrap());
        let mut obj = it.object_value().unwrap();
        let err = obj
            .update_type(crate::record::AbstractType::SortedSet)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalOp);
    }
}
