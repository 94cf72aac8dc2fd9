#[cfg(test)]
mod tests {
    use crate::record::{
        AbstractType, ColumnType, ColumnValue, CreateOptions, FieldType, Record, RecordBuilder,
        RecordKey,
    };

    /// `{ "x": [ { "y": [1, "b", 3] } ] }` with a heterogeneous inner array.
    fn nested_record() -> Record {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder
            .insert_with(|ins| {
                ins.insert_object_with(0, |obj| {
                    obj.prop_array_with("x", 0, |arr| {
                        arr.insert_object_with(0, |o| {
                            o.prop_array_with("y", 0, |y| {
                                y.insert_u8(1)?;
                                y.insert_string("b")?;
                                y.insert_u8(3)
                            })
                        })
                    })
                })
            })
            .unwrap();
        builder.finish().unwrap()
    }

    /// `{ "x": [ { "y": [1, 2, 3] } ] }` with the homogeneous run stored
    /// as a column.
    fn column_record() -> Record {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder
            .insert_with(|ins| {
                ins.insert_object_with(0, |obj| {
                    obj.prop_array_with("x", 0, |arr| {
                        arr.insert_object_with(0, |o| {
                            o.prop_column_with("y", ColumnType::U8, 4, |col| {
                                col.push_u8(1)?;
                                col.push_u8(2)?;
                                col.push_u8(3)
                            })
                        })
                    })
                })
            })
            .unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_find_array_through_unit_object() {
        let record = nested_record();
        let find = record.find("x.0.y").unwrap().unwrap();
        assert_eq!(find.result_type().unwrap(), FieldType::Array);

        let mut arr = find.result_array().unwrap();
        let mut types = Vec::new();
        while arr.next().unwrap() {
            types.push(arr.field_type().unwrap());
        }
        assert_eq!(types, vec![FieldType::U8, FieldType::String, FieldType::U8]);
    }

    #[test]
    fn test_find_is_repeatable_and_pure() {
        let record = nested_record();
        let before = record.raw_data().to_vec();
        for _ in 0..3 {
            let find = record.find("x.0.y.1").unwrap().unwrap();
            assert_eq!(find.result_string().unwrap(), "b");
        }
        assert_eq!(record.raw_data(), before.as_slice());
    }

    #[test]
    fn test_find_terminal_values() {
        let record = nested_record();
        assert_eq!(
            record.find("x.0.y.0").unwrap().unwrap().result_u8().unwrap(),
            1
        );
        assert_eq!(
            record.find("x.0.y.2").unwrap().unwrap().result_u8().unwrap(),
            3
        );
    }

    #[test]
    fn test_find_misses_return_none() {
        let record = nested_record();
        assert!(record.find("nope").unwrap().is_none());
        assert!(record.find("x.1").unwrap().is_none());
        assert!(record.find("x.0.y.9").unwrap().is_none());
        assert!(record.find("x.0.z").unwrap().is_none());
    }

    #[test]
    fn test_find_update_array_type() {
        let mut record = nested_record();
        {
            let mut patch = record.patch_begin().unwrap();
            patch
                .find_update_array_type("x.0.y", AbstractType::SortedSet)
                .unwrap();
        }
        let find = record.find("x.0.y").unwrap().unwrap();
        let arr = find.result_array().unwrap();
        assert!(!arr.is_multiset());
        assert!(arr.is_sorted());
    }

    #[test]
    fn test_find_column_and_update_type() {
        let record = column_record();
        let find = record.find("x.0.y").unwrap().unwrap();
        assert_eq!(find.result_type().unwrap(), FieldType::Column);
        let col = find.result_column().unwrap();
        assert_eq!(col.length(), 3);
        assert_eq!(col.element_type(), ColumnType::U8);

        let mut record = record;
        {
            let mut patch = record.patch_begin().unwrap();
            patch
                .find_update_column_type("x.0.y", AbstractType::SortedMultiset)
                .unwrap();
        }
        let col = record
            .find("x.0.y")
            .unwrap()
            .unwrap()
            .result_column()
            .unwrap();
        assert!(col.is_multiset());
        assert!(col.is_sorted());
    }

    #[test]
    fn test_find_column_element() {
        let record = column_record();
        let find = record.find("x.0.y.1").unwrap().unwrap();
        assert_eq!(find.result_type().unwrap(), FieldType::U8);
        assert_eq!(
            find.result_column_value().unwrap(),
            ColumnValue::Unsigned(Some(2))
        );
    }

    #[test]
    fn test_find_update_in_revision() {
        let mut record = nested_record();
        let mut revise = record.revise_begin().unwrap();
        revise
            .find_update_array_type("x.0.y", AbstractType::SortedMultiset)
            .unwrap();
        let revised = revise.revise_end().unwrap();

        // The revision carries the new annotation; the original keeps the old.
        let arr = revised
            .find("x.0.y")
            .unwrap()
            .unwrap()
            .result_array()
            .unwrap();
        assert!(arr.is_sorted());
        let arr = record
            .find("x.0.y")
            .unwrap()
            .unwrap()
            .result_array()
            .unwrap();
        assert!(!arr.is_sorted());
    }

    #[test]
    fn test_find_quoted_key() {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder
            .insert_with(|ins| {
                ins.insert_object_with(0, |obj| obj.prop_u8("spaced out", 42))
            })
            .unwrap();
        let record = builder.finish().unwrap();
        assert_eq!(
            record
                .find("\"spaced out\"")
                .unwrap()
                .unwrap()
                .result_u8()
                .unwrap(),
            42
        );
    }

    #[test]
    fn test_find_wrong_accessor_type() {
        let record = nested_record();
        let find = record.find("x.0.y.0").unwrap().unwrap();
        assert_eq!(
            find.result_string().unwrap_err().kind(),
            crate::error::ErrorKind::TypeMismatch
        );
    }
}
