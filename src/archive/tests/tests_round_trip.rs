#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::archive::tests::helpers::{object_record, string_map};
    use crate::archive::{
        Archive, ArchiveScalar, ArchiveWriter, GroupPayload, PropType,
    };
    use crate::error::ErrorKind;
    use crate::pack::PackerKind;
    use crate::record::{AbstractType, CreateOptions, RecordBuilder, RecordKey};

    #[test]
    fn test_archive_file_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.carbon-archive");

        let record = object_record(|obj| {
            obj.prop_string("title", "archive me")?;
            obj.prop_u32("count", 7)
        });
        ArchiveWriter::new(PackerKind::Identity)
            .write_record_to_file(&record, &path)
            .unwrap();

        let archive = Archive::open(&path).unwrap();
        let map = string_map(&archive);
        let root = archive.root().unwrap();

        let sid = root.string_prop(map["title"]).unwrap().unwrap();
        assert_eq!(archive.string(sid).unwrap(), "archive me");

        let group = root.group(PropType::U32).unwrap().unwrap();
        assert_eq!(group.keys, vec![map["count"]]);
        let GroupPayload::Fixed(values) = &group.payload else {
            panic!("u32 group should be fixed");
        };
        assert_eq!(values, &[ArchiveScalar::U32(7)]);
    }

    #[test]
    fn test_scalar_groups_partition_by_type() {
        let record = object_record(|obj| {
            obj.prop_u8("a", 1)?;
            obj.prop_u8("b", 2)?;
            obj.prop_i64("c", -3)?;
            obj.prop_bool("d", true)?;
            obj.prop_null("e")?;
            obj.prop_float("f", 0.5)
        });
        let block = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap();
        let archive = Archive::from_block(block).unwrap();
        let map = string_map(&archive);
        let root = archive.root().unwrap();

        assert!(root.flags().contains(PropType::U8));
        assert!(root.flags().contains(PropType::I64));
        assert!(root.flags().contains(PropType::Bool));
        assert!(root.flags().contains(PropType::Null));
        assert!(root.flags().contains(PropType::Float));
        assert!(!root.flags().contains(PropType::U16));

        let u8s = root.group(PropType::U8).unwrap().unwrap();
        assert_eq!(u8s.keys, vec![map["a"], map["b"]]);
        let GroupPayload::Fixed(values) = &u8s.payload else {
            panic!("u8 group should be fixed");
        };
        assert_eq!(values, &[ArchiveScalar::U8(1), ArchiveScalar::U8(2)]);

        let nulls = root.group(PropType::Null).unwrap().unwrap();
        assert_eq!(nulls.keys, vec![map["e"]]);
    }

    #[test]
    fn test_nested_object_group() {
        let record = object_record(|obj| {
            obj.prop_object_with("child", 0, |c| {
                c.prop_string("name", "inner")?;
                c.prop_u8("depth", 1)
            })
        });
        let block = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap();
        let archive = Archive::from_block(block).unwrap();
        let map = string_map(&archive);
        let root = archive.root().unwrap();

        let group = root.group(PropType::Object).unwrap().unwrap();
        assert_eq!(group.keys, vec![map["child"]]);
        let GroupPayload::Objects(offs) = &group.payload else {
            panic!("object group should hold offsets");
        };
        let child = archive.object_at(offs[0]).unwrap();
        assert_ne!(child.oid(), root.oid());
        let sid = child.string_prop(map["name"]).unwrap().unwrap();
        assert_eq!(archive.string(sid).unwrap(), "inner");
    }

    #[test]
    fn test_typed_array_groups() {
        let record = object_record(|obj| {
            obj.prop_array_with("ints", 0, |arr| {
                arr.insert_u16(10)?;
                arr.insert_u16(20)?;
                arr.insert_u16(30)
            })?;
            obj.prop_array_with("words", 0, |arr| {
                arr.insert_string("alpha")?;
                arr.insert_string("beta")
            })
        });
        let block = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap();
        let archive = Archive::from_block(block).unwrap();
        let map = string_map(&archive);
        let root = archive.root().unwrap();

        let ints = root.group(PropType::U16Array).unwrap().unwrap();
        assert_eq!(ints.keys, vec![map["ints"]]);
        let GroupPayload::Arrays(entries) = &ints.payload else {
            panic!("array group expected");
        };
        assert_eq!(entries[0].len, 3);
        assert_eq!(
            entries[0].values,
            vec![
                ArchiveScalar::U16(10),
                ArchiveScalar::U16(20),
                ArchiveScalar::U16(30)
            ]
        );

        let words = root.group(PropType::StringArray).unwrap().unwrap();
        let GroupPayload::Arrays(entries) = &words.payload else {
            panic!("array group expected");
        };
        let decoded: Vec<String> = entries[0]
            .values
            .iter()
            .map(|v| match v {
                ArchiveScalar::StringId(id) => archive.string(*id).unwrap(),
                other => panic!("unexpected value {other:?}"),
            })
            .collect();
        assert_eq!(decoded, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_object_array_becomes_column_group() {
        let record = object_record(|obj| {
            obj.prop_array_with("rows", 0, |arr| {
                arr.insert_object_with(0, |o| {
                    o.prop_u8("x", 1)?;
                    o.prop_string("tag", "first")
                })?;
                arr.insert_object_with(0, |o| {
                    o.prop_u8("x", 2)?;
                    o.prop_string("tag", "second")
                })
            })
        });
        let block = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap();
        let archive = Archive::from_block(block).unwrap();
        let map = string_map(&archive);
        let root = archive.root().unwrap();

        let group = root.group(PropType::ObjectArray).unwrap().unwrap();
        assert_eq!(group.keys, vec![map["rows"]]);
        let GroupPayload::ColumnGroups(offs) = &group.payload else {
            panic!("object-array group expected");
        };

        let (num_objects, columns) = archive.column_group_at(offs[0]).unwrap();
        assert_eq!(num_objects, 2);
        assert_eq!(columns.len(), 2);

        let x = columns.iter().find(|c| c.name == map["x"]).unwrap();
        assert_eq!(x.value_type, PropType::U8);
        assert_eq!(x.entries.len(), 2);

        let tag = columns.iter().find(|c| c.name == map["tag"]).unwrap();
        assert_eq!(tag.value_type, PropType::String);
    }

    #[test]
    fn test_is_sorted_flag_survives() {
        let options = CreateOptions::keep().with_derivation(AbstractType::SortedSet);
        let mut builder = RecordBuilder::new(RecordKey::None, options).unwrap();
        builder
            .insert_with(|ins| ins.insert_object_with(0, |obj| obj.prop_u8("k", 1)))
            .unwrap();
        let record = builder.finish().unwrap();

        let block = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap();
        let archive = Archive::from_block(block).unwrap();
        assert!(archive.is_sorted());
    }

    #[test]
    fn test_non_object_root_rejected() {
        let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
        builder.insert_with(|ins| ins.insert_u8(1)).unwrap();
        let record = builder.finish().unwrap();

        let err = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArg);
    }

    #[test]
    fn test_binary_props_rejected() {
        let record = object_record(|obj| {
            obj.prop_binary("blob", b"\x01", None, None, None)
        });
        let err = ArchiveWriter::new(PackerKind::Identity)
            .write_record(&record)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArg);
    }
}
