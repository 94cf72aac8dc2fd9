//! End-to-end scenarios across the record engine, printers, dictionary,
//! packers, and archive layer.

use carbonrec::archive::{Archive, ArchiveWriter};
use carbonrec::pack::PackerKind;
use carbonrec::record::{
    AbstractType, ColumnType, CreateOptions, FieldType, Record, RecordBuilder, RecordKey,
};
use carbonrec::strdict::StringDict;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::fmt::Subscriber;

fn init_tracing() {
    let _ = Subscriber::builder()
        .with_max_level(Level::TRACE)
        .try_init();
}

#[test]
fn test_empty_nokey_record_defaults() {
    init_tracing();

    let record = Record::create_empty(AbstractType::UnsortedMultiset, RecordKey::None).unwrap();
    let it = record.iter().unwrap();
    assert!(it.is_multiset());
    assert!(!it.is_sorted());
    assert_eq!(record.to_json_compact().unwrap(), "[]");
}

#[test]
fn test_sorted_set_record_keeps_insert_order() {
    init_tracing();

    let options = CreateOptions::keep().with_derivation(AbstractType::SortedSet);
    let mut builder = RecordBuilder::new(RecordKey::None, options).unwrap();
    builder
        .insert_with(|ins| {
            ins.insert_u8(3)?;
            ins.insert_u8(1)?;
            ins.insert_u8(2)
        })
        .unwrap();
    let record = builder.finish().unwrap();

    let it = record.iter().unwrap();
    assert!(!it.is_multiset());
    assert!(it.is_sorted());
    assert_eq!(record.to_json_compact().unwrap(), "[3, 1, 2]");
}

#[test]
fn test_find_and_retag_heterogeneous_array() {
    init_tracing();

    // { "x": [ { "y": [1, "b", 3] } ] }
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
    let mut record = builder.finish().unwrap();

    let find = record.find("x.0.y").unwrap().unwrap();
    let mut arr = find.result_array().unwrap();
    let mut types = Vec::new();
    while arr.next().unwrap() {
        types.push(arr.field_type().unwrap());
    }
    assert_eq!(types, vec![FieldType::U8, FieldType::String, FieldType::U8]);
    drop(arr);
    drop(find);

    record
        .patch_begin()
        .unwrap()
        .find_update_array_type("x.0.y", AbstractType::SortedSet)
        .unwrap();

    let arr = record
        .find("x.0.y")
        .unwrap()
        .unwrap()
        .result_array()
        .unwrap();
    assert!(!arr.is_multiset());
    assert!(arr.is_sorted());
}

#[test]
fn test_find_and_retag_column() {
    init_tracing();

    // { "x": [ { "y": [1, 2, 3] } ] } with y compacted into a column.
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
    let mut record = builder.finish().unwrap();

    let find = record.find("x.0.y").unwrap().unwrap();
    assert_eq!(find.result_type().unwrap(), FieldType::Column);
    let col = find.result_column().unwrap();
    assert_eq!(col.length(), 3);
    drop(col);
    drop(find);

    record
        .patch_begin()
        .unwrap()
        .find_update_column_type("x.0.y", AbstractType::SortedMultiset)
        .unwrap();

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
fn test_dictionary_id_reuse() {
    init_tracing();

    let dict = StringDict::with_capacity(8);
    let ids = dict.insert(&["alpha", "beta", "alpha", "gamma"]);
    assert_eq!(ids[0], ids[2]);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[3]);
    assert_eq!(dict.num_distinct(), 3);

    dict.remove(&[ids[1]]).unwrap();
    let again = dict.insert(&["beta"]);
    assert_eq!(again[0], ids[1]);
}

#[test]
fn test_huffman_archive_of_ten_thousand_fields() {
    init_tracing();

    let keys: Vec<String> = (0..10_000).map(|i| format!("field-{i}")).collect();
    let values: Vec<String> = (0..10_000).map(|i| format!("value-{i}-payload")).collect();

    let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
    builder
        .insert_with(|ins| {
            ins.insert_object_with(0, |obj| {
                for (k, v) in keys.iter().zip(&values) {
                    obj.prop_string(k, v)?;
                }
                Ok(())
            })
        })
        .unwrap();
    let record = builder.finish().unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bulk.carbon-archive");
    ArchiveWriter::new(PackerKind::Huffman)
        .write_record_to_file(&record, &path)
        .unwrap();

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.num_strings(), 20_000);

    // Decode the whole string table once, read the string property group
    // once, then check every property maps back to its original value.
    let mut by_string = std::collections::HashMap::new();
    for id in archive.string_ids() {
        by_string.insert(archive.string(id).unwrap(), id);
    }
    let root = archive.root().unwrap();
    let group = root
        .group(carbonrec::archive::PropType::String)
        .unwrap()
        .unwrap();
    let carbonrec::archive::GroupPayload::Fixed(group_values) = &group.payload else {
        panic!("string group should be fixed-size");
    };
    let props: std::collections::HashMap<u64, u64> = group
        .keys
        .iter()
        .zip(group_values)
        .map(|(k, v)| match v {
            carbonrec::archive::ArchiveScalar::StringId(sid) => (*k, *sid),
            other => panic!("unexpected value {other:?}"),
        })
        .collect();
    assert_eq!(props.len(), 10_000);

    for (k, v) in keys.iter().zip(&values) {
        let key_id = by_string[k];
        let value_id = props[&key_id];
        assert_eq!(archive.string(value_id).unwrap(), *v);
    }
}

#[test]
fn test_record_persists_verbatim() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("doc.carbon");

    let mut builder = RecordBuilder::new(RecordKey::Auto, CreateOptions::optimize()).unwrap();
    builder
        .insert_with(|ins| {
            ins.insert_object_with(0, |obj| {
                obj.prop_string("title", "persistence")?;
                obj.prop_u64("bytes", 4096)
            })
        })
        .unwrap();
    let record = builder.finish().unwrap();
    record.save_to_file(&path).unwrap();

    let restored = Record::from_file(&path).unwrap();
    assert_eq!(restored.raw_data(), record.raw_data());
    assert_eq!(restored.commit_hash(), record.commit_hash());
    assert_eq!(
        restored.to_json_compact().unwrap(),
        record.to_json_compact().unwrap()
    );
}

#[test]
fn test_revision_pipeline() {
    init_tracing();

    let mut builder = RecordBuilder::new(RecordKey::Unsigned(1), CreateOptions::keep()).unwrap();
    builder
        .insert_with(|ins| ins.insert_object_with(0, |obj| obj.prop_u8("version", 1)))
        .unwrap();
    let mut v1 = builder.finish().unwrap();
    let h1 = v1.commit_hash();

    let mut revise = v1.revise_begin().unwrap();
    {
        let mut it = revise.iterator().unwrap();
        it.fast_forward().unwrap();
        it.insert_with(|ins| ins.insert_string("appended")).unwrap();
    }
    let v2 = revise.revise_end().unwrap();

    assert_ne!(v2.commit_hash(), h1);
    assert_eq!(v1.commit_hash(), h1);
    assert!(!v1.is_latest());
    assert_eq!(
        v2.to_json_compact().unwrap(),
        r#"[{"version": 1}, "appended"]"#
    );
    assert_eq!(v1.to_json_compact().unwrap(), r#"{"version": 1}"#);
}
