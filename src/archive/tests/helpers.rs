use std::collections::HashMap;

use crate::archive::Archive;
use crate::error::Result;
use crate::record::{CreateOptions, ObjectInserter, Record, RecordBuilder, RecordKey};

/// Builds a unit-array record whose single element is an object.
pub(crate) fn object_record(
    f: impl FnOnce(&mut ObjectInserter<'_>) -> Result<()>,
) -> Record {
    let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
    builder
        .insert_with(|ins| ins.insert_object_with(0, f))
        .unwrap();
    builder.finish().unwrap()
}

/// Decodes every string in the archive into a `string → id` map.
pub(crate) fn string_map(archive: &Archive) -> HashMap<String, u64> {
    archive
        .string_ids()
        .into_iter()
        .map(|id| (archive.string(id).unwrap(), id))
        .collect()
}
