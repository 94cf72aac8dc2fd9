//! Depth-first archive traversal with pruning.
//!
//! The visitor walks objects in pre-order. Every interior node offers a
//! policy hook: returning [`VisitPolicy::Exclude`] prunes the subtree
//! (an object, one property-type group, or one object-valued array).
//! A `visit_mask` of group flag bits additionally filters which group
//! types are traversed at all.
//!
//! Recursion depth is bounded by the archive's nesting, which the writer
//! bounds in turn; corrupt offsets surface as `Corrupted` errors from the
//! reader rather than unbounded recursion.

use crate::archive::reader::{
    Archive, ArchiveScalar, ArrayEntry, ColumnData, ColumnEntry, GroupPayload, ObjectCursor,
};
use crate::archive::PropType;
use crate::error::{Error, Result};

/// Whether to descend into the current subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitPolicy {
    Include,
    Exclude,
}

// ------------------------------------------------------------------------------------------------
// Visitor trait
// ------------------------------------------------------------------------------------------------

/// Callback surface of an archive walk. Every method has a default no-op
/// (or all-inclusive) implementation; implementors override what they
/// need.
#[allow(unused_variables)]
pub trait ArchiveVisitor {
    fn record_begin(&mut self) {}
    fn record_end(&mut self) {}

    fn object_begin(&mut self, oid: u64) -> VisitPolicy {
        VisitPolicy::Include
    }
    fn object_end(&mut self, oid: u64) {}

    /// Brackets one property-type group; `Exclude` skips its pair calls.
    fn first_prop_type_group(&mut self, oid: u64, prop_type: PropType) -> VisitPolicy {
        VisitPolicy::Include
    }
    fn next_prop_type_group(&mut self, oid: u64, prop_type: PropType) {}

    fn visit_null_pairs(&mut self, oid: u64, keys: &[u64]) {}
    fn visit_bool_pairs(&mut self, oid: u64, keys: &[u64], values: &[bool]) {}
    fn visit_u8_pairs(&mut self, oid: u64, keys: &[u64], values: &[u8]) {}
    fn visit_u16_pairs(&mut self, oid: u64, keys: &[u64], values: &[u16]) {}
    fn visit_u32_pairs(&mut self, oid: u64, keys: &[u64], values: &[u32]) {}
    fn visit_u64_pairs(&mut self, oid: u64, keys: &[u64], values: &[u64]) {}
    fn visit_i8_pairs(&mut self, oid: u64, keys: &[u64], values: &[i8]) {}
    fn visit_i16_pairs(&mut self, oid: u64, keys: &[u64], values: &[i16]) {}
    fn visit_i32_pairs(&mut self, oid: u64, keys: &[u64], values: &[i32]) {}
    fn visit_i64_pairs(&mut self, oid: u64, keys: &[u64], values: &[i64]) {}
    fn visit_float_pairs(&mut self, oid: u64, keys: &[u64], values: &[f32]) {}
    /// String values arrive as dictionary ids.
    fn visit_string_pairs(&mut self, oid: u64, keys: &[u64], values: &[u64]) {}

    /// Policy hook per nested-object property; `Include` recurses.
    fn visit_object_prop(&mut self, oid: u64, key: u64) -> VisitPolicy {
        VisitPolicy::Include
    }

    /// Brackets one array group.
    fn enter_array_group(&mut self, oid: u64, prop_type: PropType, keys: &[u64]) -> VisitPolicy {
        VisitPolicy::Include
    }
    fn leave_array_group(&mut self, oid: u64, prop_type: PropType) {}

    fn visit_null_array_pair(&mut self, oid: u64, key: u64, count: u32) {}
    fn visit_bool_array_pair(&mut self, oid: u64, key: u64, values: &[bool]) {}
    fn visit_u8_array_pair(&mut self, oid: u64, key: u64, values: &[u8]) {}
    fn visit_u16_array_pair(&mut self, oid: u64, key: u64, values: &[u16]) {}
    fn visit_u32_array_pair(&mut self, oid: u64, key: u64, values: &[u32]) {}
    fn visit_u64_array_pair(&mut self, oid: u64, key: u64, values: &[u64]) {}
    fn visit_i8_array_pair(&mut self, oid: u64, key: u64, values: &[i8]) {}
    fn visit_i16_array_pair(&mut self, oid: u64, key: u64, values: &[i16]) {}
    fn visit_i32_array_pair(&mut self, oid: u64, key: u64, values: &[i32]) {}
    fn visit_i64_array_pair(&mut self, oid: u64, key: u64, values: &[i64]) {}
    fn visit_float_array_pair(&mut self, oid: u64, key: u64, values: &[f32]) {}
    fn visit_string_array_pair(&mut self, oid: u64, key: u64, values: &[u64]) {}

    /// Brackets one object-valued array property (two-level protocol:
    /// the column group below, then the embedded objects' own groups).
    fn enter_object_array(&mut self, oid: u64, key: u64) -> VisitPolicy {
        VisitPolicy::Include
    }
    fn leave_object_array(&mut self, oid: u64, key: u64) {}

    fn enter_column_group(&mut self, oid: u64, key: u64, num_objects: u32) -> VisitPolicy {
        VisitPolicy::Include
    }
    /// One primitive column of an object array.
    fn visit_column(&mut self, oid: u64, key: u64, column: &ColumnData) {}
}

// ------------------------------------------------------------------------------------------------
// Driver
// ------------------------------------------------------------------------------------------------

impl Archive {
    /// Depth-first walk of the whole archive. `visit_mask` selects which
    /// property-type groups are traversed (see [`crate::archive::VISIT_ALL`]).
    pub fn visit(&self, visitor: &mut impl ArchiveVisitor, visit_mask: u32) -> Result<()> {
        visitor.record_begin();
        visit_object(self, &self.root()?, visitor, visit_mask)?;
        visitor.record_end();
        Ok(())
    }
}

macro_rules! unpack_scalars {
    ($values:expr, $variant:ident, $ty:ty) => {{
        let mut out: Vec<$ty> = Vec::with_capacity($values.len());
        for v in $values.iter() {
            match v {
                ArchiveScalar::$variant(x) => out.push(*x),
                _ => return Err(Error::corrupted("scalar group holds mixed types")),
            }
        }
        out
    }};
}

fn visit_object(
    archive: &Archive,
    cursor: &ObjectCursor<'_>,
    v: &mut impl ArchiveVisitor,
    mask: u32,
) -> Result<()> {
    let oid = cursor.oid();
    if v.object_begin(oid) == VisitPolicy::Exclude {
        return Ok(());
    }
    for pt in cursor.flags().iter_present() {
        if mask & (1 << pt.flag_bit()) == 0 {
            continue;
        }
        if v.first_prop_type_group(oid, pt) == VisitPolicy::Exclude {
            v.next_prop_type_group(oid, pt);
            continue;
        }
        let Some(group) = cursor.group(pt)? else {
            continue;
        };
        match &group.payload {
            GroupPayload::Keys => v.visit_null_pairs(oid, &group.keys),
            GroupPayload::Fixed(values) => {
                dispatch_fixed(oid, pt, &group.keys, values, v)?;
            }
            GroupPayload::Objects(offs) => {
                for (key, off) in group.keys.iter().zip(offs) {
                    if v.visit_object_prop(oid, *key) == VisitPolicy::Include {
                        visit_object(archive, &archive.object_at(*off)?, v, mask)?;
                    }
                }
            }
            GroupPayload::Arrays(entries) => {
                if v.enter_array_group(oid, pt, &group.keys) == VisitPolicy::Include {
                    for (key, entry) in group.keys.iter().zip(entries) {
                        dispatch_array(oid, pt, *key, entry, v)?;
                    }
                }
                v.leave_array_group(oid, pt);
            }
            GroupPayload::ColumnGroups(offs) => {
                for (key, off) in group.keys.iter().zip(offs) {
                    if v.enter_object_array(oid, *key) == VisitPolicy::Exclude {
                        v.leave_object_array(oid, *key);
                        continue;
                    }
                    let (num_objects, columns) = archive.column_group_at(*off)?;
                    if v.enter_column_group(oid, *key, num_objects) == VisitPolicy::Include {
                        for column in &columns {
                            if column.value_type == PropType::Object {
                                for entry in &column.entries {
                                    let ColumnEntry::Objects(obj_offs) = entry else {
                                        continue;
                                    };
                                    for obj_off in obj_offs {
                                        visit_object(
                                            archive,
                                            &archive.object_at(*obj_off)?,
                                            v,
                                            mask,
                                        )?;
                                    }
                                }
                            } else {
                                v.visit_column(oid, *key, column);
                            }
                        }
                    }
                    v.leave_object_array(oid, *key);
                }
            }
        }
        v.next_prop_type_group(oid, pt);
    }
    v.object_end(oid);
    Ok(())
}

fn dispatch_fixed(
    oid: u64,
    pt: PropType,
    keys: &[u64],
    values: &[ArchiveScalar],
    v: &mut impl ArchiveVisitor,
) -> Result<()> {
    match pt {
        PropType::Bool => v.visit_bool_pairs(oid, keys, &unpack_scalars!(values, Bool, bool)),
        PropType::U8 => v.visit_u8_pairs(oid, keys, &unpack_scalars!(values, U8, u8)),
        PropType::U16 => v.visit_u16_pairs(oid, keys, &unpack_scalars!(values, U16, u16)),
        PropType::U32 => v.visit_u32_pairs(oid, keys, &unpack_scalars!(values, U32, u32)),
        PropType::U64 => v.visit_u64_pairs(oid, keys, &unpack_scalars!(values, U64, u64)),
        PropType::I8 => v.visit_i8_pairs(oid, keys, &unpack_scalars!(values, I8, i8)),
        PropType::I16 => v.visit_i16_pairs(oid, keys, &unpack_scalars!(values, I16, i16)),
        PropType::I32 => v.visit_i32_pairs(oid, keys, &unpack_scalars!(values, I32, i32)),
        PropType::I64 => v.visit_i64_pairs(oid, keys, &unpack_scalars!(values, I64, i64)),
        PropType::Float => v.visit_float_pairs(oid, keys, &unpack_scalars!(values, Float, f32)),
        PropType::String => {
            v.visit_string_pairs(oid, keys, &unpack_scalars!(values, StringId, u64))
        }
        other => {
            return Err(Error::internal(format!(
                "{other:?} is not a fixed scalar group"
            )));
        }
    }
    Ok(())
}

fn dispatch_array(
    oid: u64,
    pt: PropType,
    key: u64,
    entry: &ArrayEntry,
    v: &mut impl ArchiveVisitor,
) -> Result<()> {
    let values = &entry.values;
    match pt {
        PropType::NullArray => v.visit_null_array_pair(oid, key, entry.len),
        PropType::BoolArray => {
            v.visit_bool_array_pair(oid, key, &unpack_scalars!(values, Bool, bool))
        }
        PropType::U8Array => v.visit_u8_array_pair(oid, key, &unpack_scalars!(values, U8, u8)),
        PropType::U16Array => v.visit_u16_array_pair(oid, key, &unpack_scalars!(values, U16, u16)),
        PropType::U32Array => v.visit_u32_array_pair(oid, key, &unpack_scalars!(values, U32, u32)),
        PropType::U64Array => v.visit_u64_array_pair(oid, key, &unpack_scalars!(values, U64, u64)),
        PropType::I8Array => v.visit_i8_array_pair(oid, key, &unpack_scalars!(values, I8, i8)),
        PropType::I16Array => v.visit_i16_array_pair(oid, key, &unpack_scalars!(values, I16, i16)),
        PropType::I32Array => v.visit_i32_array_pair(oid, key, &unpack_scalars!(values, I32, i32)),
        PropType::I64Array => v.visit_i64_array_pair(oid, key, &unpack_scalars!(values, I64, i64)),
        PropType::FloatArray => {
            v.visit_float_array_pair(oid, key, &unpack_scalars!(values, Float, f32))
        }
        PropType::StringArray => {
            v.visit_string_array_pair(oid, key, &unpack_scalars!(values, StringId, u64))
        }
        other => {
            return Err(Error::internal(format!("{other:?} is not an array group")));
        }
    }
    Ok(())
}
