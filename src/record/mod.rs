//! Binary Record Engine Module
//!
//! A *record* is a self-contained binary document: a key header, an
//! outer array-shaped container of typed fields, and optional tail free
//! space. Records are byte-addressable — the in-memory form **is** the
//! serialized form — and are edited through copy-on-write *revisions*
//! identified by a commit hash, or through in-place *patches*.
//!
//! ## Design Invariants
//!
//! - Every container begins with its derived abstract-type marker and,
//!   for arrays and objects, ends with its end marker; columns are
//!   length-delimited.
//! - Empty slots inside containers are zero bytes and are skipped on read.
//! - Insert order is preserved in the byte stream; the abstract-type
//!   annotation is metadata and never enforced.
//! - The commit hash changes exactly when a revision closes; patches leave
//!   it untouched.
//!
//! ## Concurrency
//!
//! A finished record may be read from many threads at once (shared
//! borrows). All mutation goes through `&mut self` contexts, which is the
//! single-writer discipline enforced at compile time.
//!
//! ## Sub-modules
//!
//! - [`marker`] — marker bytes, key kinds, abstract and field types
//! - [`array_it`] / [`object_it`] / [`column_it`] — container iterators
//! - [`insert`] — typed field inserters
//! - [`dot`] — dot-path parsing
//! - [`find`] — path evaluation over records

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod array_it;
pub mod column_it;
pub mod dot;
pub(crate) mod field;
pub mod find;
pub mod insert;
pub mod marker;
pub mod object_it;

#[cfg(test)]
mod tests;

pub use array_it::ArrayIt;
pub use column_it::{ColumnIt, ColumnValue};
pub use dot::DotPath;
pub use field::BinaryValue;
pub use find::Find;
pub use insert::{Inserter, ObjectInserter};
pub use marker::{AbstractType, ColumnType, ContainerShape, FieldType, KeyKind};
pub use object_it::ObjectIt;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fs::File;
use std::hash::Hasher;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use seahash::SeaHasher;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mem::{AccessMode, MemBlock, MemFile};
use crate::record::field::{container_annotation, varuint_at};
use crate::record::marker::{ContainerShape as Shape, EMPTY_SLOT};

/// Default tail capacity a fresh record block reserves.
const DEFAULT_BLOCK_CAPACITY: usize = 1024;

/// Deepest container nesting the compaction walk will follow.
const MAX_NESTING_DEPTH: usize = 256;

// ------------------------------------------------------------------------------------------------
// Keys
// ------------------------------------------------------------------------------------------------

/// Key given at record creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey<'k> {
    /// No key, no commit hash.
    None,
    /// Auto-generated unsigned key.
    Auto,
    /// User-provided unsigned key.
    Unsigned(u64),
    /// User-provided signed key.
    Signed(i64),
    /// User-provided string key.
    Str(&'k str),
}

impl RecordKey<'_> {
    fn kind(&self) -> KeyKind {
        match self {
            RecordKey::None => KeyKind::NoKey,
            RecordKey::Auto => KeyKind::AutoKey,
            RecordKey::Unsigned(_) => KeyKind::UKey,
            RecordKey::Signed(_) => KeyKind::IKey,
            RecordKey::Str(_) => KeyKind::SKey,
        }
    }
}

/// Generates a process-unique unsigned key for `RecordKey::Auto`.
fn generate_auto_key() -> u64 {
    static SEED: OnceLock<u64> = OnceLock::new();
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seed = *SEED.get_or_init(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });
    seed.wrapping_add(COUNTER.fetch_add(1, Ordering::Relaxed))
}

// ------------------------------------------------------------------------------------------------
// Header parsing
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct HeaderInfo {
    pub kind: KeyKind,
    /// Offset of the commit hash field; `None` for keyless records.
    pub hash_off: Option<usize>,
    /// Offset of the outer container's derived marker.
    pub payload_off: usize,
}

fn parse_header(file: &MemFile<'_>) -> Result<HeaderInfo> {
    let kind = KeyKind::from_marker(file.slice_at(0, 1)?[0])?;
    let mut off = 1;
    match kind {
        KeyKind::NoKey => {}
        KeyKind::AutoKey | KeyKind::UKey | KeyKind::IKey => off += 8,
        KeyKind::SKey => {
            let (len, n) = varuint_at(file, off)?;
            off += n + len as usize;
        }
    }
    let hash_off = kind.has_hash().then_some(off);
    if kind.has_hash() {
        off += 8;
    }
    Ok(HeaderInfo {
        kind,
        hash_off,
        payload_off: off,
    })
}

// ------------------------------------------------------------------------------------------------
// Record
// ------------------------------------------------------------------------------------------------

/// A binary record. See the module docs for the layout.
#[derive(Debug, Clone)]
pub struct Record {
    block: MemBlock,
    is_latest: bool,
    commit_lock: bool,
}

impl Record {
    /// Creates an empty record with default capacities.
    pub fn create_empty(derivation: AbstractType, key: RecordKey<'_>) -> Result<Self> {
        Self::create_empty_ex(derivation, key, DEFAULT_BLOCK_CAPACITY, 0)
    }

    /// Creates an empty record with explicit block and outer-array
    /// capacities.
    pub fn create_empty_ex(
        derivation: AbstractType,
        key: RecordKey<'_>,
        block_capacity: usize,
        array_capacity: usize,
    ) -> Result<Self> {
        let mut block = MemBlock::with_capacity(block_capacity);
        {
            let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
            file.write(&[key.kind().marker()])?;
            match key {
                RecordKey::None => {}
                RecordKey::Auto => file.write_u64(generate_auto_key())?,
                RecordKey::Unsigned(v) => file.write_u64(v)?,
                RecordKey::Signed(v) => file.write_i64(v)?,
                RecordKey::Str(s) => {
                    file.write_varuint(s.len() as u64)?;
                    file.write(s.as_bytes())?;
                }
            }
            if key.kind().has_hash() {
                file.write_u64(0)?;
            }
            file.write(&[derivation.marker(Shape::Array)])?;
            file.write_zero(array_capacity)?;
            file.write(&[marker::ARRAY_END])?;
        }
        let mut record = Self {
            block,
            is_latest: true,
            commit_lock: false,
        };
        record.chain_hash(0)?;
        Ok(record)
    }

    /// Adopts a serialized record verbatim, validating the header and
    /// outer container marker.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let block = MemBlock::from_bytes(bytes);
        let file = MemFile::open_read(&block);
        let header = parse_header(&file)?;
        container_annotation(&file, header.payload_off, Shape::Array)?;
        drop(file);
        Ok(Self {
            block,
            is_latest: true,
            commit_lock: false,
        })
    }

    /// Loads a record file written by [`save_to_file`](Self::save_to_file).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut f = File::open(path.as_ref()).map_err(Error::fread)?;
        let nbytes = f
            .metadata()
            .map_err(Error::fread)?
            .len() as usize;
        let block = MemBlock::from_reader(&mut f, nbytes)?;
        Self::from_bytes(block.raw_data())
    }

    /// Writes the record's bytes verbatim.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut f = File::create(path.as_ref()).map_err(Error::fwrite)?;
        self.block.write_to(&mut f)
    }

    /// The serialized record bytes.
    pub fn raw_data(&self) -> &[u8] {
        self.block.raw_data()
    }

    // --------------------------------------------------------------------------------------------
    // Key and versioning accessors
    // --------------------------------------------------------------------------------------------

    pub(crate) fn header(&self) -> Result<HeaderInfo> {
        parse_header(&MemFile::open_read(&self.block))
    }

    pub(crate) fn read_file(&self) -> MemFile<'_> {
        MemFile::open_read(&self.block)
    }

    /// The record's key kind.
    pub fn key_kind(&self) -> Result<KeyKind> {
        Ok(self.header()?.kind)
    }

    /// Whether the record carries any key.
    pub fn has_key(&self) -> Result<bool> {
        Ok(self.key_kind()? != KeyKind::NoKey)
    }

    /// Unsigned key value (auto or user keys).
    pub fn key_unsigned(&self) -> Result<u64> {
        let header = self.header()?;
        if !header.kind.is_unsigned() {
            return Err(Error::type_mismatch(format!(
                "record key is {:?}, accessed as unsigned",
                header.kind
            )));
        }
        let file = self.read_file();
        let b = file.slice_at(1, 8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Signed key value.
    pub fn key_signed(&self) -> Result<i64> {
        let header = self.header()?;
        if !header.kind.is_signed() {
            return Err(Error::type_mismatch(format!(
                "record key is {:?}, accessed as signed",
                header.kind
            )));
        }
        let file = self.read_file();
        let b = file.slice_at(1, 8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// String key value, borrowed from the record.
    pub fn key_string(&self) -> Result<&str> {
        let header = self.header()?;
        if !header.kind.is_string() {
            return Err(Error::type_mismatch(format!(
                "record key is {:?}, accessed as string",
                header.kind
            )));
        }
        let file = self.read_file();
        let (len, n) = varuint_at(&file, 1)?;
        let bytes = self.block.raw_data();
        let start = 1 + n;
        std::str::from_utf8(&bytes[start..start + len as usize])
            .map_err(|_| Error::corrupted("string key is not valid UTF-8"))
    }

    /// The current commit hash; 0 for keyless records.
    pub fn commit_hash(&self) -> u64 {
        let Ok(header) = self.header() else { return 0 };
        let Some(off) = header.hash_off else { return 0 };
        let bytes = self.block.raw_data();
        let b = &bytes[off..off + 8];
        u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    /// Whether no newer revision has been derived from this record.
    pub fn is_latest(&self) -> bool {
        self.is_latest
    }

    /// Blocks further revisions until released.
    pub fn set_commit_lock(&mut self, locked: bool) {
        self.commit_lock = locked;
    }

    // --------------------------------------------------------------------------------------------
    // Iteration and printing
    // --------------------------------------------------------------------------------------------

    /// Read-only iterator over the outer container.
    pub fn iter(&self) -> Result<ArrayIt<'_>> {
        let header = self.header()?;
        let mut file = MemFile::open_read(&self.block);
        file.seek(header.payload_off)?;
        ArrayIt::open_at(file, header.payload_off)
    }

    /// Renders the record as plain JSON.
    pub fn to_json_compact(&self) -> Result<String> {
        crate::printer::to_string(self, &mut crate::printer::JsonCompact::default())
    }

    /// Renders the record as JSON with a `meta` header (key, commit hash).
    pub fn to_json_extended(&self) -> Result<String> {
        crate::printer::to_string(self, &mut crate::printer::JsonExtended::default())
    }

    /// Hex/ASCII dump of the record bytes, 16 per row.
    pub fn hexdump(&self) -> String {
        let bytes = self.raw_data();
        let mut out = String::new();
        for (row, chunk) in bytes.chunks(16).enumerate() {
            out.push_str(&format!("{:08x}  ", row * 16));
            for i in 0..16 {
                match chunk.get(i) {
                    Some(b) => out.push_str(&format!("{b:02x} ")),
                    None => out.push_str("   "),
                }
            }
            out.push(' ');
            for &b in chunk {
                out.push(if (0x20..0x7F).contains(&b) { b as char } else { '.' });
            }
            out.push('\n');
        }
        out
    }

    // --------------------------------------------------------------------------------------------
    // Revision and patching
    // --------------------------------------------------------------------------------------------

    /// Opens a copy-on-write revision context. The original stays valid
    /// and unchanged until [`ReviseContext::revise_end`] succeeds.
    pub fn revise_begin(&mut self) -> Result<ReviseContext<'_>> {
        if self.commit_lock {
            return Err(Error::illegal_state("record is commit-locked"));
        }
        let revised = self.clone();
        Ok(ReviseContext {
            original: self,
            revised: Some(revised),
        })
    }

    /// Opens an in-place patch context; the commit hash is untouched.
    pub fn patch_begin(&mut self) -> Result<PatchContext<'_>> {
        Ok(PatchContext { record: self })
    }

    // --------------------------------------------------------------------------------------------
    // Internals
    // --------------------------------------------------------------------------------------------

    /// Replaces the commit hash with `H(prev_hash ‖ body)`, so a revision
    /// always gets a new hash even when the body is unchanged.
    fn chain_hash(&mut self, prev: u64) -> Result<()> {
        let header = self.header()?;
        let Some(hash_off) = header.hash_off else {
            return Ok(());
        };
        let body_start = header.payload_off;
        let hash = {
            let bytes = self.block.raw_data();
            let mut hasher = SeaHasher::new();
            hasher.write_u64(prev);
            hasher.write(&bytes[body_start..]);
            hasher.finish()
        };
        self.block.write(hash_off, &hash.to_le_bytes());
        debug!(hash, "record commit hash updated");
        Ok(())
    }

    /// Removes reserved capacities from every container.
    fn compact(&mut self) -> Result<()> {
        let header = self.header()?;
        let payload_off = header.payload_off;
        let mut file = MemFile::open(&mut self.block, AccessMode::ReadWrite);
        compact_container(&mut file, payload_off, 0)
    }
}

// ------------------------------------------------------------------------------------------------
// Compaction
// ------------------------------------------------------------------------------------------------

fn compact_container(file: &mut MemFile<'_>, off: usize, depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::corrupted("container nesting too deep"));
    }
    let marker = file.slice_at(off, 1)?[0];
    let Some((shape, _)) = AbstractType::classify(marker) else {
        return Err(Error::marker_mapping(marker));
    };
    match shape {
        Shape::Column => {
            let (cap, cap_w) = varuint_at(file, off + 2)?;
            let (len, len_w) = varuint_at(file, off + 2 + cap_w)?;
            if cap == len {
                return Ok(());
            }
            let elem = ColumnType::from_marker(file.slice_at(off + 1, 1)?[0])?;
            let esz = elem.element_size();
            let values_off = off + 2 + cap_w + len_w;
            file.seek(values_off + len as usize * esz)?;
            file.move_left((cap - len) as usize * esz)?;
            file.seek(off + 2)?;
            file.rewrite_varuint(len)?;
            Ok(())
        }
        Shape::Array | Shape::Object => {
            let end_marker = if shape == Shape::Array {
                marker::ARRAY_END
            } else {
                marker::OBJECT_END
            };
            let mut pos = off + 1;
            loop {
                // Drop any run of empty slots.
                let mut zeros = 0;
                while file.slice_at(pos + zeros, 1)?[0] == EMPTY_SLOT {
                    zeros += 1;
                }
                if zeros > 0 {
                    file.seek(pos)?;
                    file.move_left(zeros)?;
                }
                let byte = file.slice_at(pos, 1)?[0];
                if byte == end_marker {
                    return Ok(());
                }
                let value_off = if shape == Shape::Object {
                    let (key_len, n) = varuint_at(file, pos)?;
                    pos + n + key_len as usize
                } else {
                    pos
                };
                let ty = FieldType::from_marker(file.slice_at(value_off, 1)?[0])?;
                if matches!(ty, FieldType::Array | FieldType::Object | FieldType::Column) {
                    compact_container(file, value_off, depth + 1)?;
                }
                pos = value_off + field::field_span(file, value_off)?;
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Creation options and builder
// ------------------------------------------------------------------------------------------------

/// Options applied when a record build or revision closes.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    /// Remove tail free space after the record.
    pub shrink: bool,
    /// Remove reserved capacities inside containers.
    pub compact: bool,
    /// Abstract-type annotation of the outer array.
    pub derivation: AbstractType,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self::keep()
    }
}

impl CreateOptions {
    /// Keep capacities and tail free space (insertion-friendly).
    pub fn keep() -> Self {
        Self {
            shrink: false,
            compact: false,
            derivation: AbstractType::UnsortedMultiset,
        }
    }

    /// Shrink and compact (read-mostly documents).
    pub fn optimize() -> Self {
        Self {
            shrink: true,
            compact: true,
            derivation: AbstractType::UnsortedMultiset,
        }
    }

    /// Replaces the outer-array annotation.
    pub fn with_derivation(mut self, derivation: AbstractType) -> Self {
        self.derivation = derivation;
        self
    }
}

/// Builder for a fresh record: create, insert, freeze.
pub struct RecordBuilder {
    record: Record,
    options: CreateOptions,
}

impl RecordBuilder {
    /// Opens a build context for a new record.
    pub fn new(key: RecordKey<'_>, options: CreateOptions) -> Result<Self> {
        let record = Record::create_empty(options.derivation, key)?;
        Ok(Self { record, options })
    }

    /// Runs `f` with an inserter appending to the outer container.
    pub fn insert_with<R>(&mut self, f: impl FnOnce(&mut Inserter<'_>) -> Result<R>) -> Result<R> {
        let header = self.record.header()?;
        let mut file = MemFile::open(&mut self.record.block, AccessMode::ReadWrite);
        file.seek(header.payload_off)?;
        let mut it = ArrayIt::open_at(file, header.payload_off)?;
        it.fast_forward()?;
        it.insert_with(f)
    }

    /// Freezes the record: applies the shrink/compact options and commits
    /// the initial revision hash.
    pub fn finish(mut self) -> Result<Record> {
        if self.options.compact {
            self.record.compact()?;
        }
        if self.options.shrink {
            self.record.block.shrink();
        }
        let prev = self.record.commit_hash();
        self.record.chain_hash(prev)?;
        Ok(self.record)
    }
}

// ------------------------------------------------------------------------------------------------
// Revision context
// ------------------------------------------------------------------------------------------------

/// Copy-on-write revision over a record.
pub struct ReviseContext<'a> {
    original: &'a mut Record,
    revised: Option<Record>,
}

impl ReviseContext<'_> {
    fn revised_mut(&mut self) -> Result<&mut Record> {
        self.revised
            .as_mut()
            .ok_or_else(|| Error::illegal_state("revision already closed"))
    }

    /// Read-write iterator over the revised copy's outer container.
    pub fn iterator(&mut self) -> Result<ArrayIt<'_>> {
        let record = self.revised_mut()?;
        let header = record.header()?;
        let mut file = MemFile::open(&mut record.block, AccessMode::ReadWrite);
        file.seek(header.payload_off)?;
        ArrayIt::open_at(file, header.payload_off)
    }

    /// Rewrites the abstract-type annotation of the array at `path`.
    pub fn find_update_array_type(&mut self, path: &str, annotation: AbstractType) -> Result<()> {
        find::update_abstract_type(self.revised_mut()?, path, Shape::Array, annotation)
    }

    /// Rewrites the abstract-type annotation of the column at `path`.
    pub fn find_update_column_type(&mut self, path: &str, annotation: AbstractType) -> Result<()> {
        find::update_abstract_type(self.revised_mut()?, path, Shape::Column, annotation)
    }

    /// Closes the revision: chains a fresh commit hash onto the revised
    /// copy and returns it. The original is marked superseded.
    pub fn revise_end(mut self) -> Result<Record> {
        let mut revised = self
            .revised
            .take()
            .ok_or_else(|| Error::illegal_state("revision already closed"))?;
        let prev = self.original.commit_hash();
        revised.chain_hash(prev)?;
        self.original.is_latest = false;
        revised.is_latest = true;
        Ok(revised)
    }
}

// ------------------------------------------------------------------------------------------------
// Patch context
// ------------------------------------------------------------------------------------------------

/// In-place edit over a record; the commit hash stays unchanged.
pub struct PatchContext<'a> {
    record: &'a mut Record,
}

impl PatchContext<'_> {
    /// Read-write iterator over the record's outer container.
    pub fn iterator(&mut self) -> Result<ArrayIt<'_>> {
        let header = self.record.header()?;
        let mut file = MemFile::open(&mut self.record.block, AccessMode::ReadWrite);
        file.seek(header.payload_off)?;
        ArrayIt::open_at(file, header.payload_off)
    }

    /// Rewrites the abstract-type annotation of the array at `path`.
    pub fn find_update_array_type(&mut self, path: &str, annotation: AbstractType) -> Result<()> {
        find::update_abstract_type(self.record, path, Shape::Array, annotation)
    }

    /// Rewrites the abstract-type annotation of the column at `path`.
    pub fn find_update_column_type(&mut self, path: &str, annotation: AbstractType) -> Result<()> {
        find::update_abstract_type(self.record, path, Shape::Column, annotation)
    }
}
