//! String Dictionary Module
//!
//! A thread-safe, content-addressed map between strings and stable integer
//! ids. The dictionary backs both the record engine (binary field keys are
//! resolved against it by the archive writer) and the archive's embedded
//! string table.
//!
//! ## Design Invariants
//!
//! - An id is unique among live strings; inserting an already-present string
//!   returns its existing id.
//! - Removed ids go onto a free-list and are reissued in LIFO order, so an
//!   id is stable only for the lifetime of its string.
//! - The content vector and free-list grow in lock-step, geometrically.
//! - A single spinlock guards the content vector, the free-list, and the
//!   hash index; every public operation holds it for the full call.
//!
//! ## Concurrency
//!
//! Readers and writers are mutually exclusive. Critical sections are short
//! (hash probes, vector pushes); see [`spinlock`] for the backoff strategy.
//! Bulk operations amortize one acquisition over the whole input slice.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod spinlock;

#[cfg(test)]
mod tests;

pub use spinlock::{SpinGuard, SpinLock};

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};

/// Stable handle to a live dictionary string.
pub type StringId = u64;

/// Sentinel id returned by [`StringDict::locate_fast`] for absent keys.
pub const NULL_STRING_ID: StringId = u64::MAX;

// ------------------------------------------------------------------------------------------------
// Statistics
// ------------------------------------------------------------------------------------------------

/// Resettable index statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DictCounters {
    /// Index probes that found their key.
    pub hits: u64,
    /// Index probes that missed.
    pub misses: u64,
}

// ------------------------------------------------------------------------------------------------
// Interior
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Slot {
    /// `None` marks a slot whose id sits on the free-list.
    bytes: Option<Box<str>>,
}

struct DictInner {
    slots: Vec<Slot>,
    /// Freed ids, reissued LIFO.
    free: Vec<StringId>,
    index: HashMap<String, StringId>,
    counters: DictCounters,
}

impl DictInner {
    fn pop_free_id(&mut self) -> StringId {
        if let Some(id) = self.free.pop() {
            return id;
        }
        // Grow content vector and free-list in lock-step.
        let old = self.slots.len();
        let new = (old * 2).max(64);
        trace!(old, new, "string dictionary grow");
        self.slots.resize_with(new, Slot::default);
        self.free.extend(((old as u64 + 1)..new as u64).rev());
        old as StringId
    }
}

// ------------------------------------------------------------------------------------------------
// StringDict
// ------------------------------------------------------------------------------------------------

/// Thread-safe string↔id dictionary with reusable id slots.
pub struct StringDict {
    inner: SpinLock<DictInner>,
}

impl StringDict {
    /// Creates a dictionary with `capacity` pre-allocated id slots and a
    /// hash index sized for `num_buckets * bucket_capacity` entries.
    ///
    /// `nthreads` is accepted for API compatibility with bulk-encoding
    /// callers; all operations currently run under the single lock.
    pub fn create(
        capacity: usize,
        num_buckets: usize,
        bucket_capacity: usize,
        nthreads: usize,
    ) -> Self {
        let _ = nthreads;
        let mut slots = Vec::new();
        slots.resize_with(capacity, Slot::default);
        Self {
            inner: SpinLock::new(DictInner {
                slots,
                free: (0..capacity as u64).rev().collect(),
                index: HashMap::with_capacity(num_buckets * bucket_capacity),
                counters: DictCounters::default(),
            }),
        }
    }

    /// Creates a dictionary with default index sizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::create(capacity, capacity.max(16), 1, 1)
    }

    /// Inserts each string, returning one id per input in order.
    ///
    /// Strings already present (including duplicates within the same call)
    /// share their existing id.
    pub fn insert(&self, strings: &[&str]) -> Vec<StringId> {
        let mut inner = self.inner.lock();
        let mut ids = Vec::with_capacity(strings.len());
        for &s in strings {
            if let Some(&id) = inner.index.get(s) {
                inner.counters.hits += 1;
                ids.push(id);
                continue;
            }
            inner.counters.misses += 1;
            let id = inner.pop_free_id();
            inner.slots[id as usize].bytes = Some(Box::from(s));
            inner.index.insert(s.to_owned(), id);
            ids.push(id);
        }
        ids
    }

    /// Looks up each key, tolerating absent keys.
    ///
    /// Returns `(ids, found_mask, num_not_found)`; where the mask is false
    /// the id slot holds [`NULL_STRING_ID`].
    pub fn locate_safe(&self, keys: &[&str]) -> (Vec<StringId>, Vec<bool>, usize) {
        let mut inner = self.inner.lock();
        let mut ids = Vec::with_capacity(keys.len());
        let mut mask = Vec::with_capacity(keys.len());
        let mut not_found = 0;
        for &k in keys {
            match inner.index.get(k) {
                Some(&id) => {
                    inner.counters.hits += 1;
                    ids.push(id);
                    mask.push(true);
                }
                None => {
                    inner.counters.misses += 1;
                    ids.push(NULL_STRING_ID);
                    mask.push(false);
                    not_found += 1;
                }
            }
        }
        (ids, mask, not_found)
    }

    /// Looks up keys that the caller guarantees are present. Absent keys
    /// yield [`NULL_STRING_ID`] without further diagnostics.
    pub fn locate_fast(&self, keys: &[&str]) -> Vec<StringId> {
        let (ids, _, _) = self.locate_safe(keys);
        ids
    }

    /// Returns an owned copy of the string stored under each id.
    pub fn extract(&self, ids: &[StringId]) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            let slot = inner
                .slots
                .get(id as usize)
                .and_then(|s| s.bytes.as_deref())
                .ok_or_else(|| Error::illegal_arg(format!("string id {id} is not live")))?;
            out.push(slot.to_owned());
        }
        Ok(out)
    }

    /// Removes each id, returning its slot to the free-list.
    pub fn remove(&self, ids: &[StringId]) -> Result<()> {
        let mut inner = self.inner.lock();
        let mut removed = Vec::with_capacity(ids.len());
        for &id in ids {
            let slot = inner
                .slots
                .get_mut(id as usize)
                .ok_or_else(|| Error::illegal_arg(format!("string id {id} out of range")))?;
            let Some(bytes) = slot.bytes.take() else {
                return Err(Error::illegal_arg(format!("string id {id} already removed")));
            };
            inner.free.push(id);
            inner.index.remove(bytes.as_ref());
            // Heap strings are released together, after all bookkeeping.
            removed.push(bytes);
        }
        drop(inner);
        drop(removed);
        Ok(())
    }

    /// Number of live strings.
    pub fn num_distinct(&self) -> usize {
        self.inner.lock().index.len()
    }

    /// Snapshot of the index hit/miss counters.
    pub fn counters(&self) -> DictCounters {
        self.inner.lock().counters
    }

    /// Zeroes the index hit/miss counters.
    pub fn reset_counters(&self) {
        self.inner.lock().counters = DictCounters::default();
    }

    /// Returns `(id, string)` for every live entry, ordered by id.
    ///
    /// Used by the archive writer to lay the string table out in a stable
    /// order, and by packers that learn from the whole corpus.
    pub fn contents(&self) -> Vec<(StringId, String)> {
        let inner = self.inner.lock();
        let mut entries: Vec<(StringId, String)> = inner
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                slot.bytes
                    .as_deref()
                    .map(|s| (id as StringId, s.to_owned()))
            })
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
