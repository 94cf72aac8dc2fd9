//! # carbonrec
//!
//! A columnar binary format for self-describing semi-structured records
//! ("CARBON"), with a compressed, indexed archive layer for read-mostly
//! analytical access.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Record Engine                       │
//! │  ┌───────────┐   ┌───────────────┐   ┌─────────────────┐   │
//! │  │ MemBlock  │   │  Iterators /  │   │  Revise (COW) / │   │
//! │  │ + MemFile │──►│  Inserters    │──►│  Patch contexts │   │
//! │  └───────────┘   └───────────────┘   └─────────────────┘   │
//! │        │                  │                    │           │
//! │        ▼                  ▼                    ▼           │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  Archive writer → packed columnar file → reader /    │  │
//! │  │  visitor  (string table compressed by a packer)      │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`mem`] | Resizable memory block and seekable byte/bit cursor with varuint codec |
//! | [`strdict`] | Thread-safe string↔id dictionary with reusable id slots |
//! | [`pack`] | String packers — identity, Huffman, shared-prefix |
//! | [`record`] | Binary record engine: containers, iterators, inserters, revisions, dot paths |
//! | [`printer`] | Streaming JSON emitters (compact and extended) |
//! | [`archive`] | Columnar archive writer, memory-mapped reader, depth-first visitor |
//! | [`error`] | Crate-wide error kinds and thread-local diagnostics |
//!
//! ## Key Features
//!
//! - **Byte-addressable records** — the in-memory form is the serialized
//!   form; saving a record is writing its block verbatim.
//! - **Copy-on-write revisions** — each successful revision produces a new
//!   record identified by a fresh commit hash; readers of the original are
//!   never disturbed.
//! - **Abstract-type annotations** — containers record sorted/unsorted ×
//!   set/multiset semantics in their marker byte; the library preserves
//!   but never enforces them.
//! - **Columnar archives** — objects become type-grouped property tables
//!   with per-type offset indexes and an embedded, compressed string
//!   dictionary.
//!
//! ## Quick Start
//!
//! ```rust
//! use carbonrec::record::{CreateOptions, RecordBuilder, RecordKey};
//!
//! let mut builder = RecordBuilder::new(RecordKey::Auto, CreateOptions::keep()).unwrap();
//! builder
//!     .insert_with(|ins| {
//!         ins.insert_object_with(0, |obj| {
//!             obj.prop_string("name", "carbon")?;
//!             obj.prop_u32("stars", 1024)
//!         })
//!     })
//!     .unwrap();
//! let record = builder.finish().unwrap();
//!
//! assert_eq!(
//!     record.to_json_compact().unwrap(),
//!     r#"{"name": "carbon", "stars": 1024}"#
//! );
//! assert_eq!(record.find("name").unwrap().unwrap().result_string().unwrap(), "carbon");
//! ```

pub mod archive;
pub mod error;
pub mod mem;
pub mod pack;
pub mod printer;
pub mod record;
pub mod strdict;
