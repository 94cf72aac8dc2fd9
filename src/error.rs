//! Crate-wide error type and diagnostics.
//!
//! Every fallible public operation in this crate returns [`Error`]. The
//! variants form a closed set of error kinds shared by all subsystems, so
//! callers can match on the failure class without caring which layer
//! produced it.
//!
//! In addition to the returned error value, every constructed error records
//! a diagnostic (kind, source file, line, message) in a **thread-local**
//! last-error slot. The slot exists for debugging and FFI-style callers
//! that only see a boolean failure indicator; regular Rust callers should
//! rely on the returned [`Error`] instead.

use std::cell::RefCell;
use std::panic::Location;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// ------------------------------------------------------------------------------------------------
// Error kinds
// ------------------------------------------------------------------------------------------------

/// Classification of an [`Error`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was absent.
    NullPtr,
    /// An argument value was outside its legal domain.
    IllegalArg,
    /// The operation is not permitted in the cursor's or record's mode.
    IllegalOp,
    /// The object is not in a state that permits the operation.
    IllegalState,
    /// A position, index, or length exceeded its bounds.
    OutOfBounds,
    /// A typed accessor was applied to a field of a different type.
    TypeMismatch,
    /// The byte stream violates the format contract.
    Corrupted,
    /// The archive version byte is not supported by this build.
    UnsupportedVersion,
    /// Memory could not be obtained.
    Alloc,
    /// Reading from the backing file failed.
    FReadFailed,
    /// Writing to the backing file failed.
    FWriteFailed,
    /// A marker byte has no mapping to a known symbol.
    MarkerMapping,
    /// Dot-path parsing expected a `.` separator.
    ParseDotExpected,
    /// Dot-path parsing expected a key or index after a separator.
    ParseEntryExpected,
    /// Dot-path parsing hit a token that is neither key nor index.
    ParseUnknownToken,
    /// An internal invariant was violated.
    Internal,
}

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// The error type returned by all fallible operations in this crate.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message attached at the failure site.
    pub fn message(&self) -> &str {
        &self.message
    }

    #[track_caller]
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let loc = Location::caller();
        record_last_error(kind, loc.file(), loc.line(), &message);
        Self { kind, message }
    }

    #[track_caller]
    pub(crate) fn illegal_arg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalArg, message)
    }

    #[track_caller]
    pub(crate) fn illegal_op(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalOp, message)
    }

    #[track_caller]
    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalState, message)
    }

    #[track_caller]
    pub(crate) fn out_of_bounds(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfBounds, message)
    }

    #[track_caller]
    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    #[track_caller]
    pub(crate) fn corrupted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Corrupted, message)
    }

    #[track_caller]
    pub(crate) fn unsupported_version(found: u8, expected: u8) -> Self {
        Self::new(
            ErrorKind::UnsupportedVersion,
            format!("archive version {found} not supported (expected {expected})"),
        )
    }

    #[track_caller]
    pub(crate) fn marker_mapping(byte: u8) -> Self {
        Self::new(
            ErrorKind::MarkerMapping,
            format!("no marker mapping for byte 0x{byte:02X}"),
        )
    }

    #[track_caller]
    pub(crate) fn fread(err: std::io::Error) -> Self {
        Self::new(ErrorKind::FReadFailed, err.to_string())
    }

    #[track_caller]
    pub(crate) fn fwrite(err: std::io::Error) -> Self {
        Self::new(ErrorKind::FWriteFailed, err.to_string())
    }

    #[track_caller]
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

// ------------------------------------------------------------------------------------------------
// Thread-local last-error slot
// ------------------------------------------------------------------------------------------------

/// Diagnostic captured at the site where an [`Error`] was constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error classification.
    pub kind: ErrorKind,
    /// Source file of the failure site.
    pub file: &'static str,
    /// Source line of the failure site.
    pub line: u32,
    /// Message attached at the failure site.
    pub message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<Diagnostic>> = const { RefCell::new(None) };
}

fn record_last_error(kind: ErrorKind, file: &'static str, line: u32, message: &str) {
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(Diagnostic {
            kind,
            file,
            line,
            message: message.to_owned(),
        });
    });
}

/// Returns a copy of the most recent error diagnostic raised on this thread,
/// if any.
pub fn last_error() -> Option<Diagnostic> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Clears the thread-local last-error slot.
pub fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}
