//! Error codes the mongodb crate doesn't name for us.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

/// Server code for a unique index violation.
pub const DUPLICATE_KEY: i32 = 11000;

/// Does this error come from violating a unique index?
///
/// Inside a transaction the violation may surface as a command error rather
/// than a write error, so both are checked.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}
