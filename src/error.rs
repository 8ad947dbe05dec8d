//! Error types for the fallible boundaries of the engine: FEN parsing,
//! opening book loading, and UCI option handling.
//!
//! Internal search invariants are not modeled here -- a violated search
//! invariant (for example, no legal move at a fail-high cutoff) is a
//! programming error and is handled with `debug_assert!`/`unreachable!`
//! at the point of detection, per the protocol this engine implements.

use std::fmt;

/// A FEN string does not describe a legal chess position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenError(pub String);

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "illegal FEN: {}", self.0)
    }
}

impl std::error::Error for FenError {}

/// The opening book could not be loaded, or a lookup failed in a way
/// that must not crash the engine (malformed entry, missing file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    Io(String),
    Malformed(String),
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BookError::Io(msg) => write!(f, "couldn't load book: {}", msg),
            BookError::Malformed(msg) => write!(f, "malformed book data: {}", msg),
        }
    }
}

impl std::error::Error for BookError {}

/// A `setoption` command the registry could not apply as given.
///
/// Per the registry's fallback rule, an out-of-range value for a known
/// option is never an error (it silently resolves to the option's
/// default); this type only models the one case that is: a name the
/// registry doesn't recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    Unknown(String),
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionError::Unknown(name) => write!(f, "unrecognized option: {}", name),
        }
    }
}

impl std::error::Error for OptionError {}
