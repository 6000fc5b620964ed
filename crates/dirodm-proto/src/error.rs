//! Protocol error types.

use crate::dn::Dn;
use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A distinguished name could not be parsed.
    #[error("invalid distinguished name '{dn}': {reason}")]
    InvalidDn { dn: String, reason: String },

    /// Unknown search scope keyword.
    #[error("invalid search scope: {0}")]
    InvalidScope(String),
}

/// Errors reported by a directory transport.
///
/// These are produced by whatever implements the directory operations and are
/// passed through the mapping engine unchanged, except for `NotFound` and
/// `SizeLimitExceeded` which callers need to tell apart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectoryError {
    /// No entry exists with the given name.
    #[error("no such entry: {0}")]
    NotFound(Dn),

    /// An entry with the given name already exists.
    #[error("entry already exists: {0}")]
    AlreadyExists(Dn),

    /// The operation is only allowed on leaf entries.
    #[error("entry has children: {0}")]
    NotAllowedOnNonLeaf(Dn),

    /// The server stopped returning results after `limit` entries.
    #[error("size limit of {limit} entries exceeded")]
    SizeLimitExceeded { limit: u32 },

    /// The filter text was rejected.
    #[error("invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// Any other transport failure (connection, timeout, protocol).
    #[error("transport error: {0}")]
    Transport(String),
}
