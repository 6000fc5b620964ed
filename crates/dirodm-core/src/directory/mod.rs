//! Transport seam between sessions and a directory server.

mod memory;

pub use memory::MemoryDirectory;

use dirodm_proto::{DirectoryEntry, DirectoryError, Dn, Modification, SearchPage, SearchRequest};

/// Low-level directory operations a session is built on.
///
/// Implementations are shared between sessions and must be usable from
/// several threads at once.
pub trait DirectoryOperations: Send + Sync {
    /// Create an entry. Fails if the name is taken.
    fn bind(&self, entry: &DirectoryEntry) -> Result<(), DirectoryError>;

    /// Apply modifications to an existing entry.
    fn modify(&self, dn: &Dn, modifications: &[Modification]) -> Result<(), DirectoryError>;

    /// Delete a leaf entry.
    fn unbind(&self, dn: &Dn) -> Result<(), DirectoryError>;

    /// Read one entry with all attributes.
    fn lookup(&self, dn: &Dn) -> Result<DirectoryEntry, DirectoryError>;

    /// Run one search request, returning one page of results.
    fn search(&self, request: &SearchRequest) -> Result<SearchPage, DirectoryError>;
}
