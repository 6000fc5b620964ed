//! dirodm protocol types.
//!
//! This crate defines the directory-side representation the mapping engine
//! talks to: distinguished names, raw attribute values, entries, attribute
//! modifications, and the paged search request/response pair exchanged with a
//! directory transport.
//!
//! # Modules
//!
//! - [`dn`] - Distinguished names and relative distinguished names
//! - [`entry`] - Raw values, attributes, entries and modifications
//! - [`search`] - Search scope, search requests and result pages
//! - [`error`] - Protocol and transport error types

pub mod dn;
pub mod entry;
pub mod error;
pub mod search;

pub use dn::{Dn, Rdn};
pub use entry::{Attribute, DirectoryEntry, Modification, RawValue, OBJECT_CLASS};
pub use error::{DirectoryError, Error};
pub use search::{PageControl, PageCookie, SearchPage, SearchRequest, SearchScope};
