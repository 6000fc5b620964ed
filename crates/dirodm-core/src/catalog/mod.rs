//! Metadata model: how persistent types map onto directory entries.

mod attribute;
mod class;
mod declaration;
mod persistent;
mod registry;

pub use attribute::{AttributeMetadata, Cardinality};
pub use class::{ClassMetadata, ClassMetadataBuilder, DEFAULT_IDENTIFIER, TOP};
pub use declaration::{AttributeDeclaration, ClassDeclaration, DeclaredType, SchemaDeclaration};
pub use persistent::{Persistent, Record};
pub use registry::{Registry, RegistryBuilder};
