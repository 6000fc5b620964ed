//! dirodm core - object-to-directory mapping engine.
//!
//! Maps typed application objects onto directory entries: class metadata and
//! the type registry, attribute syntax converters, a typed filter builder, a
//! per-session entry cache, change computation on update, and paged search.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod directory;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod session;
pub mod value;

pub use cache::{CacheStats, EntryCache};
pub use catalog::{
    AttributeDeclaration, AttributeMetadata, Cardinality, ClassDeclaration, ClassMetadata,
    ClassMetadataBuilder, DeclaredType, Persistent, Record, Registry, RegistryBuilder,
    SchemaDeclaration,
};
pub use config::{EngineConfig, DEFAULT_PAGE_SIZE};
pub use convert::{Converter, ConverterSet, Syntax, SyntaxConverter};
pub use directory::{DirectoryOperations, MemoryDirectory};
pub use error::{ConversionError, Error, MappingError};
pub use filter::{Comparison, Filter, FilterBuilder, FilterEvaluator, PropertyFilterBuilder};
pub use mapping::Mapper;
pub use session::{PageState, Pages, Session, SessionFactory};
pub use value::{Properties, Reference, Value, ValueType};

/// Re-export protocol types.
pub use dirodm_proto as proto;
