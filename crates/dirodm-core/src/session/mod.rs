//! Sessions: the unit of work against a directory.
//!
//! A [`SessionFactory`] holds everything shared (registry, converters,
//! transport, configuration). Each [`Session`] adds a private entry cache, so
//! updates only send the attributes that changed since the session last saw
//! the entry. Sessions are not shared between threads; open one per task.

mod pages;

pub use pages::{PageState, Pages};

use crate::cache::EntryCache;
use crate::catalog::{ClassMetadata, Persistent, Record, Registry};
use crate::config::EngineConfig;
use crate::convert::ConverterSet;
use crate::directory::DirectoryOperations;
use crate::error::Error;
use crate::filter::{Filter, FilterBuilder};
use crate::mapping::Mapper;
use crate::value::Reference;
use dirodm_proto::{DirectoryEntry, Dn, Modification, PageCookie, SearchRequest, SearchScope};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared state from which sessions are opened.
#[derive(Clone)]
pub struct SessionFactory {
    registry: Arc<Registry>,
    converters: Arc<ConverterSet>,
    directory: Arc<dyn DirectoryOperations>,
    config: EngineConfig,
}

impl SessionFactory {
    /// Create a factory with the standard converters and default configuration.
    pub fn new(registry: Registry, directory: Arc<dyn DirectoryOperations>) -> Self {
        Self {
            registry: Arc::new(registry),
            converters: Arc::new(ConverterSet::standard()),
            directory,
            config: EngineConfig::default(),
        }
    }

    pub fn with_converters(mut self, converters: ConverterSet) -> Self {
        self.converters = Arc::new(converters);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a session with an empty cache.
    pub fn open_session(&self) -> Session {
        let id = NEXT_SESSION_ID.fetch_add(1, AtomicOrdering::Relaxed);
        tracing::debug!(session = id, "session opened");
        Session {
            id,
            registry: Arc::clone(&self.registry),
            converters: Arc::clone(&self.converters),
            directory: Arc::clone(&self.directory),
            config: self.config.clone(),
            cache: EntryCache::new(),
        }
    }

    /// A filter builder for a typed persistent class.
    pub fn filter_builder<T: Persistent>(&self) -> Result<FilterBuilder, Error> {
        self.filter_builder_for(T::type_name())
    }

    /// A filter builder for a registered type name.
    pub fn filter_builder_for(&self, type_name: &str) -> Result<FilterBuilder, Error> {
        Ok(FilterBuilder::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.converters),
            type_name,
        )?)
    }
}

/// A unit of work with its own entry cache.
pub struct Session {
    id: u64,
    registry: Arc<Registry>,
    converters: Arc<ConverterSet>,
    directory: Arc<dyn DirectoryOperations>,
    config: EngineConfig,
    cache: EntryCache,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    /// Create the entry for a new instance, returning its name.
    pub fn bind<T: Persistent>(&mut self, instance: &T) -> Result<Dn, Error> {
        let record = Record::from_persistent(instance)?;
        self.bind_record(&record)
    }

    pub fn bind_record(&mut self, record: &Record) -> Result<Dn, Error> {
        let mut entry = DirectoryEntry::new(record.dn.clone());
        Mapper::new(&self.registry, &self.converters).to_entry(record, &mut entry)?;
        self.directory.bind(&entry)?;
        tracing::debug!(session = self.id, dn = %record.dn, type_name = %record.type_name, "bound entry");
        self.cache.store(record.dn.clone(), entry);
        Ok(record.dn.clone())
    }

    /// Save an instance's changes, returning the modifications sent.
    ///
    /// Nothing is sent when the instance matches the last known entry.
    pub fn update<T: Persistent>(&mut self, instance: &T) -> Result<Vec<Modification>, Error> {
        let record = Record::from_persistent(instance)?;
        self.update_record(&record)
    }

    pub fn update_record(&mut self, record: &Record) -> Result<Vec<Modification>, Error> {
        let mut entry = match self.cache.retrieve(&record.dn) {
            Some(cached) => cached.clone(),
            None => self.fetch(&record.dn)?,
        };
        let modifications =
            Mapper::new(&self.registry, &self.converters).to_entry(record, &mut entry)?;
        if !modifications.is_empty() {
            self.directory.modify(&record.dn, &modifications)?;
            tracing::debug!(
                session = self.id,
                dn = %record.dn,
                count = modifications.len(),
                "updated entry"
            );
        }
        self.cache.store(record.dn.clone(), entry);
        Ok(modifications)
    }

    /// Delete an instance's entry.
    pub fn unbind<T: Persistent>(&mut self, instance: &T) -> Result<(), Error> {
        let reference = instance.reference()?;
        self.unbind_dn(&reference.dn)
    }

    /// Delete the entry with the given name.
    pub fn unbind_dn(&mut self, dn: &Dn) -> Result<(), Error> {
        self.directory.unbind(dn)?;
        self.cache.remove(dn);
        tracing::debug!(session = self.id, dn = %dn, "unbound entry");
        Ok(())
    }

    /// Read one instance by name.
    ///
    /// Served from the cache when the session has already seen the entry.
    pub fn lookup<T: Persistent>(&mut self, dn: &Dn) -> Result<T, Error> {
        let metadata = Arc::clone(self.registry.get_for::<T>()?);
        let record = self.lookup_as(dn, Some(&metadata))?;
        Ok(record.into_persistent()?)
    }

    /// Read one entry by name as a record of its most specific registered type.
    pub fn lookup_record(&mut self, dn: &Dn) -> Result<Record, Error> {
        self.lookup_as(dn, None)
    }

    /// Follow a reference.
    pub fn resolve<T: Persistent>(&mut self, reference: &Reference) -> Result<T, Error> {
        self.lookup(&reference.dn)
    }

    fn lookup_as(
        &mut self,
        dn: &Dn,
        expected: Option<&Arc<ClassMetadata>>,
    ) -> Result<Record, Error> {
        let entry = match self.cache.retrieve(dn) {
            Some(cached) => cached.clone(),
            None => {
                let entry = self.fetch(dn)?;
                self.cache.store(dn.clone(), entry.clone());
                entry
            }
        };
        Mapper::new(&self.registry, &self.converters).from_entry(&entry, expected)
    }

    fn fetch(&self, dn: &Dn) -> Result<DirectoryEntry, Error> {
        let entry = self.directory.lookup(dn)?;
        assert_eq!(
            entry.dn(),
            dn,
            "directory answered a lookup with a different entry"
        );
        Ok(entry)
    }

    /// Search below `base` for instances of `T` (and its subtypes).
    pub fn search<T: Persistent>(
        &mut self,
        base: &Dn,
        filter: &Filter,
        scope: SearchScope,
    ) -> Result<Vec<T>, Error> {
        self.search_records(T::type_name(), base, filter, scope)?
            .into_iter()
            .map(|r| r.into_persistent().map_err(Error::from))
            .collect()
    }

    /// Search with the configured base and scope.
    pub fn find<T: Persistent>(&mut self, filter: &Filter) -> Result<Vec<T>, Error> {
        let base = self.config.base();
        let scope = self.config.scope;
        self.search(&base, filter, scope)
    }

    /// Search for records of a registered type.
    pub fn search_records(
        &mut self,
        type_name: &str,
        base: &Dn,
        filter: &Filter,
        scope: SearchScope,
    ) -> Result<Vec<Record>, Error> {
        let metadata = Arc::clone(self.registry.get(type_name)?);
        let request = self.request(base, filter, scope);
        let (records, _) = self.run_search(&request, &metadata)?;
        tracing::debug!(session = self.id, base = %base, found = records.len(), "search");
        Ok(records)
    }

    /// Count matching entries without decoding them.
    pub fn count(&self, base: &Dn, filter: &Filter, scope: SearchScope) -> Result<u64, Error> {
        let request = self
            .request(base, filter, scope)
            .with_attributes(Vec::new());
        let page = self.directory.search(&request)?;
        Ok(page.entries.len() as u64)
    }

    /// Page through instances of `T` below `base` (subtree).
    ///
    /// A page size of 0 uses the configured default.
    pub fn pages<T: Persistent>(
        &mut self,
        page_size: u32,
        filter: &Filter,
        base: &Dn,
    ) -> Result<Pages<'_, T>, Error> {
        self.paged(T::type_name(), page_size, filter, base, |record| {
            record.into_persistent::<T>().map_err(Error::from)
        })
    }

    /// Page through records of a registered type.
    pub fn record_pages(
        &mut self,
        type_name: &str,
        page_size: u32,
        filter: &Filter,
        base: &Dn,
    ) -> Result<Pages<'_, Record>, Error> {
        self.paged(type_name, page_size, filter, base, Ok)
    }

    /// A filter builder for a typed persistent class.
    pub fn filter_builder<T: Persistent>(&self) -> Result<FilterBuilder, Error> {
        self.filter_builder_for(T::type_name())
    }

    pub fn filter_builder_for(&self, type_name: &str) -> Result<FilterBuilder, Error> {
        Ok(FilterBuilder::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.converters),
            type_name,
        )?)
    }

    /// End the session, dropping its cache.
    pub fn close(self) {}

    fn paged<T>(
        &mut self,
        type_name: &str,
        page_size: u32,
        filter: &Filter,
        base: &Dn,
        convert: fn(Record) -> Result<T, Error>,
    ) -> Result<Pages<'_, T>, Error> {
        let metadata = Arc::clone(self.registry.get(type_name)?);
        let page_size = if page_size == 0 {
            self.config.page_size.max(1)
        } else {
            page_size
        };
        let request = self.request(base, filter, SearchScope::Subtree);
        Ok(Pages::new(self, metadata, request, page_size, convert))
    }

    fn request(&self, base: &Dn, filter: &Filter, scope: SearchScope) -> SearchRequest {
        SearchRequest::new(base.clone(), filter.encode())
            .with_scope(scope)
            .with_size_limit(self.config.size_limit)
    }

    /// Run one request, cache every returned entry and decode it.
    pub(crate) fn run_search(
        &mut self,
        request: &SearchRequest,
        metadata: &Arc<ClassMetadata>,
    ) -> Result<(Vec<Record>, Option<PageCookie>), Error> {
        let page = self.directory.search(request)?;
        let mapper = Mapper::new(&self.registry, &self.converters);
        let mut records = Vec::with_capacity(page.entries.len());
        for entry in page.entries {
            let record = mapper.from_entry(&entry, Some(metadata))?;
            self.cache.store(entry.dn().clone(), entry);
            records.push(record);
        }
        Ok((records, page.cookie))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::debug!(
            session = self.id,
            cached = self.cache.len(),
            hits = self.cache.stats().hits(),
            misses = self.cache.stats().misses(),
            "session closed"
        );
    }
}
