//! In-memory directory, for tests, fixtures and the command line tool.

use super::DirectoryOperations;
use crate::error::Error;
use crate::filter::{Filter, FilterEvaluator};
use dirodm_proto::{
    DirectoryEntry, DirectoryError, Dn, Modification, PageCookie, SearchPage, SearchRequest,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;

/// A directory tree held in memory.
///
/// Entries are kept ordered by normalized name, so search results come back
/// in a stable order. Paged searches use the result offset as cookie.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<BTreeMap<Dn, DirectoryEntry>>,
    size_limit: u32,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `entries`, without structure checks.
    pub fn with_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let directory = Self::new();
        for entry in entries {
            directory.insert(entry);
        }
        directory
    }

    /// Set a server-side size limit; 0 means none.
    pub fn with_size_limit(mut self, size_limit: u32) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Load entries from JSON (an array of entries).
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let entries: Vec<DirectoryEntry> = serde_json::from_str(text)?;
        Ok(Self::with_entries(entries))
    }

    /// Load entries from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let directory = Self::from_json(&text)?;
        tracing::info!(path = %path.as_ref().display(), entries = directory.len(), "loaded directory fixture");
        Ok(directory)
    }

    /// Insert or replace an entry, without structure checks.
    pub fn insert(&self, entry: DirectoryEntry) {
        self.entries.write().insert(entry.dn().clone(), entry);
    }

    /// All entries in name order.
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn contains(&self, dn: &Dn) -> bool {
        self.entries.read().contains_key(dn)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn effective_limit(&self, requested: u32) -> u32 {
        match (requested, self.size_limit) {
            (0, server) => server,
            (client, 0) => client,
            (client, server) => client.min(server),
        }
    }
}

fn encode_offset(offset: usize) -> PageCookie {
    PageCookie::new((offset as u64).to_be_bytes().to_vec())
}

fn decode_offset(cookie: &PageCookie) -> Result<usize, DirectoryError> {
    let bytes: [u8; 8] = cookie
        .as_bytes()
        .try_into()
        .map_err(|_| DirectoryError::Transport("malformed paged results cookie".to_string()))?;
    Ok(u64::from_be_bytes(bytes) as usize)
}

impl DirectoryOperations for MemoryDirectory {
    fn bind(&self, entry: &DirectoryEntry) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write();
        let dn = entry.dn();
        if entries.contains_key(dn) {
            return Err(DirectoryError::AlreadyExists(dn.clone()));
        }
        if let Some(parent) = dn.parent() {
            // A missing parent is only an error inside a known naming context.
            let inside_known_tree = entries.keys().any(|existing| parent.is_descendant_of(existing));
            if !parent.is_root() && !entries.contains_key(&parent) && inside_known_tree {
                return Err(DirectoryError::NotFound(parent));
            }
        }
        tracing::trace!(dn = %dn, "bind");
        entries.insert(dn.clone(), entry.clone());
        Ok(())
    }

    fn modify(&self, dn: &Dn, modifications: &[Modification]) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(dn)
            .ok_or_else(|| DirectoryError::NotFound(dn.clone()))?;
        entry.apply(modifications);
        tracing::trace!(dn = %dn, count = modifications.len(), "modify");
        Ok(())
    }

    fn unbind(&self, dn: &Dn) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write();
        if !entries.contains_key(dn) {
            return Err(DirectoryError::NotFound(dn.clone()));
        }
        if entries.keys().any(|other| other.is_descendant_of(dn)) {
            return Err(DirectoryError::NotAllowedOnNonLeaf(dn.clone()));
        }
        entries.remove(dn);
        tracing::trace!(dn = %dn, "unbind");
        Ok(())
    }

    fn lookup(&self, dn: &Dn) -> Result<DirectoryEntry, DirectoryError> {
        self.entries
            .read()
            .get(dn)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(dn.clone()))
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchPage, DirectoryError> {
        let filter = Filter::parse(&request.filter).map_err(|e| DirectoryError::InvalidFilter {
            filter: request.filter.clone(),
            reason: e.to_string(),
        })?;

        let entries = self.entries.read();
        if !request.base.is_root() && !entries.contains_key(&request.base) {
            return Err(DirectoryError::NotFound(request.base.clone()));
        }

        let matches: Vec<&DirectoryEntry> = entries
            .values()
            .filter(|e| request.scope.contains(&request.base, e.dn()))
            .filter(|e| FilterEvaluator::matches(&filter, e))
            .collect();

        let limit = self.effective_limit(request.size_limit);
        if limit > 0 && matches.len() > limit as usize {
            return Err(DirectoryError::SizeLimitExceeded { limit });
        }

        let (window, cookie) = match &request.page {
            Some(page) if page.size > 0 => {
                let offset = match &page.cookie {
                    Some(cookie) if !cookie.is_empty() => decode_offset(cookie)?,
                    _ => 0,
                };
                let start = offset.min(matches.len());
                let end = (start + page.size as usize).min(matches.len());
                let next = (end < matches.len()).then(|| encode_offset(end));
                (&matches[start..end], next)
            }
            _ => (&matches[..], None),
        };

        let results = window
            .iter()
            .map(|e| {
                let mut entry = (*e).clone();
                if let Some(attributes) = &request.attributes {
                    entry.retain_attributes(attributes);
                }
                entry
            })
            .collect();

        tracing::trace!(
            base = %request.base,
            filter = %request.filter,
            scope = %request.scope,
            matched = matches.len(),
            "search"
        );
        Ok(SearchPage {
            entries: results,
            cookie,
        })
    }
}
