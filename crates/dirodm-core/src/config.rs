//! Engine configuration.

use crate::error::Error;
use dirodm_proto::{Dn, SearchScope};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of entries per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Defaults applied by sessions to searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used when a paged search asks for 0.
    pub page_size: u32,

    /// Client-side size limit sent with every search. 0 means no limit.
    pub size_limit: u32,

    /// Scope of searches that don't name one.
    pub scope: SearchScope,

    /// Base of searches that don't name one. None means the root.
    pub base: Option<Dn>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            size_limit: 0,
            scope: SearchScope::Subtree,
            base: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default page size (at least 1).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_size_limit(mut self, size_limit: u32) -> Self {
        self.size_limit = size_limit;
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_base(mut self, base: Dn) -> Self {
        self.base = Some(base);
        self
    }

    /// The default search base.
    pub fn base(&self) -> Dn {
        self.base.clone().unwrap_or_else(Dn::root)
    }

    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(text)?;
        if config.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Read from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.size_limit, 0);
        assert_eq!(config.scope, SearchScope::Subtree);
        assert!(config.base().is_root());
    }

    #[test]
    fn test_builder() {
        let base = Dn::parse("dc=example").unwrap();
        let config = EngineConfig::new()
            .with_page_size(0)
            .with_size_limit(50)
            .with_scope(SearchScope::OneLevel)
            .with_base(base.clone());
        assert_eq!(config.page_size, 1);
        assert_eq!(config.size_limit, 50);
        assert_eq!(config.base(), base);
    }

    #[test]
    fn test_from_json() {
        let config =
            EngineConfig::from_json(r#"{ "page_size": 25, "base": "ou=people,dc=example" }"#)
                .unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.scope, SearchScope::Subtree);
        assert_eq!(config.base(), Dn::parse("ou=people,dc=example").unwrap());

        assert!(EngineConfig::from_json(r#"{ "page_size": 0 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "scope": "everywhere" }"#).is_err());
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "scope": "onelevel", "size_limit": 10 }"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.scope, SearchScope::OneLevel);
        assert_eq!(config.size_limit, 10);
    }
}
