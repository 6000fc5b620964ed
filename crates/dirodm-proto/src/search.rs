//! Search requests and paged results.

use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far below the base a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Only the base entry itself.
    Base,
    /// Immediate children of the base.
    OneLevel,
    /// The base and everything below it.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Check if `dn` falls inside this scope relative to `base`.
    pub fn contains(&self, base: &Dn, dn: &Dn) -> bool {
        match self {
            SearchScope::Base => dn == base,
            SearchScope::OneLevel => dn.parent().as_ref() == Some(base),
            SearchScope::Subtree => dn.is_within(base),
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::Base => write!(f, "base"),
            SearchScope::OneLevel => write!(f, "onelevel"),
            SearchScope::Subtree => write!(f, "subtree"),
        }
    }
}

impl FromStr for SearchScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "object" => Ok(SearchScope::Base),
            "one" | "onelevel" => Ok(SearchScope::OneLevel),
            "sub" | "subtree" => Ok(SearchScope::Subtree),
            other => Err(Error::InvalidScope(other.to_string())),
        }
    }
}

/// Opaque continuation token of the paged-results control.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageCookie(Vec<u8>);

impl PageCookie {
    /// Wrap raw cookie bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw cookie bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// An empty cookie marks the last page.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Paged-results control attached to a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageControl {
    /// Maximum entries per page.
    pub size: u32,
    /// Cookie from the previous page, absent on the first request.
    pub cookie: Option<PageCookie>,
}

impl PageControl {
    /// Control for the first page.
    pub fn first(size: u32) -> Self {
        Self { size, cookie: None }
    }

    /// Control continuing after `cookie`.
    pub fn next(size: u32, cookie: PageCookie) -> Self {
        Self {
            size,
            cookie: Some(cookie),
        }
    }
}

/// A search sent to the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Base of the search.
    pub base: Dn,
    /// Filter in the textual filter grammar.
    pub filter: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Client-side size limit; 0 means no limit.
    pub size_limit: u32,
    /// Attributes to return; `None` returns all of them.
    pub attributes: Option<Vec<String>>,
    /// Paged-results control.
    pub page: Option<PageControl>,
}

impl SearchRequest {
    /// Create a subtree search without limits.
    pub fn new(base: Dn, filter: impl Into<String>) -> Self {
        Self {
            base,
            filter: filter.into(),
            scope: SearchScope::default(),
            size_limit: 0,
            attributes: None,
            page: None,
        }
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the size limit.
    pub fn with_size_limit(mut self, size_limit: u32) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Restrict the returned attributes.
    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Attach a paged-results control.
    pub fn with_page(mut self, page: PageControl) -> Self {
        self.page = Some(page);
        self
    }
}

/// One response to a search request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchPage {
    /// Matching entries.
    pub entries: Vec<DirectoryEntry>,
    /// Cookie for the next page; absent or empty on the last page.
    pub cookie: Option<PageCookie>,
}

impl SearchPage {
    /// A final page.
    pub fn last(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            cookie: None,
        }
    }

    /// A page followed by more results.
    pub fn with_cookie(entries: Vec<DirectoryEntry>, cookie: PageCookie) -> Self {
        Self {
            entries,
            cookie: Some(cookie),
        }
    }

    /// Check if the directory reported more results.
    pub fn has_more(&self) -> bool {
        self.cookie.as_ref().is_some_and(|c| !c.is_empty())
    }
}
