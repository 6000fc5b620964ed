//! Lazy paged search results.

use super::Session;
use crate::catalog::{ClassMetadata, Record};
use crate::error::Error;
use dirodm_proto::{PageControl, PageCookie, SearchRequest};
use std::iter::FusedIterator;
use std::sync::Arc;

/// Where a paged search stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Another page can be requested; `None` before the first one.
    HasMore(Option<PageCookie>),
    /// No more pages, or a page failed.
    Exhausted,
}

/// Iterator over the pages of a search, one request per page.
///
/// Each item is one page of results. Once the directory reports no more
/// pages or a request fails, the iterator is finished; in particular a size
/// limit error is yielded once and then iteration ends.
pub struct Pages<'s, T> {
    session: &'s mut Session,
    metadata: Arc<ClassMetadata>,
    request: SearchRequest,
    page_size: u32,
    state: PageState,
    convert: fn(Record) -> Result<T, Error>,
}

impl<'s, T> Pages<'s, T> {
    pub(crate) fn new(
        session: &'s mut Session,
        metadata: Arc<ClassMetadata>,
        request: SearchRequest,
        page_size: u32,
        convert: fn(Record) -> Result<T, Error>,
    ) -> Self {
        Self {
            session,
            metadata,
            request,
            page_size,
            state: PageState::HasMore(None),
            convert,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PageState::Exhausted
    }

    fn fetch(&mut self, cookie: Option<PageCookie>) -> Result<Vec<T>, Error> {
        let control = match cookie {
            Some(cookie) => PageControl::next(self.page_size, cookie),
            None => PageControl::first(self.page_size),
        };
        let request = self.request.clone().with_page(control);
        let (records, next) = self.session.run_search(&request, &self.metadata)?;

        self.state = match next {
            Some(cookie) if !cookie.is_empty() => PageState::HasMore(Some(cookie)),
            _ => PageState::Exhausted,
        };
        let converted: Result<Vec<T>, Error> = records.into_iter().map(self.convert).collect();
        if converted.is_err() {
            self.state = PageState::Exhausted;
        }
        converted
    }
}

impl<T> Iterator for Pages<'_, T> {
    type Item = Result<Vec<T>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let cookie = match std::mem::replace(&mut self.state, PageState::Exhausted) {
            PageState::Exhausted => return None,
            PageState::HasMore(cookie) => cookie,
        };
        Some(self.fetch(cookie))
    }
}

impl<T> FusedIterator for Pages<'_, T> {}
