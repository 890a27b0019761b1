//! Generic lazy pagination over page-based listing endpoints.
//!
//! `paginated` adapts a page-request function into a pull-based sequence of
//! items. Pages are fetched on demand: stopping early issues no further
//! requests, and upstream failures surface on the element being produced.

use std::collections::VecDeque;
use std::future::Future;

use super::error::GitLabError;
use super::types::{Page, PageOptions};

/// Default page size for GitLab listing endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Build a lazy item sequence over a paged endpoint.
///
/// `fetch` is called with successive page options starting at page 1 until
/// the upstream signals the end (an empty page or no next-page cursor).
/// Each call to `paginated` starts from the first page; the sequence is not
/// resumable across calls.
pub fn paginated<T, F, Fut>(fetch: F, per_page: u32) -> Paginated<T, F>
where
    F: FnMut(PageOptions) -> Fut,
    Fut: Future<Output = Result<Page<T>, GitLabError>>,
{
    Paginated {
        fetch,
        per_page,
        next_page: Some(1),
        buffer: VecDeque::new(),
    }
}

/// Pull-based paginated sequence, produced by [`paginated`].
pub struct Paginated<T, F> {
    fetch: F,
    per_page: u32,
    /// Next page to request; `None` once the upstream is exhausted.
    next_page: Option<u32>,
    buffer: VecDeque<T>,
}

impl<T, F, Fut> Paginated<T, F>
where
    F: FnMut(PageOptions) -> Fut,
    Fut: Future<Output = Result<Page<T>, GitLabError>>,
{
    /// Produce the next item, fetching the next page when the buffer runs dry.
    pub async fn try_next(&mut self) -> Result<Option<T>, GitLabError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            let Some(page_number) = self.next_page else {
                return Ok(None);
            };

            let page = (self.fetch)(PageOptions {
                page: Some(page_number),
                per_page: Some(self.per_page),
            })
            .await?;

            if page.items.is_empty() {
                self.next_page = None;
                return Ok(None);
            }

            self.buffer.extend(page.items);
            self.next_page = page.next_page;
        }
    }

    /// Drain the remaining items into a vector.
    pub async fn try_collect(mut self) -> Result<Vec<T>, GitLabError> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }
}
