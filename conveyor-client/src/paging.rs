//! Cursor-based pagination engine
//!
//! A generic, demand-driven page walker: it never fetches more than one page
//! ahead, and whether more pages exist is always the fetcher's report (the
//! server's `paging.next`), never inferred from page size.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::Result;

/// One fetched page of items
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Whether the source reports additional pages after this one
    pub more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, more: bool) -> Self {
        Self { items, more }
    }

    /// A terminal empty page
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            more: false,
        }
    }
}

/// Fetches one page of items by 0-based page index
#[async_trait]
pub trait PageFetcher: Send {
    type Item: Send;

    async fn fetch(&mut self, page: usize) -> Result<Page<Self::Item>>;
}

/// Lazy, restartable walk over a paginated source
///
/// An explicit state machine (current page index, buffered items, and the
/// source's more-pages flag) advanced iteratively so deep backlogs never
/// recurse. A paginator is scoped to one fetch cycle and discarded once the
/// backlog is drained.
pub struct Paginator<F: PageFetcher> {
    fetcher: F,
    page: usize,
    buffer: VecDeque<F::Item>,
    more: bool,
    primed: bool,
}

impl<F: PageFetcher> Paginator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            page: 0,
            buffer: VecDeque::new(),
            more: false,
            primed: false,
        }
    }

    /// Clears state and eagerly fetches page 0
    ///
    /// An empty first page leaves the paginator in a quiet empty state, not
    /// an error.
    pub async fn reset(&mut self) -> Result<()> {
        self.page = 0;
        let fetched = self.fetcher.fetch(self.page).await?;
        self.buffer = fetched.items.into();
        self.more = fetched.more;
        self.primed = true;
        Ok(())
    }

    /// Whether another item is available, buffered or on the server
    ///
    /// Primes the paginator with an implicit [`reset`](Self::reset) on first
    /// use.
    pub async fn has_next(&mut self) -> Result<bool> {
        if !self.primed {
            self.reset().await?;
        }
        Ok(!self.buffer.is_empty() || self.more)
    }

    /// Returns the next item in server order
    ///
    /// Fetches the next page when the buffer runs dry and the source reports
    /// more; returns `Ok(None)` only when buffer and source are both
    /// exhausted.
    pub async fn next(&mut self) -> Result<Option<F::Item>> {
        if !self.primed {
            self.reset().await?;
        }
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if !self.more {
                return Ok(None);
            }
            self.page += 1;
            let fetched = self.fetcher.fetch(self.page).await?;
            self.buffer = fetched.items.into();
            self.more = fetched.more;
        }
    }
}
