//! Offset-driven pagination
//!
//! The platform's `get` calls page results through a `Limit`/`Offset` pair
//! and return a continuation offset until the collection is exhausted. The
//! [`Paginator`] feeds that offset back into successive calls, accumulating
//! items in call order.
//!
//! Termination relies on the server eventually withholding a continuation
//! token, so a safety cap aborts with
//! [`ClientError::PaginationExhausted`](super::ClientError::PaginationExhausted)
//! instead of looping forever against a misbehaving server.

use std::future::Future;
use tracing::debug;

use super::{ClientError, ClientResult};

/// Pagination state for one collection fetch.
///
/// `offset` is an opaque continuation token: 0 means "start of collection",
/// and the server returning no token means "exhausted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Page size requested from the server.
    pub limit: u64,
    /// Continuation token fed back from the previous page.
    pub offset: u64,
}

/// One page of results plus the continuation token, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Token for the next page; `None` when the collection is exhausted.
    pub next_offset: Option<u64>,
}

impl<T> Page<T> {
    /// A terminal page carrying the final batch of items.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_offset: None,
        }
    }

    /// An intermediate page pointing at the next offset.
    pub fn partial(items: Vec<T>, next_offset: u64) -> Self {
        Self {
            items,
            next_offset: Some(next_offset),
        }
    }
}

/// Repeatedly invokes a page-fetch primitive until the server signals
/// exhaustion.
#[derive(Debug)]
pub struct Paginator {
    cursor: PaginationCursor,
    max_pages: u64,
}

impl Paginator {
    /// Build a paginator with the given page size and safety cap.
    pub fn new(limit: u64, max_pages: u64) -> Self {
        Self {
            cursor: PaginationCursor { limit, offset: 0 },
            max_pages,
        }
    }

    /// The current cursor (offset 0 between fetches).
    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    /// Fetch every page of a collection.
    ///
    /// `fetch` receives `(limit, offset)`; the offset starts at 0 and is then
    /// fed from each page's `next_offset`. Items accumulate in call order.
    /// The cursor resets to offset 0 on completion so the paginator can be
    /// reused for the next collection.
    ///
    /// # Errors
    /// [`ClientError::PaginationExhausted`] if `max_pages` pages arrive
    /// without the server withholding a continuation token; any fetch error
    /// propagates as-is (the cursor still resets).
    pub async fn fetch_all<T, F, Fut>(&mut self, mut fetch: F) -> ClientResult<Vec<T>>
    where
        F: FnMut(u64, u64) -> Fut,
        Fut: Future<Output = ClientResult<Page<T>>>,
    {
        self.cursor.offset = 0;
        let mut result = Vec::new();
        let mut pages: u64 = 0;

        loop {
            if pages >= self.max_pages {
                self.cursor.offset = 0;
                return Err(ClientError::PaginationExhausted { pages });
            }

            let page = match fetch(self.cursor.limit, self.cursor.offset).await {
                Ok(page) => page,
                Err(err) => {
                    self.cursor.offset = 0;
                    return Err(err);
                }
            };
            pages += 1;
            debug!(
                page = pages,
                items = page.items.len(),
                next_offset = ?page.next_offset,
                "received page"
            );
            result.extend(page.items);

            match page.next_offset {
                Some(next) => self.cursor.offset = next,
                None => break,
            }
        }

        // Reset so the next collection starts from the beginning.
        self.cursor.offset = 0;
        debug!(pages, total = result.len(), "pagination complete");
        Ok(result)
    }
}
