//! Offset pagination: one bounded page per call, and a lazy paginator on top.
use crate::core::db::{execute_query, Server};
use crate::core::{ProdevError, Result};
use crate::record::{Record, RECORD_COLUMNS};
use crate::retry::RetryPolicy;
use serde::Serialize;
use tracing::{debug, error};

/// One slice of `user_data` fetched with a given limit and offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
    pub records: Vec<Record>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// An empty page means the data ran out.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for Page {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Fetches a single page on a fresh connection, closed before returning.
///
/// Negative `limit` or `offset` values are clamped to zero. An empty page
/// means there is no data at that offset; a failure is returned as `Err`.
pub fn fetch_page(server: &Server, limit: i64, offset: i64) -> Result<Page> {
    let limit = limit.max(0);
    let offset = offset.max(0);

    let conn = server.open()?;
    let sql = format!(
        "SELECT {} FROM user_data ORDER BY rowid LIMIT ?1 OFFSET ?2",
        RECORD_COLUMNS
    );
    let records = execute_query(&conn, &sql, [limit, offset])?;
    conn.close()?;

    debug!(limit, offset, rows = records.len(), "fetched page");
    Ok(Page {
        limit: limit as u64,
        offset: offset as u64,
        records,
    })
}

/// Lazily walks the table page by page.
///
/// Starts at offset 0 and advances by `page_size` after every non-empty
/// page. The first empty page ends the sequence. A failed fetch is retried
/// per the retry policy; if it still fails it is yielded once and the
/// sequence ends.
#[derive(Debug)]
pub struct LazyPaginator<'a> {
    server: &'a Server,
    page_size: usize,
    offset: usize,
    retry: RetryPolicy,
    done: bool,
}

impl<'a> LazyPaginator<'a> {
    pub fn new(server: &'a Server, page_size: usize) -> Self {
        LazyPaginator {
            server,
            page_size,
            offset: 0,
            retry: RetryPolicy::none(),
            done: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Offset the next page will be fetched from.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for LazyPaginator<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.page_size == 0 {
            self.done = true;
            return Some(Err(ProdevError::InvalidArgument(
                "page size must be at least 1".to_string(),
            )));
        }

        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let offset = i64::try_from(self.offset).unwrap_or(i64::MAX);
        let server = self.server;
        match self.retry.run(|| fetch_page(server, limit, offset)) {
            Ok(page) if page.is_empty() => {
                debug!(offset = self.offset, "pagination finished");
                self.done = true;
                None
            }
            Ok(page) => {
                self.offset = self.offset.saturating_add(self.page_size);
                Some(Ok(page))
            }
            Err(e) => {
                error!("Error during pagination: {}", e);
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Pages of `page_size` records, fetched one at a time as the caller asks.
pub fn lazy_paginate(server: &Server, page_size: usize) -> LazyPaginator<'_> {
    LazyPaginator::new(server, page_size)
}
