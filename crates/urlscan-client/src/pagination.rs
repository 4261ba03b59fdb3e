//! Lazy, forward-only iteration over paginated result sets.
//!
//! A [`PageSource`] knows how to turn a cursor into one [`ResultPage`];
//! [`ResultIterator`] drives it, buffering one page at a time and handing
//! out records in server order.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use tracing::debug;
use urlscan_core::ResultRecord;

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    /// Records in server order
    pub records: Vec<ResultRecord>,
    /// Cursor for the next page; `None` on the last page
    pub cursor: Option<String>,
}

impl ResultPage {
    /// Page with the given records and continuation cursor.
    #[must_use]
    pub fn new(records: Vec<ResultRecord>, cursor: Option<String>) -> Self {
        Self { records, cursor }
    }
}

/// A paginated endpoint.
#[async_trait]
pub trait PageSource: Send {
    /// Fetch the page at `cursor` (`None` for the first page).
    ///
    /// # Errors
    /// Returns error if the request fails or the page is malformed.
    async fn fetch_page(&mut self, cursor: Option<String>) -> Result<ResultPage>;
}

#[derive(Debug)]
enum NextPage {
    Fetch(Option<String>),
    Exhausted,
}

/// Single-pass iterator over every record of a [`PageSource`].
///
/// Records are fetched lazily: a page is only requested once the previous
/// one has been fully consumed. Each cursor is exchanged for a page exactly
/// once.
///
/// # Example
///
/// ```rust,no_run
/// use urlscan_client::{Client, SearchQuery};
///
/// # async fn run() -> urlscan_client::Result<()> {
/// let client = Client::new("my-api-key")?;
/// let mut results = client.search(SearchQuery::new("domain:example.com").with_limit(250));
/// while let Some(record) = results.try_next().await? {
///     println!("{:?}", record.id());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ResultIterator<S> {
    source: S,
    buffer: VecDeque<ResultRecord>,
    next: NextPage,
    last_cursor: Option<String>,
    limit: Option<usize>,
    yielded: usize,
    done: bool,
}

impl<S: PageSource> ResultIterator<S> {
    /// Iterate `source` from its first page.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            next: NextPage::Fetch(None),
            last_cursor: None,
            limit: None,
            yielded: 0,
            done: false,
        }
    }

    /// Stop after `limit` records.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Start at `cursor` instead of the first page.
    #[must_use]
    pub fn starting_at(mut self, cursor: Option<String>) -> Self {
        self.next = NextPage::Fetch(cursor);
        self
    }

    /// Number of records handed out so far.
    #[must_use]
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Next record, `Ok(None)` once exhausted.
    ///
    /// After an error the iterator is finished and keeps returning `Ok(None)`.
    ///
    /// # Errors
    /// Returns error if a page fetch fails or the server repeats a cursor.
    pub async fn try_next(&mut self) -> Result<Option<ResultRecord>> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self.limit.is_some_and(|limit| self.yielded >= limit) {
                self.finish();
                return Ok(None);
            }
            if let Some(record) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(record));
            }

            let cursor = match std::mem::replace(&mut self.next, NextPage::Exhausted) {
                NextPage::Fetch(cursor) => cursor,
                NextPage::Exhausted => {
                    self.finish();
                    return Ok(None);
                }
            };
            if cursor.is_some() && cursor == self.last_cursor {
                self.finish();
                return Err(ClientError::Protocol(format!(
                    "server returned cursor '{}' twice in a row",
                    cursor.unwrap_or_default()
                )));
            }

            let page = match self.source.fetch_page(cursor.clone()).await {
                Ok(page) => page,
                Err(e) => {
                    self.finish();
                    return Err(e);
                }
            };
            debug!(
                "Fetched page of {} record(s), more: {}",
                page.records.len(),
                page.cursor.is_some()
            );

            self.last_cursor = cursor;
            self.buffer.extend(page.records);
            self.next = match page.cursor {
                Some(next) => NextPage::Fetch(Some(next)),
                None => NextPage::Exhausted,
            };
        }
    }

    /// Drain every remaining record, stopping at the first error.
    ///
    /// # Errors
    /// Returns the first error encountered.
    pub async fn collect_all(mut self) -> Result<Vec<ResultRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.try_next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Adapt into a [`Stream`] that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<ResultRecord>> {
        stream::unfold(self, |mut iter| async move {
            match iter.try_next().await {
                Ok(Some(record)) => Some((Ok(record), iter)),
                Ok(None) => None,
                Err(e) => Some((Err(e), iter)),
            }
        })
    }

    fn finish(&mut self) {
        self.done = true;
        self.buffer.clear();
        self.next = NextPage::Exhausted;
    }
}
