//! Paginated traversal of remote result sets.
//!
//! [`fetch_all`] turns a page-at-a-time source into a lazy stream of
//! records: the next page is requested only once the current page's records
//! have been drained, and the traversal ends when the remote stops returning
//! a continuation token. A stream is not restartable mid-sequence; a fresh
//! call re-queries from the start.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::model::RemoteRecord;
use crate::remote::retry::with_retry;
use crate::remote::{Page, RemoteError};

/// A single query against a server-paginated endpoint.
///
/// Implementations bind a client to one query (a search, one compartment's
/// children, one compartment's backups) so the traversal logic stays
/// independent of what is being listed.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<Page, RemoteError>;
}

/// Traversal failure. A page fetch that exhausts its retry budget aborts the
/// whole traversal: a continuation-token boundary is not resumable without
/// remote support, so there is no per-record recovery.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("remote API unavailable after {attempts} attempts: {source}")]
    RemoteUnavailable {
        attempts: u32,
        #[source]
        source: RemoteError,
    },
}

/// Stream every record of a paginated query, in page order.
///
/// Each page fetch goes through the shared retry policy. The stream is lazy:
/// nothing is fetched until it is polled, and page N+1 is requested only
/// after the last record of page N has been yielded.
pub fn fetch_all<'a, S>(
    source: &'a S,
    retry: &'a RetryConfig,
    operation: &'a str,
) -> impl Stream<Item = Result<RemoteRecord, FetchError>> + 'a
where
    S: PageSource + ?Sized,
{
    struct Traversal {
        buffer: VecDeque<RemoteRecord>,
        next_token: Option<String>,
        exhausted: bool,
    }

    let start = Traversal {
        buffer: VecDeque::new(),
        next_token: None,
        exhausted: false,
    };

    futures::stream::try_unfold(start, move |mut state| async move {
        loop {
            if let Some(record) = state.buffer.pop_front() {
                return Ok(Some((record, state)));
            }
            if state.exhausted {
                return Ok(None);
            }

            let token = state.next_token.take();
            let (page, _attempts) =
                with_retry(retry, operation, || source.fetch_page(token.as_deref()))
                    .await
                    .map_err(|e| FetchError::RemoteUnavailable {
                        attempts: e.attempts,
                        source: e.error,
                    })?;

            state.buffer = page.records.into();
            state.next_token = page.next_token;
            // No token means this was the last page; drain the buffer and stop.
            state.exhausted = state.next_token.is_none();
        }
    })
}
