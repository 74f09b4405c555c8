//! Offset pagination expressed as a fold over a stream of pages.
//!
//! The HTTP transport is injected as a page-fetch closure so the accumulation rules can be
//! exercised without a server.

use std::future::Future;

use futures::{stream, TryStreamExt};
use tracing::debug;

use crate::error::IndexerError;

/// One page of results plus the total the indexer claims to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

struct PageCursor<F> {
    offset: Option<u64>,
    fetch_page: F,
}

async fn next_page<T, F, Fut>(
    cursor: PageCursor<F>,
    page_size: u32,
) -> Result<Option<(Vec<T>, PageCursor<F>)>, IndexerError>
where
    F: FnMut(u64, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, IndexerError>>,
{
    let PageCursor {
        offset,
        mut fetch_page,
    } = cursor;

    let Some(offset) = offset else {
        return Ok(None);
    };

    let page = fetch_page(offset, page_size).await?;
    let fetched = offset + page.items.len() as u64;

    debug!(
        offset,
        received = page.items.len(),
        total = page.total,
        "fetched indexer page"
    );

    // An empty page ends the loop even if `total` claims more, otherwise a stale total
    // would spin forever.
    let next_offset = if page.items.is_empty() || fetched >= page.total {
        None
    } else {
        Some(fetched)
    };

    Ok(Some((
        page.items,
        PageCursor {
            offset: next_offset,
            fetch_page,
        },
    )))
}

/// Fetches pages sequentially, starting at offset 0, until the accumulated length reaches
/// the reported total.
///
/// Any page error aborts the whole collection: callers never see a partial result.
pub async fn collect_pages<T, F, Fut>(page_size: u32, fetch_page: F) -> Result<Vec<T>, IndexerError>
where
    F: FnMut(u64, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, IndexerError>>,
{
    if page_size == 0 {
        return Err(IndexerError::Configuration(
            "page size must be greater than zero".to_string(),
        ));
    }

    let cursor = PageCursor {
        offset: Some(0),
        fetch_page,
    };

    stream::try_unfold(cursor, move |cursor| next_page(cursor, page_size))
        .try_concat()
        .await
}
