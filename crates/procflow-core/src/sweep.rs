// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded-page loops over filtered row sets.
//!
//! [`drain`] is the bulk sweep: fetch the first page, act on every row (the
//! action must take the row out of the filter, e.g. delete it), and fetch the
//! first page again. It stops when a fetch returns fewer rows than the page
//! size. Offsets are never carried over between fetches, so rows inserted
//! concurrently into the same filter are picked up by a later page instead
//! of shifting a stale offset. A failure aborts the loop; pages already
//! processed stay processed and re-running the sweep resumes the work.
//!
//! [`scan`] walks the set page by page with an advancing offset, for actions
//! that leave rows in place.

use std::future::Future;

use tracing::debug;

use crate::error::Result;
use crate::persistence::QueryOptions;

/// Drain a filtered set page by page. Returns the number of rows acted on.
///
/// `act` must remove its row from the filtered set, otherwise a full page is
/// fetched again forever.
pub(crate) async fn drain<T, F, FFut, A, AFut>(
    page_size: i64,
    mut fetch: F,
    mut act: A,
) -> Result<u64>
where
    F: FnMut(QueryOptions) -> FFut,
    FFut: Future<Output = Result<Vec<T>>>,
    A: FnMut(T) -> AFut,
    AFut: Future<Output = Result<()>>,
{
    let page_size = page_size.max(1);
    let mut total = 0u64;

    loop {
        let page = fetch(QueryOptions::first(page_size)).await?;
        let fetched = page.len();

        for row in page {
            act(row).await?;
        }
        total += fetched as u64;

        debug!(fetched, total, "Sweep page processed");
        if (fetched as i64) < page_size {
            return Ok(total);
        }
    }
}

/// Walk a filtered set page by page without removing rows. Returns the
/// number of rows acted on.
pub(crate) async fn scan<T, F, FFut, A, AFut>(
    page_size: i64,
    mut fetch: F,
    mut act: A,
) -> Result<u64>
where
    F: FnMut(QueryOptions) -> FFut,
    FFut: Future<Output = Result<Vec<T>>>,
    A: FnMut(T) -> AFut,
    AFut: Future<Output = Result<()>>,
{
    let page_size = page_size.max(1);
    let mut offset = 0i64;

    loop {
        let page = fetch(QueryOptions::new(offset, page_size)).await?;
        let fetched = page.len() as i64;

        for row in page {
            act(row).await?;
        }
        offset += fetched;

        if fetched < page_size {
            return Ok(offset as u64);
        }
    }
}

/// Collect every row of a filtered set.
pub(crate) async fn collect<T, F, FFut>(page_size: i64, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(QueryOptions) -> FFut,
    FFut: Future<Output = Result<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut rows = Vec::new();

    loop {
        let page = fetch(QueryOptions::new(rows.len() as i64, page_size)).await?;
        let fetched = page.len() as i64;
        rows.extend(page);

        if fetched < page_size {
            return Ok(rows);
        }
    }
}
