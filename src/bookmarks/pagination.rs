//! Bounded multi-page listing.
//!
//! The list endpoint returns at most [`PAGE_SIZE_CAP`] bookmarks per call and
//! has no server-side search. Pages are requested with the ids already seen
//! (`have`) so the server only returns new items; the query filter runs on
//! each page before it is accumulated, which keeps the ceiling check exact.

use std::collections::HashSet;
use std::future::Future;
use tracing::debug;

use crate::error::InstapaperError;
use crate::model::Bookmark;

/// Largest page the list endpoint will return.
pub const PAGE_SIZE_CAP: usize = 500;
/// Upper bound on page requests per listing.
pub const MAX_PAGES: usize = 10;
/// Result count when the caller gives no positive limit.
pub const DEFAULT_LIMIT: usize = 100;

/// Requested limit, with absent or non-positive values mapped to the default.
pub fn effective_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => DEFAULT_LIMIT,
    }
}

/// Accumulation stops once this many matches are collected.
pub fn fetch_ceiling(limit: usize) -> usize {
    limit.min(PAGE_SIZE_CAP * MAX_PAGES)
}

/// Case-insensitive title filter. Blank queries match everything.
///
/// A non-blank query is matched as given, surrounding whitespace included.
#[derive(Clone, Debug)]
pub struct TitleFilter {
    needle: Option<String>,
}

impl TitleFilter {
    pub fn new(query: Option<&str>) -> Self {
        let needle = query
            .filter(|q| !q.trim().is_empty())
            .map(str::to_lowercase);
        Self { needle }
    }

    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        match &self.needle {
            Some(needle) => bookmark.title.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }
}

/// Drive `fetch_page` until the ceiling is reached, a page brings nothing
/// new, or [`MAX_PAGES`] pages were requested.
///
/// `fetch_page` receives the 1-based page number and the comma-separated ids
/// seen so far (empty on the first page). The result keeps server order and
/// is truncated to `limit`.
pub async fn collect_pages<F, Fut>(
    limit: usize,
    filter: &TitleFilter,
    mut fetch_page: F,
) -> Result<Vec<Bookmark>, InstapaperError>
where
    F: FnMut(usize, String) -> Fut,
    Fut: Future<Output = Result<Vec<Bookmark>, InstapaperError>>,
{
    let ceiling = fetch_ceiling(limit);
    let mut seen_order: Vec<String> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut results: Vec<Bookmark> = Vec::new();

    for page in 1..=MAX_PAGES {
        let have = seen_order.join(",");
        let fetched = fetch_page(page, have).await?;

        let fresh: Vec<Bookmark> = fetched
            .into_iter()
            .filter(|b| seen.insert(b.bookmark_id))
            .collect();

        if fresh.is_empty() {
            debug!(page, "No new bookmarks, listing exhausted");
            break;
        }

        seen_order.extend(fresh.iter().map(|b| b.bookmark_id.to_string()));

        let before = results.len();
        results.extend(fresh.into_iter().filter(|b| filter.matches(b)));
        debug!(page, count = results.len() - before, total = results.len(), "Fetched bookmark page");

        if results.len() >= ceiling {
            break;
        }
    }

    results.truncate(limit);
    Ok(results)
}
