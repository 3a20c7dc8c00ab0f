//! Listing pagination
//!
//! The listing is an append-only sequence of [`PostSummary`] values plus a
//! [`PaginationCursor`]. State is never mutated in place: [`ListingState::apply`]
//! consumes the current state and a fetched page and returns the next state,
//! and [`load_more`] takes the state by value, so two appends racing on the same
//! list cannot be written.
//!
//! Duplicate uids across pages are kept as they come.

use serde::Serialize;

use crate::config::PrismicConfig;
use crate::content::{ContentSource, PostSummary, RawPage, SourceError};
use crate::helpers::DateFormatter;

/// Most pages followed when walking the whole listing
pub const MAX_PAGES: usize = 1000;

/// Where the listing is in the result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationCursor {
    /// Opaque URL of the next page, `None` once the last page is loaded
    pub next_page: Option<String>,
    pub current_page: usize,
}

impl PaginationCursor {
    /// Whether another page can be requested
    pub fn has_next(&self) -> bool {
        self.next_page.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Posts loaded so far and the cursor to continue from
#[derive(Debug, Clone, Serialize)]
pub struct ListingState {
    pub posts: Vec<PostSummary>,
    pub cursor: PaginationCursor,
}

impl ListingState {
    /// State right after the first page arrived
    pub fn from_first_page(page: RawPage, dates: &DateFormatter) -> Self {
        let empty = Self {
            posts: Vec::new(),
            cursor: PaginationCursor {
                next_page: None,
                current_page: 0,
            },
        };
        empty.apply(page, dates)
    }

    /// Append a fetched page and move the cursor onto it
    pub fn apply(self, page: RawPage, dates: &DateFormatter) -> Self {
        let mut posts = self.posts;
        posts.extend(
            page.results
                .iter()
                .map(|doc| PostSummary::from_raw(doc, dates)),
        );

        Self {
            posts,
            cursor: PaginationCursor {
                next_page: page.next_page,
                current_page: page.page.max(self.cursor.current_page + 1),
            },
        }
    }

    /// Slugs of the loaded posts, in listing order
    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.posts.iter().filter_map(|p| p.uid.as_deref())
    }
}

/// Fetch the first page of posts
pub async fn first_page(
    source: &dyn ContentSource,
    prismic: &PrismicConfig,
    dates: &DateFormatter,
) -> Result<ListingState, SourceError> {
    let page = source
        .fetch_page(&prismic.content_type, prismic.page_size)
        .await?;
    tracing::debug!(
        "First page: {} posts, next page: {}",
        page.results.len(),
        page.next_page.is_some()
    );
    Ok(ListingState::from_first_page(page, dates))
}

/// Fetch the page after `state` and merge it
///
/// Returns `state` untouched, without touching the network, when the cursor
/// has no next page.
pub async fn load_more(
    source: &dyn ContentSource,
    state: ListingState,
    dates: &DateFormatter,
) -> Result<ListingState, SourceError> {
    let next = match &state.cursor.next_page {
        Some(url) if state.cursor.has_next() => url.clone(),
        _ => return Ok(state),
    };

    let mut page = source.fetch_next(&next).await?;
    if page.next_page.as_deref() == Some(next.as_str()) {
        tracing::warn!("Page {} points back at itself, stopping pagination", next);
        page.next_page = None;
    }
    tracing::debug!(
        "Loaded page {} with {} posts",
        page.page,
        page.results.len()
    );
    Ok(state.apply(page, dates))
}

/// First page plus up to `pages - 1` merges, stopping at the last page
pub async fn load_pages(
    source: &dyn ContentSource,
    prismic: &PrismicConfig,
    dates: &DateFormatter,
    pages: usize,
) -> Result<ListingState, SourceError> {
    let mut state = first_page(source, prismic, dates).await?;
    for _ in 1..pages {
        if !state.cursor.has_next() {
            break;
        }
        state = load_more(source, state, dates).await?;
    }
    Ok(state)
}
