//! In-memory content source for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::raw::{RawContentGroup, RawDocument, RawPage, RawPostData};
use super::richtext::RichTextBlock;
use super::source::{ContentSource, SourceError};

const NEXT_PREFIX: &str = "memory://page/";

/// Serves a fixed list of pages and documents
pub struct MemorySource {
    pages: Vec<RawPage>,
    documents: Vec<RawDocument>,
    network_calls: AtomicUsize,
}

impl MemorySource {
    /// One page per inner vector, chained through `memory://page/N` tokens
    pub fn with_pages(pages: Vec<Vec<RawDocument>>) -> Self {
        let total = pages.len();
        let documents = pages.iter().flatten().cloned().collect();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, results)| RawPage {
                page: i + 1,
                results_per_page: results.len(),
                results_size: results.len(),
                total_results_size: 0,
                total_pages: total,
                next_page: (i + 1 < total).then(|| format!("{}{}", NEXT_PREFIX, i + 2)),
                prev_page: (i > 0).then(|| format!("{}{}", NEXT_PREFIX, i)),
                results,
            })
            .collect();

        Self {
            pages,
            documents,
            network_calls: AtomicUsize::new(0),
        }
    }

    /// Pages served as given; `memory://page/N` tokens resolve to the Nth
    pub fn with_raw_pages(pages: Vec<RawPage>) -> Self {
        let documents = pages.iter().flat_map(|p| p.results.clone()).collect();
        Self {
            pages,
            documents,
            network_calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch_page(
        &self,
        _content_type: &str,
        _page_size: usize,
    ) -> Result<RawPage, SourceError> {
        self.record_call();
        Ok(self.pages.first().cloned().unwrap_or(RawPage {
            page: 1,
            results_per_page: 0,
            results_size: 0,
            total_results_size: 0,
            total_pages: 0,
            next_page: None,
            prev_page: None,
            results: Vec::new(),
        }))
    }

    async fn fetch_by_key(
        &self,
        content_type: &str,
        key: &str,
    ) -> Result<RawDocument, SourceError> {
        self.record_call();
        self.documents
            .iter()
            .find(|d| d.uid.as_deref() == Some(key))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                content_type: content_type.to_string(),
                uid: key.to_string(),
            })
    }

    async fn fetch_next(&self, next_page: &str) -> Result<RawPage, SourceError> {
        self.record_call();
        let index = next_page
            .strip_prefix(NEXT_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1));

        match index.and_then(|i| self.pages.get(i)) {
            Some(page) => Ok(page.clone()),
            None => Err(SourceError::Status {
                status: 404,
                url: next_page.to_string(),
            }),
        }
    }
}

/// A post document with one content section
pub fn doc(uid: &str, title: &str, date: Option<&str>) -> RawDocument {
    RawDocument {
        id: format!("id-{}", uid),
        uid: Some(uid.to_string()),
        doc_type: "spacetraveling".to_string(),
        first_publication_date: date.map(str::to_string),
        last_publication_date: date.map(str::to_string),
        data: RawPostData {
            title: title.to_string(),
            subtitle: format!("{} subtitle", title),
            author: "Joseph Oliveira".to_string(),
            banner: None,
            content: vec![RawContentGroup {
                heading: "First steps".to_string(),
                body: vec![RichTextBlock::paragraph("Lorem ipsum dolor sit amet")],
            }],
        },
    }
}
