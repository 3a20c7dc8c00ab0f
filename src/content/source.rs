//! The content source seam
//!
//! Everything the blog reads comes through [`ContentSource`]. The production
//! implementation is [`super::PrismicClient`].

use async_trait::async_trait;
use thiserror::Error;

use super::raw::{RawDocument, RawPage};

/// Errors raised while talking to the content source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content source answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no {content_type} document with uid {uid:?}")]
    NotFound { content_type: String, uid: String },
    #[error("API root {0} lists no master ref")]
    MissingMasterRef(String),
}

impl SourceError {
    /// Whether the error means the document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Read access to paginated and keyed content
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of documents of a type
    async fn fetch_page(&self, content_type: &str, page_size: usize)
        -> Result<RawPage, SourceError>;

    /// One document by its uid
    async fn fetch_by_key(&self, content_type: &str, key: &str)
        -> Result<RawDocument, SourceError>;

    /// Follow an opaque `next_page` URL
    async fn fetch_next(&self, next_page: &str) -> Result<RawPage, SourceError>;
}
