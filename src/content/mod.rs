//! Content module - post models and the content source they come from

mod post;
mod prismic;
pub mod raw;
pub mod richtext;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use post::{ContentSection, PostDetail, PostSummary};
pub use prismic::PrismicClient;
pub use raw::{RawDocument, RawPage};
pub use richtext::{RichTextBlock, Sanitizer};
pub use source::{ContentSource, SourceError};
