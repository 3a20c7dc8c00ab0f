//! Post models
//!
//! [`PostSummary`] feeds the listing, [`PostDetail`] the post page. Both are
//! built from [`RawDocument`]s and never modified afterwards.

use serde::{Deserialize, Serialize};

use super::raw::RawDocument;
use super::richtext::RichTextBlock;
use crate::helpers::DateFormatter;

/// A post as shown on the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Slug (URL-friendly identifier)
    pub uid: Option<String>,

    /// Publication timestamp exactly as the content source sent it
    pub first_publication_date: Option<String>,

    /// Formatted copy of the publication date
    pub display_date: String,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Map a raw record, formatting its date
    pub fn from_raw(doc: &RawDocument, dates: &DateFormatter) -> Self {
        Self {
            uid: doc.uid.clone(),
            first_publication_date: doc.first_publication_date.clone(),
            display_date: dates.format(doc.first_publication_date.as_deref()),
            title: doc.data.title.clone(),
            subtitle: doc.data.subtitle.clone(),
            author: doc.data.author.clone(),
        }
    }
}

/// A full post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub content: Vec<ContentSection>,
}

/// A heading followed by its body blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

impl From<RawDocument> for PostDetail {
    fn from(doc: RawDocument) -> Self {
        let banner_url = doc
            .data
            .banner
            .and_then(|b| b.url)
            .filter(|url| !url.is_empty());

        Self {
            uid: doc.uid,
            first_publication_date: doc.first_publication_date,
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
            banner_url,
            content: doc
                .data
                .content
                .into_iter()
                .map(|group| ContentSection {
                    heading: group.heading,
                    body: group.body,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::raw::{RawContentGroup, RawImage, RawPostData};

    fn raw_doc() -> RawDocument {
        RawDocument {
            id: "X1".to_string(),
            uid: Some("hello-world".to_string()),
            doc_type: "spacetraveling".to_string(),
            first_publication_date: Some("2021-03-25T00:00:00Z".to_string()),
            last_publication_date: None,
            data: RawPostData {
                title: "Hello".to_string(),
                subtitle: "World".to_string(),
                author: "Ana".to_string(),
                banner: Some(RawImage {
                    url: Some(String::new()),
                    alt: None,
                }),
                content: vec![RawContentGroup {
                    heading: "Intro".to_string(),
                    body: vec![RichTextBlock::paragraph("Some text")],
                }],
            },
        }
    }

    #[test]
    fn test_summary_keeps_source_date() {
        let doc = raw_doc();
        let summary = PostSummary::from_raw(&doc, &DateFormatter::default());
        assert_eq!(summary.display_date, "25 Mar 2021");
        assert_eq!(
            summary.first_publication_date.as_deref(),
            Some("2021-03-25T00:00:00Z")
        );
        assert_eq!(summary.uid.as_deref(), Some("hello-world"));
        assert_eq!(summary.subtitle, "World");
    }

    #[test]
    fn test_detail_from_raw() {
        let detail = PostDetail::from(raw_doc());
        assert_eq!(detail.title, "Hello");
        // empty banner url counts as no banner
        assert!(detail.banner_url.is_none());
        assert_eq!(detail.content.len(), 1);
        assert_eq!(detail.content[0].heading, "Intro");
        assert_eq!(detail.content[0].body[0].text, "Some text");
    }
}
