//! Wire shapes of the Prismic REST API
//!
//! Only the fields the blog consumes are modelled. Everything else the API
//! returns is ignored during deserialization.

use serde::{Deserialize, Deserializer, Serialize};

use super::richtext::RichTextBlock;

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default)]
    pub results_per_page: usize,
    #[serde(default)]
    pub results_size: usize,
    #[serde(default)]
    pub total_results_size: usize,
    #[serde(default)]
    pub total_pages: usize,
    /// Opaque URL of the following page, absent on the last page
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    #[serde(default)]
    pub results: Vec<RawDocument>,
}

fn first_page() -> usize {
    1
}

/// A single document of the post custom type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: RawPostData,
}

/// The `data` object of a post document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPostData {
    #[serde(default, deserialize_with = "plain_text")]
    pub title: String,
    #[serde(default, deserialize_with = "plain_text")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "plain_text")]
    pub author: String,
    #[serde(default)]
    pub banner: Option<RawImage>,
    #[serde(default)]
    pub content: Vec<RawContentGroup>,
}

/// Image field; an empty image comes back as `{}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// One entry of the `content` group field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContentGroup {
    #[serde(default, deserialize_with = "plain_text")]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextBlock>,
}

/// Accept a key-text field (plain string), a title/rich-text field (array of
/// blocks, joined by spaces) or null.
fn plain_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextField {
        Plain(String),
        Rich(Vec<RichTextBlock>),
        Null(()),
    }

    Ok(match TextField::deserialize(deserializer)? {
        TextField::Plain(s) => s,
        TextField::Rich(blocks) => blocks
            .iter()
            .map(|b| b.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        TextField::Null(()) => String::new(),
    })
}
