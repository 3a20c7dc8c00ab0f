//! Prismic REST API v2 client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::raw::{RawDocument, RawPage};
use super::source::{ContentSource, SourceError};
use crate::config::PrismicConfig;

/// API root document; only the refs matter here
#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// HTTP client for a Prismic repository
#[derive(Clone, Debug)]
pub struct PrismicClient {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// Build a client from the `prismic` config section
    pub fn new(config: &PrismicConfig) -> Result<Self, SourceError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("spacetraveling/", env!("CARGO_PKG_VERSION"))
    }

    /// Current master ref; every search is made against it
    async fn master_ref(&self) -> Result<String, SourceError> {
        let mut url = self.endpoint.clone();
        self.append_token(&mut url);

        let root: ApiRoot = self.get_json(url).await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| SourceError::MissingMasterRef(self.endpoint.to_string()))
    }

    fn search_url(
        &self,
        master_ref: &str,
        predicate: &str,
        page_size: Option<usize>,
    ) -> Result<Url, SourceError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/documents/search", base))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("ref", master_ref);
            qp.append_pair("q", &format!("[{}]", predicate));
            if let Some(size) = page_size {
                qp.append_pair("pageSize", &size.to_string());
            }
        }
        self.append_token(&mut url);
        Ok(url)
    }

    fn append_token(&self, url: &mut Url) {
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        tracing::debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| SourceError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Quote a value for use inside a predicate string
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn fetch_page(
        &self,
        content_type: &str,
        page_size: usize,
    ) -> Result<RawPage, SourceError> {
        let master_ref = self.master_ref().await?;
        let predicate = format!("[at(document.type,{})]", quote(content_type));
        let url = self.search_url(&master_ref, &predicate, Some(page_size))?;
        self.get_json(url).await
    }

    async fn fetch_by_key(
        &self,
        content_type: &str,
        key: &str,
    ) -> Result<RawDocument, SourceError> {
        let master_ref = self.master_ref().await?;
        let predicate = format!("[at(my.{}.uid,{})]", content_type, quote(key));
        let url = self.search_url(&master_ref, &predicate, Some(1))?;
        let page: RawPage = self.get_json(url).await?;

        page.results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound {
                content_type: content_type.to_string(),
                uid: key.to_string(),
            })
    }

    async fn fetch_next(&self, next_page: &str) -> Result<RawPage, SourceError> {
        let url = Url::parse(next_page)?;
        self.get_json(url).await
    }
}
