//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `prismic.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    /// Language of the UI strings (en, pt-BR)
    pub language: String,
    /// Locale used for month names in dates (en_US, pt_BR, ...)
    pub locale: String,
    /// IANA timezone dates are shown in
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date format (date-fns style tokens)
    pub date_format: String,

    /// Banner shown on posts that have no banner of their own
    pub banner: String,

    #[serde(default)]
    pub prismic: PrismicConfig,

    #[serde(default)]
    pub reading: ReadingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "en".to_string(),
            locale: "en_US".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "dd MMM yyyy".to_string(),

            banner: "/banner.png".to_string(),

            prismic: PrismicConfig::default(),
            reading: ReadingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply PRISMIC_* environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using Prismic endpoint from {}", ENDPOINT_ENV);
            self.prismic.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.prismic.access_token = Some(token);
        }
    }
}

/// Content repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API root, e.g. https://my-repo.cdn.prismic.io/api/v2
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding the blog posts
    pub content_type: String,
    /// Posts per listing page
    pub page_size: usize,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            content_type: "spacetraveling".to_string(),
            page_size: 1,
        }
    }
}

/// Read-time estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.date_format, "dd MMM yyyy");
        assert_eq!(config.prismic.content_type, "spacetraveling");
        assert_eq!(config.prismic.page_size, 1);
        assert_eq!(config.reading.words_per_minute, 200);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: pt-BR
locale: pt_BR
prismic:
  endpoint: https://blog.cdn.prismic.io/api/v2
  page_size: 5
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.locale, "pt_BR");
        assert_eq!(config.prismic.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.page_size, 5);
        // untouched fields keep their defaults
        assert_eq!(config.prismic.content_type, "spacetraveling");
        assert_eq!(config.reading.words_per_minute, 200);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://other.cdn.prismic.io/api/v2".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.prismic.endpoint, "https://other.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.access_token.as_deref(), Some("secret"));

        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.prismic.endpoint, "https://other.cdn.prismic.io/api/v2");
    }
}
